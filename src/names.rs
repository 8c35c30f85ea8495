use std::collections::BTreeMap;

/// A name id issued by [`Names`]. Ids are dense, stable for the life of the
/// table, and never reused.
pub type NameId = usize;

/// Interns identifier strings to unique integer ids.
///
/// Every module that deals with user-written names (the scanner, the device
/// model, the monitor store) works in terms of [`NameId`]s and goes through
/// this table to get the string back for display.
#[derive(Debug, Default)]
pub struct Names {
    names: Vec<String>,
    ids: BTreeMap<String, NameId>,
}

impl Names {
    pub fn new() -> Names {
        Names::default()
    }

    /// Returns the id for `name`, interning it on first sight.
    ///
    /// Panics if `name` does not start with a letter. The scanner only ever
    /// passes alpha-initial strings here; anything else is an embedding bug.
    pub fn lookup(&mut self, name: &str) -> NameId {
        assert!(
            name.chars().next().map_or(false, |c| c.is_ascii_alphabetic()),
            "name must start with a letter: {name:?}"
        );
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len();
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    /// Returns the id for `name` if it has been interned. Never inserts.
    pub fn query(&self, name: &str) -> Option<NameId> {
        self.ids.get(name).copied()
    }

    /// Returns the string for `name_id`, or `None` if no such id was issued.
    pub fn get_name_string(&self, name_id: NameId) -> Option<&str> {
        self.names.get(name_id).map(|s| s.as_str())
    }
}
