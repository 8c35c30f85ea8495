use std::collections::BTreeMap;
use std::path::Path;

use lazy_static::lazy_static;

use crate::devices::{DeviceType, InputPort, OutputPort};
use crate::error::FileError;
use crate::names::{NameId, Names};

/// The reserved structural keywords of the definition language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Devices,
    Connect,
    Monitor,
    End,
    /// The gate pin prefix, as in `G1.I2`.
    I,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Devices => "DEVICES",
            Keyword::Connect => "CONNECT",
            Keyword::Monitor => "MONITOR",
            Keyword::End => "END",
            Keyword::I => "I",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Dot,
    Comma,
    Semicolon,
    Equals,
    Arrow,
    OpenBracket,
    CloseBracket,
    Keyword(Keyword),
    Device(DeviceType),
    DtypeInput(InputPort),
    DtypeOutput(OutputPort),
    /// An unsigned integer literal, kept as its source text.
    Number(String),
    Name(NameId),
    Eof,
}

/// One token with the character offset where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub pos: usize,
}

lazy_static! {
    static ref RESERVED_WORDS: BTreeMap<&'static str, SymbolKind> = {
        let mut words = BTreeMap::new();
        words.insert("DEVICES", SymbolKind::Keyword(Keyword::Devices));
        words.insert("CONNECT", SymbolKind::Keyword(Keyword::Connect));
        words.insert("MONITOR", SymbolKind::Keyword(Keyword::Monitor));
        words.insert("END", SymbolKind::Keyword(Keyword::End));
        words.insert("I", SymbolKind::Keyword(Keyword::I));
        words.insert("CLOCK", SymbolKind::Device(DeviceType::Clock));
        words.insert("SWITCH", SymbolKind::Device(DeviceType::Switch));
        words.insert("AND", SymbolKind::Device(DeviceType::And));
        words.insert("NAND", SymbolKind::Device(DeviceType::Nand));
        words.insert("OR", SymbolKind::Device(DeviceType::Or));
        words.insert("NOR", SymbolKind::Device(DeviceType::Nor));
        words.insert("XOR", SymbolKind::Device(DeviceType::Xor));
        words.insert("NOT", SymbolKind::Device(DeviceType::Not));
        words.insert("DTYPE", SymbolKind::Device(DeviceType::Dtype));
        words.insert("SET", SymbolKind::DtypeInput(InputPort::Set));
        words.insert("CLEAR", SymbolKind::DtypeInput(InputPort::Clear));
        words.insert("DATA", SymbolKind::DtypeInput(InputPort::Data));
        words.insert("CLK", SymbolKind::DtypeInput(InputPort::Clk));
        words.insert("Q", SymbolKind::DtypeOutput(OutputPort::Q));
        words.insert("QBAR", SymbolKind::DtypeOutput(OutputPort::Qbar));
        words
    };
}

/// Turns a definition file into a stream of [`Symbol`]s.
///
/// Characters with no place in the language (including `-`, which lets `->`
/// read as an arrow) are skipped without complaint, and `#` starts a comment
/// running to the end of the line.
#[derive(Debug)]
pub struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line_starts: Vec<usize>,
}

impl Scanner {
    /// Opens a definition file. The path must name an existing `.txt` file.
    pub fn open(path: impl AsRef<Path>) -> Result<Scanner, FileError> {
        let path = path.as_ref();
        if path.extension().map_or(true, |ext| ext != "txt") {
            return Err(FileError::NotTxt(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FileError::NotFound(path.display().to_string())
            } else {
                FileError::Io(e)
            }
        })?;
        Ok(Scanner::from_string(&text))
    }

    pub fn from_string(text: &str) -> Scanner {
        let chars: Vec<char> = text.chars().collect();
        let mut line_starts = vec![0];
        for (i, ch) in chars.iter().enumerate() {
            if *ch == '\n' {
                line_starts.push(i + 1);
            }
        }
        Scanner {
            chars,
            pos: 0,
            line_starts,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_to_symbol(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '#' {
                while self.peek().map_or(false, |c| c != '\n') {
                    self.pos += 1;
                }
            } else if ch.is_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn read_name(&mut self) -> String {
        let mut word = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() {
                word.push(ch);
                self.pos += 1;
            } else {
                break;
            }
        }
        word
    }

    fn read_number(&mut self) -> String {
        let mut digits = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.pos += 1;
            } else {
                break;
            }
        }
        digits
    }

    /// Returns the next symbol, interning any name through `names`.
    ///
    /// `after_dot` is true when the previous symbol was a dot. It makes a
    /// leading `I` lex as its own keyword so a pin reference like `.I12`
    /// comes out as dot, `I`, number.
    pub fn next_symbol(&mut self, names: &mut Names, after_dot: bool) -> Symbol {
        loop {
            self.skip_to_symbol();
            let pos = self.pos;
            let Some(ch) = self.peek() else {
                return Symbol { kind: SymbolKind::Eof, pos };
            };
            let kind = match ch {
                '.' => {
                    self.pos += 1;
                    SymbolKind::Dot
                }
                ',' => {
                    self.pos += 1;
                    SymbolKind::Comma
                }
                ';' => {
                    self.pos += 1;
                    SymbolKind::Semicolon
                }
                '=' => {
                    self.pos += 1;
                    SymbolKind::Equals
                }
                '>' => {
                    self.pos += 1;
                    SymbolKind::Arrow
                }
                '(' => {
                    self.pos += 1;
                    SymbolKind::OpenBracket
                }
                ')' => {
                    self.pos += 1;
                    SymbolKind::CloseBracket
                }
                'I' if after_dot => {
                    self.pos += 1;
                    SymbolKind::Keyword(Keyword::I)
                }
                ch if ch.is_ascii_alphabetic() => {
                    let word = self.read_name();
                    match RESERVED_WORDS.get(word.as_str()) {
                        Some(kind) => kind.clone(),
                        None => SymbolKind::Name(names.lookup(&word)),
                    }
                }
                ch if ch.is_ascii_digit() => SymbolKind::Number(self.read_number()),
                _ => {
                    // Anything else is garbage and gets dropped.
                    self.pos += 1;
                    continue;
                }
            };
            return Symbol { kind, pos };
        }
    }

    /// The line containing `pos`: its text, 1-based number, and the 0-based
    /// column of `pos` within it.
    pub fn error_context(&self, pos: usize) -> (String, usize, usize) {
        let pos = pos.min(self.chars.len());
        let line_idx = match self.line_starts.binary_search(&pos) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let start = self.line_starts[line_idx];
        let end = self
            .line_starts
            .get(line_idx + 1)
            .map(|next| next - 1)
            .unwrap_or(self.chars.len());
        let line: String = self.chars[start..end].iter().collect();
        (line, line_idx + 1, pos - start)
    }
}
