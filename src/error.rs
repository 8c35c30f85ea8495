/// Failure to open a circuit definition file.
#[derive(Debug)]
pub enum FileError {
    NotFound(String),
    NotTxt(String),
    Io(std::io::Error),
}

impl std::fmt::Display for FileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileError::NotFound(path) => write!(f, "file not found: {path}"),
            FileError::NotTxt(path) => write!(f, "not a .txt file: {path}"),
            FileError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for FileError {}

impl From<std::io::Error> for FileError {
    fn from(e: std::io::Error) -> FileError {
        FileError::Io(e)
    }
}

/// Why a device declaration was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    DevicePresent,
    InvalidQualifier,
}

/// Why a connection could not be made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionError {
    PortAbsent,
    InputConnected,
    InputToInput,
    OutputToOutput,
}

/// Why a monitor could not be added or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorError {
    NotOutput,
    MonitorPresent,
    MonitorAbsent,
}

/// Which class of rule a diagnostic violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Syntax,
    Semantic,
}

/// Where in the source a diagnostic points: the offending line's text, its
/// 1-based line number, and the 0-based column of the offending symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceContext {
    pub line: String,
    pub line_no: usize,
    pub col: usize,
}

/// One parse diagnostic. Diagnostics with no [`SourceContext`] describe
/// whole-file conditions such as an unconnected input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub category: Category,
    pub message: String,
    pub context: Option<SourceContext>,
}

impl Diagnostic {
    pub fn syntax(message: impl Into<String>, context: SourceContext) -> Diagnostic {
        Diagnostic {
            category: Category::Syntax,
            message: message.into(),
            context: Some(context),
        }
    }

    pub fn semantic(message: impl Into<String>, context: SourceContext) -> Diagnostic {
        Diagnostic {
            category: Category::Semantic,
            message: message.into(),
            context: Some(context),
        }
    }

    pub fn whole_file(message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            category: Category::Semantic,
            message: message.into(),
            context: None,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.category {
            Category::Syntax => "SyntaxError",
            Category::Semantic => "SemanticError",
        };
        if let Some(ctx) = &self.context {
            writeln!(f, "Error on line {}", ctx.line_no)?;
            writeln!(f, "{}", ctx.line)?;
            writeln!(f, "{}^", " ".repeat(ctx.col))?;
        }
        write!(f, "{label}: {}", self.message)
    }
}
