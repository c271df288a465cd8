use std::fmt;
use thiserror::Error;

pub type SheetResult<T> = Result<T, SheetError>;

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Excel read error: {0}")]
    Read(#[from] calamine::XlsxError),

    #[error("Excel package error: {0}")]
    Package(#[from] zip::result::ZipError),

    #[error("Excel XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Excel write error: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("Format error: {0}")]
    Format(FormatErrorContext),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InputDomain(String),

    #[error("Sheet '{0}' already exists")]
    DuplicateSheet(String),
}

impl SheetError {
    /// Shorthand for a bare format error with only a value and a reason.
    pub fn format(value: impl Into<String>, reason: impl Into<String>) -> Self {
        SheetError::Format(FormatErrorContext::new(value, reason))
    }

    pub fn is_format(&self) -> bool {
        matches!(self, SheetError::Format(_))
    }

    /// Attach field/cell context to a format error. Other variants pass through.
    pub fn at(self, field: &str, cell: &str) -> Self {
        match self {
            SheetError::Format(ctx) => SheetError::Format(ctx.with_field(field).with_cell(cell)),
            other => other,
        }
    }
}

/// Diagnostic context for a cell that could not be interpreted
#[derive(Debug, Clone, PartialEq)]
pub struct FormatErrorContext {
    /// Raw cell text as found in the sheet
    pub value: String,
    /// What went wrong
    pub reason: String,
    /// Field the value was bound to, if binding got that far
    pub field: Option<String>,
    /// A1 reference of the offending cell
    pub cell: Option<String>,
    /// Number format id that triggered the failure
    pub format_id: Option<u32>,
}

impl FormatErrorContext {
    pub fn new(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            reason: reason.into(),
            field: None,
            cell: None,
            format_id: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Keeps an already recorded cell reference (the decoder knows it first).
    pub fn with_cell(mut self, cell: impl Into<String>) -> Self {
        if self.cell.is_none() {
            let cell = cell.into();
            if !cell.is_empty() {
                self.cell = Some(cell);
            }
        }
        self
    }

    pub fn with_format_id(mut self, format_id: u32) -> Self {
        self.format_id = Some(format_id);
        self
    }
}

impl fmt::Display for FormatErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)?;
        if let Some(id) = self.format_id {
            write!(f, " [format id {}]", id)?;
        }
        if let Some(field) = &self.field {
            write!(f, " in field '{}'", field)?;
        }
        if let Some(cell) = &self.cell {
            write!(f, " at {}", cell)?;
        }
        write!(f, " (value: '{}')", self.value)
    }
}

impl From<FormatErrorContext> for SheetError {
    fn from(ctx: FormatErrorContext) -> Self {
        SheetError::Format(ctx)
    }
}
