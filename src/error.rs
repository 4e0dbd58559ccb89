use thiserror::Error;

/// Grammar violations found while reading a TSF file.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("Empty file.")]
    EmptyFile,

    #[error("Missing attribute section. Attribute section must come before data.")]
    MissingAttributeSection,

    #[error("Missing @data tag.")]
    MissingDataTag,

    #[error("Missing series information under data section.")]
    MissingSeries,

    #[error("Invalid meta-data specification at line {line}: {content}")]
    InvalidMetadata { line: usize, content: String },

    #[error("Missing attributes/values in series at line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid attribute type '{0}'. Supported types are numeric, string and date")]
    InvalidAttributeType(String),

    #[error("Invalid attribute value '{value}' for attribute '{attribute}' at line {line}")]
    InvalidAttributeValue {
        line: usize,
        attribute: String,
        value: String,
    },

    #[error("Invalid series value '{value}' at line {line}. Missing values should be indicated with ? symbol")]
    InvalidValue { line: usize, value: String },
}

#[derive(Error, Debug)]
pub enum ToolkitError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serde error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

pub type Result<T> = std::result::Result<T, ToolkitError>;
