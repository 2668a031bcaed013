use std::num::{ParseFloatError, ParseIntError};
use derive_more::*;

/// Failure to read a tileset document.
#[derive(Error, Display, From, Debug)]
pub enum TsxParseError {
    XmlError(roxmltree::Error),
    #[display(fmt="{_0}")]
    ParseIntError(ParseIntError),
    #[display(fmt="{_0}")]
    ParseFloatError(ParseFloatError),
    #[display(fmt="Unexpected root tag '{tag_name}'")]
    #[from(ignore)]
    UnexpectedTagError { tag_name: String },
    #[display(fmt="<{tag_name}> is missing attribute '{attribute}'")]
    #[from(ignore)]
    MissingAttribute { tag_name: String, attribute: String },
    #[display(fmt="Unexpected value {value}")]
    #[from(ignore)]
    InvalidAttributeValue { value: String },
    #[display(fmt="Invalid type tag '{tag}'")]
    #[from(ignore)]
    InvalidTileType { tag: String },
    #[display(fmt="Property '{name}' has unknown type '{type_name}'")]
    #[from(ignore)]
    UnknownPropertyType { name: String, type_name: String },
    #[display(fmt="Property '{name}' has value '{value}' which is not a valid {type_name}")]
    #[from(ignore)]
    InvalidPropertyValue { name: String, type_name: String, value: String },
    #[display(fmt="Line {line}: {source}")]
    #[from(ignore)]
    AtLine { line: u32, source: Box<TsxParseError> },
}

impl TsxParseError {
    /// Attaches the line of the element being parsed, unless the error already has one.
    pub fn at_line(self, line: u32) -> Self {
        match self {
            Self::AtLine { .. } => self,
            _ => Self::AtLine { line, source: Box::new(self) },
        }
    }
}
