//! Error types for aggregated associations.

use std::fmt;

/// The primary error type for all aggregated-association operations.
#[derive(Debug)]
pub enum Error {
    /// Model metadata is malformed; raised while a model class is being defined
    Definition(DefinitionError),
    /// Value conversion errors
    Type(TypeError),
    /// An accessor name the model does not respond to
    NoMethod(NoMethodError),
    /// Configuration errors
    Config(ConfigError),
    /// Custom error with message
    Custom(String),
}

/// Failure raised while generating accessor metadata for a model.
#[derive(Debug, Clone)]
pub struct DefinitionError {
    pub kind: DefinitionErrorKind,
    /// Table name of the model whose metadata is malformed
    pub model: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionErrorKind {
    /// An attribute has an empty name
    EmptyAttributeName,
    /// Two attributes share the same name
    DuplicateAttribute,
    /// An attribute name cannot be used as an accessor name
    InvalidAccessorName,
    /// An enumerated attribute does not name a declared attribute
    UnknownEnumAttribute,
    /// An enumerated attribute declares no values
    EmptyEnum,
}

#[derive(Debug, Clone)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub attribute: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NoMethodError {
    /// Table name of the model that was asked
    pub model: &'static str,
    pub method: String,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Build a definition-time error.
    pub fn definition(
        kind: DefinitionErrorKind,
        model: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Error::Definition(DefinitionError {
            kind,
            model,
            message: message.into(),
        })
    }

    /// Build an error for an accessor the model does not respond to.
    pub fn no_method(model: &'static str, method: impl Into<String>) -> Self {
        Error::NoMethod(NoMethodError {
            model,
            method: method.into(),
        })
    }

    /// Build a type error for a value that could not be converted.
    pub fn type_mismatch(expected: &'static str, actual: impl Into<String>) -> Self {
        Error::Type(TypeError {
            expected,
            actual: actual.into(),
            attribute: None,
        })
    }

    /// Attach the attribute name to a type error; other errors pass through.
    #[must_use]
    pub fn with_attribute(self, attribute: &str) -> Self {
        match self {
            Error::Type(mut e) => {
                if e.attribute.is_none() {
                    e.attribute = Some(attribute.to_string());
                }
                Error::Type(e)
            }
            other => other,
        }
    }

    /// Whether this error was raised while defining a model class.
    pub fn is_definition(&self) -> bool {
        matches!(self, Error::Definition(_))
    }

    /// The definition error kind, if this is a definition error.
    pub fn definition_kind(&self) -> Option<DefinitionErrorKind> {
        match self {
            Error::Definition(e) => Some(e.kind),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Definition(e) => {
                write!(f, "Definition error on model '{}': {}", e.model, e.message)
            }
            Error::Type(e) => {
                if let Some(attr) = &e.attribute {
                    write!(
                        f,
                        "Type error in attribute '{}': expected {}, found {}",
                        attr, e.expected, e.actual
                    )
                } else {
                    write!(f, "Type error: expected {}, found {}", e.expected, e.actual)
                }
            }
            Error::NoMethod(e) => {
                write!(f, "undefined method '{}' for model '{}'", e.method, e.model)
            }
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Config(ConfigError {
            message: format!("invalid reserved-name pattern: {err}"),
            source: Some(Box::new(err)),
        })
    }
}

/// Result type alias for aggregated-association operations.
pub type Result<T> = std::result::Result<T, Error>;
