//! Errors surfaced by the blog engine.
//!
//! Every rejected mutation leaves the store exactly as it was; the variant
//! tells the caller which boundary answer to give.

use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Malformed input
    Validation(String),
    /// A referenced entity does not exist, or is not visible to the viewer
    NotFound(String),
    /// The viewer lacks the rights for the action
    PermissionDenied(String),
    /// A uniqueness violation survived the retry budget
    Conflict(String),
    /// Any other store failure
    Store(StoreError),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Error::PermissionDenied(msg.into())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Validation(msg) => write!(f, "Validation error: {}", msg),
            Error::NotFound(what) => write!(f, "Not found: {}", what),
            Error::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            Error::Conflict(msg) => write!(f, "Conflict: {}", msg),
            Error::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Error::Store(e)
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(e: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = e
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let codes: Vec<&str> = errors.iter().map(|err| err.code.as_ref()).collect();
                format!("{} ({})", field, codes.join(", "))
            })
            .collect();
        fields.sort();
        Error::Validation(format!("invalid fields: {}", fields.join("; ")))
    }
}
