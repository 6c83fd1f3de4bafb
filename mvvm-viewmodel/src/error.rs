use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ViewModelError {
    #[error("invalid registration: {reason}")]
    InvalidRegistration { reason: &'static str },

    #[error("invalid parameter: expected={expected}, found={found}")]
    InvalidParameter {
        expected: &'static str,
        found: &'static str,
    },

    #[error("unknown property: {0}")]
    UnknownProperty(String),

    #[error("property type mismatch: property={property}, expected={expected}")]
    PropertyType {
        property: String,
        expected: &'static str,
    },

    #[error("view model hook panicked: owner={owner}, message={message}")]
    Panicked { owner: String, message: String },
}

pub type ViewModelResult<T> = Result<T, ViewModelError>;
