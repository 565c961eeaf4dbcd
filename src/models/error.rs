use thiserror::Error;

/// Errors raised while mapping records to and from their JSON form
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid date `{0}`, expected YYYY-MM-DD or DD/MM/YYYY")]
    InvalidDate(String),

    #[error("invalid invoice number `{value}`: {reason}")]
    InvalidInvoiceNo { value: String, reason: &'static str },

    #[error("due date {due} is before issue date {issued}")]
    DueBeforeIssued { issued: String, due: String },

    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("unknown field `{0}`")]
    UnknownField(String),
}

impl ModelError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}
