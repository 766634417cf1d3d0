use thiserror::Error;

/// Failure taxonomy shared by every store operation.
#[derive(Debug, Error)]
pub enum CmsError {
    /// Lookup by id, slug, clerk id or email found nothing. Carries the model
    /// name used in the message ("Post not found").
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Slug already exists")]
    DuplicateSlug,

    #[error("User already exists")]
    DuplicateUser,

    #[error("Email already in use")]
    DuplicateEmail,

    /// Required field missing, wrong type, or enum value outside its set.
    #[error("{0}")]
    Validation(String),

    /// A settings category name that has no backing collection.
    #[error("Invalid setting type: {0}")]
    InvalidCategory(String),

    /// The store rejected a write because a unique index already holds the
    /// value. Resource stores translate this into the matching duplicate error.
    #[error("unique index `{index}` rejected the write")]
    UniqueViolation {
        /// Name of the violated index, `<collection>_<field>_unique`.
        index: String,
    },

    #[error(transparent)]
    Server(#[from] anyhow::Error),
}

impl CmsError {
    /// Builds the validation error for `model`, shaped like
    /// "Post validation failed: title is required".
    pub fn validation(model: &str, detail: impl std::fmt::Display) -> Self {
        Self::Validation(format!("{model} validation failed: {detail}"))
    }

    /// Whether the error was caused by client input rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::DuplicateSlug
                | Self::DuplicateUser
                | Self::DuplicateEmail
                | Self::Validation(_)
                | Self::UniqueViolation { .. }
        )
    }
}

/// Result alias used across the shared crate.
pub type CmsResult<T> = std::result::Result<T, CmsError>;
