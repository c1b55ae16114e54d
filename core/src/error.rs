use thiserror::Error;

/// Errors produced by the catalog, the stores and the service layer.
#[derive(Debug, Error)]
pub enum Error {
    /// The request was malformed or incomplete.
    #[error("{0}")]
    Validation(String),

    /// No user, recipe or category matched. The payload names what was missing.
    #[error("{0} not found")]
    NotFound(String),

    /// A unique key (user name) already exists.
    #[error("{0}")]
    Conflict(String),

    /// The caller's role does not permit the operation.
    #[error("{0}")]
    Forbidden(String),

    /// The hosted store was unreachable, rejected the call or sent back
    /// something that could not be parsed.
    ///
    /// Never retried automatically.
    #[error("upstream store error: {0}")]
    Upstream(String),

    /// The stored `ingredients` column of a recipe is not a valid mapping.
    ///
    /// This is a data-integrity failure, distinct from [`Error::NotFound`].
    #[error("stored ingredients of recipe {recipe_id} could not be decoded: {source}")]
    CorruptIngredients {
        recipe_id: i64,
        #[source]
        source: serde_json::Error,
    },

    /// The ingredient catalog is missing, malformed or incomplete.
    #[error("invalid ingredient catalog: {0}")]
    Catalog(String),

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
