use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("unknown source format: \"{0}\"")]
    UnknownSourceFormat(String),
    #[error("invalid profile: {0}")]
    InvalidProfile(String),
    #[error("invalid override: {0}")]
    InvalidOverride(String),
    #[error("no such property: \"{0}\"")]
    KeyNotFound(String),
    #[error("cannot merge a mapping with a scalar at \"{0}\"")]
    MergeConflict(String),
    #[error("unexpected node: {0}")]
    UnexpectedNode(String),
    #[error("malformed YAML profile")]
    Parse(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type ProfileResult<T> = std::result::Result<T, ProfileError>;

impl ProfileError {
    /// Collapses everything but the user-facing kinds into `Parse`.
    pub(crate) fn into_parse(self) -> Self {
        match self {
            ProfileError::UnknownSourceFormat(_)
            | ProfileError::InvalidProfile(_)
            | ProfileError::Parse(_) => self,
            other => ProfileError::Parse(Box::new(other)),
        }
    }

    pub(crate) fn parse<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ProfileError::Parse(Box::new(err))
    }
}
