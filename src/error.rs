use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("bad input: {0}")]
    BadInput(String),

    #[error("capacity exceeded: value of {size} bytes exceeds cache capacity of {capacity} bytes")]
    CapacityExceeded { size: usize, capacity: usize },

    #[error("missing dependency: {0}")]
    MissingDependency(String),
}

impl Error {
    pub fn bad_input(msg: impl Into<String>) -> Self {
        Error::BadInput(msg.into())
    }

    pub fn missing_dependency(msg: impl Into<String>) -> Self {
        Error::MissingDependency(msg.into())
    }
}
