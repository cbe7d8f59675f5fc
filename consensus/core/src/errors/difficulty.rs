use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DifficultyError {
    #[error("the difficulty window has only {0} entries while {1} are required")]
    UnderMinWindowSizeAllowed(usize, usize),

    #[error("the difficulty window timestamps have an empty range")]
    EmptyTimestampRange,
}

pub type DifficultyResult<T> = std::result::Result<T, DifficultyError>;
