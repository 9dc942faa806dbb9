use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Please fill in all fields")]
    MissingCredentials,

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("No account found with this email ({0}). Please register first.")]
    AccountNotFound(String),

    #[error("An account with this email already exists ({0}). Please try logging in instead.")]
    AccountAlreadyExists(String),

    #[error("Invalid identity assertion: {0}")]
    InvalidAssertion(String),

    #[error("Identity assertion signature is not verified; refusing to trust it")]
    UnverifiedAssertion,

    #[error("User not authenticated")]
    Unauthenticated,

    #[error("Expenses for {0} could not be loaded; sign in again before making changes")]
    LedgerUnavailable(String),

    #[error("Invalid expense: {0}")]
    InvalidExpense(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl AppError {
    /// True for errors caused by user input rather than the environment.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::MissingCredentials
                | AppError::PasswordTooShort { .. }
                | AppError::InvalidAssertion(_)
                | AppError::InvalidExpense(_)
        )
    }
}
