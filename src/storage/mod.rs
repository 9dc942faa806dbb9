mod repository;
mod store;

pub use repository::*;
pub use store::*;

/// Store key holding the signed-in user record
pub const CURRENT_USER_KEY: &str = "currentUser";

/// Store key holding every registered user
pub const REGISTERED_USERS_KEY: &str = "registeredUsers";

/// Store key holding the flat, user-tagged expense collection
pub const ALL_EXPENSES_KEY: &str = "allExpenses";
