use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{Expense, User, UserId};

use super::{ALL_EXPENSES_KEY, CURRENT_USER_KEY, REGISTERED_USERS_KEY, Store};

/// Typed access to the persisted records on top of a key-value store.
///
/// Every value is a JSON document. Reads tolerate corrupt documents: the
/// damaged record is reported and treated as absent.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn Store>,
}

impl Repository {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CorruptRecord> {
        let raw = self
            .store
            .get(key)
            .with_context(|| format!("Failed to read {}", key))
            .map_err(CorruptRecord::Store)?;

        match raw {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|err| CorruptRecord::Json(key.to_string(), err)),
            None => Ok(None),
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)
            .with_context(|| format!("Failed to encode {}", key))?;
        self.store
            .set(key, &raw)
            .with_context(|| format!("Failed to write {}", key))
    }

    /// Read a collection, treating a corrupt document as empty.
    fn read_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.read_json::<Vec<T>>(key) {
            Ok(list) => Ok(list.unwrap_or_default()),
            Err(CorruptRecord::Json(key, err)) => {
                tracing::warn!(key = %key, error = %err, "discarding corrupt record");
                Ok(Vec::new())
            }
            Err(CorruptRecord::Store(err)) => Err(err),
        }
    }

    // ========================
    // Session
    // ========================

    /// Load the persisted current user. A corrupt record is removed.
    pub fn load_current_user(&self) -> Result<Option<User>> {
        match self.read_json(CURRENT_USER_KEY) {
            Ok(user) => Ok(user),
            Err(CorruptRecord::Json(key, err)) => {
                tracing::warn!(key = %key, error = %err, "discarding corrupt session record");
                self.clear_current_user()?;
                Ok(None)
            }
            Err(CorruptRecord::Store(err)) => Err(err),
        }
    }

    pub fn save_current_user(&self, user: &User) -> Result<()> {
        self.write_json(CURRENT_USER_KEY, user)
    }

    pub fn clear_current_user(&self) -> Result<()> {
        self.store
            .remove(CURRENT_USER_KEY)
            .context("Failed to clear current user")
    }

    // ========================
    // Registry
    // ========================

    pub fn list_registered_users(&self) -> Result<Vec<User>> {
        self.read_list(REGISTERED_USERS_KEY)
    }

    pub fn find_registered_user(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .list_registered_users()?
            .into_iter()
            .find(|u| u.email == email))
    }

    /// Insert or replace the registry entry with the same email.
    pub fn register_user(&self, user: &User) -> Result<()> {
        let mut users = self.list_registered_users()?;
        match users.iter_mut().find(|u| u.email == user.email) {
            Some(existing) => *existing = user.clone(),
            None => users.push(user.clone()),
        }
        self.write_json(REGISTERED_USERS_KEY, &users)
    }

    // ========================
    // Expenses
    // ========================

    pub fn list_all_expenses(&self) -> Result<Vec<Expense>> {
        self.read_list(ALL_EXPENSES_KEY)
    }

    /// The persisted expenses owned by one user, in stored order.
    pub fn list_expenses_for_user(&self, user_id: &UserId) -> Result<Vec<Expense>> {
        Ok(self
            .list_all_expenses()?
            .into_iter()
            .filter(|e| &e.user_id == user_id)
            .collect())
    }

    /// Replace one user's expenses, keeping every other user's records.
    pub fn save_expenses_for_user(&self, user_id: &UserId, expenses: &[Expense]) -> Result<()> {
        let mut all: Vec<Expense> = self
            .list_all_expenses()?
            .into_iter()
            .filter(|e| &e.user_id != user_id)
            .collect();
        all.extend(expenses.iter().cloned());
        self.write_json(ALL_EXPENSES_KEY, &all)
    }
}

enum CorruptRecord {
    Store(anyhow::Error),
    Json(String, serde_json::Error),
}
