// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use expenso::Config;
use expenso::application::{ExpenseLedger, IdentityService};
use expenso::domain::{Category, Cents, ExpenseDraft};
use expenso::storage::{MemoryStore, Repository, Store};

/// Identity service and ledger wired to one store
pub struct TestApp {
    pub store: Arc<dyn Store>,
    pub identity: IdentityService,
    pub ledger: ExpenseLedger,
}

impl TestApp {
    /// Fresh in-memory app with the default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self> {
        Self::on_store(Arc::new(MemoryStore::new()), config)
    }

    /// Build services over an existing store, as after a restart
    pub fn on_store(store: Arc<dyn Store>, config: Config) -> Result<Self> {
        let repo = Repository::new(store.clone());
        let identity = IdentityService::new(repo.clone(), config)?;
        let ledger = ExpenseLedger::new(repo, &identity);
        Ok(Self {
            store,
            identity,
            ledger,
        })
    }

    /// Simulated restart: new services over the same store
    pub fn restart(&self) -> Result<Self> {
        Self::on_store(self.store.clone(), self.identity.config().clone())
    }
}

/// In-memory store whose next read of a chosen key fails
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_next_get: Mutex<Option<String>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_get(&self, key: &str) {
        *self.fail_next_get.lock().unwrap() = Some(key.to_string());
    }
}

impl Store for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut failing = self.fail_next_get.lock().unwrap();
        if failing.as_deref() == Some(key) {
            *failing = None;
            return Err(anyhow!("read of {} failed", key));
        }
        drop(failing);
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key)
    }
}

/// Helper to parse a date string into NaiveDate
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

pub fn draft(description: &str, amount: Cents, category: Category) -> ExpenseDraft {
    ExpenseDraft::new(description, amount, category, parse_date("2024-06-01"))
}

pub fn draft_on(description: &str, amount: Cents, category: Category, date: &str) -> ExpenseDraft {
    ExpenseDraft::new(description, amount, category, parse_date(date))
}
