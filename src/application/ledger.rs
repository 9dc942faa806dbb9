use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::domain::{
    Category, Cents, Expense, ExpenseDraft, ExpenseId, ExpensePatch, ExpenseQuery, User, UserId,
    total_amount, totals_by_category,
};
use crate::storage::Repository;

use super::reporting::{CategoryReport, LedgerSummary, build_category_report, build_summary};
use super::{AppError, IdentityService, Observable, SubscriptionId};

/// The active user's expenses.
///
/// Follows the identity service: whenever the current user changes the
/// in-memory list is rebuilt from the store, so it only ever holds the
/// signed-in user's records. Writes persist first and publish second.
///
/// Subscribers to [`ExpenseLedger::expenses_signal`] are called after the
/// write lock is released and may read the ledger, but must not mutate it.
pub struct ExpenseLedger {
    state: Arc<LedgerState>,
    user_signal: Arc<Observable<Option<User>>>,
    subscription: SubscriptionId,
}

struct LedgerState {
    repo: Repository,
    latency: Duration,
    /// Authoritative copy, held for the whole of each read-modify-write
    writer: Mutex<Active>,
    /// Taken before `writer` is released so changes are published in write order
    publishing: Mutex<()>,
    /// Published user, readable without the write lock
    user: Mutex<Option<UserId>>,
    expenses: Observable<Vec<Expense>>,
}

#[derive(Default)]
struct Active {
    user: Option<UserId>,
    expenses: Vec<Expense>,
    /// The user's stored records could not be read, so writing would clobber them
    load_failed: bool,
}

impl Active {
    fn writable_user(&self) -> Result<UserId, AppError> {
        let user = self.user.clone().ok_or(AppError::Unauthenticated)?;
        if self.load_failed {
            return Err(AppError::LedgerUnavailable(user.to_string()));
        }
        Ok(user)
    }
}

impl ExpenseLedger {
    /// Create a ledger bound to `identity`. It immediately loads the
    /// current user's expenses, if anyone is signed in.
    pub fn new(repo: Repository, identity: &IdentityService) -> Self {
        let state = Arc::new(LedgerState {
            repo,
            latency: identity.config().simulated_latency(),
            writer: Mutex::new(Active::default()),
            publishing: Mutex::new(()),
            user: Mutex::new(None),
            expenses: Observable::new(Vec::new()),
        });

        let user_signal = identity.current_user_signal();
        let listener = state.clone();
        let subscription = user_signal.subscribe(move |user| listener.resync(user.as_ref()));

        Self {
            state,
            user_signal,
            subscription,
        }
    }

    // ========================
    // Mutations
    // ========================

    /// Record a new expense for the signed-in user and return its id.
    pub async fn add(&self, draft: ExpenseDraft) -> Result<ExpenseId, AppError> {
        self.state.simulate_latency().await;

        let mut active = self.state.lock_writer();
        let user_id = active.writable_user()?;
        draft.validate().map_err(AppError::InvalidExpense)?;

        let expense = Expense::from_draft(draft, user_id.clone());
        let id = expense.id.clone();

        let mut expenses = active.expenses.clone();
        expenses.push(expense);
        self.state.repo.save_expenses_for_user(&user_id, &expenses)?;
        active.expenses = expenses;

        tracing::debug!(user_id = %user_id, expense_id = %id, "added expense");
        self.state.publish(active);
        Ok(id)
    }

    /// Apply a partial update. Returns `Ok(false)` if the signed-in user has
    /// no expense with this id.
    pub async fn update(&self, id: &ExpenseId, patch: ExpensePatch) -> Result<bool, AppError> {
        self.state.simulate_latency().await;

        let mut active = self.state.lock_writer();
        let user_id = active.writable_user()?;

        let mut expenses = active.expenses.clone();
        let Some(expense) = expenses.iter_mut().find(|e| &e.id == id) else {
            return Ok(false);
        };

        let mut updated = expense.clone();
        updated.apply(patch);
        updated.validate().map_err(AppError::InvalidExpense)?;
        *expense = updated;

        self.state.repo.save_expenses_for_user(&user_id, &expenses)?;
        active.expenses = expenses;

        tracing::debug!(user_id = %user_id, expense_id = %id, "updated expense");
        self.state.publish(active);
        Ok(true)
    }

    /// Remove an expense. Returns `Ok(false)` if the signed-in user has no
    /// expense with this id.
    pub async fn delete(&self, id: &ExpenseId) -> Result<bool, AppError> {
        self.state.simulate_latency().await;

        let mut active = self.state.lock_writer();
        let user_id = active.writable_user()?;

        let Some(index) = active.expenses.iter().position(|e| &e.id == id) else {
            return Ok(false);
        };
        let mut expenses = active.expenses.clone();
        expenses.remove(index);

        self.state.repo.save_expenses_for_user(&user_id, &expenses)?;
        active.expenses = expenses;

        tracing::debug!(user_id = %user_id, expense_id = %id, "deleted expense");
        self.state.publish(active);
        Ok(true)
    }

    // ========================
    // Queries
    // ========================

    /// Snapshot of the signed-in user's expenses, in insertion order.
    pub fn expenses(&self) -> Vec<Expense> {
        self.state.expenses.get()
    }

    /// Live list for the signed-in user.
    pub fn expenses_signal(&self) -> &Observable<Vec<Expense>> {
        &self.state.expenses
    }

    pub fn get(&self, id: &ExpenseId) -> Option<Expense> {
        self.state
            .expenses
            .with(|expenses| expenses.iter().find(|e| &e.id == id).cloned())
    }

    pub fn query(&self, query: &ExpenseQuery) -> Vec<Expense> {
        self.state.expenses.with(|expenses| query.apply(expenses))
    }

    /// The user whose expenses are currently loaded.
    pub fn active_user(&self) -> Option<UserId> {
        self.state.lock_user().clone()
    }

    pub fn total_amount(&self) -> Cents {
        self.state.expenses.with(|expenses| total_amount(expenses))
    }

    pub fn totals_by_category(&self) -> BTreeMap<Category, Cents> {
        self.state.expenses.with(|expenses| totals_by_category(expenses))
    }

    pub fn category_report(&self) -> CategoryReport {
        self.state.expenses.with(|expenses| build_category_report(expenses))
    }

    pub fn summary(&self) -> Result<LedgerSummary, AppError> {
        let user_id = self.active_user().ok_or(AppError::Unauthenticated)?;
        Ok(self
            .state
            .expenses
            .with(|expenses| build_summary(user_id, expenses)))
    }
}

impl Drop for ExpenseLedger {
    fn drop(&mut self) {
        self.user_signal.unsubscribe(self.subscription);
    }
}

impl LedgerState {
    fn lock_writer(&self) -> MutexGuard<'_, Active> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_user(&self) -> MutexGuard<'_, Option<UserId>> {
        self.user.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Release the write lock, then hand the new state to subscribers.
    fn publish(&self, active: MutexGuard<'_, Active>) {
        let user = active.user.clone();
        let expenses = active.expenses.clone();
        let _publishing = self
            .publishing
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        drop(active);

        *self.lock_user() = user;
        self.expenses.set(expenses);
    }

    /// Replace the in-memory list with the persisted records of `user`.
    fn resync(&self, user: Option<&User>) {
        let mut active = self.lock_writer();
        *active = match user {
            Some(user) => match self.repo.list_expenses_for_user(&user.id) {
                Ok(expenses) => {
                    tracing::debug!(user_id = %user.id, count = expenses.len(), "loaded expenses");
                    Active {
                        user: Some(user.id.clone()),
                        expenses,
                        load_failed: false,
                    }
                }
                Err(err) => {
                    tracing::warn!(user_id = %user.id, error = %err, "failed to load expenses, ledger is read-only");
                    Active {
                        user: Some(user.id.clone()),
                        expenses: Vec::new(),
                        load_failed: true,
                    }
                }
            },
            None => Active::default(),
        };
        self.publish(active);
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}
