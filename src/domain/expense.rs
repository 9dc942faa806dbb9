use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Category, Cents, MAX_AMOUNT_CENTS, UserId, format_cents, to_base36};

/// Opaque expense identifier, assigned once at creation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseId(String);

impl ExpenseId {
    /// Time-based prefix (base36 milliseconds) plus a short random suffix.
    /// Unique enough for one person's ledger; collisions are not checked.
    pub fn generate() -> Self {
        let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let suffix: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();
        Self(format!("{}{}", to_base36(millis), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ExpenseId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ExpenseId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single recorded expense, owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: ExpenseId,
    pub description: String,
    /// Always positive
    pub amount_cents: Cents,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    /// Calendar day the money was spent
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    /// Materialize a draft for its owner, assigning a fresh id.
    pub fn from_draft(draft: ExpenseDraft, user_id: UserId) -> Self {
        Self {
            id: ExpenseId::generate(),
            description: draft.description.trim().to_string(),
            amount_cents: draft.amount_cents,
            category: draft.category,
            product_type: normalize_optional(draft.product_type),
            date: draft.date,
            notes: normalize_optional(draft.notes),
            user_id,
            created_at: Utc::now(),
        }
    }

    /// Merge a patch into this expense. Id and owner never change.
    pub fn apply(&mut self, patch: ExpensePatch) {
        if let Some(description) = patch.description {
            self.description = description.trim().to_string();
        }
        if let Some(amount_cents) = patch.amount_cents {
            self.amount_cents = amount_cents;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(product_type) = patch.product_type {
            self.product_type = normalize_optional(product_type);
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(notes) = patch.notes {
            self.notes = normalize_optional(notes);
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_fields(&self.description, self.amount_cents)
    }
}

/// Everything needed to create an expense except its id and owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseDraft {
    pub description: String,
    pub amount_cents: Cents,
    pub category: Category,
    pub product_type: Option<String>,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

impl ExpenseDraft {
    pub fn new(
        description: impl Into<String>,
        amount_cents: Cents,
        category: Category,
        date: NaiveDate,
    ) -> Self {
        Self {
            description: description.into(),
            amount_cents,
            category,
            product_type: None,
            date,
            notes: None,
        }
    }

    pub fn with_product_type(mut self, product_type: impl Into<String>) -> Self {
        self.product_type = Some(product_type.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_fields(&self.description, self.amount_cents)
    }
}

/// Partial replacement of an expense's editable fields.
///
/// `None` leaves a field untouched. For the optional text fields,
/// `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpensePatch {
    pub description: Option<String>,
    pub amount_cents: Option<Cents>,
    pub category: Option<Category>,
    pub product_type: Option<Option<String>>,
    pub date: Option<NaiveDate>,
    pub notes: Option<Option<String>>,
}

impl ExpensePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn validate_fields(description: &str, amount_cents: Cents) -> Result<(), String> {
    if description.trim().is_empty() {
        return Err("description must not be empty".to_string());
    }
    if amount_cents <= 0 {
        return Err("amount must be greater than zero".to_string());
    }
    if amount_cents > MAX_AMOUNT_CENTS {
        return Err(format!(
            "amount must not exceed {}",
            format_cents(MAX_AMOUNT_CENTS)
        ));
    }
    Ok(())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
