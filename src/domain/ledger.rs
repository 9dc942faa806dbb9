use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::{Category, Cents, Expense};

/// Sum of all expense amounts, saturating at `Cents::MAX`.
pub fn total_amount(expenses: &[Expense]) -> Cents {
    expenses
        .iter()
        .fold(0, |total: Cents, e| total.saturating_add(e.amount_cents))
}

/// Sum of expense amounts per category. Categories with no expenses are absent.
pub fn totals_by_category(expenses: &[Expense]) -> BTreeMap<Category, Cents> {
    let mut totals = BTreeMap::new();
    for expense in expenses {
        let total: &mut Cents = totals.entry(expense.category).or_insert(0);
        *total = total.saturating_add(expense.amount_cents);
    }
    totals
}

/// Per-category count and total, used to build reports.
pub fn category_aggregates(expenses: &[Expense]) -> BTreeMap<Category, (usize, Cents)> {
    let mut aggregates: BTreeMap<Category, (usize, Cents)> = BTreeMap::new();
    for expense in expenses {
        let entry = aggregates.entry(expense.category).or_insert((0, 0));
        entry.0 += 1;
        entry.1 = entry.1.saturating_add(expense.amount_cents);
    }
    aggregates
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Date,
    Amount,
    Description,
    Category,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Date => "date",
            SortKey::Amount => "amount",
            SortKey::Description => "description",
            SortKey::Category => "category",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "date" => Some(SortKey::Date),
            "amount" => Some(SortKey::Amount),
            "description" | "title" => Some(SortKey::Description),
            "category" => Some(SortKey::Category),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// Filter and ordering for listing expenses. The default lists everything,
/// newest first.
#[derive(Debug, Clone, Default)]
pub struct ExpenseQuery {
    pub category: Option<Category>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub sort: SortKey,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl ExpenseQuery {
    fn matches(&self, expense: &Expense) -> bool {
        self.category.is_none_or(|c| expense.category == c)
            && self.from_date.is_none_or(|d| expense.date >= d)
            && self.to_date.is_none_or(|d| expense.date <= d)
    }

    /// Filter, sort and truncate a list of expenses.
    pub fn apply(&self, expenses: &[Expense]) -> Vec<Expense> {
        let mut selected: Vec<Expense> = expenses
            .iter()
            .filter(|e| self.matches(e))
            .cloned()
            .collect();

        selected.sort_by(|a, b| {
            let ordering = compare(self.sort, a, b);
            match self.order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });

        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

fn compare(key: SortKey, a: &Expense, b: &Expense) -> Ordering {
    // Ties fall back to insertion time so listings are stable across calls
    let primary = match key {
        SortKey::Date => a.date.cmp(&b.date),
        SortKey::Amount => a.amount_cents.cmp(&b.amount_cents),
        SortKey::Description => a
            .description
            .to_lowercase()
            .cmp(&b.description.to_lowercase()),
        SortKey::Category => a.category.as_str().cmp(b.category.as_str()),
    };
    primary.then_with(|| a.created_at.cmp(&b.created_at))
}
