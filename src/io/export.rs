use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::ExpenseLedger;
use crate::domain::{Expense, ExpenseQuery, SortKey, SortOrder, User, format_cents};

/// Everything one user owns, as written by a JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub user: User,
    pub expenses: Vec<Expense>,
}

/// Writes the signed-in user's expenses to CSV or JSON
pub struct Exporter<'a> {
    user: &'a User,
    ledger: &'a ExpenseLedger,
}

impl<'a> Exporter<'a> {
    pub fn new(user: &'a User, ledger: &'a ExpenseLedger) -> Self {
        Self { user, ledger }
    }

    fn oldest_first(&self) -> Vec<Expense> {
        self.ledger.query(&ExpenseQuery {
            sort: SortKey::Date,
            order: SortOrder::Ascending,
            ..Default::default()
        })
    }

    /// Export expenses to CSV, oldest first. Returns the number of rows.
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let expenses = self.oldest_first();
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "date",
            "description",
            "category",
            "product_type",
            "amount",
            "notes",
        ])?;

        for expense in &expenses {
            let date = expense.date.format("%Y-%m-%d").to_string();
            let amount = format_cents(expense.amount_cents);
            csv_writer.write_record([
                expense.id.as_str(),
                date.as_str(),
                expense.description.as_str(),
                expense.category.as_str(),
                expense.product_type.as_deref().unwrap_or(""),
                amount.as_str(),
                expense.notes.as_deref().unwrap_or(""),
            ])?;
        }

        csv_writer.flush()?;
        Ok(expenses.len())
    }

    /// Export a JSON snapshot of the user and their expenses.
    pub fn export_json<W: Write>(&self, mut writer: W) -> Result<ExpenseSnapshot> {
        let snapshot = ExpenseSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            user: self.user.clone(),
            expenses: self.oldest_first(),
        };

        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        Ok(snapshot)
    }
}
