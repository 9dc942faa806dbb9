use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Category, Cents, Expense, UserId, category_aggregates, total_amount};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryReport {
    pub generated_at: DateTime<Utc>,
    /// Largest total first
    pub categories: Vec<CategorySummary>,
    pub total: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: Category,
    pub total: Cents,
    pub count: usize,
    pub average: Cents,
    pub percentage: f64,
}

/// Dashboard view of one user's ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub user_id: UserId,
    pub total: Cents,
    pub expense_count: usize,
    pub categories: Vec<CategorySummary>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

pub fn build_category_report(expenses: &[Expense]) -> CategoryReport {
    let total = total_amount(expenses);

    let mut categories: Vec<CategorySummary> = category_aggregates(expenses)
        .into_iter()
        .map(|(category, (count, sum))| CategorySummary {
            category,
            total: sum,
            count,
            average: if count > 0 { sum / count as i64 } else { 0 },
            percentage: if total > 0 {
                (sum as f64 / total as f64) * 100.0
            } else {
                0.0
            },
        })
        .collect();
    categories.sort_by(|a, b| b.total.cmp(&a.total).then(a.category.cmp(&b.category)));

    CategoryReport {
        generated_at: Utc::now(),
        categories,
        total,
    }
}

pub fn build_summary(user_id: UserId, expenses: &[Expense]) -> LedgerSummary {
    let report = build_category_report(expenses);
    LedgerSummary {
        user_id,
        total: report.total,
        expense_count: expenses.len(),
        categories: report.categories,
        first_date: expenses.iter().map(|e| e.date).min(),
        last_date: expenses.iter().map(|e| e.date).max(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExpenseDraft;

    fn make(amount: Cents, category: Category, day: u32) -> Expense {
        let date = NaiveDate::from_ymd_opt(2024, 4, day).unwrap();
        Expense::from_draft(
            ExpenseDraft::new("item", amount, category, date),
            UserId::from("user_r"),
        )
    }

    #[test]
    fn test_category_report_orders_by_total() {
        let expenses = vec![
            make(1000, Category::Travel, 1),
            make(2000, Category::Travel, 2),
            make(1000, Category::Shopping, 3),
        ];
        let report = build_category_report(&expenses);

        assert_eq!(report.total, 4000);
        assert_eq!(report.categories[0].category, Category::Travel);
        assert_eq!(report.categories[0].count, 2);
        assert_eq!(report.categories[0].average, 1500);
        assert!((report.categories[0].percentage - 75.0).abs() < f64::EPSILON);
        assert_eq!(report.categories[1].category, Category::Shopping);
    }

    #[test]
    fn test_empty_report() {
        let report = build_category_report(&[]);
        assert_eq!(report.total, 0);
        assert!(report.categories.is_empty());
    }

    #[test]
    fn test_summary_date_range() {
        let expenses = vec![make(100, Category::Other, 9), make(100, Category::Other, 2)];
        let summary = build_summary(UserId::from("user_r"), &expenses);
        assert_eq!(summary.expense_count, 2);
        assert_eq!(summary.first_date, NaiveDate::from_ymd_opt(2024, 4, 2));
        assert_eq!(summary.last_date, NaiveDate::from_ymd_opt(2024, 4, 9));
    }
}
