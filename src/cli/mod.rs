use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use crate::application::{AppError, ExpenseLedger, IdentityService};
use crate::config::{Config, DEFAULT_MIN_PASSWORD_LEN};
use crate::domain::{
    Category, ExpenseDraft, ExpenseId, ExpensePatch, ExpenseQuery, SortKey, SortOrder, User,
    format_cents, parse_amount, total_amount,
};
use crate::storage::{FileStore, Repository};

/// Expenso - Personal Expense Tracker
#[derive(Parser)]
#[command(name = "expenso")]
#[command(about = "A local-first personal expense tracker with per-user ledgers")]
#[command(version)]
pub struct Cli {
    /// Store file path
    #[arg(short, long, env = "EXPENSO_STORE", default_value = "expenso.json")]
    pub store: String,

    /// Refuse logins for emails that were never registered
    #[arg(long, global = true)]
    pub require_registration: bool,

    /// Minimum password length
    #[arg(long, global = true, default_value_t = DEFAULT_MIN_PASSWORD_LEN)]
    pub min_password_len: usize,

    /// Accept Google credentials without signature verification (unsafe)
    #[arg(long, global = true)]
    pub trust_unverified_assertions: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account and sign in
    Register {
        email: String,

        #[arg(short, long, env = "EXPENSO_PASSWORD")]
        password: String,
    },

    /// Sign in with email and password
    Login {
        email: String,

        #[arg(short, long, env = "EXPENSO_PASSWORD")]
        password: String,
    },

    /// Sign in with a Google ID token
    LoginGoogle {
        #[arg(long)]
        credential: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Record an expense
    Add {
        /// Amount spent (e.g., "4.50" or "20")
        amount: String,

        #[arg(short, long)]
        description: String,

        /// Category label or slug (see `categories`)
        #[arg(short, long)]
        category: String,

        /// Product or sub-type, free text
        #[arg(short, long)]
        product_type: Option<String>,

        /// Date of the expense (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List expenses
    List {
        #[arg(long)]
        category: Option<String>,

        /// Filter from date (YYYY-MM-DD)
        #[arg(long)]
        from_date: Option<String>,

        /// Filter to date (YYYY-MM-DD)
        #[arg(long)]
        to_date: Option<String>,

        /// Sort by: date, amount, description, category
        #[arg(long, default_value = "date")]
        sort: String,

        /// Ascending order (default is descending)
        #[arg(long)]
        asc: bool,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show one expense
    Show { id: String },

    /// Change fields of an expense
    Edit {
        id: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        amount: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long, conflicts_with = "clear_product_type")]
        product_type: Option<String>,

        #[arg(long)]
        clear_product_type: bool,

        #[arg(long)]
        date: Option<String>,

        #[arg(short, long, conflicts_with = "clear_notes")]
        notes: Option<String>,

        #[arg(long)]
        clear_notes: bool,
    },

    /// Delete an expense
    Delete { id: String },

    /// Totals and per-category breakdown
    Summary,

    /// List the available categories
    Categories,

    /// Export expenses to CSV or JSON
    Export {
        /// Format: csv, json
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

impl Cli {
    pub fn config(&self) -> Config {
        Config {
            min_password_len: self.min_password_len,
            require_registration: self.require_registration,
            trust_unverified_assertions: self.trust_unverified_assertions,
            ..Config::default()
        }
    }

    /// Open the store and wire the identity service and ledger together.
    fn open(&self) -> Result<(IdentityService, ExpenseLedger)> {
        let store = FileStore::open(&self.store)
            .with_context(|| format!("Failed to open store: {}", self.store))?;
        let repo = Repository::new(Arc::new(store));
        let identity = IdentityService::new(repo.clone(), self.config())?;
        let ledger = ExpenseLedger::new(repo, &identity);
        Ok((identity, ledger))
    }

    pub async fn run(self) -> Result<()> {
        if let Commands::Categories = self.command {
            for category in Category::ALL {
                println!("{:<20} {}", category.slug(), category.as_str());
            }
            return Ok(());
        }

        let (identity, ledger) = self.open()?;

        match self.command {
            Commands::Register { email, password } => {
                let user = identity.register(&email, &password).await?;
                println!("Account created successfully! Signed in as {} ({})", user.email, user.id);
            }

            Commands::Login { email, password } => {
                let user = identity.login(&email, &password).await?;
                println!("Login successful! Signed in as {} ({})", user.email, user.id);
            }

            Commands::LoginGoogle { credential } => {
                let user = identity.login_with_google_credential(&credential).await?;
                println!("Signed in with Google as {} ({})", user.email, user.id);
            }

            Commands::Logout => {
                identity.logout()?;
                println!("Signed out.");
            }

            Commands::Whoami => match identity.current_user() {
                Some(user) => print_user(&user),
                None => println!("Not signed in."),
            },

            Commands::Add {
                amount,
                description,
                category,
                product_type,
                date,
                notes,
            } => {
                require_user(&identity)?;
                let amount_cents =
                    parse_amount(&amount).context("Invalid amount. Use '4.50' or '20'")?;
                let date = match date {
                    Some(date_str) => parse_date(&date_str)?,
                    None => Local::now().date_naive(),
                };

                let mut draft =
                    ExpenseDraft::new(description, amount_cents, parse_category(&category)?, date);
                draft.product_type = product_type;
                draft.notes = notes;

                let id = ledger.add(draft).await?;
                println!("Expense added successfully! {} ({})", format_cents(amount_cents), id);
            }

            Commands::List {
                category,
                from_date,
                to_date,
                sort,
                asc,
                limit,
            } => {
                require_user(&identity)?;
                let query = ExpenseQuery {
                    category: category.as_deref().map(parse_category).transpose()?,
                    from_date: from_date
                        .as_deref()
                        .map(parse_date)
                        .transpose()
                        .context("Invalid from-date")?,
                    to_date: to_date
                        .as_deref()
                        .map(parse_date)
                        .transpose()
                        .context("Invalid to-date")?,
                    sort: SortKey::from_str(&sort).ok_or_else(|| {
                        anyhow::anyhow!(
                            "Invalid sort key '{}'. Valid keys: date, amount, description, category",
                            sort
                        )
                    })?,
                    order: if asc {
                        SortOrder::Ascending
                    } else {
                        SortOrder::Descending
                    },
                    limit,
                };
                run_list_command(&ledger, &query);
            }

            Commands::Show { id } => {
                require_user(&identity)?;
                let expense = ledger
                    .get(&ExpenseId::from(id.as_str()))
                    .ok_or_else(|| anyhow::anyhow!("Expense not found: {}", id))?;

                println!("ID:          {}", expense.id);
                println!("Date:        {}", expense.date);
                println!("Description: {}", expense.description);
                println!("Amount:      {}", format_cents(expense.amount_cents));
                println!("Category:    {}", expense.category);
                if let Some(product_type) = &expense.product_type {
                    println!("Product:     {}", product_type);
                }
                if let Some(notes) = &expense.notes {
                    println!("Notes:       {}", notes);
                }
                println!(
                    "Recorded:    {}",
                    expense.created_at.format("%Y-%m-%d %H:%M:%S UTC")
                );
            }

            Commands::Edit {
                id,
                description,
                amount,
                category,
                product_type,
                clear_product_type,
                date,
                notes,
                clear_notes,
            } => {
                require_user(&identity)?;
                let patch = ExpensePatch {
                    description,
                    amount_cents: amount
                        .as_deref()
                        .map(parse_amount)
                        .transpose()
                        .context("Invalid amount. Use '4.50' or '20'")?,
                    category: category.as_deref().map(parse_category).transpose()?,
                    product_type: if clear_product_type {
                        Some(None)
                    } else {
                        product_type.map(Some)
                    },
                    date: date.as_deref().map(parse_date).transpose()?,
                    notes: if clear_notes { Some(None) } else { notes.map(Some) },
                };
                if patch.is_empty() {
                    anyhow::bail!("Nothing to change. Pass at least one field to edit.");
                }

                if ledger.update(&ExpenseId::from(id.as_str()), patch).await? {
                    println!("Expense updated: {}", id);
                } else {
                    anyhow::bail!("Expense not found: {}", id);
                }
            }

            Commands::Delete { id } => {
                require_user(&identity)?;
                if ledger.delete(&ExpenseId::from(id.as_str())).await? {
                    println!("Expense deleted: {}", id);
                } else {
                    anyhow::bail!("Expense not found: {}", id);
                }
            }

            Commands::Summary => {
                let user = require_user(&identity)?;
                run_summary_command(&user, &ledger)?;
            }

            Commands::Export { format, output } => {
                let user = require_user(&identity)?;
                run_export_command(&user, &ledger, &format, output.as_deref())?;
            }

            Commands::Categories => {}
        }

        Ok(())
    }
}

fn require_user(identity: &IdentityService) -> Result<User, AppError> {
    identity.current_user().ok_or(AppError::Unauthenticated)
}

fn print_user(user: &User) {
    println!("Name:     {}", user.name);
    println!("Email:    {}", user.email);
    println!("User ID:  {}", user.id);
    if let Some(provider) = user.provider {
        println!("Provider: {}", provider);
    }
    if let Some(picture) = &user.picture {
        println!("Picture:  {}", picture);
    }
}

fn run_list_command(ledger: &ExpenseLedger, query: &ExpenseQuery) {
    let expenses = ledger.query(query);

    if expenses.is_empty() {
        println!("No expenses found.");
        return;
    }

    println!(
        "{:<12} {:>10} {:<18} {:<22} ID",
        "DATE", "AMOUNT", "CATEGORY", "DESCRIPTION"
    );
    println!("{}", "-".repeat(80));
    for expense in &expenses {
        println!(
            "{:<12} {:>10} {:<18} {:<22} {}",
            expense.date.to_string(),
            format_cents(expense.amount_cents),
            truncate(expense.category.as_str(), 18),
            truncate(&expense.description, 22),
            expense.id
        );
    }
    println!("{}", "-".repeat(80));

    let shown = total_amount(&expenses);
    println!("{:<12} {:>10} ({} expenses)", "TOTAL", format_cents(shown), expenses.len());
}

fn run_summary_command(user: &User, ledger: &ExpenseLedger) -> Result<()> {
    let summary = ledger.summary()?;

    println!("Expenses for {} ({})", user.name, user.email);
    println!();
    println!("Total spent: {}", format_cents(summary.total));
    println!("Expenses:    {}", summary.expense_count);
    if let (Some(first), Some(last)) = (summary.first_date, summary.last_date) {
        println!("Period:      {} to {}", first, last);
    }

    let report = ledger.category_report();
    if report.categories.is_empty() {
        return Ok(());
    }

    println!();
    println!(
        "{:<20} {:>10} {:>6} {:>10} {:>7}",
        "CATEGORY", "TOTAL", "COUNT", "AVERAGE", "SHARE"
    );
    println!("{}", "-".repeat(57));
    for entry in &report.categories {
        println!(
            "{:<20} {:>10} {:>6} {:>10} {:>6.1}%",
            entry.category.as_str(),
            format_cents(entry.total),
            entry.count,
            format_cents(entry.average),
            entry.percentage
        );
    }
    Ok(())
}

fn run_export_command(
    user: &User,
    ledger: &ExpenseLedger,
    format: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(user, ledger);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match format {
        "csv" => {
            let count = exporter.export_csv(writer)?;
            if output.is_some() {
                eprintln!("Exported {} expenses", count);
            }
        }
        "json" => {
            let snapshot = exporter.export_json(writer)?;
            if output.is_some() {
                eprintln!("Exported {} expenses", snapshot.expenses.len());
            }
        }
        _ => {
            anyhow::bail!("Invalid export format '{}'. Valid formats: csv, json", format);
        }
    }

    Ok(())
}

fn parse_category(input: &str) -> Result<Category> {
    Category::from_str(input).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown category '{}'. Run `expenso categories` for the list.",
            input
        )
    })
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD", date_str))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
