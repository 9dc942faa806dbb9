use serde::{Deserialize, Serialize};

/// The fixed set of spending categories an expense can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Food & Dining")]
    FoodDining,
    #[serde(rename = "Transportation")]
    Transportation,
    #[serde(rename = "Shopping")]
    Shopping,
    #[serde(rename = "Entertainment")]
    Entertainment,
    #[serde(rename = "Bills & Utilities")]
    BillsUtilities,
    #[serde(rename = "Healthcare")]
    Healthcare,
    #[serde(rename = "Travel")]
    Travel,
    #[serde(rename = "Education")]
    Education,
    #[serde(rename = "Business")]
    Business,
    #[serde(rename = "Other")]
    Other,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::FoodDining,
        Category::Transportation,
        Category::Shopping,
        Category::Entertainment,
        Category::BillsUtilities,
        Category::Healthcare,
        Category::Travel,
        Category::Education,
        Category::Business,
        Category::Other,
    ];

    /// Display label, also used as the persisted form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::FoodDining => "Food & Dining",
            Category::Transportation => "Transportation",
            Category::Shopping => "Shopping",
            Category::Entertainment => "Entertainment",
            Category::BillsUtilities => "Bills & Utilities",
            Category::Healthcare => "Healthcare",
            Category::Travel => "Travel",
            Category::Education => "Education",
            Category::Business => "Business",
            Category::Other => "Other",
        }
    }

    /// Command-line friendly form, e.g. "food-dining".
    pub fn slug(&self) -> &'static str {
        match self {
            Category::FoodDining => "food-dining",
            Category::Transportation => "transportation",
            Category::Shopping => "shopping",
            Category::Entertainment => "entertainment",
            Category::BillsUtilities => "bills-utilities",
            Category::Healthcare => "healthcare",
            Category::Travel => "travel",
            Category::Education => "education",
            Category::Business => "business",
            Category::Other => "other",
        }
    }

    /// Parse either the label or the slug, case-insensitively.
    pub fn from_str(s: &str) -> Option<Self> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().to_lowercase() == needle || c.slug() == needle)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
