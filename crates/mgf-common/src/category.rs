use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Acquisition/fragmentation category a folder tree belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Dia,
    Dda,
    Hcd,
    Etd,
}

impl Category {
    /// Categories in the order a run processes them.
    pub const ALL: [Category; 4] = [Category::Dia, Category::Dda, Category::Hcd, Category::Etd];

    /// Tagging flag handed to the processing unit for files of this category.
    pub fn tagged(self) -> bool {
        !matches!(self, Category::Dda)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Dia => "DIA",
            Category::Dda => "DDA",
            Category::Hcd => "HCD",
            Category::Etd => "ETD",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid category '{0}'. Valid values: dia, dda, hcd, etd")]
pub struct ParseCategoryError(pub String);

impl std::str::FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dia" => Ok(Category::Dia),
            "dda" => Ok(Category::Dda),
            "hcd" => Ok(Category::Hcd),
            "etd" => Ok(Category::Etd),
            _ => Err(ParseCategoryError(s.to_string())),
        }
    }
}
