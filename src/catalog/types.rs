use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable product identifier. Catalogs in the wild use either numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    Number(u64),
    Text(String),
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductId::Number(n) => write!(f, "{}", n),
            ProductId::Text(s) => f.write_str(s),
        }
    }
}

impl ProductId {
    /// Whether `input` spells this id exactly, so "007" only names `Text("007")`
    pub fn is_spelled(&self, input: &str) -> bool {
        self.to_string() == input.trim()
    }
}

impl From<u64> for ProductId {
    fn from(n: u64) -> Self {
        ProductId::Number(n)
    }
}

impl From<&str> for ProductId {
    /// Numeric strings map to numeric ids, so "3" from a command line matches id 3
    fn from(s: &str) -> Self {
        match s.trim().parse::<u64>() {
            Ok(n) => ProductId::Number(n),
            Err(_) => ProductId::Text(s.trim().to_string()),
        }
    }
}

/// A selectable product record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

impl CatalogItem {
    /// Case-insensitive keyword match across the descriptive fields
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        [&self.name, &self.brand, &self.category, &self.description]
            .iter()
            .any(|field| field.to_lowercase().contains(&query))
    }
}

/// On-disk catalog layout: `{ "products": [...] }`
#[derive(Debug, Deserialize)]
pub(super) struct CatalogFile {
    pub products: Vec<CatalogItem>,
}
