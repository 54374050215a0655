use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::types::{CatalogFile, CatalogItem, ProductId};
use crate::utils::{log_debug, Result, RoutineError};

/// Source of product records, read once per session
pub trait CatalogSource {
    fn load(&self) -> Result<Vec<CatalogItem>>;
}

/// Catalog backed by a `products.json` file
pub struct JsonCatalogSource {
    path: PathBuf,
}

impl JsonCatalogSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl CatalogSource for JsonCatalogSource {
    fn load(&self) -> Result<Vec<CatalogItem>> {
        let json = std::fs::read_to_string(&self.path).map_err(|e| {
            RoutineError::Catalog(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        let file: CatalogFile = serde_json::from_str(&json).map_err(|e| {
            RoutineError::Catalog(format!("failed to parse {}: {}", self.path.display(), e))
        })?;
        log_debug(format!("Loaded {} products from {}", file.products.len(), self.path.display()));
        Ok(file.products)
    }
}

/// Fixed in-memory catalog
impl CatalogSource for Vec<CatalogItem> {
    fn load(&self) -> Result<Vec<CatalogItem>> {
        Ok(self.clone())
    }
}

/// Cached, read-only view of the product catalog
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<CatalogItem>,
    search_enabled: bool,
}

impl Catalog {
    /// Load the catalog once from its source
    pub fn load(source: &dyn CatalogSource, search_enabled: bool) -> Result<Self> {
        Ok(Self::from_items(source.load()?, search_enabled))
    }

    pub fn from_items(items: Vec<CatalogItem>, search_enabled: bool) -> Self {
        Self {
            items,
            search_enabled,
        }
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn find(&self, id: &ProductId) -> Option<&CatalogItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Distinct category labels, sorted
    pub fn categories(&self) -> Vec<&str> {
        self.items
            .iter()
            .map(|item| item.category.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn search_enabled(&self) -> bool {
        self.search_enabled
    }

    /// Items in catalog order matching the category (exact) and, when search
    /// is enabled, the keyword query. A disabled search ignores the query.
    pub fn filter(&self, category: Option<&str>, query: Option<&str>) -> Vec<&CatalogItem> {
        let query = if self.search_enabled { query } else { None };
        self.items
            .iter()
            .filter(|item| category.map_or(true, |c| item.category == c))
            .filter(|item| query.map_or(true, |q| item.matches(q)))
            .collect()
    }
}
