/// Product catalog module - Gateway

mod loader;
mod types;

pub use loader::{Catalog, CatalogSource, JsonCatalogSource};
pub use types::{CatalogItem, ProductId};
