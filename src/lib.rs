pub mod app;
pub mod catalog;
pub mod cli;
pub mod constants;
pub mod format;
pub mod models;
pub mod relay;
pub mod selection;
pub mod session;
pub mod storage;
pub mod utils;

pub use app::{load_config, Config, Session, SharedSession};
pub use catalog::{Catalog, CatalogItem, ProductId};
pub use format::normalize;
pub use selection::SelectionStore;
pub use utils::RoutineError;
