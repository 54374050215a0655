/// Product selection module - Gateway

mod store;

pub use store::{SelectionStore, Toggled};
