/// Credential-injecting relay server - Gateway
mod server;

pub use server::{create_router, serve, RelayState};
