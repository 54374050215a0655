use crate::utils::Result;

/// Opaque key-value persistence, the local-storage analogue.
///
/// Both operations are synchronous. Callers treat failures as best-effort
/// and decide for themselves whether to surface them.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` when the key was never written
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Write (or overwrite) a value
    fn write(&self, key: &str, value: &str) -> Result<()>;
}
