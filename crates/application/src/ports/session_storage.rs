//! Session-scoped key/value storage port

/// Port for ephemeral storage that lives as long as the client session
/// (the equivalent of a browser tab's session storage).
pub trait SessionStorage: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value.
    fn set(&self, key: &str, value: &str);

    /// Remove a value.
    fn remove(&self, key: &str);
}
