//! Configuration access port trait.

/// Raw lookups by `[section] key`.
///
/// Typed parsing and defaults live in `domain::config_validation`, so every
/// key is parsed in one place and rejected there when malformed.
pub trait ConfigPort {
    /// The trimmed value, or `None` when the key is absent or empty.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
}
