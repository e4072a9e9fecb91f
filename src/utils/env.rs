//! Environment variable utilities

/// Get environment variable as Option
///
/// Unset and blank values both yield `None`.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
