//! Environment variable utilities

/// Get environment variable as Option
///
/// Returns `Some(value)` if set and not blank, `None` otherwise.
///
/// # Example
/// ```
/// use modhost::utils::env_opt;
///
/// let data_dir = env_opt("MODHOST_DATA_DIR").unwrap_or_else(|| "data/modules".to_string());
/// assert!(!data_dir.is_empty());
/// ```
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get environment variable as integer
///
/// Returns `Some(value)` if set and parseable, `None` otherwise.
pub fn env_int<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    std::env::var(key).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_env_helpers() {
        std::env::set_var("MODHOST_TEST_INT", " 42 ");
        std::env::set_var("MODHOST_TEST_WORD", "Yes");
        std::env::set_var("MODHOST_TEST_BLANK", "  ");

        assert_eq!(env_int::<usize>("MODHOST_TEST_INT"), Some(42));
        assert_eq!(env_opt("MODHOST_TEST_WORD").as_deref(), Some("Yes"));
        assert_eq!(env_opt("MODHOST_TEST_BLANK"), None);
        assert_eq!(env_opt("MODHOST_TEST_UNSET"), None);
        assert_eq!(env_int::<usize>("MODHOST_TEST_WORD"), None);

        for key in ["MODHOST_TEST_INT", "MODHOST_TEST_WORD", "MODHOST_TEST_BLANK"] {
            std::env::remove_var(key);
        }
    }
}
