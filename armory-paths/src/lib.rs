//! XDG Base Directory paths for armory.
//!
//! The CLI and the audit store resolve their files through these helpers so
//! that the same layout is used on every platform.

use std::path::PathBuf;

const APP_DIR: &str = "armory";

/// Get the armory config directory.
///
/// Returns `$XDG_CONFIG_HOME/armory` if set, otherwise `~/.config/armory`.
///
/// # Examples
///
/// ```
/// use armory_paths::config_dir;
///
/// let config = config_dir();
/// let user_config = config.join("config.toml");
/// ```
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// Get the armory data directory.
///
/// Returns `$XDG_DATA_HOME/armory` if set, otherwise `~/.local/share/armory`.
/// The audit log lives here unless configured elsewhere.
///
/// # Examples
///
/// ```
/// use armory_paths::data_dir;
///
/// let audit_log = data_dir().join("audit.jsonl");
/// ```
pub fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

fn xdg_dir(env_var: &str, home_relative: &str) -> PathBuf {
    match std::env::var(env_var) {
        Ok(base) if !base.is_empty() => PathBuf::from(base).join(APP_DIR),
        _ => match dirs::home_dir() {
            Some(home) => home.join(home_relative).join(APP_DIR),
            None => PathBuf::from(home_relative).join(APP_DIR),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_dir_ends_with_armory() {
        let path = config_dir();
        assert!(path.ends_with("armory"), "config_dir should end with 'armory'");
    }

    #[test]
    #[serial]
    fn test_data_dir_ends_with_armory() {
        let path = data_dir();
        assert!(path.ends_with("armory"), "data_dir should end with 'armory'");
    }

    #[test]
    #[serial]
    fn test_config_dir_respects_xdg_env() {
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", "/tmp/test-config");
        }
        let path = config_dir();
        assert_eq!(path, PathBuf::from("/tmp/test-config/armory"));
        unsafe {
            std::env::remove_var("XDG_CONFIG_HOME");
        }
    }

    #[test]
    #[serial]
    fn test_data_dir_respects_xdg_env() {
        unsafe {
            std::env::set_var("XDG_DATA_HOME", "/tmp/test-data");
        }
        let path = data_dir();
        assert_eq!(path, PathBuf::from("/tmp/test-data/armory"));
        unsafe {
            std::env::remove_var("XDG_DATA_HOME");
        }
    }

    #[test]
    #[serial]
    fn test_empty_xdg_value_falls_back_to_home() {
        unsafe {
            std::env::set_var("XDG_DATA_HOME", "");
        }
        let path = data_dir();
        assert!(path.ends_with(".local/share/armory"));
        unsafe {
            std::env::remove_var("XDG_DATA_HOME");
        }
    }
}
