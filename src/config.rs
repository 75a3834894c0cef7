//! Environment configuration.

use std::env;

#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Tee every terminal write to this file (`MOORLINE_WRITE_LOG`).
    pub write_log: Option<String>,
    /// Force pass-through mode even on an interactive terminal
    /// (`MOORLINE_PASSTHROUGH=1`).
    pub passthrough: bool,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            write_log: env_string_opt("MOORLINE_WRITE_LOG"),
            passthrough: env_flag("MOORLINE_PASSTHROUGH"),
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::EnvConfig;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env lock poisoned")
    }

    fn set_env_guard(key: &'static str, value: Option<&str>) -> EnvGuard {
        let previous = env::var(key).ok();
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
        EnvGuard { key, previous }
    }

    #[test]
    fn env_defaults() {
        let _lock = env_lock();
        let _g1 = set_env_guard("MOORLINE_WRITE_LOG", None);
        let _g2 = set_env_guard("MOORLINE_PASSTHROUGH", None);

        let config = EnvConfig::from_env();
        assert!(config.write_log.is_none());
        assert!(!config.passthrough);
    }

    #[test]
    fn env_values_are_read() {
        let _lock = env_lock();
        let _g1 = set_env_guard("MOORLINE_WRITE_LOG", Some("/tmp/moorline.log"));
        // Engine tests in this target construct engines concurrently and
        // read MOORLINE_PASSTHROUGH; keep it off here.
        let _g2 = set_env_guard("MOORLINE_PASSTHROUGH", Some("0"));

        let config = EnvConfig::from_env();
        assert_eq!(config.write_log.as_deref(), Some("/tmp/moorline.log"));
        assert!(!config.passthrough, "only \"1\" enables the flag");
    }

    #[test]
    fn empty_write_log_is_ignored() {
        let _lock = env_lock();
        let _g1 = set_env_guard("MOORLINE_WRITE_LOG", Some(""));
        let config = EnvConfig::from_env();
        assert!(config.write_log.is_none());
    }
}
