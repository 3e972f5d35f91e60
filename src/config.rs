use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "MamaCare";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Days shown in the appointment day picker, starting today.
pub const BOOKING_WINDOW_DAYS: u32 = 14;

/// An appointment can only be cancelled this far ahead of its start.
pub const CANCELLATION_LEAD_HOURS: i64 = 24;

/// Reminder notifications fire this many days before the session.
pub const REMINDER_LEAD_DAYS: i64 = 1;

/// Local hour at which reminder notifications fire.
pub const REMINDER_HOUR: u32 = 9;

/// Vaccine schedule (read-only reference data) is refetched after this.
pub const SCHEDULE_CACHE_TTL_SECS: u64 = 600;

/// PBKDF2-SHA256 rounds for stored password hashes.
pub const PBKDF2_ITERATIONS: u32 = 600_000;

/// Buffered auth events per subscriber before the slowest one lags.
pub const AUTH_EVENT_CAPACITY: usize = 256;

pub const DEFAULT_PORT: u16 = 8470;

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "mamacare=info,mamacare_lib=info,tower_http=warn"
}

/// Get the application data directory (~/MamaCare/).
/// Falls back to the working directory when no home directory is known.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Path of the document database inside a data directory.
pub fn database_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("mamacare.db")
}

/// Runtime configuration, read from the environment at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub pbkdf2_iterations: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: app_data_dir(),
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            pbkdf2_iterations: PBKDF2_ITERATIONS,
        }
    }
}

impl AppConfig {
    /// Read `MAMACARE_DATA_DIR`, `MAMACARE_BIND` and `MAMACARE_PORT`.
    /// Unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("MAMACARE_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(ip) = lookup("MAMACARE_BIND") {
            match ip.parse::<IpAddr>() {
                Ok(ip) => config.bind_addr.set_ip(ip),
                Err(_) => tracing::warn!(value = %ip, "Ignoring invalid MAMACARE_BIND"),
            }
        }
        if let Some(port) = lookup("MAMACARE_PORT") {
            match port.parse::<u16>() {
                Ok(port) => config.bind_addr.set_port(port),
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid MAMACARE_PORT"),
            }
        }

        config
    }

    pub fn database_path(&self) -> PathBuf {
        database_path(&self.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn app_data_dir_ends_with_app_name() {
        assert!(app_data_dir().ends_with("MamaCare"));
    }

    #[test]
    fn defaults_bind_localhost() {
        let config = AppConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert!(config.bind_addr.ip().is_loopback());
        assert_eq!(config.pbkdf2_iterations, PBKDF2_ITERATIONS);
    }

    #[test]
    fn env_overrides_apply() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("MAMACARE_DATA_DIR", "/tmp/mc"),
            ("MAMACARE_BIND", "0.0.0.0"),
            ("MAMACARE_PORT", "9000"),
        ]));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/mc"));
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:9000");
        assert_eq!(config.database_path(), PathBuf::from("/tmp/mc/mamacare.db"));
    }

    #[test]
    fn invalid_port_keeps_default() {
        let config = AppConfig::from_lookup(lookup_from(&[("MAMACARE_PORT", "http")]));
        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.3.0");
    }
}
