//! Process settings read from the environment.

use crate::models::DEFAULT_GROUP;

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database_path() -> String {
    "volley_manager.db".to_string()
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Group opened at startup.
    pub default_group: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_path: default_database_path(),
            default_group: DEFAULT_GROUP.to_string(),
        }
    }
}

impl Settings {
    /// Override defaults with `HOST`, `PORT`, `DATABASE_PATH` and `DEFAULT_GROUP`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            database_path: lookup("DATABASE_PATH").unwrap_or(defaults.database_path),
            default_group: lookup("DEFAULT_GROUP")
                .filter(|g| !g.trim().is_empty())
                .unwrap_or(defaults.default_group),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn unset_or_invalid_values_fall_back_to_defaults() {
        let env: HashMap<&str, &str> = [("PORT", "not-a-port"), ("DEFAULT_GROUP", "  ")].into();
        let s = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn values_are_read_from_the_environment() {
        let env: HashMap<&str, &str> = [("PORT", "9000"), ("DATABASE_PATH", "/tmp/v.db")].into();
        let s = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(s.port, 9000);
        assert_eq!(s.database_path, "/tmp/v.db");
        assert_eq!(s.host, "0.0.0.0");
    }
}
