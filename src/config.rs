//! Environment configuration.
//!
//! Values come from the process environment, with a `.env` file in the working
//! directory loaded first. Command-line flags override them.

use std::path::PathBuf;

use crate::domain::{MAX_DEGREE, MIN_DEGREE};
use crate::error::AppError;

pub const ENV_DB_PATH: &str = "FANDB_PATH";
pub const ENV_DEFAULT_DEGREE: &str = "FANDB_DEFAULT_DEGREE";
pub const ENV_LOG: &str = "FANDB_LOG";

const DEFAULT_DB_PATH: &str = "db.sqlite";
const DEFAULT_DEGREE: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub default_degree: usize,
    /// `tracing` filter directive, if set.
    pub log_filter: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let db_path = lookup(ENV_DB_PATH)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let default_degree = match lookup(ENV_DEFAULT_DEGREE) {
            None => DEFAULT_DEGREE,
            Some(raw) => {
                let degree: usize = raw.trim().parse().map_err(|_| {
                    AppError::new(2, format!("{ENV_DEFAULT_DEGREE} must be an integer (got '{raw}')."))
                })?;
                if !(MIN_DEGREE..=MAX_DEGREE).contains(&degree) {
                    return Err(AppError::new(
                        2,
                        format!("{ENV_DEFAULT_DEGREE} must be between {MIN_DEGREE} and {MAX_DEGREE} (got {degree})."),
                    ));
                }
                degree
            }
        };

        let log_filter = lookup(ENV_LOG).filter(|v| !v.trim().is_empty());

        Ok(Self {
            db_path,
            default_degree,
            log_filter,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let c = config(&[]).unwrap();
        assert_eq!(c.db_path, PathBuf::from("db.sqlite"));
        assert_eq!(c.default_degree, 2);
        assert_eq!(c.log_filter, None);
    }

    #[test]
    fn environment_values_are_read() {
        let c = config(&[
            (ENV_DB_PATH, "/tmp/fans.sqlite"),
            (ENV_DEFAULT_DEGREE, " 3 "),
            (ENV_LOG, "fan_curves=debug"),
        ])
        .unwrap();
        assert_eq!(c.db_path, PathBuf::from("/tmp/fans.sqlite"));
        assert_eq!(c.default_degree, 3);
        assert_eq!(c.log_filter.as_deref(), Some("fan_curves=debug"));
    }

    #[test]
    fn out_of_range_default_degree_is_rejected() {
        assert_eq!(config(&[(ENV_DEFAULT_DEGREE, "9")]).unwrap_err().exit_code(), 2);
        assert!(config(&[(ENV_DEFAULT_DEGREE, "two")]).is_err());
    }
}
