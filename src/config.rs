use log::LevelFilter;

use crate::database::Database;
use crate::error::ClientError;
use crate::gateway::DEFAULT_API_BASE;

pub const API_BASE_KEY: &str = "api_base";
pub const LOG_LEVEL_KEY: &str = "log_level";

/// Keys the client reads, with the description stored alongside them.
pub const KNOWN_KEYS: [(&str, &str); 2] = [
    (API_BASE_KEY, "Backend base URL, including the API prefix"),
    (LOG_LEVEL_KEY, "Log level: error, warn, info, debug or trace"),
];

pub fn describe(key: &str) -> Option<&'static str> {
    KNOWN_KEYS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, description)| *description)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_base: String,
    pub log_level: LevelFilter,
}

impl Settings {
    /// Environment first, then stored config, then defaults.
    pub fn load(db: &Database) -> Result<Self, ClientError> {
        Self::resolve(
            std::env::var("TASKFLOW_API_BASE").ok(),
            std::env::var("TASKFLOW_LOG").ok(),
            db,
        )
    }

    fn resolve(
        env_api_base: Option<String>,
        env_log_level: Option<String>,
        db: &Database,
    ) -> Result<Self, ClientError> {
        let api_base = match env_api_base.filter(|v| !v.is_empty()) {
            Some(value) => value,
            None => db
                .get_config(API_BASE_KEY)?
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        };

        let level = match env_log_level.filter(|v| !v.is_empty()) {
            Some(value) => Some(value),
            None => db.get_config(LOG_LEVEL_KEY)?,
        };
        let log_level = match level {
            Some(value) => value
                .parse::<LevelFilter>()
                .map_err(|_| ClientError::Config(format!("unknown log level '{value}'")))?,
            None => LevelFilter::Info,
        };

        Ok(Settings {
            api_base,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env_or_store() {
        let db = Database::in_memory().unwrap();
        let settings = Settings::resolve(None, None, &db).unwrap();
        assert_eq!(settings.api_base, DEFAULT_API_BASE);
        assert_eq!(settings.log_level, LevelFilter::Info);
    }

    #[test]
    fn test_env_overrides_stored_config() {
        let db = Database::in_memory().unwrap();
        db.set_config(API_BASE_KEY, "http://stored/api/v1", None).unwrap();
        db.set_config(LOG_LEVEL_KEY, "debug", None).unwrap();

        let stored = Settings::resolve(None, None, &db).unwrap();
        assert_eq!(stored.api_base, "http://stored/api/v1");
        assert_eq!(stored.log_level, LevelFilter::Debug);

        let env = Settings::resolve(Some("http://env/api/v1".to_string()), Some("warn".to_string()), &db).unwrap();
        assert_eq!(env.api_base, "http://env/api/v1");
        assert_eq!(env.log_level, LevelFilter::Warn);
    }

    #[test]
    fn test_bad_log_level_is_config_error() {
        let db = Database::in_memory().unwrap();
        let result = Settings::resolve(None, Some("loud".to_string()), &db);
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_known_keys_have_descriptions() {
        assert!(describe(API_BASE_KEY).is_some());
        assert_eq!(describe("nope"), None);
    }
}
