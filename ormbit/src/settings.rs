use crate::error::OrmError;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::sync::Once;
use tracing::info;

static DOTENV_ONCE: Once = Once::new();

fn ensure_dotenv_loaded() {
    DOTENV_ONCE.call_once(|| match dotenvy::dotenv() {
        Ok(path) => info!("Settings loaded including {}", path.display()),
        Err(_) => info!("Settings loaded without .env file."),
    });
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct OrmSettings {
    pub database: DatabaseSettings,
    pub schema: SchemaSettings,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DatabaseSettings {
    pub path: String,
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SchemaSettings {
    /// Create missing tables on first registration.
    pub bootstrap: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LogSettings {
    pub filter: String,
}

impl Default for OrmSettings {
    fn default() -> Self {
        OrmSettings {
            database: DatabaseSettings { path: ":memory:".to_string(), busy_timeout_ms: 5_000 },
            schema: SchemaSettings { bootstrap: true },
            log: LogSettings { filter: "ormbit=info".to_string() },
        }
    }
}

impl OrmSettings {
    /// Defaults, then the optional file at `path`, then `ORMBIT__SECTION__KEY` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, OrmError> {
        ensure_dotenv_loaded();
        let defaults = OrmSettings::default();
        let mut builder = Config::builder()
            .set_default("database.path", defaults.database.path)?
            .set_default("database.busy_timeout_ms", defaults.database.busy_timeout_ms as i64)?
            .set_default("schema.bootstrap", defaults.schema.bootstrap)?
            .set_default("log.filter", defaults.log.filter)?;
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings = builder
            .add_source(Environment::with_prefix("ORMBIT").prefix_separator("__").try_parsing(true).separator("__"))
            .build()?
            .try_deserialize::<OrmSettings>()?;
        info!("{:?}", settings);
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[database]\npath = \"orm.db\"\n\n[schema]\nbootstrap = false").unwrap();
        let settings = OrmSettings::load(Some(file.path())).unwrap();
        assert_eq!(settings.database.path, "orm.db");
        assert_eq!(settings.database.busy_timeout_ms, 5_000);
        assert!(!settings.schema.bootstrap);
        assert_eq!(settings.log.filter, "ormbit=info");
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = OrmSettings::load(Some(Path::new("/nonexistent/ormbit.toml"))).unwrap_err();
        assert!(matches!(err, OrmError::Config(_)));
    }
}
