use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use std::env;

/// Which persistence mechanism holds orders for this deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// One pretty-printed JSON file under the data directory.
    JsonFile,
    /// A single key in device-local key/value storage.
    LocalStorage,
    /// One row per order in an SQLite database.
    Sqlite,
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub backend: Backend,
    pub data_dir: String,
    pub uploads_dir: String,
    pub local_storage_dir: String,
    pub database_url: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Print shop order intake API")]
pub struct Args {
    /// Host to bind to (overrides PRINTSHOP_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PRINTSHOP_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Order backend (overrides PRINTSHOP_BACKEND)
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Directory holding orders.json (overrides PRINTSHOP_DATA_DIR)
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Directory for uploaded files (overrides PRINTSHOP_UPLOADS_DIR)
    #[arg(long)]
    pub uploads_dir: Option<String>,

    /// Directory for the local-storage backend (overrides PRINTSHOP_LOCAL_STORAGE_DIR)
    #[arg(long)]
    pub local_storage_dir: Option<String>,

    /// Database URL for the sqlite backend (overrides PRINTSHOP_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::merge(args, |key| env::var(key))?;
        Ok((cfg, migrate))
    }

    /// CLI values win; `lookup` supplies environment fallbacks.
    fn merge<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let env_or = |key: &str, default: &str| -> Result<String> {
            match lookup(key) {
                Ok(value) => Ok(value),
                Err(env::VarError::NotPresent) => Ok(default.to_string()),
                Err(err) => Err(err).with_context(|| format!("reading {}", key)),
            }
        };

        let env_host = env_or("PRINTSHOP_HOST", "0.0.0.0")?;
        let env_port = env_or("PRINTSHOP_PORT", "3000")?;
        let env_port = env_port
            .parse::<u16>()
            .with_context(|| format!("parsing PRINTSHOP_PORT value `{}`", env_port))?;
        let env_backend = env_or("PRINTSHOP_BACKEND", "json-file")?;
        let env_backend = Backend::from_str(&env_backend, true)
            .map_err(|e| anyhow!("parsing PRINTSHOP_BACKEND value `{}`: {}", env_backend, e))?;
        let env_data = env_or("PRINTSHOP_DATA_DIR", "./data")?;
        let env_uploads = env_or("PRINTSHOP_UPLOADS_DIR", "./uploads")?;
        let env_local = env_or("PRINTSHOP_LOCAL_STORAGE_DIR", "./data/local-storage")?;
        let env_db = env_or("PRINTSHOP_DATABASE_URL", "sqlite://./data/orders.db")?;

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            backend: args.backend.unwrap_or(env_backend),
            data_dir: args.data_dir.unwrap_or(env_data),
            uploads_dir: args.uploads_dir.unwrap_or(env_uploads),
            local_storage_dir: args.local_storage_dir.unwrap_or(env_local),
            database_url: args.database_url.unwrap_or(env_db),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, env::VarError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned().ok_or(env::VarError::NotPresent)
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = AppConfig::merge(Args::default(), lookup(&[])).unwrap();
        assert_eq!(cfg.addr(), "0.0.0.0:3000");
        assert_eq!(cfg.backend, Backend::JsonFile);
        assert_eq!(cfg.data_dir, "./data");
        assert_eq!(cfg.uploads_dir, "./uploads");
    }

    #[test]
    fn cli_overrides_environment() {
        let args = Args::parse_from(["print-intake", "--port", "8080", "--backend", "sqlite"]);
        let cfg = AppConfig::merge(
            args,
            lookup(&[("PRINTSHOP_PORT", "9000"), ("PRINTSHOP_BACKEND", "local-storage")]),
        )
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.backend, Backend::Sqlite);
    }

    #[test]
    fn environment_backend_and_bad_port() {
        let cfg =
            AppConfig::merge(Args::default(), lookup(&[("PRINTSHOP_BACKEND", "local-storage")]))
                .unwrap();
        assert_eq!(cfg.backend, Backend::LocalStorage);

        assert!(AppConfig::merge(Args::default(), lookup(&[("PRINTSHOP_PORT", "http")])).is_err());
        assert!(AppConfig::merge(Args::default(), lookup(&[("PRINTSHOP_BACKEND", "redis")])).is_err());
    }
}
