use std::{env, fmt::Display, io, path::PathBuf, str::FromStr};

use log::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Scylla,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scylla" => Ok(StorageBackend::Scylla),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend {other:?}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub workers: usize,
    pub storage: StorageBackend,
    pub scylla_node: String,
    pub keyspace: String,
    pub media_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub seed_users: bool,
}

impl Config {
    pub fn load() -> io::Result<Self> {
        Ok(Self {
            bind_addr: try_load("MICROBLOG_BIND", "127.0.0.1:8080")?,
            workers: try_load("MICROBLOG_WORKERS", &num_cpus::get().to_string())?,
            storage: try_load("MICROBLOG_STORAGE", "scylla")?,
            scylla_node: try_load("SCYLLA_NODE", "127.0.0.1:9042")?,
            keyspace: try_load("SCYLLA_KEYSPACE", "microblog")?,
            media_dir: try_load("MEDIA_DIR", "saved_files")?,
            max_upload_bytes: try_load("MICROBLOG_MAX_UPLOAD_BYTES", "10485760")?,
            seed_users: try_load("MICROBLOG_SEED_USERS", "true")?,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> io::Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        io::Error::new(io::ErrorKind::InvalidInput, format!("{key}: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_backend_parses_case_insensitively() {
        assert_eq!("Memory".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert_eq!("scylla".parse::<StorageBackend>(), Ok(StorageBackend::Scylla));
        assert!("postgres".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn unset_variable_falls_back_to_default() {
        let port: u16 = try_load("MICROBLOG_TEST_UNSET_PORT", "8080").unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn unparseable_value_is_an_error() {
        env::set_var("MICROBLOG_TEST_BAD_FLAG", "maybe");
        let res: io::Result<bool> = try_load("MICROBLOG_TEST_BAD_FLAG", "true");
        assert!(res.is_err());
    }
}
