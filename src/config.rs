use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to deserialize config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,

    /// Starting size of the per-connection read buffer. It doubles as
    /// needed, so this only affects how many reads a request takes.
    pub read_buffer_size: usize,

    /// When set, successful responses are sent with chunked transfer
    /// encoding in chunks of at most this many bytes.
    pub chunk_size: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 42069,
            read_buffer_size: 8,
            chunk_size: None,
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config = ServerConfig::from_toml("port = 8080\n").unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.read_buffer_size, 8);
        assert_eq!(config.chunk_size, None);
        assert_eq!(config.address, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }

    #[test]
    fn parses_all_fields() {
        let config = ServerConfig::from_toml(
            "address = \"127.0.0.1\"\nport = 0\nread_buffer_size = 1024\nchunk_size = 32\n",
        )
        .unwrap();
        assert_eq!(config.address, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.port, 0);
        assert_eq!(config.read_buffer_size, 1024);
        assert_eq!(config.chunk_size, Some(32));
    }

    #[test]
    fn rejects_bad_types() {
        assert!(ServerConfig::from_toml("port = \"eighty\"\n").is_err());
    }

    #[test]
    fn reports_missing_file() {
        let err = ServerConfig::from_file("/nonexistent/tcphttp.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
