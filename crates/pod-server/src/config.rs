use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Content store server configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Largest accepted object body, in bytes.
    pub max_object_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 5001)),
            max_object_size: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:5001".parse::<SocketAddr>().unwrap());
        assert_eq!(c.max_object_size, 10 * 1024 * 1024);
    }

    #[test]
    fn parses_partial_toml() {
        let c = ServerConfig::from_toml_str("bind_addr = \"0.0.0.0:8080\"").unwrap();
        assert_eq!(c.bind_addr.port(), 8080);
        assert_eq!(c.max_object_size, ServerConfig::default().max_object_size);
    }

    #[test]
    fn rejects_bad_toml() {
        assert!(matches!(
            ServerConfig::from_toml_str("bind_addr = 5"),
            Err(ServerError::Config(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(&path, "max_object_size = 64\n").unwrap();
        assert_eq!(ServerConfig::load(&path).unwrap().max_object_size, 64);
    }
}
