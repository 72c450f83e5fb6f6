//! Server configuration loaded from environment variables.
//!
//! Every setting has a default so a local test server starts with zero
//! configuration.

use std::net::IpAddr;

/// Server configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerConfig {
    /// DC this server instance serves; new users are homed here.
    /// Env: `MTLINK_DC_ID`
    /// Default: `1`
    pub dc_id: u32,

    /// Address to listen on.
    /// Env: `MTLINK_LISTEN_ADDR`
    /// Default: `127.0.0.1`
    pub listen_addr: IpAddr,

    /// TCP port to listen on.
    /// Env: `MTLINK_PORT`
    /// Default: `11441`
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            dc_id:       1,
            listen_addr: IpAddr::from([127, 0, 0, 1]),
            port:        11441,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup("MTLINK_DC_ID") {
            match val.parse::<u32>() {
                Ok(id) if id != 0 => config.dc_id = id,
                _ => tracing::warn!(value = %val, "Invalid MTLINK_DC_ID, using default"),
            }
        }

        if let Some(val) = lookup("MTLINK_LISTEN_ADDR") {
            match val.parse::<IpAddr>() {
                Ok(addr) => config.listen_addr = addr,
                Err(_)   => tracing::warn!(value = %val, "Invalid MTLINK_LISTEN_ADDR, using default"),
            }
        }

        if let Some(val) = lookup("MTLINK_PORT") {
            match val.parse::<u16>() {
                Ok(port) => config.port = port,
                Err(_)   => tracing::warn!(value = %val, "Invalid MTLINK_PORT, using default"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.dc_id, 1);
        assert_eq!(config.port, 11441);
    }

    #[test]
    fn test_lookup_overrides_and_fallbacks() {
        let config = ServerConfig::from_lookup(|key| match key {
            "MTLINK_DC_ID"       => Some("2".into()),
            "MTLINK_LISTEN_ADDR" => Some("not an address".into()),
            "MTLINK_PORT"        => Some("11442".into()),
            _ => None,
        });
        assert_eq!(config.dc_id, 2);
        assert_eq!(config.listen_addr, ServerConfig::default().listen_addr);
        assert_eq!(config.port, 11442);
    }
}
