//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

/// Default port when neither PORT nor SERVER_ADDR is set
pub const DEFAULT_PORT: u16 = 4000;

/// Server configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origin for CORS ("*" for any)
    pub cors_origin: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| format!("0.0.0.0:{}", DEFAULT_PORT))
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress(server_addr.clone()))?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            cors_origin: env::var("CORS_ORIGIN").unwrap_or_else(|_| "*".to_string()),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            log_level: "info".to_string(),
            cors_origin: "*".to_string(),
        }
    }
}

/// Client-side configuration for the sync client and headless driver
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Websocket endpoint of the sync server
    pub ws_url: String,
    pub log_level: String,
    pub player_name: String,
    pub player_color: String,
    pub player_car: String,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_url =
            env::var("SERVER_URL").unwrap_or_else(|_| format!("http://localhost:{}", DEFAULT_PORT));

        Ok(Self {
            ws_url: ws_url_from(&server_url)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            player_name: env::var("PLAYER_NAME").unwrap_or_else(|_| "Driver".to_string()),
            player_color: env::var("PLAYER_COLOR").unwrap_or_else(|_| "red".to_string()),
            player_car: env::var("PLAYER_CAR").unwrap_or_else(|_| "default".to_string()),
        })
    }
}

/// Map an http(s) server URL onto its websocket endpoint.
///
/// `ws://` and `wss://` URLs are accepted as-is; `/ws` is appended when the
/// URL has no path of its own.
pub fn ws_url_from(server_url: &str) -> Result<String, ConfigError> {
    let trimmed = server_url.trim().trim_end_matches('/');

    let base = if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if trimmed.starts_with("ws://") || trimmed.starts_with("wss://") {
        trimmed.to_string()
    } else {
        return Err(ConfigError::InvalidServerUrl(server_url.to_string()));
    };

    if base.ends_with("/ws") {
        Ok(base)
    } else {
        Ok(format!("{}/ws", base))
    }
}

/// URL other players on the local network should point `SERVER_URL` at.
/// Falls back to loopback when no LAN address is known.
pub fn lan_server_url(lan_ip: Option<&str>, port: u16) -> String {
    let ip = lan_ip
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or("127.0.0.1");
    format!("http://{}:{}", ip, port)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format: {0}")]
    InvalidAddress(String),

    #[error("Server URL must start with http://, https://, ws:// or wss://: {0}")]
    InvalidServerUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_urls_map_to_ws_endpoint() {
        assert_eq!(
            ws_url_from("http://localhost:4000").unwrap(),
            "ws://localhost:4000/ws"
        );
        assert_eq!(
            ws_url_from("https://race.example.com/").unwrap(),
            "wss://race.example.com/ws"
        );
    }

    #[test]
    fn ws_urls_keep_their_path() {
        assert_eq!(
            ws_url_from("ws://127.0.0.1:9000/ws").unwrap(),
            "ws://127.0.0.1:9000/ws"
        );
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        assert!(matches!(
            ws_url_from("ftp://host"),
            Err(ConfigError::InvalidServerUrl(_))
        ));
    }

    #[test]
    fn default_config_listens_on_4000() {
        let config = Config::default();
        assert_eq!(config.server_addr.port(), 4000);
        assert_eq!(config.cors_origin, "*");
    }

    #[test]
    fn lan_url_uses_detected_address_or_loopback() {
        assert_eq!(
            lan_server_url(Some("192.168.1.20"), 4000),
            "http://192.168.1.20:4000"
        );
        assert_eq!(lan_server_url(None, 4000), "http://127.0.0.1:4000");
        assert_eq!(lan_server_url(Some(" "), 8080), "http://127.0.0.1:8080");
    }
}
