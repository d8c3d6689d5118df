//! Service-level configuration

use anyhow::Result;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the storefront client, used for post-activation redirects
    pub client_url: String,
    /// Public base URL of this API, embedded in emailed links
    pub api_url: String,
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// Delay before an assembling order auto-advances to ready
    pub order_ready_delay: Duration,
}

impl AppConfig {
    /// Create a new AppConfig from environment variables
    ///
    /// # Environment Variables
    /// - `CLIENT_URL`: Storefront base URL (default: "http://localhost:3000")
    /// - `API_URL`: Public base URL of this API (default: "http://localhost:5000")
    /// - `BIND_ADDR`: Listen address (default: "0.0.0.0:3000")
    /// - `ORDER_READY_DELAY_SECS`: Auto-advance delay in seconds (default: 30)
    pub fn from_env() -> Result<Self> {
        let client_url =
            std::env::var("CLIENT_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let api_url =
            std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:5000".to_string());

        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let order_ready_delay = std::env::var("ORDER_READY_DELAY_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Ok(AppConfig {
            client_url,
            api_url,
            bind_addr,
            order_ready_delay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_app_config_defaults() {
        unsafe {
            std::env::remove_var("CLIENT_URL");
            std::env::remove_var("API_URL");
            std::env::remove_var("BIND_ADDR");
            std::env::remove_var("ORDER_READY_DELAY_SECS");
        }

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.client_url, "http://localhost:3000");
        assert_eq!(config.api_url, "http://localhost:5000");
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.order_ready_delay, Duration::from_secs(30));
    }

    #[test]
    #[serial]
    fn test_app_config_api_url_from_env() {
        unsafe {
            std::env::set_var("API_URL", "https://api.florea.example");
        }

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.api_url, "https://api.florea.example");

        unsafe {
            std::env::remove_var("API_URL");
        }
    }

    #[test]
    #[serial]
    fn test_app_config_custom_delay() {
        unsafe {
            std::env::set_var("ORDER_READY_DELAY_SECS", "5");
        }

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.order_ready_delay, Duration::from_secs(5));

        unsafe {
            std::env::remove_var("ORDER_READY_DELAY_SECS");
        }
    }
}
