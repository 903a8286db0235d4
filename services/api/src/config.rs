//! Application configuration

use anyhow::Result;

/// Server-level configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP listener binds to
    pub bind_addr: String,
    /// Deployment environment (`development` or `production`)
    pub environment: String,
    /// Base URL of the frontend, used in password-reset emails
    pub frontend_url: String,
    /// Shared secret for checkout webhook signature verification
    pub webhook_secret: String,
}

impl AppConfig {
    /// Create a new AppConfig from environment variables
    ///
    /// # Environment Variables
    /// - `BIND_ADDR`: listener address (default: 0.0.0.0:3000)
    /// - `APP_ENV`: deployment environment (default: development)
    /// - `APP_FRONTEND_URL`: frontend base URL (default: http://localhost:5173)
    /// - `WEBHOOK_SECRET`: checkout webhook secret (default: dev-webhook-secret)
    pub fn from_env() -> Result<Self> {
        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let environment =
            std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let frontend_url = std::env::var("APP_FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:5173".to_string());
        let webhook_secret = std::env::var("WEBHOOK_SECRET")
            .unwrap_or_else(|_| "dev-webhook-secret".to_string());

        Ok(AppConfig {
            bind_addr,
            environment,
            frontend_url,
            webhook_secret,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_app_config_defaults() {
        std::env::remove_var("BIND_ADDR");
        std::env::remove_var("APP_ENV");

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.environment, "development");
        assert!(!config.is_production());
    }

    #[test]
    #[serial]
    fn test_app_config_from_env_with_custom_values() {
        std::env::set_var("BIND_ADDR", "127.0.0.1:8080");
        std::env::set_var("APP_ENV", "production");

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert!(config.is_production());

        std::env::remove_var("BIND_ADDR");
        std::env::remove_var("APP_ENV");
    }
}
