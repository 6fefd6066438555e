use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub url: String,
    pub connect_attempts: u32,
    pub retry_delay_secs: u64,
    /// Log a one-second countdown while waiting between attempts.
    pub staged_countdown: bool,
    pub watchdog_interval_ms: u64,
}

impl GatewayConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
}

pub struct Config {
    pub port: u16,
    pub gateway: GatewayConfig,
    pub registry: RegistryConfig,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

impl Config {
    pub fn from_env() -> Self {
        let gateway = GatewayConfig {
            url: std::env::var("RELAY_GATEWAY_URL")
                .unwrap_or_else(|_| "ws://127.0.0.1:8900/emitters".to_string()),
            connect_attempts: env_parse::<u32>("RELAY_CONNECT_ATTEMPTS")
                .filter(|n| *n > 0)
                .unwrap_or(3),
            retry_delay_secs: env_parse("RELAY_RETRY_DELAY_SECS").unwrap_or(3),
            staged_countdown: std::env::var("RELAY_RETRY_COUNTDOWN")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            watchdog_interval_ms: env_parse::<u64>("RELAY_WATCHDOG_INTERVAL_MS")
                .filter(|n| *n > 0)
                .unwrap_or(1000),
        };

        let registry = RegistryConfig {
            base_url: std::env::var("RELAY_REGISTRY_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8900".to_string()),
            auth_token: std::env::var("RELAY_REGISTRY_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
        };

        Self {
            port: env_parse("PORT").unwrap_or(5000),
            gateway,
            registry,
        }
    }
}
