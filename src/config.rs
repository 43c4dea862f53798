use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;

use tracing::{info, warn};

use crate::allocator::AllocatorConfig;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub allocator: AllocatorSettings,
    pub log: LogConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            store: StoreConfig::from_env(),
            allocator: AllocatorSettings::from_env(),
            log: LogConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "HAULAGE_API_HOST";
    const PORT_VAR: &'static str = "HAULAGE_API_PORT";

    fn from_env() -> Self {
        let host_value =
            env_string(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, display_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    var = Self::HOST_VAR,
                    value = %host_value,
                    error = %err,
                    "Could not parse host, using {}",
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = env_string(Self::PORT_VAR)
            .and_then(|raw| parse_port(&raw, Self::PORT_VAR))
            .unwrap_or(Self::DEFAULT_PORT);

        Self {
            bind_ip,
            display_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

/// Where rate overrides are persisted.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    data_dir: PathBuf,
}

impl StoreConfig {
    const DEFAULT_DATA_DIR: &'static str = "data/overrides";
    const DATA_DIR_VAR: &'static str = "HAULAGE_DATA_DIR";

    fn from_env() -> Self {
        Self {
            data_dir: env_string(Self::DATA_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_DATA_DIR)),
        }
    }

    /// Directory holding one JSON file per override record.
    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }
}

/// Configuration for the trailer allocation heuristic.
#[derive(Clone, Debug)]
pub struct AllocatorSettings {
    allocator: AllocatorConfig,
}

impl AllocatorSettings {
    const GAP_VAR: &'static str = "HAULAGE_ALLOCATOR_GAP_CM";
    const ROW_LOOKBACK_VAR: &'static str = "HAULAGE_ALLOCATOR_ROW_LOOKBACK";

    fn from_env() -> Self {
        let gap_cm = load_f64_with_warning(
            Self::GAP_VAR,
            AllocatorConfig::DEFAULT_GAP_CM,
            |value| value >= 0.0,
            "must not be negative",
            "Adjusted stack gap changes how many plots fit on a trailer",
        );

        let row_lookback = env_string(Self::ROW_LOOKBACK_VAR)
            .and_then(|raw| parse_positive_usize(&raw, Self::ROW_LOOKBACK_VAR))
            .unwrap_or(AllocatorConfig::DEFAULT_ROW_LOOKBACK);

        let allocator = AllocatorConfig::builder()
            .gap_cm(gap_cm)
            .row_lookback(row_lookback)
            .build();

        Self { allocator }
    }

    /// Returns the configured AllocatorConfig.
    pub fn allocator_config(&self) -> AllocatorConfig {
        self.allocator
    }
}

/// Log output settings. The level filter itself comes from `RUST_LOG`.
#[derive(Clone, Debug)]
pub struct LogConfig {
    json: bool,
}

impl LogConfig {
    const JSON_VAR: &'static str = "HAULAGE_LOG_JSON";

    /// Read on its own so logging can start before the rest of the configuration.
    pub fn from_env() -> Self {
        Self {
            json: env_string(Self::JSON_VAR)
                .and_then(|raw| parse_bool(&raw, Self::JSON_VAR))
                .unwrap_or(false),
        }
    }

    /// Emit logs as JSON lines instead of human-readable text.
    pub fn json(&self) -> bool {
        self.json
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!(var = name, error = %err, "Access failed, using default value");
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            warn!(
                var = var_name,
                value = other,
                "Could not interpret as boolean value, using default value"
            );
            None
        }
    }
}

fn parse_port(raw: &str, var_name: &str) -> Option<u16> {
    match raw.trim().parse::<u16>() {
        Ok(0) => {
            warn!(var = var_name, "Port must not be 0, using default value");
            None
        }
        Ok(value) => Some(value),
        Err(err) => {
            warn!(var = var_name, value = raw, error = %err, "Could not parse port, using default value");
            None
        }
    }
}

fn parse_positive_usize(raw: &str, var_name: &str) -> Option<usize> {
    match raw.trim().parse::<usize>() {
        Ok(0) => {
            warn!(var = var_name, "Value must be at least 1, using default value");
            None
        }
        Ok(value) => Some(value),
        Err(err) => {
            warn!(var = var_name, value = raw, error = %err, "Could not parse number, using default value");
            None
        }
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    notice: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) if value.is_finite() && validator(value) => {
                let tolerance = (default.abs().max(1.0)) * 1e-9;
                if (value - default).abs() > tolerance {
                    info!(var = var_name, value, "{}", notice);
                }
                value
            }
            Ok(_) => {
                warn!(
                    var = var_name,
                    value = %raw,
                    "Invalid value ({}), using {}",
                    invalid_hint,
                    default
                );
                default
            }
            Err(err) => {
                warn!(
                    var = var_name,
                    value = %raw,
                    error = %err,
                    "Could not parse as number, using {}",
                    default
                );
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_true_values() {
        assert_eq!(parse_bool("1", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("true", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("yes", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("y", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("on", "TEST_VAR"), Some(true));

        assert_eq!(parse_bool("TRUE", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("ON", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("  1  ", "TEST_VAR"), Some(true));
    }

    #[test]
    fn test_parse_bool_false_values() {
        assert_eq!(parse_bool("0", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("false", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("no", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("n", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("off", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool(" FALSE ", "TEST_VAR"), Some(false));
    }

    #[test]
    fn test_parse_bool_invalid_values() {
        assert_eq!(parse_bool("invalid", "TEST_VAR"), None);
        assert_eq!(parse_bool("2", "TEST_VAR"), None);
        assert_eq!(parse_bool("", "TEST_VAR"), None);
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("9090", "TEST_VAR"), Some(9090));
        assert_eq!(parse_port(" 80 ", "TEST_VAR"), Some(80));
        assert_eq!(parse_port("0", "TEST_VAR"), None);
        assert_eq!(parse_port("70000", "TEST_VAR"), None);
        assert_eq!(parse_port("http", "TEST_VAR"), None);
    }

    #[test]
    fn test_parse_positive_usize() {
        assert_eq!(parse_positive_usize("5", "TEST_VAR"), Some(5));
        assert_eq!(parse_positive_usize("0", "TEST_VAR"), None);
        assert_eq!(parse_positive_usize("-1", "TEST_VAR"), None);
    }

    #[test]
    fn unset_variable_yields_default() {
        let value = load_f64_with_warning(
            "HAULAGE_TEST_SURELY_UNSET_VARIABLE",
            10.0,
            |v| v >= 0.0,
            "must not be negative",
            "changed",
        );
        assert_eq!(value, 10.0);
    }
}
