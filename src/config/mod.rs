//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `GREENPROOF_*` environment variables.
//! Fusion weights and decision bands live in [`crate::scoring::FusionConfig`].

pub mod error;


pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_DUPLICATE_CAPACITY, DEFAULT_ORACLE_API_KEY_ENV, DEFAULT_ORACLE_MODEL,
    DEFAULT_ORACLE_TIMEOUT_MS, DEFAULT_RESPONSE_LANGUAGE, DEFAULT_SIMILARITY_TIMEOUT_MS,
};
use crate::similarity::DevicePreference;

/// Prefix on the oracle model name that selects the in-process mock oracle.
pub const MOCK_ORACLE_PREFIX: &str = "mock:";

/// Service configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `GREENPROOF_*` overrides on top of defaults,
/// then [`Config::validate`] before constructing any component.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `8080`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Optional JSON challenge table merged over the built-in one.
    pub registry_path: Option<PathBuf>,

    /// Directory holding the CLIP weights and tokenizer.
    pub clip_model_path: Option<PathBuf>,

    /// Run the similarity model in deterministic stub mode. Default: `false`.
    pub similarity_stub: bool,

    /// Vision-language model name. Default: `gemini-2.0-flash`.
    pub oracle_model: String,

    /// Name of the env var that must carry the oracle credential.
    pub oracle_api_key_env: String,

    /// Upper bound on a single oracle call. Default: 30s.
    pub oracle_timeout: Duration,

    /// Upper bound on a single similarity scoring call. Default: 10s.
    pub similarity_timeout: Duration,

    /// Compute device for the similarity model (`auto` or `cpu`). Default: `auto`.
    pub similarity_device: DevicePreference,

    /// Language tag the oracle is asked to answer in. Default: `ko`.
    pub response_language: String,

    /// Max remembered image hashes in the duplicate ledger. Default: `100_000`.
    pub duplicate_capacity: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            registry_path: None,
            clip_model_path: None,
            similarity_stub: false,
            oracle_model: DEFAULT_ORACLE_MODEL.to_string(),
            oracle_api_key_env: DEFAULT_ORACLE_API_KEY_ENV.to_string(),
            oracle_timeout: Duration::from_millis(DEFAULT_ORACLE_TIMEOUT_MS),
            similarity_timeout: Duration::from_millis(DEFAULT_SIMILARITY_TIMEOUT_MS),
            similarity_device: DevicePreference::Auto,
            response_language: DEFAULT_RESPONSE_LANGUAGE.to_string(),
            duplicate_capacity: DEFAULT_DUPLICATE_CAPACITY,
        }
    }
}

impl Config {
    pub const ENV_PORT: &'static str = "GREENPROOF_PORT";
    pub const ENV_BIND_ADDR: &'static str = "GREENPROOF_BIND_ADDR";
    pub const ENV_REGISTRY_PATH: &'static str = "GREENPROOF_REGISTRY_PATH";
    pub const ENV_CLIP_MODEL_PATH: &'static str = "GREENPROOF_CLIP_MODEL_PATH";
    pub const ENV_SIMILARITY_STUB: &'static str = "GREENPROOF_SIMILARITY_STUB";
    pub const ENV_ORACLE_MODEL: &'static str = "GREENPROOF_ORACLE_MODEL";
    pub const ENV_ORACLE_API_KEY_ENV: &'static str = "GREENPROOF_ORACLE_API_KEY_ENV";
    pub const ENV_ORACLE_TIMEOUT_MS: &'static str = "GREENPROOF_ORACLE_TIMEOUT_MS";
    pub const ENV_SIMILARITY_TIMEOUT_MS: &'static str = "GREENPROOF_SIMILARITY_TIMEOUT_MS";
    pub const ENV_SIMILARITY_DEVICE: &'static str = "GREENPROOF_SIMILARITY_DEVICE";
    pub const ENV_RESPONSE_LANGUAGE: &'static str = "GREENPROOF_RESPONSE_LANGUAGE";
    pub const ENV_DUPLICATE_CAPACITY: &'static str = "GREENPROOF_DUPLICATE_CAPACITY";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let registry_path = Self::parse_optional_path_from_env(Self::ENV_REGISTRY_PATH);
        let clip_model_path = Self::parse_optional_path_from_env(Self::ENV_CLIP_MODEL_PATH);
        let similarity_stub =
            Self::parse_bool_from_env(Self::ENV_SIMILARITY_STUB, defaults.similarity_stub);
        let oracle_model = Self::parse_string_from_env(Self::ENV_ORACLE_MODEL, defaults.oracle_model);
        let oracle_api_key_env =
            Self::parse_string_from_env(Self::ENV_ORACLE_API_KEY_ENV, defaults.oracle_api_key_env);
        let oracle_timeout =
            Self::parse_millis_from_env(Self::ENV_ORACLE_TIMEOUT_MS, defaults.oracle_timeout)?;
        let similarity_timeout = Self::parse_millis_from_env(
            Self::ENV_SIMILARITY_TIMEOUT_MS,
            defaults.similarity_timeout,
        )?;
        let similarity_device = Self::parse_device_from_env(defaults.similarity_device)?;
        let response_language =
            Self::parse_string_from_env(Self::ENV_RESPONSE_LANGUAGE, defaults.response_language);
        let duplicate_capacity =
            Self::parse_u64_from_env(Self::ENV_DUPLICATE_CAPACITY, defaults.duplicate_capacity);

        Ok(Self {
            port,
            bind_addr,
            registry_path,
            clip_model_path,
            similarity_stub,
            oracle_model,
            oracle_api_key_env,
            oracle_timeout,
            similarity_timeout,
            similarity_device,
            response_language,
            duplicate_capacity,
        })
    }

    /// Validates paths, credentials and basic invariants.
    ///
    /// Missing model weights (outside stub mode) and a missing oracle
    /// credential (outside mock mode) are reported here, once, at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref path) = self.registry_path {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_file() {
                return Err(ConfigError::NotAFile { path: path.clone() });
            }
        }

        match self.clip_model_path {
            Some(ref path) => {
                if !path.exists() {
                    return Err(ConfigError::PathNotFound { path: path.clone() });
                }
                if !path.is_dir() {
                    return Err(ConfigError::NotADirectory { path: path.clone() });
                }
            }
            None if !self.similarity_stub => {
                return Err(ConfigError::MissingEnvVar {
                    name: Self::ENV_CLIP_MODEL_PATH,
                });
            }
            None => {}
        }

        if !self.is_mock_oracle() {
            let present = env::var(&self.oracle_api_key_env)
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false);
            if !present {
                return Err(ConfigError::MissingCredential {
                    name: self.oracle_api_key_env.clone(),
                });
            }
        }

        if self.oracle_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_ORACLE_TIMEOUT_MS,
                value: "0".to_string(),
                reason: "timeout must be positive".to_string(),
            });
        }

        if self.similarity_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_SIMILARITY_TIMEOUT_MS,
                value: "0".to_string(),
                reason: "timeout must be positive".to_string(),
            });
        }

        Ok(())
    }

    /// Returns `true` when the oracle model name selects the mock oracle.
    pub fn is_mock_oracle(&self) -> bool {
        self.oracle_model.starts_with(MOCK_ORACLE_PREFIX)
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    fn parse_device_from_env(default: DevicePreference) -> Result<DevicePreference, ConfigError> {
        match env::var(Self::ENV_SIMILARITY_DEVICE) {
            Ok(v) if !v.trim().is_empty() => {
                v.parse::<DevicePreference>().map_err(|reason| ConfigError::InvalidValue {
                    name: Self::ENV_SIMILARITY_DEVICE,
                    value: v.clone(),
                    reason,
                })
            }
            _ => Ok(default),
        }
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(default)
    }

    fn parse_bool_from_env(var_name: &str, default: bool) -> bool {
        match env::var(var_name) {
            Ok(v) => matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            ),
            Err(_) => default,
        }
    }

    fn parse_millis_from_env(
        var_name: &'static str,
        default: Duration,
    ) -> Result<Duration, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| ConfigError::InvalidValue {
                    name: var_name,
                    value,
                    reason: e.to_string(),
                }),
            Err(_) => Ok(default),
        }
    }

    fn parse_u64_from_env(var_name: &str, default: u64) -> u64 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}
