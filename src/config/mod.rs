//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `CLIPSTORE_*` environment variables. The
//! resulting [`Config`] is read once when a handle is created and never changes afterwards.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::constants::DEFAULT_FEATURE_DIM;
use crate::encoder::ModelFamily;

/// Where the encoders execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    /// Accelerator attached to this host.
    #[default]
    Host,
    /// Accelerator reached over a remote runtime.
    Remote,
}

impl FromStr for Device {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "host" | "local" => Ok(Device::Host),
            "remote" => Ok(Device::Remote),
            _ => Err(ConfigError::InvalidDevice {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Host => f.write_str("host"),
            Device::Remote => f.write_str("remote"),
        }
    }
}

/// Initialization record loaded from environment variables.
///
/// Use [`Config::from_env`] to read `CLIPSTORE_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Encoder placement. Default: `host`.
    pub device: Device,

    /// Accelerator index on the selected device. Default: `0`.
    pub device_id: u32,

    /// Image encoder model file.
    pub image_encoder_path: Option<PathBuf>,

    /// Text encoder model file.
    pub text_encoder_path: Option<PathBuf>,

    /// `tokenizer.json` used for text framing and family probing.
    pub tokenizer_path: Option<PathBuf>,

    /// Explicit model family; `None` probes the tokenizer.
    pub model_family: Option<ModelFamily>,

    /// Durable log location (file, or directory holding it). Default: `./clip_feat_db`.
    pub db_path: PathBuf,

    /// HTTP server port. Default: `8080`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Feature length produced by the stub encoder. Default: `512`.
    pub feature_dim: usize,
}

/// Default durable log location.
pub const DEFAULT_DB_PATH: &str = "./clip_feat_db";

impl Default for Config {
    fn default() -> Self {
        Self {
            device: Device::Host,
            device_id: 0,
            image_encoder_path: None,
            text_encoder_path: None,
            tokenizer_path: None,
            model_family: None,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            port: 8080,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            feature_dim: DEFAULT_FEATURE_DIM,
        }
    }
}

impl Config {
    const ENV_DEVICE: &'static str = "CLIPSTORE_DEVICE";
    const ENV_DEVICE_ID: &'static str = "CLIPSTORE_DEVICE_ID";
    const ENV_IMAGE_ENCODER_PATH: &'static str = "CLIPSTORE_IMAGE_ENCODER_PATH";
    const ENV_TEXT_ENCODER_PATH: &'static str = "CLIPSTORE_TEXT_ENCODER_PATH";
    const ENV_TOKENIZER_PATH: &'static str = "CLIPSTORE_TOKENIZER_PATH";
    const ENV_MODEL_FAMILY: &'static str = "CLIPSTORE_MODEL_FAMILY";
    const ENV_DB_PATH: &'static str = "CLIPSTORE_DB_PATH";
    const ENV_PORT: &'static str = "CLIPSTORE_PORT";
    const ENV_BIND_ADDR: &'static str = "CLIPSTORE_BIND_ADDR";
    const ENV_FEATURE_DIM: &'static str = "CLIPSTORE_FEATURE_DIM";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let device = Self::parse_device_from_env(defaults.device)?;
        let device_id = Self::parse_u32_from_env(Self::ENV_DEVICE_ID, defaults.device_id)?;
        let image_encoder_path = Self::parse_optional_path_from_env(Self::ENV_IMAGE_ENCODER_PATH);
        let text_encoder_path = Self::parse_optional_path_from_env(Self::ENV_TEXT_ENCODER_PATH);
        let tokenizer_path = Self::parse_optional_path_from_env(Self::ENV_TOKENIZER_PATH);
        let model_family = Self::parse_family_from_env()?;
        let db_path = Self::parse_path_from_env(Self::ENV_DB_PATH, defaults.db_path);
        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let feature_dim = Self::parse_feature_dim_from_env(defaults.feature_dim)?;

        Ok(Self {
            device,
            device_id,
            image_encoder_path,
            text_encoder_path,
            tokenizer_path,
            model_family,
            db_path,
            port,
            bind_addr,
            feature_dim,
        })
    }

    /// Validates paths and basic invariants (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.db_path.parent().filter(|p| !p.as_os_str().is_empty())
            && parent.exists()
            && !parent.is_dir()
        {
            return Err(ConfigError::NotADirectory {
                path: parent.to_path_buf(),
            });
        }

        for path in [
            &self.image_encoder_path,
            &self.text_encoder_path,
            &self.tokenizer_path,
        ]
        .into_iter()
        .flatten()
        {
            Self::require_file(path)?;
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    fn require_file(path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            return Err(ConfigError::PathNotFound {
                path: path.to_path_buf(),
            });
        }
        if !path.is_file() {
            return Err(ConfigError::NotAFile {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    fn parse_device_from_env(default: Device) -> Result<Device, ConfigError> {
        match env::var(Self::ENV_DEVICE) {
            Ok(value) if !value.trim().is_empty() => value.parse(),
            _ => Ok(default),
        }
    }

    fn parse_family_from_env() -> Result<Option<ModelFamily>, ConfigError> {
        match env::var(Self::ENV_MODEL_FAMILY) {
            Ok(value) if !value.trim().is_empty() => value
                .parse()
                .map(Some)
                .map_err(|source| ConfigError::InvalidModelFamily { source }),
            _ => Ok(None),
        }
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

    fn parse_feature_dim_from_env(default: usize) -> Result<usize, ConfigError> {
        match env::var(Self::ENV_FEATURE_DIM) {
            Ok(value) => match value.trim().parse::<usize>() {
                Ok(dim) if dim > 0 => Ok(dim),
                _ => Err(ConfigError::InvalidNumber {
                    name: Self::ENV_FEATURE_DIM,
                    value,
                }),
            },
            Err(_) => Ok(default),
        }
    }

    fn parse_u32_from_env(var_name: &'static str, default: u32) -> Result<u32, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber {
                    name: var_name,
                    value,
                }),
            Err(_) => Ok(default),
        }
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name).map(PathBuf::from).unwrap_or(default)
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }
}
