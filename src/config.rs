//! Configuration types for the parsing service.
//!
//! Every tunable lives in [`ServiceConfig`], built once at startup via its
//! [`ServiceConfigBuilder`] and shared read-only with every request through
//! [`crate::api::AppState`]. Components receive the values they need; none of
//! them reads the environment on its own.

use crate::error::ServiceError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

const MIB: u64 = 1024 * 1024;

/// Configuration for the parsing service.
///
/// # Example
/// ```rust
/// use pdf_parser::{ApiKeys, ServiceConfig};
///
/// let config = ServiceConfig::builder()
///     .api_keys(ApiKeys::from_csv("key-a, key-b"))
///     .max_upload_mb(10)
///     .max_pages(200)
///     .build()
///     .unwrap();
/// assert!(config.api_keys.is_enabled());
/// ```
#[derive(Clone)]
pub struct ServiceConfig {
    /// Name reported in startup logs. Default: "pdf_parser".
    pub app_name: String,

    /// Accepted API keys. Empty disables authentication.
    pub api_keys: ApiKeys,

    /// Root directory for per-request scratch directories. Default: `/tmp/pdf_parser`.
    pub temp_dir: PathBuf,

    /// Largest artifact accepted after acquisition, in bytes. Default: 25 MiB.
    pub max_upload_bytes: u64,

    /// Limits handed to the conversion engine.
    pub limits: ConversionLimits,

    /// Wall-clock budget for one conversion in seconds. Default: 300.
    pub conversion_timeout_secs: u64,

    /// Worker threads the engine may use for one document. Default: 4.
    pub conversion_threads: usize,

    /// Compute device requested for conversion. Default: [`Device::Auto`].
    pub device: Device,

    /// Timeout for fetching a remote source in seconds. Default: 30.
    pub download_timeout_secs: u64,

    /// Overall budget for one HTTP request in seconds. Default: 600.
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            app_name: "pdf_parser".to_string(),
            api_keys: ApiKeys::default(),
            temp_dir: PathBuf::from("/tmp/pdf_parser"),
            max_upload_bytes: 25 * MIB,
            limits: ConversionLimits::default(),
            conversion_timeout_secs: 300,
            conversion_threads: 4,
            device: Device::default(),
            download_timeout_secs: 30,
            request_timeout_secs: 600,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("app_name", &self.app_name)
            .field("api_keys", &self.api_keys)
            .field("temp_dir", &self.temp_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("limits", &self.limits)
            .field("conversion_timeout_secs", &self.conversion_timeout_secs)
            .field("conversion_threads", &self.conversion_threads)
            .field("device", &self.device)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.config.app_name = name.into();
        self
    }

    pub fn api_keys(mut self, keys: ApiKeys) -> Self {
        self.config.api_keys = keys;
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = dir.into();
        self
    }

    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn max_upload_mb(self, mb: u64) -> Self {
        self.max_upload_bytes(mb.saturating_mul(MIB))
    }

    pub fn max_pages(mut self, pages: u32) -> Self {
        self.config.limits.max_pages = pages;
        self
    }

    pub fn max_file_size_bytes(mut self, bytes: u64) -> Self {
        self.config.limits.max_file_size = bytes;
        self
    }

    pub fn max_file_size_mb(self, mb: u64) -> Self {
        self.max_file_size_bytes(mb.saturating_mul(MIB))
    }

    pub fn conversion_timeout_secs(mut self, secs: u64) -> Self {
        self.config.conversion_timeout_secs = secs;
        self
    }

    pub fn conversion_threads(mut self, n: usize) -> Self {
        self.config.conversion_threads = n.max(1);
        self
    }

    pub fn device(mut self, device: Device) -> Self {
        self.config.device = device;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, ServiceError> {
        let c = &self.config;
        if c.temp_dir.as_os_str().is_empty() {
            return Err(ServiceError::InvalidConfig(
                "temp_dir must not be empty".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(ServiceError::InvalidConfig(
                "max upload size must be ≥ 1 byte".into(),
            ));
        }
        if c.limits.max_pages == 0 {
            return Err(ServiceError::InvalidConfig(
                "max pages must be ≥ 1".into(),
            ));
        }
        for (name, secs) in [
            ("conversion timeout", c.conversion_timeout_secs),
            ("download timeout", c.download_timeout_secs),
            ("request timeout", c.request_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ServiceError::InvalidConfig(format!(
                    "{name} must be ≥ 1s"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Credential set ───────────────────────────────────────────────────────

/// The set of accepted API keys.
///
/// Keys are opaque and case-sensitive. An empty set turns authentication off
/// for every request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKeys(HashSet<String>);

impl ApiKeys {
    /// Parse a comma-separated list, trimming whitespace and dropping blanks.
    pub fn from_csv(raw: &str) -> Self {
        raw.split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect()
    }

    /// Whether requests must present a key.
    pub fn is_enabled(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ApiKeys {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

// Never print the keys themselves.
impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKeys(<{} redacted>)", self.0.len())
    }
}

// ── Conversion limits ────────────────────────────────────────────────────

/// Limits the conversion engine enforces on a single document.
///
/// Independent from the upload ceiling and usually stricter in page terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionLimits {
    /// Maximum page count. Default: 500.
    pub max_pages: u32,
    /// Maximum document size in bytes. Default: 50 MiB.
    pub max_file_size: u64,
}

impl Default for ConversionLimits {
    fn default() -> Self {
        Self {
            max_pages: 500,
            max_file_size: 50 * MIB,
        }
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Compute device requested for conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Let the engine decide. (default)
    #[default]
    Auto,
    Cpu,
    Cuda,
    Mps,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Device::Auto => "auto",
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
            Device::Mps => "mps",
        };
        f.write_str(s)
    }
}

impl FromStr for Device {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Device::Auto),
            "cpu" => Ok(Device::Cpu),
            "cuda" => Ok(Device::Cuda),
            "mps" => Ok(Device::Mps),
            other => Err(ServiceError::InvalidConfig(format!(
                "unknown device '{other}', expected auto, cpu, cuda or mps"
            ))),
        }
    }
}
