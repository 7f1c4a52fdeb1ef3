//! # Runtime Configuration
//!
//! Defaults overridden from `PKI_*` environment variables.
//!
//! ## Security Requirements
//!
//! - MAC protection requires a shared secret
//! - The shared secret MUST NOT be all zero bytes in production

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use zeroize::Zeroizing;

use pki_cmp::domain::mac::{DEFAULT_ITERATIONS, MAX_ITERATIONS};

pub const ENV_PROFILE: &str = "PKI_PROFILE";
pub const ENV_SHARED_SECRET: &str = "PKI_SHARED_SECRET";
pub const ENV_POP_REQUIRED: &str = "PKI_POP_REQUIRED";
pub const ENV_PROTECTION: &str = "PKI_PROTECTION";
pub const ENV_PBM_ITERATIONS: &str = "PKI_PBM_ITERATIONS";
pub const ENV_CA_SUBJECT: &str = "PKI_CA_SUBJECT";
pub const ENV_LOG: &str = "PKI_LOG";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Shared secret is all zero bytes
    #[error(
        "SECURITY VIOLATION: shared secret is all zero bytes. \
         Set PKI_SHARED_SECRET to a random hex value."
    )]
    InsecureSharedSecret,

    /// MAC protection selected without a shared secret
    #[error("{0} protection requires PKI_SHARED_SECRET")]
    MissingSharedSecret(ProtectionKind),

    /// Environment value could not be parsed
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

fn invalid(var: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        var,
        reason: reason.into(),
    }
}

/// Protection applied to responses of the runtime profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ProtectionKind {
    #[default]
    Signature,
    PasswordMac,
    Pbmac1,
}

impl ProtectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Signature => "signature",
            Self::PasswordMac => "pbm",
            Self::Pbmac1 => "pbmac1",
        }
    }

    pub fn is_mac(self) -> bool {
        !matches!(self, Self::Signature)
    }
}

impl fmt::Display for ProtectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtectionKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "signature" => Ok(Self::Signature),
            "pbm" => Ok(Self::PasswordMac),
            "pbmac1" => Ok(Self::Pbmac1),
            other => Err(invalid(
                ENV_PROTECTION,
                format!("'{other}' is not one of signature, pbm, pbmac1"),
            )),
        }
    }
}

/// Complete runtime configuration.
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Name of the single profile served.
    pub profile: String,
    /// Response protection.
    pub protection: ProtectionKind,
    /// Shared MAC secret.
    pub shared_secret: Option<Zeroizing<Vec<u8>>>,
    /// Whether requests must carry a verifiable POP.
    pub pop_required: bool,
    /// Iteration count for MAC protection.
    pub pbm_iterations: u32,
    /// Subject of the in-memory CA certificate.
    pub ca_subject: String,
    /// Subject of the responder certificate.
    pub responder_subject: String,
    /// `tracing` filter directive.
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            profile: "default".to_string(),
            protection: ProtectionKind::Signature,
            shared_secret: None,
            pop_required: true,
            pbm_iterations: DEFAULT_ITERATIONS,
            ca_subject: "CN=PKI Platform CA".to_string(),
            responder_subject: "CN=CMP Responder".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(profile) = lookup(ENV_PROFILE) {
            if profile.trim().is_empty() {
                return Err(invalid(ENV_PROFILE, "empty profile name"));
            }
            config.profile = profile.trim().to_string();
        }

        if let Some(secret_hex) = lookup(ENV_SHARED_SECRET) {
            let secret = hex::decode(secret_hex.trim())
                .map_err(|e| invalid(ENV_SHARED_SECRET, e.to_string()))?;
            if secret.is_empty() {
                return Err(invalid(ENV_SHARED_SECRET, "empty secret"));
            }
            config.shared_secret = Some(Zeroizing::new(secret));
        }

        if let Some(value) = lookup(ENV_POP_REQUIRED) {
            config.pop_required = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => return Err(invalid(ENV_POP_REQUIRED, format!("'{other}' is not a boolean"))),
            };
        }

        if let Some(value) = lookup(ENV_PROTECTION) {
            config.protection = value.parse()?;
        }

        if let Some(value) = lookup(ENV_PBM_ITERATIONS) {
            let iterations: u32 = value
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_PBM_ITERATIONS, format!("'{value}' is not a number")))?;
            if !(1..=MAX_ITERATIONS).contains(&iterations) {
                return Err(invalid(
                    ENV_PBM_ITERATIONS,
                    format!("{iterations} outside 1..={MAX_ITERATIONS}"),
                ));
            }
            config.pbm_iterations = iterations;
        }

        if let Some(subject) = lookup(ENV_CA_SUBJECT) {
            config.ca_subject = subject;
        }

        if let Some(level) = lookup(ENV_LOG) {
            config.log_level = level;
        }

        Ok(config)
    }

    /// Check the configuration is usable at all.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protection.is_mac() && self.shared_secret.is_none() {
            return Err(ConfigError::MissingSharedSecret(self.protection));
        }
        Ok(())
    }

    /// Validate configuration for production readiness.
    ///
    /// # Returns
    ///
    /// Returns `Err` if:
    /// - MAC protection is selected and the shared secret is all zero bytes
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(secret) = &self.shared_secret {
            if self.protection.is_mac() && secret.iter().all(|b| *b == 0) {
                return Err(ConfigError::InsecureSharedSecret);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("profile", &self.profile)
            .field("protection", &self.protection)
            .field("shared_secret", &self.shared_secret.as_ref().map(|_| "<redacted>"))
            .field("pop_required", &self.pop_required)
            .field("pbm_iterations", &self.pbm_iterations)
            .field("ca_subject", &self.ca_subject)
            .field("responder_subject", &self.responder_subject)
            .field("log_level", &self.log_level)
            .finish()
    }
}
