//! # CMP Runtime
//!
//! Builds the CA backend and the single served profile once, then answers
//! DER requests through the engine.
//!
//! ## Startup Sequence
//!
//! 1. Validate configuration
//! 2. Generate the in-memory CA
//! 3. Issue the responder certificate from the CA
//! 4. Build the profile with the configured protection
//! 5. Wire the service

use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use x509_cert::name::Name;

use pki_cmp::domain::asn1::CertTemplate;
use pki_cmp::domain::mac::MacError;
use pki_cmp::{
    CmpMessageApi, CmpService, ConfigurationContext, ContextError, FatalError, InMemoryCa,
    IssuanceBackend, IssuanceError, PasswordMacProtection, Pbmac1Protection, ProtectionStrategy,
    SigningCredential, StaticContextProvider,
};

use crate::config::{ConfigError, ProtectionKind, RuntimeConfig};

/// Startup errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("CA backend error: {0}")]
    Backend(#[from] IssuanceError),

    #[error("Profile error: {0}")]
    Context(#[from] ContextError),

    #[error("MAC protection error: {0}")]
    Mac(#[from] MacError),

    #[error("Invalid distinguished name: {0}")]
    Name(#[from] der::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Install the global `tracing` subscriber, writing to stderr.
pub fn init_logging(filter: &str) -> Result<(), RuntimeError> {
    let filter = EnvFilter::try_new(filter).map_err(|e| RuntimeError::Logging(e.to_string()))?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| RuntimeError::Logging(e.to_string()))
}

/// The engine, its CA, and the profile it serves.
#[derive(Debug)]
pub struct CmpRuntime {
    service: CmpService<StaticContextProvider>,
    ca: Arc<InMemoryCa>,
    profile: String,
}

impl CmpRuntime {
    pub fn new(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        config.validate()?;

        let ca = Arc::new(InMemoryCa::generate(&config.ca_subject)?);
        let context = build_context(config, &ca)?;

        info!(
            profile = %config.profile,
            protection = %config.protection,
            pop_required = config.pop_required,
            "CMP runtime ready"
        );

        let mut profiles = StaticContextProvider::new();
        profiles.insert(Arc::new(context));

        Ok(Self {
            service: CmpService::new(profiles, Arc::clone(&ca)),
            ca,
            profile: config.profile.clone(),
        })
    }

    /// Answer one DER request for the served profile.
    pub fn process(&self, request: &[u8]) -> Result<Vec<u8>, FatalError> {
        self.service.process_der(&self.profile, request)
    }

    pub fn service(&self) -> &CmpService<StaticContextProvider> {
        &self.service
    }

    pub fn ca(&self) -> &InMemoryCa {
        &self.ca
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }
}

/// Responder key and certificate from the CA, plus the configured protection.
fn build_context(config: &RuntimeConfig, ca: &InMemoryCa) -> Result<ConfigurationContext, RuntimeError> {
    let key = SigningCredential::generate_p256();
    let template = CertTemplate {
        subject: Some(Name::from_str(&config.responder_subject)?),
        ..Default::default()
    };
    let public_key = key
        .verifying_key()
        .to_spki()
        .map_err(|e| IssuanceError::Generation(e.to_string()))?;
    let issued = ca.issue(&template, &public_key)?;

    let mut chain = vec![issued.certificate];
    chain.extend(issued.issuer_chain);

    let mut builder = ConfigurationContext::builder(config.profile.clone())
        .signing_key(key)
        .certificate_chain(chain)
        .pop_required(config.pop_required);

    if let Some(secret) = &config.shared_secret {
        builder = builder.shared_secret(secret.to_vec());
        builder = match config.protection {
            ProtectionKind::Signature => builder,
            ProtectionKind::PasswordMac => builder.protection(ProtectionStrategy::PasswordMac(
                PasswordMacProtection::new(secret, config.pbm_iterations)?,
            )),
            ProtectionKind::Pbmac1 => builder.protection(ProtectionStrategy::Pbmac1(
                Pbmac1Protection::new(secret, config.pbm_iterations)?,
            )),
        };
    }

    Ok(builder.build()?)
}
