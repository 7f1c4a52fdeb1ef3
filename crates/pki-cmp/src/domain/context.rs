//! # Configuration Context
//!
//! Per-profile configuration: responder key and chain, signature algorithm,
//! default recipient, protection strategy and POP policy. Built once,
//! validated at construction and shared immutably behind an `Arc`.

use std::fmt;
use thiserror::Error;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::Certificate;
use zeroize::Zeroizing;

use super::algorithms::{KeyError, SignatureAlgorithm, SigningCredential};
use super::protection::{ProtectionStrategy, SignatureProtection};

/// Errors raised while assembling a context.
#[derive(Debug, Error)]
pub enum ContextError {
    /// Configured signature algorithm name is not supported
    #[error("Unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Signature protection requested without a signing key
    #[error("Profile {0} has no signing key for signature protection")]
    MissingSigningKey(String),

    /// Shared secret configured but empty
    #[error("Profile {0} has an empty shared secret")]
    EmptySharedSecret(String),

    /// Signing key does not fit the algorithm
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
}

/// Immutable per-profile configuration.
pub struct ConfigurationContext {
    profile_name: String,
    signing_key: Option<SigningCredential>,
    certificate_chain: Vec<Certificate>,
    signature_algorithm: SignatureAlgorithm,
    recipient: Option<GeneralName>,
    protection: ProtectionStrategy,
    pop_required: bool,
    shared_secret: Option<Zeroizing<Vec<u8>>>,
}

impl ConfigurationContext {
    pub fn builder(profile_name: impl Into<String>) -> ConfigurationContextBuilder {
        ConfigurationContextBuilder::new(profile_name)
    }

    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    pub fn signing_key(&self) -> Option<&SigningCredential> {
        self.signing_key.as_ref()
    }

    pub fn certificate_chain(&self) -> &[Certificate] {
        &self.certificate_chain
    }

    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.signature_algorithm
    }

    pub fn signature_algorithm_name(&self) -> &'static str {
        self.signature_algorithm.name()
    }

    /// Default recipient for responses; `None` means "answer the requester".
    pub fn recipient(&self) -> Option<&GeneralName> {
        self.recipient.as_ref()
    }

    pub fn protection(&self) -> &ProtectionStrategy {
        &self.protection
    }

    pub fn pop_required(&self) -> bool {
        self.pop_required
    }

    /// Secret used to verify MAC-protected requests.
    pub fn shared_secret(&self) -> Option<&[u8]> {
        self.shared_secret.as_ref().map(|secret| secret.as_slice())
    }
}

impl fmt::Debug for ConfigurationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationContext")
            .field("profile_name", &self.profile_name)
            .field("signature_algorithm", &self.signature_algorithm)
            .field("protection", &self.protection.name())
            .field("pop_required", &self.pop_required)
            .field("chain_len", &self.certificate_chain.len())
            .field("shared_secret", &self.shared_secret.is_some())
            .finish()
    }
}

/// Builder for [`ConfigurationContext`].
pub struct ConfigurationContextBuilder {
    profile_name: String,
    signing_key: Option<SigningCredential>,
    certificate_chain: Vec<Certificate>,
    signature_algorithm_name: Option<String>,
    recipient: Option<GeneralName>,
    protection: Option<ProtectionStrategy>,
    pop_required: bool,
    shared_secret: Option<Zeroizing<Vec<u8>>>,
}

impl ConfigurationContextBuilder {
    fn new(profile_name: impl Into<String>) -> Self {
        Self {
            profile_name: profile_name.into(),
            signing_key: None,
            certificate_chain: Vec::new(),
            signature_algorithm_name: None,
            recipient: None,
            protection: None,
            pop_required: true,
            shared_secret: None,
        }
    }

    pub fn signing_key(mut self, key: SigningCredential) -> Self {
        self.signing_key = Some(key);
        self
    }

    /// Responder chain, end-entity first.
    pub fn certificate_chain(mut self, chain: Vec<Certificate>) -> Self {
        self.certificate_chain = chain;
        self
    }

    /// `SHA256withECDSA` or `Ed25519`. Defaults to the signing key's algorithm.
    pub fn signature_algorithm(mut self, name: impl Into<String>) -> Self {
        self.signature_algorithm_name = Some(name.into());
        self
    }

    pub fn recipient(mut self, recipient: GeneralName) -> Self {
        self.recipient = Some(recipient);
        self
    }

    /// Explicit strategy. Without one, signature protection is built from
    /// the signing key, algorithm and chain.
    pub fn protection(mut self, strategy: ProtectionStrategy) -> Self {
        self.protection = Some(strategy);
        self
    }

    pub fn pop_required(mut self, required: bool) -> Self {
        self.pop_required = required;
        self
    }

    pub fn shared_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.shared_secret = Some(Zeroizing::new(secret.into()));
        self
    }

    pub fn build(self) -> Result<ConfigurationContext, ContextError> {
        let signature_algorithm = match (&self.signature_algorithm_name, &self.signing_key) {
            (Some(name), _) => SignatureAlgorithm::from_name(name)
                .map_err(|_| ContextError::UnsupportedAlgorithm(name.clone()))?,
            (None, Some(key)) => key.default_algorithm(),
            (None, None) => SignatureAlgorithm::EcdsaWithSha256,
        };

        if let Some(key) = &self.signing_key {
            if !key.supports(signature_algorithm) {
                return Err(KeyError::AlgorithmMismatch {
                    key: key.key_type(),
                    algorithm: signature_algorithm.name(),
                }
                .into());
            }
        }

        if matches!(&self.shared_secret, Some(secret) if secret.is_empty()) {
            return Err(ContextError::EmptySharedSecret(self.profile_name));
        }

        let protection = match self.protection {
            Some(strategy) => strategy,
            None => {
                let key = self
                    .signing_key
                    .clone()
                    .ok_or_else(|| ContextError::MissingSigningKey(self.profile_name.clone()))?;
                ProtectionStrategy::Signature(SignatureProtection::new(
                    key,
                    signature_algorithm,
                    self.certificate_chain.clone(),
                )?)
            }
        };

        Ok(ConfigurationContext {
            profile_name: self.profile_name,
            signing_key: self.signing_key,
            certificate_chain: self.certificate_chain,
            signature_algorithm,
            recipient: self.recipient,
            protection,
            pop_required: self.pop_required,
            shared_secret: self.shared_secret,
        })
    }
}
