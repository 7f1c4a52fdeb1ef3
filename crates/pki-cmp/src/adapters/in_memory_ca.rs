//! # In-Memory CA
//!
//! Issuing backend that keeps its key, serial counter and issuance registry
//! in process memory. Used by the runtime for local operation and by tests.
//!
//! Certificates are X.509 v3, signed with the CA key's own algorithm
//! (ECDSA P-256/secp256k1 or Ed25519). Revocation answers are complete `rp`
//! messages protected with the CA's own signature profile.

use der::Encode;
use parking_lot::RwLock;
use spki::SubjectPublicKeyInfoOwned;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};
use x509_cert::certificate::{TbsCertificate, Version};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::Validity;
use x509_cert::Certificate;

use crate::domain::algorithms::{KeyError, SigningCredential};
use crate::domain::asn1::{
    CertId, CertTemplate, PkiBody, PkiHeader, PkiMessage, PkiStatus, PkiStatusInfo, RevDetails,
};
use crate::domain::builder::{create_revocation_response_body, MessageBuilder};
use crate::domain::context::ConfigurationContext;
use crate::domain::errors::PkiFailureInfo;
use crate::ports::outbound::{IssuanceBackend, IssuanceError, IssuedCertificate};

/// Validity of issued end-entity certificates.
pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Validity of the self-signed CA certificate.
pub const CA_VALIDITY: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Profile name of the context the CA signs revocation responses with.
const RESPONDER_PROFILE: &str = "in-memory-ca";

fn key_error(error: KeyError) -> IssuanceError {
    IssuanceError::Generation(error.to_string())
}

// =============================================================================
// CERTIFICATE MINTING
// =============================================================================

/// Minimal positive INTEGER encoding of `serial`.
fn serial_number(serial: u64) -> der::Result<SerialNumber> {
    let bytes = serial.to_be_bytes();
    let start = bytes
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(bytes.len() - 1);

    let mut encoded = Vec::with_capacity(bytes.len() + 1);
    if bytes[start] & 0x80 != 0 {
        encoded.push(0);
    }
    encoded.extend_from_slice(&bytes[start..]);
    SerialNumber::new(&encoded)
}

/// Build and sign an X.509 v3 certificate.
///
/// The signature algorithm is the default algorithm of `issuer_key`.
pub fn mint_certificate(
    issuer_key: &SigningCredential,
    issuer: &Name,
    subject: Name,
    public_key: SubjectPublicKeyInfoOwned,
    serial: u64,
    validity: Duration,
) -> Result<Certificate, IssuanceError> {
    let algorithm = issuer_key.default_algorithm();

    let tbs_certificate = TbsCertificate {
        version: Version::V3,
        serial_number: serial_number(serial)?,
        signature: algorithm.algorithm_identifier(),
        issuer: issuer.clone(),
        validity: Validity::from_now(validity)?,
        subject,
        subject_public_key_info: public_key,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: None,
    };

    let signature = issuer_key
        .sign(algorithm, &tbs_certificate.to_der()?)
        .map_err(key_error)?;

    Ok(Certificate {
        tbs_certificate,
        signature_algorithm: algorithm.algorithm_identifier(),
        signature: der::asn1::BitString::from_bytes(&signature)?,
    })
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Issued, revoked and confirmed certificates, keyed by serial bytes.
#[derive(Debug, Default)]
struct Registry {
    issued: HashMap<Vec<u8>, Name>,
    revoked: HashSet<Vec<u8>>,
    confirmed: usize,
    rejected_by_requester: usize,
}

// =============================================================================
// CA
// =============================================================================

/// Self-signed CA held entirely in memory.
pub struct InMemoryCa {
    key: SigningCredential,
    certificate: Certificate,
    responder: ConfigurationContext,
    validity: Duration,
    next_serial: AtomicU64,
    registry: RwLock<Registry>,
}

impl InMemoryCa {
    /// New CA with a fresh P-256 key and a self-signed certificate for `subject`
    /// (an RFC 4514 string such as `CN=Example CA`).
    pub fn generate(subject: &str) -> Result<Self, IssuanceError> {
        Self::with_key(SigningCredential::generate_p256(), subject)
    }

    /// New CA around an existing key.
    pub fn with_key(key: SigningCredential, subject: &str) -> Result<Self, IssuanceError> {
        let name = Name::from_str(subject)?;
        let public_key = key.verifying_key().to_spki().map_err(key_error)?;
        let certificate = mint_certificate(&key, &name, name.clone(), public_key, 1, CA_VALIDITY)?;

        let responder = ConfigurationContext::builder(RESPONDER_PROFILE)
            .signing_key(key.clone())
            .certificate_chain(vec![certificate.clone()])
            .build()
            .map_err(|e| IssuanceError::Unavailable(e.to_string()))?;

        info!(subject = %name, key_type = key.key_type(), "In-memory CA ready");

        Ok(Self {
            key,
            certificate,
            responder,
            validity: DEFAULT_VALIDITY,
            next_serial: AtomicU64::new(2),
            registry: RwLock::new(Registry::default()),
        })
    }

    /// Override the validity of issued certificates.
    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    /// The CA certificate.
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn subject(&self) -> &Name {
        &self.certificate.tbs_certificate.subject
    }

    pub fn issued_count(&self) -> usize {
        self.registry.read().issued.len()
    }

    pub fn revoked_count(&self) -> usize {
        self.registry.read().revoked.len()
    }

    /// Certificates the requester accepted in a `certConf`.
    pub fn confirmation_count(&self) -> usize {
        self.registry.read().confirmed
    }

    /// Certificates the requester rejected in a `certConf`.
    pub fn rejected_confirmation_count(&self) -> usize {
        self.registry.read().rejected_by_requester
    }

    pub fn is_revoked(&self, serial: &SerialNumber) -> bool {
        self.registry.read().revoked.contains(serial.as_bytes())
    }

    /// Decide one entry without touching the registry.
    ///
    /// `pending` holds serials accepted earlier in the same request.
    fn decide_revocation(
        &self,
        registry: &Registry,
        pending: &HashSet<Vec<u8>>,
        details: &RevDetails,
    ) -> Result<RevocationDecision, IssuanceError> {
        let template = &details.cert_details;

        if matches!(&template.issuer, Some(issuer) if issuer != self.subject()) {
            return RevocationDecision::rejected(PkiFailureInfo::BAD_CERT_ID, "issuer is not this CA");
        }

        let Some(serial) = &template.serial_number else {
            return RevocationDecision::rejected(PkiFailureInfo::BAD_CERT_ID, "serial number missing");
        };
        let key = serial.as_bytes().to_vec();

        if !registry.issued.contains_key(&key) {
            return RevocationDecision::rejected(PkiFailureInfo::BAD_CERT_ID, "unknown certificate");
        }
        if registry.revoked.contains(&key) || pending.contains(&key) {
            return RevocationDecision::rejected(PkiFailureInfo::CERT_REVOKED, "already revoked");
        }

        Ok(RevocationDecision {
            status: PkiStatusInfo::accepted(),
            cert_id: Some(CertId {
                issuer: GeneralName::DirectoryName(self.subject().clone()),
                serial_number: serial.clone(),
            }),
            serial: Some(key),
        })
    }
}

/// Outcome of one revocation entry, applied only once every entry is decided.
struct RevocationDecision {
    status: PkiStatusInfo,
    cert_id: Option<CertId>,
    serial: Option<Vec<u8>>,
}

impl RevocationDecision {
    fn rejected(failure_info: PkiFailureInfo, text: &str) -> Result<Self, IssuanceError> {
        Ok(Self {
            status: PkiStatusInfo::rejection(failure_info, text)?,
            cert_id: None,
            serial: None,
        })
    }
}

impl IssuanceBackend for InMemoryCa {
    fn issue(
        &self,
        template: &CertTemplate,
        public_key: &SubjectPublicKeyInfoOwned,
    ) -> Result<IssuedCertificate, IssuanceError> {
        let subject = template.subject.clone().ok_or_else(|| IssuanceError::Rejected {
            reason: "template has no subject".into(),
        })?;

        let serial = self.next_serial.fetch_add(1, Ordering::SeqCst);
        let certificate = mint_certificate(
            &self.key,
            self.subject(),
            subject.clone(),
            public_key.clone(),
            serial,
            self.validity,
        )?;

        self.registry.write().issued.insert(
            certificate.tbs_certificate.serial_number.as_bytes().to_vec(),
            subject.clone(),
        );
        info!(serial, subject = %subject, "Issued certificate");

        Ok(IssuedCertificate {
            certificate,
            issuer_chain: vec![self.certificate.clone()],
        })
    }

    fn acknowledge_confirmation(&self, request: &PkiMessage) -> Result<(), IssuanceError> {
        let PkiBody::CertConf(statuses) = &request.body else {
            return Err(IssuanceError::Rejected {
                reason: format!("expected certConf, got {}", request.body_type()),
            });
        };

        let mut registry = self.registry.write();
        for status in statuses {
            let accepted = status
                .status_info
                .as_ref()
                .map_or(true, |info| info.status == PkiStatus::Accepted);
            if accepted {
                registry.confirmed += 1;
            } else {
                registry.rejected_by_requester += 1;
                warn!(cert_req_id = status.cert_req_id, "Requester rejected issued certificate");
            }
        }
        debug!(entries = statuses.len(), "Confirmation recorded");
        Ok(())
    }

    fn revoke(
        &self,
        request: &PkiMessage,
        details: &[RevDetails],
    ) -> Result<Option<PkiMessage>, IssuanceError> {
        let mut statuses = Vec::with_capacity(details.len());
        let mut rev_certs = Vec::new();
        {
            let mut registry = self.registry.write();
            let mut pending = HashSet::new();
            for entry in details {
                let decision = self.decide_revocation(&registry, &pending, entry)?;
                statuses.push(decision.status);
                rev_certs.extend(decision.cert_id);
                pending.extend(decision.serial);
            }

            for serial in pending {
                info!(serial = %hex::encode(&serial), "Certificate revoked");
                registry.revoked.insert(serial);
            }
        }

        let mut body = create_revocation_response_body(statuses);
        if let PkiBody::Rp(content) = &mut body {
            content.rev_certs = (!rev_certs.is_empty()).then_some(rev_certs);
        }

        let response = MessageBuilder::new(&self.responder)
            .header(PkiHeader::response_template(&request.header)?)
            .body(body)
            .build()
            .map_err(|e| IssuanceError::Generation(e.to_string()))?;

        Ok(Some(response))
    }
}

impl std::fmt::Debug for InMemoryCa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCa")
            .field("subject", &self.subject().to_string())
            .field("key_type", &self.key.key_type())
            .field("issued", &self.issued_count())
            .finish_non_exhaustive()
    }
}
