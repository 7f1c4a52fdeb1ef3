//! # Integration Tests
//!
//! Complete CMP transactions through `CmpService` at the DER boundary, with
//! the in-memory CA as backend.
//!
//! Profiles served by [`Harness`]:
//!
//! | Profile | Protection | POP |
//! |---------|------------|-----|
//! | `default` | ECDSA P-256 signature | required |
//! | `pbm` | PasswordBasedMac | optional |
//! | `pbmac1` | PBMAC1 | optional |

pub mod error_flows;
pub mod flows;

use der::asn1::OctetString;
use der::{Decode, Encode};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use x509_cert::Certificate;

use pki_cmp::domain::asn1::{CertOrEncCert, CertStatus, ErrorMsgContent};
use pki_cmp::test_utils::{request_header, signature_context};
use pki_cmp::{
    CmpMessageApi, CmpService, ConfigurationContext, InMemoryCa, PasswordMacProtection,
    Pbmac1Protection, PkiBody, PkiHeader, PkiMessage, ProtectionStrategy, StaticContextProvider,
};

/// Shared secret of the MAC profiles.
pub const SECRET: &[u8] = b"integration shared secret";

/// Iteration count of the MAC profiles.
pub const ITERATIONS: u32 = 1_000;

// =============================================================================
// TEST FIXTURES
// =============================================================================

/// Service with the signature and MAC profiles over one CA.
pub struct Harness {
    pub service: CmpService<StaticContextProvider>,
    pub ca: Arc<InMemoryCa>,
}

impl Harness {
    pub fn new() -> Self {
        let ca = Arc::new(InMemoryCa::generate("CN=Integration CA").expect("CA generation"));
        let (signature, _) = signature_context("default");

        let mut profiles = StaticContextProvider::new();
        profiles.insert(signature);
        profiles.insert(Arc::new(mac_profile("pbm", pbm_strategy(SECRET))));
        profiles.insert(Arc::new(mac_profile("pbmac1", pbmac1_strategy(SECRET))));

        Self {
            service: CmpService::new(profiles, Arc::clone(&ca)),
            ca,
        }
    }

    /// Encode `request`, process it for `profile`, decode the answer.
    pub fn exchange(&self, profile: &str, request: &PkiMessage) -> PkiMessage {
        let der = request.to_der().expect("request encoding");
        let response = self
            .service
            .process_der(profile, &der)
            .expect("no engine fault");
        PkiMessage::from_der(&response).expect("response decoding")
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn pbm_strategy(secret: &[u8]) -> ProtectionStrategy {
    ProtectionStrategy::PasswordMac(
        PasswordMacProtection::new(secret, ITERATIONS).expect("PBM parameters"),
    )
}

pub fn pbmac1_strategy(secret: &[u8]) -> ProtectionStrategy {
    ProtectionStrategy::Pbmac1(Pbmac1Protection::new(secret, ITERATIONS).expect("PBMAC1 parameters"))
}

/// MAC-protected profile validating requests with [`SECRET`].
pub fn mac_profile(name: &str, strategy: ProtectionStrategy) -> ConfigurationContext {
    ConfigurationContext::builder(name)
        .protection(strategy)
        .shared_secret(SECRET.to_vec())
        .pop_required(false)
        .build()
        .expect("MAC profile")
}

/// Request protected with `strategy` under a fresh client header.
pub fn mac_request(strategy: &ProtectionStrategy, body: PkiBody) -> PkiMessage {
    strategy
        .protect(request_header(), body, Vec::new())
        .expect("request protection")
}

/// Header continuing the transaction of `response`.
pub fn follow_up_header(response: &PkiMessage) -> PkiHeader {
    let mut header = request_header();
    header.trans_id = response.header.trans_id.clone();
    header.recip_nonce = response.header.sender_nonce.clone();
    header
}

/// Certificate carried in the first response of an ip/cp/kup.
pub fn issued_certificate(response: &PkiMessage) -> Certificate {
    let rep = response
        .body
        .cert_rep_message()
        .expect("certificate response body");
    match &rep.response[0]
        .certified_key_pair
        .as_ref()
        .expect("certified key pair")
        .cert_or_enc_cert
    {
        CertOrEncCert::Certificate(cert) => cert.clone(),
        CertOrEncCert::EncryptedCert(_) => panic!("expected a plain certificate"),
    }
}

/// certConf accepting `certificate` for request id `cert_req_id`.
pub fn cert_conf(certificate: &Certificate, cert_req_id: i64) -> PkiBody {
    let hash = Sha256::digest(certificate.to_der().expect("certificate encoding"));
    PkiBody::CertConf(vec![CertStatus {
        cert_hash: OctetString::new(hash.to_vec()).expect("hash"),
        cert_req_id,
        status_info: None,
    }])
}

pub fn error_content(message: &PkiMessage) -> &ErrorMsgContent {
    match &message.body {
        PkiBody::Error(content) => content,
        other => panic!("expected error body, got {}", other.body_type()),
    }
}
