//! Fixtures for tests: keys, self-signed certificates, contexts and
//! protected requests.
//!
//! Enabled for unit tests and, through the `test-utils` feature, for
//! downstream test crates.

use der::asn1::{BitString, OctetString};
use der::Encode;
use rand::RngCore;
use std::str::FromStr;
use std::sync::Arc;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::name::Name;
use x509_cert::Certificate;

use crate::adapters::in_memory_ca::{mint_certificate, DEFAULT_VALIDITY};
use crate::domain::algorithms::SigningCredential;
use crate::domain::asn1::header::{fresh_nonce, now};
use crate::domain::asn1::{
    CertReqMsg, CertRequest, CertTemplate, PkiBody, PkiHeader, PkiMessage, PopoSigningKey,
    ProofOfPossession,
};
use crate::domain::context::ConfigurationContext;
use crate::domain::protection::{PasswordMacProtection, ProtectionStrategy, SignatureProtection};

/// Iteration count for test MAC profiles.
pub const TEST_ITERATIONS: u32 = 1_000;

/// `CN=<cn>`.
pub fn name(cn: &str) -> Name {
    Name::from_str(&format!("CN={cn}")).expect("valid common name")
}

/// directoryName `CN=<cn>`.
pub fn directory_name(cn: &str) -> GeneralName {
    GeneralName::DirectoryName(name(cn))
}

/// Self-signed certificate for `key` with subject `CN=<cn>`.
pub fn self_signed(key: &SigningCredential, cn: &str) -> Certificate {
    let subject = name(cn);
    let public_key = key.verifying_key().to_spki().expect("encodable key");
    mint_certificate(key, &subject, subject.clone(), public_key, 1, DEFAULT_VALIDITY)
        .expect("certificate minting")
}

/// CRMF request for `CN=<cn>` with a signature POP made by `key`.
pub fn cert_req_msg(key: &SigningCredential, cn: &str, cert_req_id: i64) -> CertReqMsg {
    let cert_req = CertRequest {
        cert_req_id,
        cert_template: CertTemplate {
            subject: Some(name(cn)),
            public_key: Some(key.verifying_key().to_spki().expect("encodable key")),
            ..Default::default()
        },
        controls: None,
    };

    let algorithm = key.default_algorithm();
    let signature = key
        .sign(algorithm, &cert_req.to_der().expect("encodable request"))
        .expect("signing failed");

    CertReqMsg {
        cert_req,
        popo: Some(ProofOfPossession::Signature(PopoSigningKey {
            poposk_input: None,
            alg_id: algorithm.algorithm_identifier(),
            signature: BitString::from_bytes(&signature).expect("bit string"),
        })),
        reg_info: None,
    }
}

/// Header of a client request: `CN=client` to `CN=ca` with a random
/// transaction id, a sender nonce and the current time.
pub fn request_header() -> PkiHeader {
    let mut transaction_id = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut transaction_id);

    let mut header = PkiHeader::new(directory_name("client"), directory_name("ca"));
    header.trans_id = Some(OctetString::new(transaction_id.to_vec()).expect("octet string"));
    header.sender_nonce = Some(fresh_nonce().expect("nonce"));
    header.message_time = Some(now().expect("time"));
    header
}

/// Signature profile with a fresh P-256 responder key and self-signed chain.
pub fn signature_context(profile: &str) -> (Arc<ConfigurationContext>, SigningCredential) {
    let key = SigningCredential::generate_p256();
    let context = ConfigurationContext::builder(profile)
        .signing_key(key.clone())
        .certificate_chain(vec![self_signed(&key, "CMP Responder")])
        .build()
        .expect("signature context");
    (Arc::new(context), key)
}

/// Profile `mac`: PasswordBasedMac protection with `secret`, POP optional.
pub fn mac_context(secret: &[u8]) -> Arc<ConfigurationContext> {
    let protection = PasswordMacProtection::new(secret, TEST_ITERATIONS).expect("mac parameters");
    let context = ConfigurationContext::builder("mac")
        .protection(ProtectionStrategy::PasswordMac(protection))
        .shared_secret(secret.to_vec())
        .pop_required(false)
        .build()
        .expect("mac context");
    Arc::new(context)
}

/// Sign `header`/`body` with `key` and attach `cert` as the only extra certificate.
pub fn protect_with_signature(
    key: &SigningCredential,
    cert: Certificate,
    header: PkiHeader,
    body: PkiBody,
) -> PkiMessage {
    let strategy = ProtectionStrategy::Signature(
        SignatureProtection::new(key.clone(), key.default_algorithm(), vec![cert])
            .expect("signature protection"),
    );
    strategy
        .protect(header, body, Vec::new())
        .expect("protection")
}

/// Client request signed by `key` under a self-signed `CN=client` certificate.
pub fn protected_request(key: &SigningCredential, body: PkiBody) -> PkiMessage {
    protect_with_signature(key, self_signed(key, "client"), request_header(), body)
}

/// Client request protected with PasswordBasedMac over `secret`.
pub fn mac_protected_request(secret: &[u8], body: PkiBody) -> PkiMessage {
    let strategy = ProtectionStrategy::PasswordMac(
        PasswordMacProtection::new(secret, TEST_ITERATIONS).expect("mac parameters"),
    );
    strategy
        .protect(request_header(), body, Vec::new())
        .expect("protection")
}
