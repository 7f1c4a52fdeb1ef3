//! # Message Builder
//!
//! Assembles outgoing messages: merges the header against the profile,
//! collects `extraCerts`, and applies the profile's protection.

use der::asn1::Null;
use der::Encode;
use std::collections::HashSet;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::Certificate;

use super::asn1::header::{is_null_name, null_name};
use super::asn1::{
    BodyType, CertOrEncCert, CertRepMessage, CertResponse, CertifiedKeyPair, PkiBody, PkiHeader,
    PkiMessage, PkiStatusInfo, RevRepContent,
};
use super::context::ConfigurationContext;
use super::errors::{CmpError, FailureReason};

/// Builds one protected message for a profile.
#[derive(Debug)]
pub struct MessageBuilder<'a> {
    context: &'a ConfigurationContext,
    header: Option<PkiHeader>,
    body: Option<PkiBody>,
    issuer_chain: Vec<Certificate>,
}

impl<'a> MessageBuilder<'a> {
    pub fn new(context: &'a ConfigurationContext) -> Self {
        Self {
            context,
            header: None,
            body: None,
            issuer_chain: Vec::new(),
        }
    }

    /// Header of the message being answered (usually a response template).
    pub fn header(mut self, header: PkiHeader) -> Self {
        self.header = Some(header);
        self
    }

    pub fn body(mut self, body: PkiBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Issuer chain appended to `extraCerts` after the strategy's certificates.
    pub fn issuer_chain(mut self, chain: Vec<Certificate>) -> Self {
        self.issuer_chain = chain;
        self
    }

    pub fn build(self) -> Result<PkiMessage, CmpError> {
        let given = self
            .header
            .ok_or_else(|| CmpError::system_failure(FailureReason::IncompleteMessage).with_detail("header"))?;
        let body = self
            .body
            .ok_or_else(|| CmpError::system_failure(FailureReason::IncompleteMessage).with_detail("body"))?;

        let strategy = self.context.protection();
        let mut header = merge_header(self.context, &given);
        strategy.stamp_header(&mut header)?;

        let extra_certs = merge_extra_certs(strategy.additional_certificates(), &self.issuer_chain)?;
        let protection = strategy.compute_protection(&header, &body)?;

        Ok(PkiMessage {
            header,
            body,
            protection: Some(protection),
            extra_certs,
        })
    }
}

/// Response header from `given` and the profile.
///
/// Recipient is the profile recipient, else the given sender. Sender is the
/// strategy identity, else the given recipient, else the NULL identity. All
/// other fields are copied verbatim.
pub fn merge_header(context: &ConfigurationContext, given: &PkiHeader) -> PkiHeader {
    let recipient = context
        .recipient()
        .cloned()
        .or_else(|| present(&given.sender))
        .unwrap_or_else(null_name);
    let sender = context
        .protection()
        .sender_identity()
        .or_else(|| present(&given.recipient))
        .unwrap_or_else(null_name);

    PkiHeader {
        pvno: given.pvno,
        sender,
        recipient,
        message_time: given.message_time,
        protection_alg: given.protection_alg.clone(),
        sender_kid: given.sender_kid.clone(),
        recip_kid: given.recip_kid.clone(),
        trans_id: given.trans_id.clone(),
        sender_nonce: given.sender_nonce.clone(),
        recip_nonce: given.recip_nonce.clone(),
        free_text: given.free_text.clone(),
        general_info: given.general_info.clone(),
    }
}

fn present(name: &GeneralName) -> Option<GeneralName> {
    (!is_null_name(name)).then(|| name.clone())
}

/// Strategy certificates then issuer chain, first occurrence wins.
pub fn merge_extra_certs(
    strategy_certs: &[Certificate],
    issuer_chain: &[Certificate],
) -> Result<Option<Vec<Certificate>>, CmpError> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for cert in strategy_certs.iter().chain(issuer_chain) {
        if seen.insert(cert.to_der()?) {
            merged.push(cert.clone());
        }
    }

    Ok((!merged.is_empty()).then_some(merged))
}

// =============================================================================
// BODY HELPERS
// =============================================================================

/// ip/cp/kup body for an ir/cr/kur request.
///
/// One response entry: the first request's `certReqId`, status accepted, and
/// the issued certificate.
pub fn create_issuance_response_body(
    request: &PkiBody,
    certificate: Certificate,
    ca_pubs: Option<Vec<Certificate>>,
) -> Result<PkiBody, CmpError> {
    let request_type = request.body_type();
    let wrap: fn(CertRepMessage) -> PkiBody = match request_type.issuance_response() {
        Some(BodyType::Ip) => PkiBody::Ip,
        Some(BodyType::Cp) => PkiBody::Cp,
        Some(BodyType::Kup) => PkiBody::Kup,
        _ => {
            return Err(CmpError::system_failure(FailureReason::UnsupportedBodyType)
                .with_detail(format!("no issuance response for {request_type}")))
        }
    };

    let cert_req_id = request
        .cert_req_messages()
        .and_then(|msgs| msgs.first())
        .map(|msg| msg.cert_req.cert_req_id)
        .ok_or_else(|| CmpError::bad_data_format(FailureReason::MissingCertRequest))?;

    Ok(wrap(CertRepMessage {
        ca_pubs: ca_pubs.filter(|certs| !certs.is_empty()),
        response: vec![CertResponse {
            cert_req_id,
            status: PkiStatusInfo::accepted(),
            certified_key_pair: Some(CertifiedKeyPair {
                cert_or_enc_cert: CertOrEncCert::Certificate(certificate),
                private_key: None,
                publication_info: None,
            }),
            rsp_info: None,
        }],
    }))
}

/// `pkiconf` body.
pub fn create_confirmation_body() -> PkiBody {
    PkiBody::PkiConf(Null)
}

/// `rp` body with one status per revocation entry.
pub fn create_revocation_response_body(statuses: Vec<PkiStatusInfo>) -> PkiBody {
    PkiBody::Rp(RevRepContent {
        status: statuses,
        rev_certs: None,
        crls: None,
    })
}
