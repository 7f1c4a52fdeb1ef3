//! `PKIMessage` and `ProtectedPart` (RFC 4210 Sections 5.1, 5.1.3)

use der::asn1::BitString;
use der::{Encode, Sequence};
use serde::Serialize;
use std::fmt;

use super::body::{BodyType, PkiBody};
use super::header::{describe_name, PkiHeader};
use super::status::CmpCertificate;

/// ```text
/// PKIMessage ::= SEQUENCE {
///     header           PKIHeader,
///     body             PKIBody,
///     protection   [0] PKIProtection OPTIONAL,
///     extraCerts   [1] SEQUENCE SIZE (1..MAX) OF CMPCertificate
///                      OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct PkiMessage {
    pub header: PkiHeader,
    pub body: PkiBody,
    #[asn1(
        context_specific = "0",
        tag_mode = "EXPLICIT",
        constructed = "false",
        optional = "true"
    )]
    pub protection: Option<PkiProtection>,
    #[asn1(
        context_specific = "1",
        tag_mode = "EXPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub extra_certs: Option<Vec<CmpCertificate>>,
}

/// `PKIProtection ::= BIT STRING`
pub type PkiProtection = BitString;

/// ```text
/// ProtectedPart ::= SEQUENCE {
///     header    PKIHeader,
///     body      PKIBody }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct ProtectedPart {
    pub header: PkiHeader,
    pub body: PkiBody,
}

/// DER of `ProtectedPart(header, body)`: the bytes protection is computed over.
pub fn protected_bytes(header: &PkiHeader, body: &PkiBody) -> der::Result<Vec<u8>> {
    ProtectedPart {
        header: header.clone(),
        body: body.clone(),
    }
    .to_der()
}

impl PkiMessage {
    pub fn body_type(&self) -> BodyType {
        self.body.body_type()
    }

    /// Bytes covered by this message's protection.
    pub fn protected_bytes(&self) -> der::Result<Vec<u8>> {
        protected_bytes(&self.header, &self.body)
    }

    /// First certificate of `extraCerts`, if any.
    pub fn first_extra_cert(&self) -> Option<&CmpCertificate> {
        self.extra_certs.as_ref().and_then(|certs| certs.first())
    }

    pub fn summary(&self) -> MessageSummary {
        MessageSummary {
            transaction_id: self.header.transaction_id_hex(),
            body_type: self.body_type(),
            sender: describe_name(&self.header.sender),
            recipient: describe_name(&self.header.recipient),
        }
    }
}

/// Correlation data logged for every processed message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageSummary {
    pub transaction_id: String,
    pub body_type: BodyType,
    pub sender: String,
    pub recipient: String,
}

impl fmt::Display for MessageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tid={} type={} sender={} recipient={}",
            self.transaction_id, self.body_type, self.sender, self.recipient
        )
    }
}
