//! `PKIHeader` (RFC 4210 Section 5.1.1)

use der::asn1::{Any, GeneralizedTime, OctetString};
use der::{Encode, Enumerated, Sequence};
use rand::rngs::OsRng;
use rand::RngCore;
use spki::AlgorithmIdentifierOwned;
use std::time::SystemTime;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::name::RdnSequence;

/// Length of freshly generated sender nonces.
pub const NONCE_LEN: usize = 16;

/// ```text
/// PKIHeader ::= SEQUENCE {
///     pvno                INTEGER     { cmp1999(1), cmp2000(2) },
///     sender              GeneralName,
///     recipient           GeneralName,
///     messageTime     [0] GeneralizedTime         OPTIONAL,
///     protectionAlg   [1] AlgorithmIdentifier     OPTIONAL,
///     senderKID       [2] KeyIdentifier           OPTIONAL,
///     recipKID        [3] KeyIdentifier           OPTIONAL,
///     transactionID   [4] OCTET STRING            OPTIONAL,
///     senderNonce     [5] OCTET STRING            OPTIONAL,
///     recipNonce      [6] OCTET STRING            OPTIONAL,
///     freeText        [7] PKIFreeText             OPTIONAL,
///     generalInfo     [8] SEQUENCE SIZE (1..MAX) OF
///                         InfoTypeAndValue        OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct PkiHeader {
    pub pvno: Pvno,
    pub sender: GeneralName,
    pub recipient: GeneralName,
    #[asn1(
        context_specific = "0",
        tag_mode = "EXPLICIT",
        constructed = "false",
        optional = "true"
    )]
    pub message_time: Option<GeneralizedTime>,
    #[asn1(
        context_specific = "1",
        tag_mode = "EXPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub protection_alg: Option<AlgorithmIdentifierOwned>,
    #[asn1(
        context_specific = "2",
        tag_mode = "EXPLICIT",
        constructed = "false",
        optional = "true"
    )]
    pub sender_kid: Option<OctetString>,
    #[asn1(
        context_specific = "3",
        tag_mode = "EXPLICIT",
        constructed = "false",
        optional = "true"
    )]
    pub recip_kid: Option<OctetString>,
    #[asn1(
        context_specific = "4",
        tag_mode = "EXPLICIT",
        constructed = "false",
        optional = "true"
    )]
    pub trans_id: Option<OctetString>,
    #[asn1(
        context_specific = "5",
        tag_mode = "EXPLICIT",
        constructed = "false",
        optional = "true"
    )]
    pub sender_nonce: Option<OctetString>,
    #[asn1(
        context_specific = "6",
        tag_mode = "EXPLICIT",
        constructed = "false",
        optional = "true"
    )]
    pub recip_nonce: Option<OctetString>,
    #[asn1(
        context_specific = "7",
        tag_mode = "EXPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub free_text: Option<PkiFreeText>,
    #[asn1(
        context_specific = "8",
        tag_mode = "EXPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub general_info: Option<Vec<InfoTypeAndValue>>,
}

/// `pvno INTEGER { cmp1999(1), cmp2000(2) }`
#[derive(Clone, Debug, Copy, PartialEq, Eq, Enumerated, Ord, PartialOrd)]
#[asn1(type = "INTEGER")]
#[repr(u8)]
pub enum Pvno {
    Cmp1999 = 1,
    Cmp2000 = 2,
}

/// `PKIFreeText ::= SEQUENCE SIZE (1..MAX) OF UTF8String`
pub type PkiFreeText = Vec<String>;

/// ```text
/// InfoTypeAndValue ::= SEQUENCE {
///     infoType    OBJECT IDENTIFIER,
///     infoValue   ANY DEFINED BY infoType  OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct InfoTypeAndValue {
    pub info_type: const_oid::ObjectIdentifier,
    pub info_value: Option<Any>,
}

/// The NULL identity: a directoryName with zero RDNs (inner Name DER `30 00`).
pub fn null_name() -> GeneralName {
    GeneralName::DirectoryName(RdnSequence(Vec::new()))
}

/// True for a directoryName with zero RDNs.
pub fn is_null_name(name: &GeneralName) -> bool {
    matches!(name, GeneralName::DirectoryName(rdns) if rdns.0.is_empty())
}

/// Fresh random nonce of [`NONCE_LEN`] bytes.
pub fn fresh_nonce() -> der::Result<OctetString> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    OctetString::new(nonce.to_vec())
}

/// Current time as a `GeneralizedTime`.
pub fn now() -> der::Result<GeneralizedTime> {
    GeneralizedTime::from_system_time(SystemTime::now())
}

impl PkiHeader {
    /// A minimal cmp2000 header between two identities with no optional fields.
    pub fn new(sender: GeneralName, recipient: GeneralName) -> Self {
        Self {
            pvno: Pvno::Cmp2000,
            sender,
            recipient,
            message_time: None,
            protection_alg: None,
            sender_kid: None,
            recip_kid: None,
            trans_id: None,
            sender_nonce: None,
            recip_nonce: None,
            free_text: None,
            general_info: None,
        }
    }

    /// Header a responder answers `request` with.
    ///
    /// The transaction id is echoed, the request's sender nonce becomes the
    /// recipient nonce, and a fresh sender nonce and message time are set.
    /// Sender and recipient are kept as in the request; the message builder
    /// swaps them when it merges the header.
    pub fn response_template(request: &PkiHeader) -> der::Result<Self> {
        Ok(Self {
            pvno: request.pvno,
            sender: request.sender.clone(),
            recipient: request.recipient.clone(),
            message_time: Some(now()?),
            protection_alg: None,
            sender_kid: None,
            recip_kid: None,
            trans_id: request.trans_id.clone(),
            sender_nonce: Some(fresh_nonce()?),
            recip_nonce: request.sender_nonce.clone(),
            free_text: None,
            general_info: request.general_info.clone(),
        })
    }

    /// Transaction id as lowercase hex, empty when absent.
    pub fn transaction_id_hex(&self) -> String {
        self.trans_id
            .as_ref()
            .map(|id| hex::encode(id.as_bytes()))
            .unwrap_or_default()
    }
}

/// Short printable form of a `GeneralName` for logs.
pub fn describe_name(name: &GeneralName) -> String {
    match name {
        GeneralName::DirectoryName(rdns) if rdns.0.is_empty() => "NULL-DN".to_owned(),
        GeneralName::DirectoryName(rdns) => rdns.to_string(),
        other => other
            .to_der()
            .map(|der| format!("der:{}", hex::encode(der)))
            .unwrap_or_else(|_| "unencodable".to_owned()),
    }
}
