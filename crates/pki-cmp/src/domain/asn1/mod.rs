//! # Protocol Data Types
//!
//! DER structures of RFC 4210 (CMP) and RFC 4211 (CRMF), declared with the
//! `der` derive macros.

pub mod body;
pub mod crmf;
pub mod header;
pub mod message;
pub mod status;

pub use body::{BodyType, PkiBody};
pub use crmf::{
    CertReqMessages, CertReqMsg, CertRequest, CertTemplate, PopoSigningKey, ProofOfPossession,
};
pub use header::{null_name, PkiHeader, Pvno};
pub use message::{protected_bytes, MessageSummary, PkiMessage, ProtectedPart};
pub use status::{
    CertConfirmContent, CertId, CertOrEncCert, CertRepMessage, CertResponse, CertStatus,
    CertifiedKeyPair, CmpCertificate, ErrorMsgContent, PkiStatus, PkiStatusInfo, RevDetails,
    RevRepContent, RevReqContent,
};
