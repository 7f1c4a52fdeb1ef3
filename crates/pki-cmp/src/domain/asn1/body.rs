//! `PKIBody` (RFC 4210 Section 5.1.2)
//!
//! Every RFC body choice decodes. Bodies the engine never interprets are kept
//! as opaque DER so the dispatcher decides how to reject them.

use der::asn1::{Any, Null};
use der::Choice;
use serde::Serialize;
use std::fmt;

use super::crmf::CertReqMessages;
use super::status::{CertConfirmContent, CertRepMessage, ErrorMsgContent, RevRepContent, RevReqContent};

/// ```text
/// PKIBody ::= CHOICE {
///     ir       [0]  CertReqMessages,        --Initialization Req
///     ip       [1]  CertRepMessage,         --Initialization Resp
///     cr       [2]  CertReqMessages,        --Certification Req
///     cp       [3]  CertRepMessage,         --Certification Resp
///     p10cr    [4]  CertificationRequest,   --PKCS #10 Cert.  Req.
///     popdecc  [5]  POPODecKeyChallContent  --pop Challenge
///     popdecr  [6]  POPODecKeyRespContent,  --pop Response
///     kur      [7]  CertReqMessages,        --Key Update Request
///     kup      [8]  CertRepMessage,         --Key Update Response
///     krr      [9]  CertReqMessages,        --Key Recovery Req
///     krp      [10] KeyRecRepContent,       --Key Recovery Resp
///     rr       [11] RevReqContent,          --Revocation Request
///     rp       [12] RevRepContent,          --Revocation Response
///     ccr      [13] CertReqMessages,        --Cross-Cert.  Request
///     ccp      [14] CertRepMessage,         --Cross-Cert.  Resp
///     ckuann   [15] CAKeyUpdAnnContent,     --CA Key Update Ann.
///     cann     [16] CertAnnContent,         --Certificate Ann.
///     rann     [17] RevAnnContent,          --Revocation Ann.
///     crlann   [18] CRLAnnContent,          --CRL Announcement
///     pkiconf  [19] PKIConfirmContent,      --Confirmation
///     nested   [20] NestedMessageContent,   --Nested Message
///     genm     [21] GenMsgContent,          --General Message
///     genp     [22] GenRepContent,          --General Response
///     error    [23] ErrorMsgContent,        --Error Message
///     certConf [24] CertConfirmContent,     --Certificate confirm
///     pollReq  [25] PollReqContent,         --Polling request
///     pollRep  [26] PollRepContent          --Polling response
/// }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Choice)]
#[allow(clippy::large_enum_variant)]
pub enum PkiBody {
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", constructed = "true")]
    Ir(CertReqMessages),
    #[asn1(context_specific = "1", tag_mode = "EXPLICIT", constructed = "true")]
    Ip(CertRepMessage),
    #[asn1(context_specific = "2", tag_mode = "EXPLICIT", constructed = "true")]
    Cr(CertReqMessages),
    #[asn1(context_specific = "3", tag_mode = "EXPLICIT", constructed = "true")]
    Cp(CertRepMessage),
    #[asn1(context_specific = "4", tag_mode = "EXPLICIT", constructed = "true")]
    P10cr(Any),
    #[asn1(context_specific = "5", tag_mode = "EXPLICIT", constructed = "true")]
    Popdecc(Any),
    #[asn1(context_specific = "6", tag_mode = "EXPLICIT", constructed = "true")]
    Popdecr(Any),
    #[asn1(context_specific = "7", tag_mode = "EXPLICIT", constructed = "true")]
    Kur(CertReqMessages),
    #[asn1(context_specific = "8", tag_mode = "EXPLICIT", constructed = "true")]
    Kup(CertRepMessage),
    #[asn1(context_specific = "9", tag_mode = "EXPLICIT", constructed = "true")]
    Krr(CertReqMessages),
    #[asn1(context_specific = "10", tag_mode = "EXPLICIT", constructed = "true")]
    Krp(Any),
    #[asn1(context_specific = "11", tag_mode = "EXPLICIT", constructed = "true")]
    Rr(RevReqContent),
    #[asn1(context_specific = "12", tag_mode = "EXPLICIT", constructed = "true")]
    Rp(RevRepContent),
    #[asn1(context_specific = "13", tag_mode = "EXPLICIT", constructed = "true")]
    Ccr(CertReqMessages),
    #[asn1(context_specific = "14", tag_mode = "EXPLICIT", constructed = "true")]
    Ccp(CertRepMessage),
    #[asn1(context_specific = "15", tag_mode = "EXPLICIT", constructed = "true")]
    Ckuann(Any),
    #[asn1(context_specific = "16", tag_mode = "EXPLICIT", constructed = "true")]
    Cann(Any),
    #[asn1(context_specific = "17", tag_mode = "EXPLICIT", constructed = "true")]
    Rann(Any),
    #[asn1(context_specific = "18", tag_mode = "EXPLICIT", constructed = "true")]
    Crlann(Any),
    #[asn1(context_specific = "19", tag_mode = "EXPLICIT", constructed = "true")]
    PkiConf(Null),
    #[asn1(context_specific = "20", tag_mode = "EXPLICIT", constructed = "true")]
    Nested(Any),
    #[asn1(context_specific = "21", tag_mode = "EXPLICIT", constructed = "true")]
    Genm(Any),
    #[asn1(context_specific = "22", tag_mode = "EXPLICIT", constructed = "true")]
    Genp(Any),
    #[asn1(context_specific = "23", tag_mode = "EXPLICIT", constructed = "true")]
    Error(ErrorMsgContent),
    #[asn1(context_specific = "24", tag_mode = "EXPLICIT", constructed = "true")]
    CertConf(CertConfirmContent),
    #[asn1(context_specific = "25", tag_mode = "EXPLICIT", constructed = "true")]
    PollReq(Any),
    #[asn1(context_specific = "26", tag_mode = "EXPLICIT", constructed = "true")]
    PollRep(Any),
}

/// Body type, keyed by the RFC 4210 type code (the context tag number).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[repr(u8)]
pub enum BodyType {
    Ir = 0,
    Ip = 1,
    Cr = 2,
    Cp = 3,
    P10cr = 4,
    Popdecc = 5,
    Popdecr = 6,
    Kur = 7,
    Kup = 8,
    Krr = 9,
    Krp = 10,
    Rr = 11,
    Rp = 12,
    Ccr = 13,
    Ccp = 14,
    Ckuann = 15,
    Cann = 16,
    Rann = 17,
    Crlann = 18,
    PkiConf = 19,
    Nested = 20,
    Genm = 21,
    Genp = 22,
    Error = 23,
    CertConf = 24,
    PollReq = 25,
    PollRep = 26,
}

const ALL_BODY_TYPES: [BodyType; 27] = [
    BodyType::Ir,
    BodyType::Ip,
    BodyType::Cr,
    BodyType::Cp,
    BodyType::P10cr,
    BodyType::Popdecc,
    BodyType::Popdecr,
    BodyType::Kur,
    BodyType::Kup,
    BodyType::Krr,
    BodyType::Krp,
    BodyType::Rr,
    BodyType::Rp,
    BodyType::Ccr,
    BodyType::Ccp,
    BodyType::Ckuann,
    BodyType::Cann,
    BodyType::Rann,
    BodyType::Crlann,
    BodyType::PkiConf,
    BodyType::Nested,
    BodyType::Genm,
    BodyType::Genp,
    BodyType::Error,
    BodyType::CertConf,
    BodyType::PollReq,
    BodyType::PollRep,
];

impl BodyType {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        ALL_BODY_TYPES.get(code as usize).copied()
    }

    /// RFC 4210 ASN.1 identifier of the choice.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ir => "ir",
            Self::Ip => "ip",
            Self::Cr => "cr",
            Self::Cp => "cp",
            Self::P10cr => "p10cr",
            Self::Popdecc => "popdecc",
            Self::Popdecr => "popdecr",
            Self::Kur => "kur",
            Self::Kup => "kup",
            Self::Krr => "krr",
            Self::Krp => "krp",
            Self::Rr => "rr",
            Self::Rp => "rp",
            Self::Ccr => "ccr",
            Self::Ccp => "ccp",
            Self::Ckuann => "ckuann",
            Self::Cann => "cann",
            Self::Rann => "rann",
            Self::Crlann => "crlann",
            Self::PkiConf => "pkiconf",
            Self::Nested => "nested",
            Self::Genm => "genm",
            Self::Genp => "genp",
            Self::Error => "error",
            Self::CertConf => "certConf",
            Self::PollReq => "pollReq",
            Self::PollRep => "pollRep",
        }
    }

    /// Issuance response type for ir/cr/kur (request code + 1).
    pub fn issuance_response(self) -> Option<Self> {
        match self {
            Self::Ir | Self::Cr | Self::Kur => Self::from_code(self.code() + 1),
            _ => None,
        }
    }

    /// True for the request types that carry `CertReqMessages`.
    pub const fn carries_cert_requests(self) -> bool {
        matches!(self, Self::Ir | Self::Cr | Self::Kur | Self::Krr | Self::Ccr)
    }
}

impl fmt::Display for BodyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl PkiBody {
    pub fn body_type(&self) -> BodyType {
        match self {
            Self::Ir(_) => BodyType::Ir,
            Self::Ip(_) => BodyType::Ip,
            Self::Cr(_) => BodyType::Cr,
            Self::Cp(_) => BodyType::Cp,
            Self::P10cr(_) => BodyType::P10cr,
            Self::Popdecc(_) => BodyType::Popdecc,
            Self::Popdecr(_) => BodyType::Popdecr,
            Self::Kur(_) => BodyType::Kur,
            Self::Kup(_) => BodyType::Kup,
            Self::Krr(_) => BodyType::Krr,
            Self::Krp(_) => BodyType::Krp,
            Self::Rr(_) => BodyType::Rr,
            Self::Rp(_) => BodyType::Rp,
            Self::Ccr(_) => BodyType::Ccr,
            Self::Ccp(_) => BodyType::Ccp,
            Self::Ckuann(_) => BodyType::Ckuann,
            Self::Cann(_) => BodyType::Cann,
            Self::Rann(_) => BodyType::Rann,
            Self::Crlann(_) => BodyType::Crlann,
            Self::PkiConf(_) => BodyType::PkiConf,
            Self::Nested(_) => BodyType::Nested,
            Self::Genm(_) => BodyType::Genm,
            Self::Genp(_) => BodyType::Genp,
            Self::Error(_) => BodyType::Error,
            Self::CertConf(_) => BodyType::CertConf,
            Self::PollReq(_) => BodyType::PollReq,
            Self::PollRep(_) => BodyType::PollRep,
        }
    }

    /// Certificate request messages of ir/cr/kur/krr/ccr bodies.
    pub fn cert_req_messages(&self) -> Option<&CertReqMessages> {
        match self {
            Self::Ir(msgs) | Self::Cr(msgs) | Self::Kur(msgs) | Self::Krr(msgs) | Self::Ccr(msgs) => {
                Some(msgs)
            }
            _ => None,
        }
    }

    /// Certificate response content of ip/cp/kup/ccp bodies.
    pub fn cert_rep_message(&self) -> Option<&CertRepMessage> {
        match self {
            Self::Ip(rep) | Self::Cp(rep) | Self::Kup(rep) | Self::Ccp(rep) => Some(rep),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use der::{Decode, Encode};

    #[test]
    fn test_codes_match_positions() {
        for (position, body_type) in ALL_BODY_TYPES.iter().enumerate() {
            assert_eq!(body_type.code() as usize, position);
            assert_eq!(BodyType::from_code(position as u8), Some(*body_type));
        }
        assert_eq!(BodyType::from_code(27), None);
    }

    #[test]
    fn test_issuance_response_mapping() {
        assert_eq!(BodyType::Ir.issuance_response(), Some(BodyType::Ip));
        assert_eq!(BodyType::Cr.issuance_response(), Some(BodyType::Cp));
        assert_eq!(BodyType::Kur.issuance_response(), Some(BodyType::Kup));
        assert_eq!(BodyType::Krr.issuance_response(), None);
        assert_eq!(BodyType::Rr.issuance_response(), None);
    }

    #[test]
    fn test_pkiconf_encoding() {
        let der = PkiBody::PkiConf(Null).to_der().unwrap();

        // [19] EXPLICIT { NULL }
        assert_eq!(der, vec![0xb3, 0x02, 0x05, 0x00]);
        assert_eq!(PkiBody::from_der(&der).unwrap().body_type(), BodyType::PkiConf);
    }

    #[test]
    fn test_opaque_body_decodes() {
        // genm [21] { SEQUENCE {} }
        let der = [0xb5, 0x02, 0x30, 0x00];

        let body = PkiBody::from_der(&der).unwrap();

        assert_eq!(body.body_type(), BodyType::Genm);
        assert_eq!(body.to_der().unwrap(), der.to_vec());
    }
}
