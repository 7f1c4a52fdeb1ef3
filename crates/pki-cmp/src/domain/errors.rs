//! # CMP Errors
//!
//! One classified error type flows through validators, the message builder
//! and the handlers. A classification is the pair
//! `(PkiFailureInfo bits, FailureReason)`: the bits are what goes on the wire,
//! the reason is the stable, implementation-specific code operators see.

use der::asn1::BitString;
use serde::Serialize;
use std::fmt;
use std::ops::BitOr;
use thiserror::Error;

// =============================================================================
// PKIFailureInfo (RFC 4210 Section 5.2.3)
// =============================================================================

/// RFC 4210 `PKIFailureInfo` bitmask.
///
/// Bit positions follow the ASN.1 named-bit numbering, so bit 0 (`badAlg`)
/// is the most significant bit of the first encoded byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PkiFailureInfo(u32);

const FAILURE_NAMES: [&str; 27] = [
    "badAlg",
    "badMessageCheck",
    "badRequest",
    "badTime",
    "badCertId",
    "badDataFormat",
    "wrongAuthority",
    "incorrectData",
    "missingTimeStamp",
    "badPOP",
    "certRevoked",
    "certConfirmed",
    "wrongIntegrity",
    "badRecipientNonce",
    "timeNotAvailable",
    "unacceptedPolicy",
    "unacceptedExtension",
    "addInfoNotAvailable",
    "badSenderNonce",
    "badCertTemplate",
    "signerNotTrusted",
    "transactionIdInUse",
    "unsupportedVersion",
    "notAuthorized",
    "systemUnavail",
    "systemFailure",
    "duplicateCertReq",
];

impl PkiFailureInfo {
    pub const BAD_ALG: Self = Self::bit(0);
    pub const BAD_MESSAGE_CHECK: Self = Self::bit(1);
    pub const BAD_REQUEST: Self = Self::bit(2);
    pub const BAD_TIME: Self = Self::bit(3);
    pub const BAD_CERT_ID: Self = Self::bit(4);
    pub const BAD_DATA_FORMAT: Self = Self::bit(5);
    pub const WRONG_AUTHORITY: Self = Self::bit(6);
    pub const INCORRECT_DATA: Self = Self::bit(7);
    pub const MISSING_TIME_STAMP: Self = Self::bit(8);
    pub const BAD_POP: Self = Self::bit(9);
    pub const CERT_REVOKED: Self = Self::bit(10);
    pub const CERT_CONFIRMED: Self = Self::bit(11);
    pub const WRONG_INTEGRITY: Self = Self::bit(12);
    pub const BAD_RECIPIENT_NONCE: Self = Self::bit(13);
    pub const TIME_NOT_AVAILABLE: Self = Self::bit(14);
    pub const UNACCEPTED_POLICY: Self = Self::bit(15);
    pub const UNACCEPTED_EXTENSION: Self = Self::bit(16);
    pub const ADD_INFO_NOT_AVAILABLE: Self = Self::bit(17);
    pub const BAD_SENDER_NONCE: Self = Self::bit(18);
    pub const BAD_CERT_TEMPLATE: Self = Self::bit(19);
    pub const SIGNER_NOT_TRUSTED: Self = Self::bit(20);
    pub const TRANSACTION_ID_IN_USE: Self = Self::bit(21);
    pub const UNSUPPORTED_VERSION: Self = Self::bit(22);
    pub const NOT_AUTHORIZED: Self = Self::bit(23);
    pub const SYSTEM_UNAVAIL: Self = Self::bit(24);
    pub const SYSTEM_FAILURE: Self = Self::bit(25);
    pub const DUPLICATE_CERT_REQ: Self = Self::bit(26);

    const fn bit(position: u32) -> Self {
        Self(1 << position)
    }

    /// No failure bits set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw mask, bit `n` = named bit `n`.
    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Names of the set bits, lowest position first.
    pub fn names(self) -> Vec<&'static str> {
        FAILURE_NAMES
            .iter()
            .enumerate()
            .filter(|(position, _)| self.0 & (1 << position) != 0)
            .map(|(_, name)| *name)
            .collect()
    }

    /// Encode as a DER named-bit BIT STRING (trailing zero bits removed).
    pub fn to_bit_string(self) -> der::Result<BitString> {
        if self.0 == 0 {
            return BitString::new(0, Vec::new());
        }

        let highest = 31 - self.0.leading_zeros();
        let mut bytes = vec![0u8; (highest / 8 + 1) as usize];
        for position in 0..=highest {
            if self.0 & (1 << position) != 0 {
                bytes[(position / 8) as usize] |= 0x80 >> (position % 8);
            }
        }

        BitString::new((7 - highest % 8) as u8, bytes)
    }

    /// Decode from a named-bit BIT STRING. Bits beyond position 31 are ignored.
    pub fn from_bit_string(bits: &BitString) -> Self {
        let mut mask = 0u32;
        for (index, byte) in bits.raw_bytes().iter().enumerate().take(4) {
            for offset in 0..8 {
                if byte & (0x80 >> offset) != 0 {
                    mask |= 1 << (index * 8 + offset);
                }
            }
        }
        Self(mask)
    }
}

impl BitOr for PkiFailureInfo {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for PkiFailureInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        f.write_str(&self.names().join("|"))
    }
}

// =============================================================================
// FailureReason (internal codes)
// =============================================================================

/// Implementation-specific failure reason.
///
/// Codes are stable: they are emitted as `errorCode` in error bodies and must
/// not be renumbered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FailureReason {
    MalformedMessage,
    UnsupportedBodyType,
    NotImplemented,
    UnknownProfile,
    MissingProtection,
    MissingProtectionAlgorithm,
    UnsupportedProtectionAlgorithm,
    ProtectionVerificationFailed,
    MissingExtraCerts,
    UnusableSignerCertificate,
    ProtectionValidationFailed,
    MissingSharedSecret,
    InvalidMacParameters,
    MissingCertRequest,
    MissingPublicKey,
    MissingSubject,
    UnsupportedPublicKey,
    MissingProofOfPossession,
    UnsupportedPopType,
    PopInnerInputNotSupported,
    UnsupportedPopAlgorithm,
    PopVerificationFailed,
    EmptyRevocationRequest,
    IssuanceFailed,
    ConfirmationFailed,
    RevocationFailed,
    NoRevocationResponse,
    ContractViolation,
    IncompleteMessage,
    ProtectionComputationFailed,
    EncodingFailed,
}

impl FailureReason {
    /// Stable numeric code.
    pub const fn code(self) -> i64 {
        match self {
            Self::MalformedMessage => 1001,
            Self::UnsupportedBodyType => 1002,
            Self::NotImplemented => 1003,
            Self::UnknownProfile => 1004,
            Self::MissingProtection => 1101,
            Self::MissingProtectionAlgorithm => 1102,
            Self::UnsupportedProtectionAlgorithm => 1103,
            Self::ProtectionVerificationFailed => 1104,
            Self::MissingExtraCerts => 1105,
            Self::UnusableSignerCertificate => 1106,
            Self::ProtectionValidationFailed => 1107,
            Self::MissingSharedSecret => 1108,
            Self::InvalidMacParameters => 1109,
            Self::MissingCertRequest => 1201,
            Self::MissingPublicKey => 1202,
            Self::MissingSubject => 1203,
            Self::UnsupportedPublicKey => 1204,
            Self::MissingProofOfPossession => 1205,
            Self::UnsupportedPopType => 1206,
            Self::PopInnerInputNotSupported => 1207,
            Self::UnsupportedPopAlgorithm => 1208,
            Self::PopVerificationFailed => 1209,
            Self::EmptyRevocationRequest => 1301,
            Self::IssuanceFailed => 1401,
            Self::ConfirmationFailed => 1402,
            Self::RevocationFailed => 1403,
            Self::NoRevocationResponse => 1404,
            Self::ContractViolation => 1901,
            Self::IncompleteMessage => 1902,
            Self::ProtectionComputationFailed => 1903,
            Self::EncodingFailed => 1904,
        }
    }

    /// Human-readable description.
    pub const fn description(self) -> &'static str {
        match self {
            Self::MalformedMessage => "message is not a valid DER-encoded PKIMessage",
            Self::UnsupportedBodyType => "unsupported body type",
            Self::NotImplemented => "body type is recognised but not implemented",
            Self::UnknownProfile => "no configuration exists for the addressed profile",
            Self::MissingProtection => "message is not protected",
            Self::MissingProtectionAlgorithm => "header carries no protection algorithm",
            Self::UnsupportedProtectionAlgorithm => "protection algorithm not supported",
            Self::ProtectionVerificationFailed => "protection did not verify",
            Self::MissingExtraCerts => "signature protection requires extraCerts",
            Self::UnusableSignerCertificate => "first extraCerts certificate carries no usable key",
            Self::ProtectionValidationFailed => "protection could not be validated",
            Self::MissingSharedSecret => "no shared secret configured for MAC protection",
            Self::InvalidMacParameters => "MAC protection parameters invalid or unsupported",
            Self::MissingCertRequest => "body carries no certificate request",
            Self::MissingPublicKey => "certificate template carries no public key",
            Self::MissingSubject => "certificate template carries no subject",
            Self::UnsupportedPublicKey => "public key algorithm or encoding not supported",
            Self::MissingProofOfPossession => "proof-of-possession missing",
            Self::UnsupportedPopType => "only signature-based proof-of-possession is supported",
            Self::PopInnerInputNotSupported => "proof-of-possession with poposkInput is not supported",
            Self::UnsupportedPopAlgorithm => "proof-of-possession signature algorithm not supported",
            Self::PopVerificationFailed => "proof-of-possession signature did not verify",
            Self::EmptyRevocationRequest => "revocation request carries no entries",
            Self::IssuanceFailed => "certificate issuance failed",
            Self::ConfirmationFailed => "certificate confirmation failed",
            Self::RevocationFailed => "certificate revocation failed",
            Self::NoRevocationResponse => "revocation backend returned no response",
            Self::ContractViolation => "validator invoked for a body type it does not handle",
            Self::IncompleteMessage => "header or body not set before build",
            Self::ProtectionComputationFailed => "protection could not be computed",
            Self::EncodingFailed => "DER encoding failed",
        }
    }

    /// Symbolic name, as used in status strings.
    pub fn name(self) -> String {
        format!("{self:?}")
    }

    /// Engine faults that must not be turned into protocol error messages.
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::ContractViolation
                | Self::IncompleteMessage
                | Self::ProtectionComputationFailed
                | Self::EncodingFailed
        )
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}

// =============================================================================
// CmpError
// =============================================================================

type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Classified CMP error.
#[derive(Debug, Error)]
#[error("{reason} [{failure_info}]{}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
pub struct CmpError {
    failure_info: PkiFailureInfo,
    reason: FailureReason,
    detail: Option<String>,
    #[source]
    cause: Option<Cause>,
}

impl CmpError {
    pub fn new(failure_info: PkiFailureInfo, reason: FailureReason) -> Self {
        Self {
            failure_info,
            reason,
            detail: None,
            cause: None,
        }
    }

    pub fn bad_pop(reason: FailureReason) -> Self {
        Self::new(PkiFailureInfo::BAD_POP, reason)
    }

    pub fn bad_alg(reason: FailureReason) -> Self {
        Self::new(PkiFailureInfo::BAD_ALG, reason)
    }

    pub fn bad_data_format(reason: FailureReason) -> Self {
        Self::new(PkiFailureInfo::BAD_DATA_FORMAT, reason)
    }

    pub fn not_authorized(reason: FailureReason) -> Self {
        Self::new(PkiFailureInfo::NOT_AUTHORIZED, reason)
    }

    pub fn system_failure(reason: FailureReason) -> Self {
        Self::new(PkiFailureInfo::SYSTEM_FAILURE, reason)
    }

    /// Attach the underlying error for diagnostics.
    pub fn with_cause(mut self, cause: impl Into<Cause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Attach free-form context (body type name, profile name, ...).
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn failure_info(&self) -> PkiFailureInfo {
        self.failure_info
    }

    pub fn reason(&self) -> FailureReason {
        self.reason
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn is_fatal(&self) -> bool {
        self.reason.is_fatal()
    }
}

impl From<der::Error> for CmpError {
    fn from(error: der::Error) -> Self {
        Self::system_failure(FailureReason::EncodingFailed).with_cause(error)
    }
}

/// Engine faults. These are never representable as a protocol error message.
#[derive(Debug, Error)]
pub enum FatalError {
    /// Final DER serialization failed
    #[error("DER encoding failed: {0}")]
    Encoding(#[from] der::Error),

    /// A classified error that marks an engine defect
    #[error("Engine fault: {0}")]
    Engine(CmpError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_pop_encodes_as_named_bit_nine() {
        let bits = PkiFailureInfo::BAD_POP.to_bit_string().unwrap();

        // bit 9 = second byte, second-highest bit; 6 trailing bits unused
        assert_eq!(bits.raw_bytes(), &[0x00, 0x40]);
        assert_eq!(bits.unused_bits(), 6);
    }

    #[test]
    fn test_bad_alg_encodes_in_single_byte() {
        let bits = PkiFailureInfo::BAD_ALG.to_bit_string().unwrap();

        assert_eq!(bits.raw_bytes(), &[0x80]);
        assert_eq!(bits.unused_bits(), 7);
    }

    #[test]
    fn test_failure_info_survives_bit_string() {
        let info = PkiFailureInfo::SYSTEM_FAILURE | PkiFailureInfo::WRONG_INTEGRITY;
        let bits = info.to_bit_string().unwrap();

        assert_eq!(PkiFailureInfo::from_bit_string(&bits), info);
        assert_eq!(info.names(), vec!["wrongIntegrity", "systemFailure"]);
    }

    #[test]
    fn test_empty_failure_info() {
        assert!(PkiFailureInfo::empty().is_empty());
        assert_eq!(PkiFailureInfo::empty().to_string(), "none");
    }

    #[test]
    fn test_reason_codes_are_unique() {
        let reasons = [
            FailureReason::MalformedMessage,
            FailureReason::UnsupportedBodyType,
            FailureReason::NotImplemented,
            FailureReason::UnknownProfile,
            FailureReason::MissingProtection,
            FailureReason::MissingProtectionAlgorithm,
            FailureReason::UnsupportedProtectionAlgorithm,
            FailureReason::ProtectionVerificationFailed,
            FailureReason::MissingExtraCerts,
            FailureReason::UnusableSignerCertificate,
            FailureReason::ProtectionValidationFailed,
            FailureReason::MissingSharedSecret,
            FailureReason::InvalidMacParameters,
            FailureReason::MissingCertRequest,
            FailureReason::MissingPublicKey,
            FailureReason::MissingSubject,
            FailureReason::UnsupportedPublicKey,
            FailureReason::MissingProofOfPossession,
            FailureReason::UnsupportedPopType,
            FailureReason::PopInnerInputNotSupported,
            FailureReason::UnsupportedPopAlgorithm,
            FailureReason::PopVerificationFailed,
            FailureReason::EmptyRevocationRequest,
            FailureReason::IssuanceFailed,
            FailureReason::ConfirmationFailed,
            FailureReason::RevocationFailed,
            FailureReason::NoRevocationResponse,
            FailureReason::ContractViolation,
            FailureReason::IncompleteMessage,
            FailureReason::ProtectionComputationFailed,
            FailureReason::EncodingFailed,
        ];
        let codes: std::collections::HashSet<_> = reasons.iter().map(|r| r.code()).collect();

        assert_eq!(codes.len(), reasons.len());
    }

    #[test]
    fn test_error_display_includes_detail() {
        let error = CmpError::system_failure(FailureReason::UnsupportedBodyType).with_detail("genm");

        let text = error.to_string();
        assert!(text.contains("unsupported body type"));
        assert!(text.contains("systemFailure"));
        assert!(text.ends_with(": genm"));
    }

    #[test]
    fn test_fatal_reasons() {
        assert!(CmpError::system_failure(FailureReason::IncompleteMessage).is_fatal());
        assert!(!CmpError::bad_pop(FailureReason::PopVerificationFailed).is_fatal());
    }
}
