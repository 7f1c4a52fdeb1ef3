//! # Object Identifiers
//!
//! Algorithm and attribute OIDs the engine recognises, plus a static
//! name table used for diagnostics.

use const_oid::ObjectIdentifier;

// Protection (RFC 4210 / RFC 4211 / RFC 9481)
pub const PASSWORD_BASED_MAC: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113533.7.66.13");
pub const PBMAC1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.5.14");
pub const PBKDF2: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.5.12");
pub const HMAC_WITH_SHA256: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.2.9");
pub const SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");

// Signatures
pub const ECDSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
pub const ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");
pub const SHA256_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");

// Keys
pub const EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
pub const SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
pub const SECP256K1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.10");
pub const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

// Attributes
pub const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

static OID_NAMES: &[(ObjectIdentifier, &str)] = &[
    (PASSWORD_BASED_MAC, "PasswordBasedMac"),
    (PBMAC1, "PBMAC1"),
    (PBKDF2, "PBKDF2"),
    (HMAC_WITH_SHA256, "hmacWithSHA256"),
    (SHA256, "SHA-256"),
    (ECDSA_WITH_SHA256, "SHA256withECDSA"),
    (ED25519, "Ed25519"),
    (SHA256_WITH_RSA, "SHA256withRSA"),
    (EC_PUBLIC_KEY, "EC"),
    (SECP256R1, "secp256r1"),
    (SECP256K1, "secp256k1"),
    (RSA_ENCRYPTION, "RSA"),
    (COMMON_NAME, "CN"),
];

/// Symbolic name of a known OID.
pub fn oid_name(oid: &ObjectIdentifier) -> Option<&'static str> {
    OID_NAMES
        .iter()
        .find(|(known, _)| known == oid)
        .map(|(_, name)| *name)
}

/// Symbolic name if known, dotted form otherwise.
pub fn describe(oid: &ObjectIdentifier) -> String {
    oid_name(oid)
        .map(str::to_owned)
        .unwrap_or_else(|| oid.to_string())
}
