//! # Error Flows
//!
//! Protocol failures answered with unprotected `error` messages carrying the
//! RFC 4210 failure bit, a stable error code, and the correlation fields of
//! the failed request.

#[cfg(test)]
mod tests {
    use super::super::*;
    use pki_cmp::domain::asn1::header::is_null_name;
    use pki_cmp::domain::asn1::{PkiStatus, RevDetails};
    use pki_cmp::test_utils::{cert_req_msg, protected_request};
    use pki_cmp::{BodyType, FailureReason, PkiFailureInfo, SigningCredential};

    fn assert_error(response: &PkiMessage, info: PkiFailureInfo, reason: FailureReason) {
        assert_eq!(response.body_type(), BodyType::Error);
        assert!(response.protection.is_none());
        assert!(is_null_name(&response.header.sender));
        assert!(is_null_name(&response.header.recipient));

        let content = error_content(response);
        assert_eq!(content.pki_status_info.status, PkiStatus::Rejection);
        assert_eq!(content.pki_status_info.failure_info(), info);
        assert_eq!(content.error_code, Some(reason.code()));
    }

    #[test]
    fn test_malformed_der() {
        let harness = Harness::new();

        let response = harness
            .service
            .process_der("default", b"definitely not DER")
            .unwrap();

        let response = PkiMessage::from_der(&response).unwrap();
        assert_error(&response, PkiFailureInfo::BAD_DATA_FORMAT, FailureReason::MalformedMessage);
        assert!(response.header.trans_id.is_none());
    }

    #[test]
    fn test_unsupported_body_type() {
        let harness = Harness::new();
        let device = SigningCredential::generate_p256();
        let request = protected_request(&device, PkiBody::PkiConf(der::asn1::Null));

        let response = harness.exchange("default", &request);

        assert_error(&response, PkiFailureInfo::SYSTEM_FAILURE, FailureReason::UnsupportedBodyType);
        assert_eq!(response.header.trans_id, request.header.trans_id);
        assert_eq!(response.header.recip_nonce, request.header.sender_nonce);
    }

    #[test]
    fn test_krr_not_implemented() {
        let harness = Harness::new();
        let device = SigningCredential::generate_p256();
        let request = protected_request(&device, PkiBody::Krr(vec![cert_req_msg(&device, "device", 0)]));

        let response = harness.exchange("default", &request);

        assert_error(&response, PkiFailureInfo::SYSTEM_FAILURE, FailureReason::NotImplemented);
    }

    #[test]
    fn test_tampered_request_fails_integrity() {
        let harness = Harness::new();
        let device = SigningCredential::generate_p256();
        let mut request = protected_request(&device, PkiBody::Ir(vec![cert_req_msg(&device, "device", 0)]));
        request.header.free_text = Some(vec!["added after signing".to_string()]);

        let response = harness.exchange("default", &request);

        assert_error(
            &response,
            PkiFailureInfo::WRONG_INTEGRITY,
            FailureReason::ProtectionVerificationFailed,
        );
        assert_eq!(harness.ca.issued_count(), 0);
    }

    #[test]
    fn test_tampered_body_fails_integrity() {
        let harness = Harness::new();
        let device = SigningCredential::generate_p256();
        let mut request = protected_request(&device, PkiBody::Ir(vec![cert_req_msg(&device, "device", 0)]));
        // Swapped after signing; the new request carries a valid POP of its own
        request.body = PkiBody::Ir(vec![cert_req_msg(&device, "intruder", 0)]);

        let response = harness.exchange("default", &request);

        assert_error(
            &response,
            PkiFailureInfo::WRONG_INTEGRITY,
            FailureReason::ProtectionVerificationFailed,
        );
        assert_eq!(harness.ca.issued_count(), 0);
    }

    #[test]
    fn test_missing_extra_certs() {
        let harness = Harness::new();
        let device = SigningCredential::generate_p256();
        let mut request = protected_request(&device, PkiBody::Ir(vec![cert_req_msg(&device, "device", 0)]));
        request.extra_certs = None;

        let response = harness.exchange("default", &request);

        assert_error(
            &response,
            PkiFailureInfo::ADD_INFO_NOT_AVAILABLE,
            FailureReason::MissingExtraCerts,
        );
    }

    #[test]
    fn test_bad_pop() {
        let harness = Harness::new();
        let device = SigningCredential::generate_p256();
        let other = SigningCredential::generate_p256();
        let mut msg = cert_req_msg(&device, "device", 0);
        // POP made by a key other than the one in the template
        msg.popo = cert_req_msg(&other, "device", 0).popo;
        let request = protected_request(&device, PkiBody::Ir(vec![msg]));

        let response = harness.exchange("default", &request);

        assert_error(&response, PkiFailureInfo::BAD_POP, FailureReason::PopVerificationFailed);
        assert_eq!(harness.ca.issued_count(), 0);
    }

    #[test]
    fn test_wrong_mac_secret() {
        let harness = Harness::new();
        let device = SigningCredential::generate_p256();
        let request = mac_request(
            &pbmac1_strategy(b"not the shared secret"),
            PkiBody::Ir(vec![cert_req_msg(&device, "device", 0)]),
        );

        let response = harness.exchange("pbmac1", &request);

        assert_error(
            &response,
            PkiFailureInfo::WRONG_INTEGRITY,
            FailureReason::ProtectionVerificationFailed,
        );
    }

    #[test]
    fn test_empty_revocation_request() {
        let harness = Harness::new();
        let device = SigningCredential::generate_p256();
        let request = protected_request(&device, PkiBody::Rr(Vec::<RevDetails>::new()));

        let response = harness.exchange("default", &request);

        assert_error(
            &response,
            PkiFailureInfo::BAD_DATA_FORMAT,
            FailureReason::EmptyRevocationRequest,
        );
    }

    #[test]
    fn test_unknown_profile() {
        let harness = Harness::new();
        let device = SigningCredential::generate_p256();
        let request = protected_request(&device, PkiBody::Ir(vec![cert_req_msg(&device, "device", 0)]));

        let response = harness.exchange("nonexistent", &request);

        assert_error(&response, PkiFailureInfo::NOT_AUTHORIZED, FailureReason::UnknownProfile);
        assert_eq!(
            error_content(&response).error_details,
            Some(vec![
                FailureReason::UnknownProfile.description().to_string(),
                "nonexistent".to_string(),
            ])
        );
    }
}
