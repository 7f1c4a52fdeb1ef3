//! # CMP Transaction Flows
//!
//! Successful transactions through the service:
//!
//! 1. **Initial enrolment**: ir → ip, certConf → pkiconf
//! 2. **Revocation**: rr → rp for a certificate issued in the same run
//! 3. **MAC profiles**: PasswordBasedMac and PBMAC1 in both directions

#[cfg(test)]
mod tests {
    use super::super::*;
    use pki_cmp::domain::asn1::{CertTemplate, PkiStatus, RevDetails};
    use pki_cmp::domain::validators::{
        MacProtectionValidator, MacScheme, SignatureProtectionValidator,
    };
    use pki_cmp::test_utils::{cert_req_msg, protect_with_signature, protected_request, self_signed};
    use pki_cmp::{BodyType, SigningCredential};

    // =============================================================================
    // SIGNATURE PROFILE
    // =============================================================================

    #[test]
    fn test_enrolment_with_confirmation() {
        let harness = Harness::new();
        let device = SigningCredential::generate_p256();
        let device_cert = self_signed(&device, "client");

        // ir -> ip
        let ir = protected_request(&device, PkiBody::Ir(vec![cert_req_msg(&device, "device", 7)]));
        let ip = harness.exchange("default", &ir);

        assert_eq!(ip.body_type(), BodyType::Ip);
        assert_eq!(ip.header.trans_id, ir.header.trans_id);
        assert_eq!(ip.header.recip_nonce, ir.header.sender_nonce);
        assert_eq!(ip.header.recipient, ir.header.sender);
        assert!(SignatureProtectionValidator::new().validate(&ip).is_ok());

        let rep = ip.body.cert_rep_message().unwrap();
        assert_eq!(rep.response[0].cert_req_id, 7);
        assert_eq!(rep.response[0].status.status, PkiStatus::Accepted);
        let issued = issued_certificate(&ip);
        assert_eq!(
            issued.tbs_certificate.issuer,
            harness.ca.certificate().tbs_certificate.subject
        );
        assert!(ip.extra_certs.as_ref().unwrap().contains(harness.ca.certificate()));

        // certConf -> pkiconf
        let conf = protect_with_signature(
            &device,
            device_cert,
            follow_up_header(&ip),
            cert_conf(&issued, 7),
        );
        let pkiconf = harness.exchange("default", &conf);

        assert_eq!(pkiconf.body_type(), BodyType::PkiConf);
        assert_eq!(pkiconf.header.trans_id, ir.header.trans_id);
        assert_eq!(pkiconf.header.recip_nonce, conf.header.sender_nonce);
        assert_eq!(harness.ca.confirmation_count(), 1);
    }

    #[test]
    fn test_cr_and_kur_response_types() {
        let harness = Harness::new();
        let device = SigningCredential::generate_ed25519();

        let cp = harness.exchange(
            "default",
            &protected_request(&device, PkiBody::Cr(vec![cert_req_msg(&device, "device", 0)])),
        );
        let kup = harness.exchange(
            "default",
            &protected_request(&device, PkiBody::Kur(vec![cert_req_msg(&device, "device", 0)])),
        );

        assert_eq!(cp.body_type(), BodyType::Cp);
        assert_eq!(kup.body_type(), BodyType::Kup);
        assert_eq!(harness.ca.issued_count(), 2);
    }

    #[test]
    fn test_revocation_of_issued_certificate() {
        let harness = Harness::new();
        let device = SigningCredential::generate_p256();
        let ip = harness.exchange(
            "default",
            &protected_request(&device, PkiBody::Ir(vec![cert_req_msg(&device, "device", 0)])),
        );
        let serial = issued_certificate(&ip).tbs_certificate.serial_number;

        let rr = protected_request(
            &device,
            PkiBody::Rr(vec![RevDetails {
                cert_details: CertTemplate {
                    serial_number: Some(serial.clone()),
                    issuer: Some(harness.ca.subject().clone()),
                    ..Default::default()
                },
                crl_entry_details: None,
            }]),
        );
        let rp = harness.exchange("default", &rr);

        assert_eq!(rp.body_type(), BodyType::Rp);
        assert_eq!(rp.header.trans_id, rr.header.trans_id);
        let PkiBody::Rp(content) = &rp.body else {
            panic!("expected rp");
        };
        assert_eq!(content.status.len(), 1);
        assert_eq!(content.status[0].status, PkiStatus::Accepted);
        assert!(harness.ca.is_revoked(&serial));
        // Signed by the CA itself
        assert!(SignatureProtectionValidator::new().validate(&rp).is_ok());
        assert_eq!(rp.first_extra_cert(), Some(harness.ca.certificate()));
    }

    // =============================================================================
    // MAC PROFILES
    // =============================================================================

    fn mac_enrolment(profile: &str, strategy: ProtectionStrategy, scheme: MacScheme) {
        let harness = Harness::new();
        let device = SigningCredential::generate_p256();
        let request = mac_request(&strategy, PkiBody::Ir(vec![cert_req_msg(&device, "device", 0)]));

        let ip = harness.exchange(profile, &request);

        assert_eq!(ip.body_type(), BodyType::Ip);
        assert_eq!(ip.header.trans_id, request.header.trans_id);
        assert_eq!(
            ip.header.protection_alg.as_ref().map(|alg| alg.oid),
            request.header.protection_alg.as_ref().map(|alg| alg.oid)
        );
        assert!(MacProtectionValidator::new(Some(SECRET)).validate(&ip, scheme).is_ok());
        assert!(MacProtectionValidator::new(Some(&b"other"[..]))
            .validate(&ip, scheme)
            .is_err());
    }

    #[test]
    fn test_pbm_enrolment() {
        mac_enrolment("pbm", pbm_strategy(SECRET), MacScheme::PasswordBasedMac);
    }

    #[test]
    fn test_pbmac1_enrolment() {
        mac_enrolment("pbmac1", pbmac1_strategy(SECRET), MacScheme::Pbmac1);
    }

    #[test]
    fn test_mac_profile_accepts_request_without_pop() {
        let harness = Harness::new();
        let device = SigningCredential::generate_p256();
        let mut msg = cert_req_msg(&device, "device", 0);
        msg.popo = None;

        let ip = harness.exchange("pbm", &mac_request(&pbm_strategy(SECRET), PkiBody::Ir(vec![msg])));

        assert_eq!(ip.body_type(), BodyType::Ip);
        assert!(ip.extra_certs.as_ref().unwrap().contains(harness.ca.certificate()));
    }

    #[test]
    fn test_batch_of_independent_transactions() {
        let harness = Harness::new();
        let device = SigningCredential::generate_p256();
        let requests: Vec<Vec<u8>> = (0..8)
            .map(|id| {
                protected_request(&device, PkiBody::Ir(vec![cert_req_msg(&device, "device", id)]))
                    .to_der()
                    .unwrap()
            })
            .collect();

        let responses = harness.service.process_batch("default", &requests);

        assert_eq!(responses.len(), 8);
        assert!(responses.iter().all(|response| response.is_ok()));
        assert_eq!(harness.ca.issued_count(), 8);
    }
}
