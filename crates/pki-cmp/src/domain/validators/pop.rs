//! Proof-of-possession (RFC 4211 Section 4.1).
//!
//! Only `signature` POP without `poposkInput` is accepted: the requester signs
//! DER(`certReq`) with the private key matching `certTemplate.publicKey`.

use der::Encode;

use crate::domain::algorithms::{SignatureAlgorithm, VerifyingKey};
use crate::domain::asn1::{BodyType, CertReqMsg, PkiMessage, ProofOfPossession};
use crate::domain::errors::{CmpError, FailureReason};

/// Verifies signature POP of ir/cr/kur requests.
#[derive(Clone, Copy, Debug, Default)]
pub struct PopValidator;

impl PopValidator {
    pub fn new() -> Self {
        Self
    }

    /// True when policy allows skipping POP for this request: POP is not
    /// required and the request carries none or `raVerified`.
    pub fn is_exempt(message: &PkiMessage, pop_required: bool) -> bool {
        if pop_required {
            return false;
        }
        first_request(message).is_some_and(|msg| {
            matches!(msg.popo, None | Some(ProofOfPossession::RaVerified(_)))
        })
    }

    pub fn validate(&self, message: &PkiMessage) -> Result<(), CmpError> {
        // 1. Request types only
        let body_type = message.body_type();
        if !matches!(body_type, BodyType::Ir | BodyType::Cr | BodyType::Kur) {
            return Err(CmpError::system_failure(FailureReason::ContractViolation)
                .with_detail(format!("POP validation invoked for {body_type}")));
        }

        // 2. Request and template key
        let request = first_request(message)
            .ok_or_else(|| CmpError::bad_pop(FailureReason::MissingCertRequest))?;
        let spki = request
            .cert_req
            .cert_template
            .public_key
            .as_ref()
            .ok_or_else(|| CmpError::bad_pop(FailureReason::MissingPublicKey))?;
        let key = VerifyingKey::from_spki(spki)
            .map_err(|e| CmpError::bad_pop(FailureReason::UnsupportedPublicKey).with_cause(e))?;

        // 3. Signature POP without inner input
        let popo = match &request.popo {
            None => return Err(CmpError::bad_pop(FailureReason::MissingProofOfPossession)),
            Some(ProofOfPossession::Signature(popo)) => popo,
            Some(other) => {
                return Err(CmpError::bad_pop(FailureReason::UnsupportedPopType).with_detail(other.kind()))
            }
        };
        if popo.poposk_input.is_some() {
            return Err(CmpError::bad_pop(FailureReason::PopInnerInputNotSupported));
        }

        // 4. Verify over DER(certReq)
        let algorithm = SignatureAlgorithm::from_oid(&popo.alg_id.oid)
            .map_err(|e| CmpError::bad_pop(FailureReason::UnsupportedPopAlgorithm).with_cause(e))?;
        let data = request
            .cert_req
            .to_der()
            .map_err(|e| CmpError::bad_pop(FailureReason::PopVerificationFailed).with_cause(e))?;
        let signature = popo.signature.as_bytes().ok_or_else(|| {
            CmpError::bad_pop(FailureReason::PopVerificationFailed)
                .with_detail("signature bit string has unused bits")
        })?;

        // 5. Outcome
        match key.verify(algorithm, &data, signature) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CmpError::bad_pop(FailureReason::PopVerificationFailed)),
            Err(error) => {
                Err(CmpError::bad_pop(FailureReason::PopVerificationFailed).with_cause(error))
            }
        }
    }
}

fn first_request(message: &PkiMessage) -> Option<&CertReqMsg> {
    message.body.cert_req_messages().and_then(|msgs| msgs.first())
}
