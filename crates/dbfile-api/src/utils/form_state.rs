//! Signed form state carried between round trips.
//!
//! Payload: JSON `{ "kind": ..., "slots": [...] }`.
//! Token = base64url(payload) "." base64url(HMAC-SHA256(secret, payload)).
//!
//! The browser holds the token; the server keeps nothing between requests. A token
//! whose signature does not match, or whose slots break the store's invariants, is
//! rejected as invalid form state.

use base64::Engine;
use dbfile_core::models::{AttachmentKind, SlotStore};
use dbfile_core::AppError;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

const SEPARATOR: char = '.';

#[derive(Debug, Serialize, Deserialize)]
struct FormState {
    kind: AttachmentKind,
    slots: SlotStore,
}

/// Seals and opens form-state tokens with one process-wide secret.
#[derive(Clone)]
pub struct FormStateSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for FormStateSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormStateSigner").finish_non_exhaustive()
    }
}

impl FormStateSigner {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            secret: secret.to_vec(),
        }
    }

    fn mac(&self) -> Result<Hmac<Sha256>, AppError> {
        Hmac::<Sha256>::new_from_slice(&self.secret)
            .map_err(|e| AppError::Internal(format!("Form state key rejected: {}", e)))
    }

    /// Serialize and sign the slots of one session.
    pub fn seal(&self, kind: AttachmentKind, slots: &SlotStore) -> Result<String, AppError> {
        let payload = serde_json::to_vec(&FormState {
            kind,
            slots: slots.clone(),
        })?;

        let mut mac = self.mac()?;
        mac.update(&payload);
        let tag = mac.finalize().into_bytes();

        Ok(format!(
            "{}{}{}",
            base64_url_encode(&payload),
            SEPARATOR,
            base64_url_encode(&tag)
        ))
    }

    /// Verify a token and restore the slots it carries.
    ///
    /// The token must have been sealed for `kind`. Capacity is checked by the control
    /// the slots are handed to.
    pub fn open(&self, kind: AttachmentKind, token: &str) -> Result<SlotStore, AppError> {
        let invalid = || AppError::InvalidFormState("Form state token is invalid".to_string());

        let (payload_part, tag_part) = token.trim().split_once(SEPARATOR).ok_or_else(invalid)?;
        let payload = base64_url_decode(payload_part).map_err(|_| invalid())?;
        let tag = base64_url_decode(tag_part).map_err(|_| invalid())?;

        let mut mac = self.mac()?;
        mac.update(&payload);
        mac.verify_slice(&tag).map_err(|_| invalid())?;

        let state: FormState = serde_json::from_slice(&payload).map_err(|e| {
            AppError::InvalidFormState(format!("Form state could not be restored: {}", e))
        })?;
        if state.kind != kind {
            return Err(AppError::InvalidFormState(format!(
                "Form state belongs to a {} field, not a {} field",
                state.kind, kind
            )));
        }

        Ok(state.slots)
    }
}

fn base64_url_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
}

fn base64_url_decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbfile_core::models::AttachmentId;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn sample() -> SlotStore {
        let mut slots = SlotStore::new(3);
        slots.add(AttachmentId(4), "report.pdf");
        slots.add(AttachmentId(9), "budget.xlsx");
        slots.remove_by_id(AttachmentId(4));
        slots
    }

    #[test]
    fn test_open_restores_sealed_slots() {
        let signer = FormStateSigner::new(SECRET);
        let token = signer.seal(AttachmentKind::Document, &sample()).unwrap();
        let restored = signer.open(AttachmentKind::Document, &token).unwrap();
        assert_eq!(restored, sample());
        // The empty first slot survives the round trip.
        assert_eq!(restored.find_free_slot(), Some(0));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let signer = FormStateSigner::new(SECRET);
        let token = signer.seal(AttachmentKind::Document, &sample()).unwrap();
        let (_, tag) = token.split_once('.').unwrap();

        let mut forged = SlotStore::new(3);
        forged.add(AttachmentId(1), "someone-elses.pdf");
        let forged_payload = serde_json::to_vec(&FormState {
            kind: AttachmentKind::Document,
            slots: forged,
        })
        .unwrap();
        let forged_token = format!("{}.{}", base64_url_encode(&forged_payload), tag);

        assert!(matches!(
            signer.open(AttachmentKind::Document, &forged_token),
            Err(AppError::InvalidFormState(_))
        ));
    }

    #[test]
    fn test_other_secret_rejected() {
        let token = FormStateSigner::new(SECRET)
            .seal(AttachmentKind::Image, &sample())
            .unwrap();
        let other = FormStateSigner::new(b"another-secret-of-sufficient-length!");
        assert!(other.open(AttachmentKind::Image, &token).is_err());
    }

    #[test]
    fn test_kind_is_bound_into_token() {
        let signer = FormStateSigner::new(SECRET);
        let token = signer.seal(AttachmentKind::Image, &sample()).unwrap();
        assert!(matches!(
            signer.open(AttachmentKind::Document, &token),
            Err(AppError::InvalidFormState(_))
        ));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let signer = FormStateSigner::new(SECRET);
        for token in ["", "no-separator", "!!!.???", "e30.e30"] {
            assert!(
                matches!(
                    signer.open(AttachmentKind::Document, token),
                    Err(AppError::InvalidFormState(_))
                ),
                "token {token:?} should be rejected"
            );
        }
    }
}
