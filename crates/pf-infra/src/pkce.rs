//! Proof Key for Code Exchange (RFC 7636) for the OAuth code flow.

use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Value GoTrue expects in `code_challenge_method` for SHA-256 challenges.
pub const CHALLENGE_METHOD: &str = "s256";

const VERIFIER_LEN: usize = 56;
const UNRESERVED: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let verifier: String = (0..VERIFIER_LEN)
            .map(|_| UNRESERVED[rng.random_range(0..UNRESERVED.len())] as char)
            .collect();
        let challenge = challenge_for(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

/// `BASE64URL(SHA256(verifier))` without padding.
pub fn challenge_for(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_matches_rfc_7636_appendix_b() {
        assert_eq!(
            challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn generated_verifier_uses_unreserved_characters() {
        let pair = PkcePair::generate();
        assert_eq!(pair.verifier.len(), VERIFIER_LEN);
        assert!(pair.verifier.bytes().all(|b| UNRESERVED.contains(&b)));
        assert_eq!(pair.challenge, challenge_for(&pair.verifier));
        assert_ne!(pair.verifier, PkcePair::generate().verifier);
    }
}
