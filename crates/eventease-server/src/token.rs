use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

/// Minimal HS256 token utilities for check-in capabilities.
///
/// Notes:
/// - Uses base64url encoding WITHOUT padding.
/// - Performs signature verification using `Hmac::verify_slice`.
/// - No replay cache: a valid, unexpired token verifies repeatedly here.
///   Single use is enforced by the attendance ledger, not by the signer.

/// Fixed validity window for issued tokens. No sliding renewal.
pub const CHECK_IN_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

const CLAIMS_VERSION: u8 = 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("unsupported token header")]
    UnsupportedHeader,

    #[error("unsupported claims version")]
    UnsupportedVersion,

    #[error("invalid signing key")]
    InvalidKey,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// Claims bound into a check-in token.
///
/// The shape is fixed and versioned; decoding rejects unknown fields rather
/// than silently accepting extra payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckInClaims {
    pub v: u8,
    pub registration_id: String,
    pub event_id: String,
    pub user_id: String,

    /// Issued-at, Unix timestamp (seconds).
    pub iat: i64,

    /// Expiry, Unix timestamp (seconds). First second at which the token is
    /// no longer accepted.
    pub exp: i64,
}

/// HS256 signer/verifier around an injected process-wide secret.
///
/// The secret is passed in at construction; there is no ambient/global
/// lookup.
pub struct TokenSigner {
    secret: Vec<u8>,
}

impl TokenSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Issue a signed check-in token bound to one registration.
    ///
    /// Pure function of the inputs and the secret; no state is recorded.
    pub fn issue(
        &self,
        registration_id: &str,
        event_id: &str,
        user_id: &str,
        now: i64,
    ) -> Result<(String, CheckInClaims), TokenError> {
        let claims = CheckInClaims {
            v: CLAIMS_VERSION,
            registration_id: registration_id.to_owned(),
            event_id: event_id.to_owned(),
            user_id: user_id.to_owned(),
            iat: now,
            exp: now + CHECK_IN_TOKEN_TTL_SECS,
        };

        let token = self.encode_hs256(&claims)?;
        Ok((token, claims))
    }

    /// Verify signature, structure and expiry, returning the claims.
    pub fn verify(&self, token: &str, now: i64) -> Result<CheckInClaims, TokenError> {
        let claims: CheckInClaims = self.decode_hs256(token)?;

        if claims.v != CLAIMS_VERSION {
            return Err(TokenError::UnsupportedVersion);
        }
        if now >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn encode_hs256<T: Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        let header = TokenHeader {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        };

        let header_json = serde_json::to_vec(&header).map_err(|_| TokenError::Malformed)?;
        let claims_json = serde_json::to_vec(claims).map_err(|_| TokenError::Malformed)?;

        let header_b64 = b64url_encode(&header_json);
        let claims_b64 = b64url_encode(&claims_json);
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret)
            .map_err(|_| TokenError::InvalidKey)?;
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let sig_b64 = b64url_encode(&signature);

        Ok(format!("{signing_input}.{sig_b64}"))
    }

    fn decode_hs256<T: DeserializeOwned>(&self, token: &str) -> Result<T, TokenError> {
        let token = token.replace(char::is_whitespace, "");
        let mut parts = token.split('.');
        let Some(header_b64) = parts.next() else {
            return Err(TokenError::Malformed);
        };
        let Some(payload_b64) = parts.next() else {
            return Err(TokenError::Malformed);
        };
        let Some(sig_b64) = parts.next() else {
            return Err(TokenError::Malformed);
        };
        if parts.next().is_some() {
            return Err(TokenError::Malformed);
        }

        // Parse header to ensure alg/typ are what we expect.
        let header_raw = b64url_decode(header_b64)?;
        let header: TokenHeader =
            serde_json::from_slice(&header_raw).map_err(|_| TokenError::Malformed)?;
        if header.alg != "HS256" || header.typ.to_ascii_uppercase() != "JWT" {
            return Err(TokenError::UnsupportedHeader);
        }

        // Verify signature before touching the payload.
        let signing_input = format!("{header_b64}.{payload_b64}");
        let sig = b64url_decode(sig_b64)?;

        let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret)
            .map_err(|_| TokenError::InvalidKey)?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&sig)
            .map_err(|_| TokenError::InvalidSignature)?;

        let payload_raw = b64url_decode(payload_b64)?;
        let claims: T = serde_json::from_slice(&payload_raw).map_err(|_| TokenError::Malformed)?;

        Ok(claims)
    }
}

fn b64url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn b64url_decode(s: &str) -> Result<Vec<u8>, TokenError> {
    URL_SAFE_NO_PAD
        .decode(s.as_bytes())
        .map_err(|_| TokenError::Malformed)
}
