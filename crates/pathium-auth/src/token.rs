//! Token signing and verification.

use std::str::FromStr;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{AuthError, Result, VerifyError};

const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Parses an HMAC algorithm name such as `"HS384"`.
fn hmac_algorithm(name: &str) -> Result<Algorithm> {
    let alg =
        Algorithm::from_str(name).map_err(|_| AuthError::UnknownAlgorithm(name.to_string()))?;
    if HMAC_ALGORITHMS.contains(&alg) {
        Ok(alg)
    } else {
        Err(AuthError::UnsupportedAlgorithm(name.to_string()))
    }
}

/// Verifies a bearer token and returns its claims.
///
/// The middleware only depends on this trait, so any key source can be
/// plugged in.
pub trait TokenVerifier: Send + Sync {
    /// Returns the decoded claims of a valid token.
    ///
    /// # Errors
    ///
    /// [`VerifyError::Expired`] for an expired token,
    /// [`VerifyError::Invalid`] for anything else.
    fn verify(&self, token: &str) -> std::result::Result<Value, VerifyError>;
}

/// Verifies tokens signed with a shared HMAC secret.
#[derive(Clone)]
pub struct HmacVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl HmacVerifier {
    /// Creates a verifier accepting the named algorithms (e.g. `"HS256"`).
    ///
    /// # Errors
    ///
    /// Fails when `algorithms` is empty, names an unknown algorithm or a
    /// non-HMAC one.
    pub fn new(secret: &str, algorithms: &[&str]) -> Result<Self> {
        if algorithms.is_empty() {
            return Err(AuthError::NoAlgorithms);
        }
        let algorithms = algorithms
            .iter()
            .copied()
            .map(hmac_algorithm)
            .collect::<Result<Vec<_>>>()?;

        let mut validation = Validation::new(algorithms[0]);
        validation.algorithms = algorithms;
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        Ok(Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Creates a verifier accepting HS256 only.
    pub fn hs256(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.leeway = 0;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl std::fmt::Debug for HmacVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacVerifier")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier for HmacVerifier {
    fn verify(&self, token: &str) -> std::result::Result<Value, VerifyError> {
        Ok(decode::<Value>(token, &self.key, &self.validation)?.claims)
    }
}

fn sign(claims: &impl Serialize, secret: &str, algorithm: Algorithm) -> Result<String> {
    Ok(encode(
        &Header::new(algorithm),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Signs `claims` with HS256.
///
/// # Errors
///
/// Fails when the claims cannot be serialized.
pub fn create_token(claims: &impl Serialize, secret: &str) -> Result<String> {
    sign(claims, secret, Algorithm::HS256)
}

/// Signs `claims` with the named HMAC algorithm (`"HS256"`, `"HS384"` or
/// `"HS512"`).
///
/// # Errors
///
/// Fails when `algorithm` is unknown or not HMAC, or when the claims cannot
/// be serialized.
pub fn create_token_with(
    claims: &impl Serialize,
    secret: &str,
    algorithm: &str,
) -> Result<String> {
    sign(claims, secret, hmac_algorithm(algorithm)?)
}

/// Signs `claims` with HS256, adding `iat` and an `exp` `ttl` from now.
///
/// # Errors
///
/// Fails when the claims cannot be serialized.
pub fn create_expiring_token(
    mut claims: Map<String, Value>,
    secret: &str,
    ttl: Duration,
) -> Result<String> {
    let now = Utc::now();
    claims.insert("iat".to_string(), Value::from(now.timestamp()));
    claims.insert("exp".to_string(), Value::from((now + ttl).timestamp()));
    create_token(&claims, secret)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_create_and_verify() {
        let token = create_token(&json!({ "sub": "alice" }), "secret").unwrap();
        let claims = HmacVerifier::hs256("secret").verify(&token).unwrap();
        assert_eq!(claims["sub"], "alice");
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = create_token(&json!({ "sub": "alice" }), "secret").unwrap();
        let err = HmacVerifier::hs256("other").verify(&token).unwrap_err();
        assert!(matches!(err, VerifyError::Invalid(_)));
    }

    #[test]
    fn test_garbage_is_invalid() {
        let err = HmacVerifier::hs256("secret").verify("not.a.jwt").unwrap_err();
        assert!(matches!(err, VerifyError::Invalid(_)));
    }

    #[test]
    fn test_expired_token() {
        let token =
            create_expiring_token(Map::new(), "secret", Duration::seconds(-30)).unwrap();
        let err = HmacVerifier::hs256("secret").verify(&token).unwrap_err();
        assert_eq!(err, VerifyError::Expired);
    }

    #[test]
    fn test_unexpired_token() {
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!("bob"));
        let token = create_expiring_token(claims, "secret", Duration::hours(1)).unwrap();
        let claims = HmacVerifier::hs256("secret").verify(&token).unwrap();
        assert_eq!(claims["sub"], "bob");
        assert!(claims["exp"].as_i64().unwrap() > claims["iat"].as_i64().unwrap());
    }

    #[test]
    fn test_algorithm_not_in_list_is_invalid() {
        let token = encode(
            &Header::new(Algorithm::HS512),
            &json!({ "sub": "alice" }),
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        let verifier = HmacVerifier::new("secret", &["HS256"]).unwrap();
        assert!(verifier.verify(&token).is_err());

        let verifier = HmacVerifier::new("secret", &["HS256", "HS512"]).unwrap();
        assert!(verifier.verify(&token).is_ok());
    }

    #[test]
    fn test_create_token_with_named_algorithm() {
        let token = create_token_with(&json!({ "sub": "carol" }), "secret", "HS384").unwrap();
        assert_eq!(jsonwebtoken::decode_header(&token).unwrap().alg, Algorithm::HS384);

        let verifier = HmacVerifier::new("secret", &["HS384"]).unwrap();
        assert_eq!(verifier.verify(&token).unwrap()["sub"], "carol");
        assert!(HmacVerifier::hs256("secret").verify(&token).is_err());
    }

    #[test]
    fn test_create_token_with_rejects_non_hmac() {
        assert!(matches!(
            create_token_with(&json!({}), "secret", "RS256"),
            Err(AuthError::UnsupportedAlgorithm(_))
        ));
        assert!(matches!(
            create_token_with(&json!({}), "secret", "HS999"),
            Err(AuthError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn test_verifier_configuration_errors() {
        assert!(matches!(
            HmacVerifier::new("secret", &[]),
            Err(AuthError::NoAlgorithms)
        ));
        assert!(matches!(
            HmacVerifier::new("secret", &["XS999"]),
            Err(AuthError::UnknownAlgorithm(_))
        ));
        assert!(matches!(
            HmacVerifier::new("secret", &["RS256"]),
            Err(AuthError::UnsupportedAlgorithm(_))
        ));
    }
}
