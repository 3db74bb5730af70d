/// Shared JWT module for blog services
///
/// Tokens are signed with RS256 only. The reader API (the blog service) needs
/// just the public key to validate; the auth endpoints additionally need the
/// private key to issue access/refresh pairs.
///
/// ## Usage
///
/// ```rust,ignore
/// use crypto_core::jwt;
///
/// let (private_pem, public_pem) = jwt::load_signing_keys()?;
/// jwt::initialize_jwt_keys(&private_pem, &public_pem)?;
///
/// let pair = jwt::generate_token_pair(user_id, "reader@example.com")?;
/// let claims = jwt::validate_access_token(&pair.access)?;
/// ```
use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

const ACCESS_TOKEN_EXPIRY_HOURS: i64 = 1;
const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 7;

/// Environment variable holding the RSA private key (PEM).
pub const PRIVATE_KEY_ENV: &str = "JWT_PRIVATE_KEY_PEM";
/// Environment variable holding the RSA public key (PEM).
pub const PUBLIC_KEY_ENV: &str = "JWT_PUBLIC_KEY_PEM";

const JWT_ALGORITHM: Algorithm = Algorithm::RS256;

// ============================================================================
// Data Structures
// ============================================================================

/// Which half of a token pair a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims issued to blog readers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub token_type: TokenType,
    pub email: String,
}

impl Claims {
    /// Parse the subject as a user id.
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|e| anyhow!("Invalid user ID format in token: {e}"))
    }
}

/// Access/refresh pair, serialized the way the auth endpoints return it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

// ============================================================================
// Key Storage
// ============================================================================

static JWT_ENCODING_KEY: OnceCell<EncodingKey> = OnceCell::new();
static JWT_DECODING_KEY: OnceCell<DecodingKey> = OnceCell::new();

/// Initialize both keys from PEM strings.
///
/// Can only succeed once per process.
pub fn initialize_jwt_keys(private_key_pem: &str, public_key_pem: &str) -> Result<()> {
    let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).map_err(|e| {
        tracing::error!(error = %e, "rejected JWT private key");
        anyhow!("Failed to parse RSA private key: {e}")
    })?;
    let decoding_key = parse_public_key(public_key_pem)?;

    JWT_ENCODING_KEY
        .set(encoding_key)
        .map_err(|_| anyhow!("JWT encoding key already initialized"))?;
    JWT_DECODING_KEY
        .set(decoding_key)
        .map_err(|_| anyhow!("JWT decoding key already initialized"))?;

    tracing::debug!(algorithm = ?JWT_ALGORITHM, "JWT signing and validation keys installed");
    Ok(())
}

fn parse_public_key(public_key_pem: &str) -> Result<DecodingKey> {
    DecodingKey::from_rsa_pem(public_key_pem.as_bytes()).map_err(|e| {
        tracing::error!(error = %e, "rejected JWT public key");
        anyhow!("Failed to parse RSA public key: {e}")
    })
}

/// Initialize only the public key, for deployments that never issue tokens.
pub fn initialize_jwt_validation_only(public_key_pem: &str) -> Result<()> {
    let decoding_key = parse_public_key(public_key_pem)?;

    JWT_DECODING_KEY
        .set(decoding_key)
        .map_err(|_| anyhow!("JWT decoding key already initialized"))?;

    tracing::debug!(algorithm = ?JWT_ALGORITHM, "JWT validation key installed");
    Ok(())
}

/// Read the public key PEM from the environment.
pub fn load_validation_key() -> Result<String> {
    read_pem_env(PUBLIC_KEY_ENV)
}

/// Read both PEMs from the environment as `(private, public)`.
pub fn load_signing_keys() -> Result<(String, String)> {
    Ok((read_pem_env(PRIVATE_KEY_ENV)?, read_pem_env(PUBLIC_KEY_ENV)?))
}

fn read_pem_env(name: &str) -> Result<String> {
    let raw = std::env::var(name).map_err(|_| anyhow!("{name} is not set"))?;
    // Single-line env files carry the PEM with literal "\n" separators
    let pem = raw.replace("\\n", "\n");
    if pem.trim().is_empty() {
        return Err(anyhow!("{name} is empty"));
    }
    Ok(pem)
}

fn get_encoding_key() -> Result<&'static EncodingKey> {
    JWT_ENCODING_KEY.get().ok_or_else(|| {
        anyhow!("JWT signing key not initialized. Call initialize_jwt_keys() during startup.")
    })
}

fn get_decoding_key() -> Result<&'static DecodingKey> {
    JWT_DECODING_KEY
        .get()
        .ok_or_else(|| anyhow!("JWT keys not initialized. Call initialize_jwt_keys() or initialize_jwt_validation_only() during startup."))
}

/// Whether this process can issue tokens.
pub fn can_issue_tokens() -> bool {
    JWT_ENCODING_KEY.get().is_some()
}

// ============================================================================
// Token Generation
// ============================================================================

fn generate_token(user_id: Uuid, email: &str, token_type: TokenType) -> Result<String> {
    let now = Utc::now();
    let expiry = match token_type {
        TokenType::Access => now + Duration::hours(ACCESS_TOKEN_EXPIRY_HOURS),
        TokenType::Refresh => now + Duration::days(REFRESH_TOKEN_EXPIRY_DAYS),
    };

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: expiry.timestamp(),
        token_type,
        email: email.to_string(),
    };

    encode(&Header::new(JWT_ALGORITHM), &claims, get_encoding_key()?)
        .map_err(|e| anyhow!("Failed to generate {token_type:?} token: {e}"))
}

/// Generate a short-lived access token.
pub fn generate_access_token(user_id: Uuid, email: &str) -> Result<String> {
    generate_token(user_id, email, TokenType::Access)
}

/// Generate a refresh token, only accepted by the refresh endpoint.
pub fn generate_refresh_token(user_id: Uuid, email: &str) -> Result<String> {
    generate_token(user_id, email, TokenType::Refresh)
}

pub fn generate_token_pair(user_id: Uuid, email: &str) -> Result<TokenPair> {
    Ok(TokenPair {
        access: generate_access_token(user_id, email)?,
        refresh: generate_refresh_token(user_id, email)?,
    })
}

// ============================================================================
// Token Validation
// ============================================================================

/// Verify signature and expiry of any token issued by this module.
pub fn validate_token(token: &str) -> Result<Claims> {
    let decoding_key = get_decoding_key()?;

    let mut validation = Validation::new(JWT_ALGORITHM);
    validation.validate_exp = true;

    decode::<Claims>(token, decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| anyhow!("Token validation failed: {e}"))
}

/// Validate a token and require it to be an access token.
pub fn validate_access_token(token: &str) -> Result<Claims> {
    expect_type(validate_token(token)?, TokenType::Access)
}

/// Validate a token and require it to be a refresh token.
pub fn validate_refresh_token(token: &str) -> Result<Claims> {
    expect_type(validate_token(token)?, TokenType::Refresh)
}

fn expect_type(claims: Claims, expected: TokenType) -> Result<Claims> {
    if claims.token_type == expected {
        Ok(claims)
    } else {
        Err(anyhow!(
            "Expected {expected:?} token, got {:?}",
            claims.token_type
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_keys::init_test_keys;

    #[test]
    fn test_generate_and_validate_access_token() {
        init_test_keys();

        let user_id = Uuid::new_v4();
        let token = generate_access_token(user_id, "reader@example.com").unwrap();
        assert_eq!(token.matches('.').count(), 2);

        let claims = validate_access_token(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.email, "reader@example.com");
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn test_invalid_token_rejected() {
        init_test_keys();
        assert!(validate_token("invalid.token.here").is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        init_test_keys();

        let token = generate_access_token(Uuid::new_v4(), "reader@example.com").unwrap();
        let (head, signature) = token.rsplit_once('.').unwrap();
        let flipped: String = signature
            .chars()
            .rev()
            .collect();
        assert!(validate_token(&format!("{head}.{flipped}")).is_err());
    }

    #[test]
    fn test_token_types_are_not_interchangeable() {
        init_test_keys();

        let pair = generate_token_pair(Uuid::new_v4(), "reader@example.com").unwrap();
        assert!(validate_access_token(&pair.access).is_ok());
        assert!(validate_refresh_token(&pair.refresh).is_ok());
        assert!(validate_access_token(&pair.refresh).is_err());
        assert!(validate_refresh_token(&pair.access).is_err());
    }

    #[test]
    fn test_refresh_outlives_access() {
        init_test_keys();

        let pair = generate_token_pair(Uuid::new_v4(), "reader@example.com").unwrap();
        let access = validate_token(&pair.access).unwrap();
        let refresh = validate_token(&pair.refresh).unwrap();
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn test_malformed_pem_rejected_before_install() {
        assert!(initialize_jwt_validation_only("not a pem").is_err());
        assert!(initialize_jwt_keys("not a pem", "not a pem").is_err());
    }

    #[test]
    fn test_non_uuid_subject_rejected() {
        let claims = Claims {
            sub: "42".to_string(),
            iat: 0,
            exp: 0,
            token_type: TokenType::Access,
            email: String::new(),
        };
        assert!(claims.user_id().is_err());
    }
}
