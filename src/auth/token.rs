//! Issuing and verifying the JSON web tokens used for bearer authentication.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{Error, UserID};

// Code in this module is adapted from https://github.com/tokio-rs/axum/blob/main/examples/jwt/src/main.rs

/// How long access tokens are valid for by default.
pub const DEFAULT_ACCESS_TOKEN_LIFETIME: Duration = Duration::minutes(15);
/// How long refresh tokens are valid for by default.
pub const DEFAULT_REFRESH_TOKEN_LIFETIME: Duration = Duration::days(7);

/// The secrets and lifetimes used to create [TokenKeys].
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// The secret for signing access tokens.
    pub access_secret: String,
    /// The secret for signing refresh tokens.
    pub refresh_secret: String,
    /// How long access tokens are valid for.
    pub access_lifetime: Duration,
    /// How long refresh tokens are valid for.
    pub refresh_lifetime: Duration,
}

impl TokenConfig {
    /// Create a config with the default token lifetimes.
    pub fn new(access_secret: &str, refresh_secret: &str) -> Self {
        Self {
            access_secret: access_secret.to_owned(),
            refresh_secret: refresh_secret.to_owned(),
            access_lifetime: DEFAULT_ACCESS_TOKEN_LIFETIME,
            refresh_lifetime: DEFAULT_REFRESH_TOKEN_LIFETIME,
        }
    }
}

/// Whether a token grants access to the API or can only be exchanged for new tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Sent as the bearer token on API requests.
    Access,
    /// Exchanged at the refresh endpoint for a new token pair.
    Refresh,
}

/// The contents of a JSON Web Token.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// The ID of the user the token was issued to.
    pub sub: i64,
    /// The time the token was issued as a unix timestamp.
    pub iat: i64,
    /// The expiry time of the token as a unix timestamp.
    pub exp: i64,
    /// What the token may be used for.
    pub kind: TokenKind,
}

/// The tokens handed to a client after registering, logging in or refreshing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// The bearer token for API requests.
    pub access_token: String,
    /// The token for requesting a new pair once the access token expires.
    pub refresh_token: String,
    /// Always "Bearer".
    pub token_type: String,
    /// The number of seconds until the access token expires.
    pub expires_in: i64,
}

#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Signs and verifies access and refresh tokens.
#[derive(Clone)]
pub struct TokenKeys {
    access: KeyPair,
    refresh: KeyPair,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
}

impl TokenKeys {
    /// Derive the signing keys from `config`.
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            access: KeyPair::from_secret(&config.access_secret),
            refresh: KeyPair::from_secret(&config.refresh_secret),
            access_lifetime: config.access_lifetime,
            refresh_lifetime: config.refresh_lifetime,
        }
    }

    /// Issue a new access and refresh token for `user_id`.
    ///
    /// # Errors
    /// Returns [Error::TokenCreation] if a token could not be signed.
    pub fn issue(&self, user_id: UserID) -> Result<TokenPair, Error> {
        self.issue_at(user_id, OffsetDateTime::now_utc())
    }

    fn issue_at(&self, user_id: UserID, now: OffsetDateTime) -> Result<TokenPair, Error> {
        let access_token = self.sign(user_id, TokenKind::Access, now)?;
        let refresh_token = self.sign(user_id, TokenKind::Refresh, now)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_owned(),
            expires_in: self.access_lifetime.whole_seconds(),
        })
    }

    fn sign(&self, user_id: UserID, kind: TokenKind, now: OffsetDateTime) -> Result<String, Error> {
        let (keys, lifetime) = match kind {
            TokenKind::Access => (&self.access, self.access_lifetime),
            TokenKind::Refresh => (&self.refresh, self.refresh_lifetime),
        };

        let claims = Claims {
            sub: user_id.as_i64(),
            iat: now.unix_timestamp(),
            exp: (now + lifetime).unix_timestamp(),
            kind,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|error| Error::TokenCreation(error.to_string()))
    }

    /// Check that `token` is a valid, unexpired token of `kind` and return its user ID.
    ///
    /// # Errors
    /// Returns [Error::Unauthorized] if the token is invalid, expired or of another kind.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<UserID, Error> {
        let keys = match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        };

        let claims = decode::<Claims>(token, &keys.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|error| {
                tracing::debug!("Rejected {kind:?} token: {error}");
                Error::Unauthorized
            })?
            .claims;

        if claims.kind != kind {
            tracing::debug!("Rejected {:?} token used as {kind:?} token", claims.kind);
            return Err(Error::Unauthorized);
        }

        Ok(UserID::new(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, OffsetDateTime};

    use crate::{
        Error, UserID,
        auth::token::{TokenConfig, TokenKeys, TokenKind},
    };

    fn test_keys() -> TokenKeys {
        TokenKeys::new(&TokenConfig::new("access-secret", "refresh-secret"))
    }

    #[test]
    fn access_token_verifies_to_user() {
        let keys = test_keys();
        let user_id = UserID::new(7);

        let tokens = keys.issue(user_id).unwrap();

        assert_eq!(keys.verify(&tokens.access_token, TokenKind::Access), Ok(user_id));
        assert_eq!(tokens.token_type, "Bearer");
        assert_eq!(tokens.expires_in, 15 * 60);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let keys = test_keys();

        let tokens = keys.issue(UserID::new(7)).unwrap();

        assert_eq!(
            keys.verify(&tokens.refresh_token, TokenKind::Access),
            Err(Error::Unauthorized)
        );
        assert_eq!(
            keys.verify(&tokens.access_token, TokenKind::Refresh),
            Err(Error::Unauthorized)
        );
    }

    #[test]
    fn kind_is_checked_when_secrets_match() {
        let keys = TokenKeys::new(&TokenConfig::new("same-secret", "same-secret"));

        let tokens = keys.issue(UserID::new(7)).unwrap();

        assert_eq!(
            keys.verify(&tokens.refresh_token, TokenKind::Access),
            Err(Error::Unauthorized)
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = test_keys();
        let yesterday = OffsetDateTime::now_utc() - Duration::days(1);

        let tokens = keys.issue_at(UserID::new(7), yesterday).unwrap();

        assert_eq!(
            keys.verify(&tokens.access_token, TokenKind::Access),
            Err(Error::Unauthorized)
        );
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let other_keys = TokenKeys::new(&TokenConfig::new("other", "other-refresh"));

        let tokens = other_keys.issue(UserID::new(7)).unwrap();

        assert_eq!(
            test_keys().verify(&tokens.access_token, TokenKind::Access),
            Err(Error::Unauthorized)
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(
            test_keys().verify("not.a.token", TokenKind::Access),
            Err(Error::Unauthorized)
        );
    }
}
