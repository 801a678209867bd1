use crate::domain;
use crate::domain::user::UserIdentity;
use anyhow::{Context, bail};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;

/// Audience stamped on access tokens issued to signed-in users
pub const AUTHENTICATED_AUDIENCE: &str = "authenticated";

#[derive(Debug, Deserialize)]
struct AccessClaims {
    sub: String,
}

/// Verifies HS256 access tokens minted by the identity provider with a shared secret
#[derive(Clone)]
pub struct JwtTokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtTokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[AUTHENTICATED_AUDIENCE]);

        JwtTokenVerifier {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl domain::user::driven_ports::TokenVerifier for JwtTokenVerifier {
    fn verify(&self, access_token: &str) -> Result<UserIdentity, anyhow::Error> {
        let token_data = decode::<AccessClaims>(access_token, &self.key, &self.validation)
            .context("decoding access token")?;
        if token_data.claims.sub.trim().is_empty() {
            bail!("access token has no subject");
        }

        Ok(UserIdentity::new(token_data.claims.sub))
    }
}
