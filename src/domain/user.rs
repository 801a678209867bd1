use thiserror::Error;

/// The signed-in user as resolved by the identity provider. Only the opaque id is relied on;
/// it is the value stored in a todo's `user_id` column.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserIdentity {
    pub id: String,
}

impl UserIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        UserIdentity { id: id.into() }
    }
}

pub mod driven_ports {
    use super::*;

    /// Checks an access token issued by the identity provider and extracts who it belongs to.
    pub trait TokenVerifier {
        fn verify(&self, access_token: &str) -> Result<UserIdentity, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;

    #[derive(Debug, Error)]
    pub enum IdentityError {
        #[error("the access token was rejected: {0}")]
        InvalidToken(anyhow::Error),
    }

    pub trait IdentityPort {
        /// Resolves the caller's identity. A missing or empty token is an anonymous caller,
        /// not an error; a token that fails verification is.
        fn current_user(
            &self,
            access_token: Option<&str>,
            verifier: &impl driven_ports::TokenVerifier,
        ) -> Result<Option<UserIdentity>, IdentityError>;
    }
}

pub struct UserService {}

impl driving_ports::IdentityPort for UserService {
    fn current_user(
        &self,
        access_token: Option<&str>,
        verifier: &impl driven_ports::TokenVerifier,
    ) -> Result<Option<UserIdentity>, driving_ports::IdentityError> {
        let Some(token) = access_token.map(str::trim).filter(|token| !token.is_empty()) else {
            return Ok(None);
        };

        verifier
            .verify(token)
            .map(Some)
            .map_err(driving_ports::IdentityError::InvalidToken)
    }
}
