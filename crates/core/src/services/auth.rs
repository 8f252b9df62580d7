//! Authentication service: registration, login, and token verification.

use catalog_common::{AppError, AppResult, Config};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::user::{CreateUserInput, UserService, UserView, verify_password};

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: String,
    /// User email.
    pub email: String,
    /// Issued at, as a Unix timestamp.
    pub iat: i64,
    /// Expiry, as a Unix timestamp.
    pub exp: i64,
}

/// Input for logging in.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

/// The authenticated user together with a signed access token.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserView,
    pub access_token: String,
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    user_service: UserService,
    jwt_secret: String,
    token_expiry_hours: i64,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(user_service: UserService, config: &Config) -> Self {
        Self {
            user_service,
            jwt_secret: config.auth.jwt_secret.clone(),
            token_expiry_hours: config.auth.token_expiry_hours,
        }
    }

    /// Register a new user and issue an access token.
    pub async fn register(&self, input: CreateUserInput) -> AppResult<AuthResponse> {
        let user = self.user_service.create(input).await?;
        let access_token = self.issue_token(&user.id, &user.email)?;

        Ok(AuthResponse {
            user: user.into(),
            access_token,
        })
    }

    /// Authenticate by email and password and issue an access token.
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthResponse> {
        input.validate()?;

        // Unknown email and wrong password are indistinguishable to the caller.
        let user = self
            .user_service
            .find_by_email(&input.email)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

        if !verify_password(&input.password, &user.password_hash)? {
            return Err(AppError::Unauthorized(
                "Invalid email or password".to_string(),
            ));
        }

        tracing::info!(user_id = %user.id, "user logged in");

        let access_token = self.issue_token(&user.id, &user.email)?;
        Ok(AuthResponse {
            user: user.into(),
            access_token,
        })
    }

    /// Verify an access token and return its claims.
    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::Unauthorized("Token has expired".to_string())
            }
            _ => AppError::Unauthorized("Invalid token".to_string()),
        })
    }

    fn issue_token(&self, user_id: &str, email: &str) -> AppResult<String> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + chrono::Duration::hours(self.token_expiry_hours)).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
    }
}
