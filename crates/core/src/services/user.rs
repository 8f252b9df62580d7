//! User service.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use catalog_common::{AppError, AppResult, IdGenerator, Paginated, Pagination};
use catalog_db::{entities::user, repositories::UserRepository};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

/// Input for creating a new user.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 6, max = 128))]
    pub password: String,

    #[validate(length(max = 256))]
    pub name: Option<String>,
}

/// Input for updating a user. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserInput {
    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(min = 6, max = 128))]
    pub password: Option<String>,

    #[validate(length(max = 256))]
    pub name: Option<String>,
}

/// A user as exposed by the API. Omits the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<user::Model> for UserView {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a new user.
    pub async fn create(&self, input: CreateUserInput) -> AppResult<user::Model> {
        input.validate()?;

        if self.user_repo.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        let password_hash = hash_password(&input.password)?;
        let user = self
            .user_repo
            .create(
                self.id_gen.generate(),
                input.email,
                password_hash,
                input.name,
            )
            .await?;

        tracing::info!(user_id = %user.id, "created user");

        Ok(user)
    }

    /// List users, newest first.
    pub async fn list(&self, pagination: Pagination) -> AppResult<Paginated<UserView>> {
        let pagination = pagination.normalized();

        let users = self
            .user_repo
            .find_all(pagination.limit, pagination.offset())
            .await?;
        let total = self.user_repo.count().await?;

        Ok(Paginated::new(users, total, &pagination).map(UserView::from))
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<UserView> {
        self.user_repo.get_by_id(id).await.map(UserView::from)
    }

    /// Count all users.
    pub async fn count(&self) -> AppResult<u64> {
        self.user_repo.count().await
    }

    /// Find a user by email.
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<user::Model>> {
        self.user_repo.find_by_email(email).await
    }

    /// Update a user.
    pub async fn update(&self, id: &str, input: UpdateUserInput) -> AppResult<UserView> {
        input.validate()?;

        let user = self.user_repo.get_by_id(id).await?;

        if let Some(email) = &input.email
            && email != &user.email
            && self.user_repo.find_by_email(email).await?.is_some()
        {
            return Err(AppError::Conflict("Email is already taken".to_string()));
        }

        let password_hash = input.password.as_deref().map(hash_password).transpose()?;

        self.user_repo
            .update(id, input.email, password_hash, input.name)
            .await
            .map(UserView::from)
    }

    /// Delete a user, returning a confirmation message.
    pub async fn delete(&self, id: &str) -> AppResult<String> {
        self.user_repo.get_by_id(id).await?;
        self.user_repo.delete(id).await?;

        tracing::info!(user_id = %id, "deleted user");

        Ok(format!("User with ID {id} has been successfully deleted"))
    }
}

/// Hash a password with Argon2id and a fresh random salt.
pub(crate) fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Check a password against a stored Argon2 hash.
pub(crate) fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
