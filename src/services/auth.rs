use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::instrument;

use crate::{
    config::Config,
    error::{AppError, AppResult, is_unique_violation},
    models::{Identity, LoginInput, RegisterInput, User, UserWithToken},
    repository::UserStore,
    telemetry::USERS_REGISTERED,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    jwt_secret: String,
    jwt_expires_in_hours: i64,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, config: &Config) -> Self {
        Self::with_secret(users, config.jwt_secret.clone(), config.jwt_expires_in_hours)
    }

    pub fn with_secret(
        users: Arc<dyn UserStore>,
        jwt_secret: String,
        jwt_expires_in_hours: i64,
    ) -> Self {
        Self {
            users,
            jwt_secret,
            jwt_expires_in_hours,
        }
    }

    #[instrument(name = "auth.register", skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: RegisterInput) -> AppResult<UserWithToken> {
        let username = input.username.trim();
        if username.is_empty() {
            return Err(AppError::Validation("username: this field may not be blank".into()));
        }
        if input.password.is_empty() {
            return Err(AppError::Validation("password: this field may not be blank".into()));
        }

        if self.users.exists_by_username(username).await? {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        let password_hash = self.hash_password(&input.password)?;

        // A concurrent registration can claim the name after the check above.
        let user = self
            .users
            .create(username, &password_hash, &input.first_name, &input.last_name)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict("Username already taken".to_string())
                } else {
                    AppError::Database(e)
                }
            })?;

        let token = self.generate_token(user.id)?;

        USERS_REGISTERED.add(1, &[]);

        tracing::info!(user_id = user.id, "User registered");

        Ok(UserWithToken::from_user(&user, token))
    }

    #[instrument(name = "auth.login", skip(self, input), fields(username = %input.username))]
    pub async fn login(&self, input: LoginInput) -> AppResult<UserWithToken> {
        let user = self
            .users
            .find_by_username(input.username.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        self.verify_password(&input.password, &user.password_hash)?;

        let token = self.generate_token(user.id)?;

        tracing::info!(user_id = user.id, "User logged in");

        Ok(UserWithToken::from_user(&user, token))
    }

    #[instrument(name = "auth.get_user", skip(self))]
    pub async fn get_user(&self, user_id: i32) -> AppResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound("User not found".to_string()))
    }

    /// Resolves a bearer token into the identity acting on this request. The
    /// staff flag is read from storage, never from the token.
    #[instrument(name = "auth.identify", skip(self, token))]
    pub async fn identify(&self, token: &str) -> AppResult<Identity> {
        let user_id = self.validate_token(token)?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(Identity::from(&user))
    }

    #[instrument(name = "auth.validate_token", skip(self, token))]
    pub fn validate_token(&self, token: &str) -> AppResult<i32> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims.sub)
    }

    pub fn generate_token(&self, user_id: i32) -> AppResult<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + Duration::hours(self.jwt_expires_in_hours);

        let claims = Claims {
            sub: user_id,
            exp: exp.unix_timestamp(),
            iat: now.unix_timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;

        Ok(token)
    }

    fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    fn verify_password(&self, password: &str, hash: &str) -> AppResult<()> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Invalid hash: {}", e)))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AppError::InvalidCredentials)
    }
}
