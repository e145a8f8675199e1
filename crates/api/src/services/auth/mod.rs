//! Identity service.
//!
//! Registration, password login and bearer-token resolution. Hashing and
//! token signing are injected through [`PasswordHasher`] and [`TokenIssuer`].

mod error;
mod password;
mod token;

pub use error::AuthError;
pub use password::{Argon2Hasher, PasswordHasher};
pub use token::{HmacTokenIssuer, TokenIssuer};

use tracing::instrument;

use bazaar_core::{Email, UserId};

use crate::db::{RepositoryError, Store};
use crate::models::User;

/// Minimum password length, in characters.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Accepted display name length, in characters.
const NAME_LENGTH: std::ops::RangeInclusive<usize> = 2..=100;

/// A user together with a freshly issued token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Authentication service.
///
/// Handles user registration, login, and token resolution.
pub struct AuthService<'a> {
    store: &'a dyn Store,
    hasher: &'a dyn PasswordHasher,
    tokens: &'a dyn TokenIssuer,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        store: &'a dyn Store,
        hasher: &'a dyn PasswordHasher,
        tokens: &'a dyn TokenIssuer,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    /// Register a new customer account and sign them in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidName`, `AuthError::InvalidEmail` or
    /// `AuthError::WeakPassword` for bad input, and
    /// `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, name, password), fields(email = %email))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let name = validate_name(name)?;
        let email = Email::parse(email)?;
        validate_password(password)?;

        if self.store.get_user_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = self.hasher.hash(password)?;
        let user = User::new(name, email, password_hash);

        // The unique index still catches a concurrent registration.
        self.store.insert_user(&user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })?;

        let token = self.tokens.issue(&user.id)?;
        tracing::info!(user_id = %user.id, "User registered");
        Ok(Session { user, token })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Unknown and malformed emails are reported the same way.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .store
            .get_user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        self.hasher.verify(password, &user.password_hash)?;

        let token = self.tokens.issue(&user.id)?;
        Ok(Session { user, token })
    }

    /// Resolve a bearer token to its subject id.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` or `AuthError::TokenExpired`.
    pub fn authenticate(&self, token: &str) -> Result<UserId, AuthError> {
        self.tokens.resolve(token)
    }

    /// Look up a user by id.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the account no longer exists.
    pub async fn get_user(&self, id: &UserId) -> Result<User, AuthError> {
        self.store
            .get_user_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Look up a user by email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no account uses this email.
    pub async fn get_user_by_email(&self, email: &Email) -> Result<User, AuthError> {
        self.store
            .get_user_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

fn validate_name(name: &str) -> Result<String, AuthError> {
    let name = name.trim();
    if !NAME_LENGTH.contains(&name.chars().count()) {
        return Err(AuthError::InvalidName(format!(
            "name must be between {} and {} characters",
            NAME_LENGTH.start(),
            NAME_LENGTH.end()
        )));
    }
    Ok(name.to_owned())
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}
