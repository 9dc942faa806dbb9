use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::config::Config;
use crate::domain::{GoogleProfile, User};
use crate::storage::Repository;

use super::{AppError, Observable};

/// Owns the signed-in user.
///
/// The current user is restored from the store on construction and every
/// session transition (login, registration, logout) is persisted and then
/// published through [`IdentityService::current_user_signal`].
pub struct IdentityService {
    repo: Repository,
    config: Config,
    current_user: Arc<Observable<Option<User>>>,
    authenticated: Arc<Observable<bool>>,
}

impl IdentityService {
    /// Create the service, restoring any persisted session.
    pub fn new(repo: Repository, config: Config) -> Result<Self, AppError> {
        let restored = repo.load_current_user()?;
        if let Some(user) = &restored {
            tracing::info!(user_id = %user.id, "restored session");
        }

        let authenticated = restored.is_some();
        Ok(Self {
            repo,
            config,
            current_user: Arc::new(Observable::new(restored)),
            authenticated: Arc::new(Observable::new(authenticated)),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ========================
    // Session operations
    // ========================

    /// Sign in with email and password.
    ///
    /// Passwords are only checked for presence and length; there is no
    /// credential store.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        self.simulate_latency().await;
        let email = self.validate_credentials(email, password)?;

        let user = match self.repo.find_registered_user(email)? {
            Some(existing) => existing,
            None if self.config.require_registration => {
                return Err(AppError::AccountNotFound(email.to_string()));
            }
            None => {
                let user = User::from_email(email);
                self.repo.register_user(&user)?;
                user
            }
        };

        self.establish(user)
    }

    /// Create a new account and sign in as it.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AppError> {
        self.simulate_latency().await;
        let email = self.validate_credentials(email, password)?;

        if self.repo.find_registered_user(email)?.is_some() {
            return Err(AppError::AccountAlreadyExists(email.to_string()));
        }

        let user = User::from_email(email);
        self.repo.register_user(&user)?;
        tracing::info!(user_id = %user.id, "registered account");
        self.establish(user)
    }

    /// Sign in from a Google profile.
    ///
    /// The caller is responsible for having verified the assertion the
    /// profile came from; its claims are trusted as given.
    pub async fn login_with_google(&self, profile: GoogleProfile) -> Result<User, AppError> {
        self.simulate_latency().await;
        let email = profile.email.trim();
        if email.is_empty() {
            return Err(AppError::InvalidAssertion("missing email claim".to_string()));
        }

        let mut profile = GoogleProfile {
            email: email.to_string(),
            ..profile
        };
        if profile.name.trim().is_empty() {
            profile.name = email.split('@').next().unwrap_or(email).to_string();
        }

        let user = User::from_google(&profile);
        self.repo.register_user(&user)?;
        self.establish(user)
    }

    /// Sign in from a raw Google ID token.
    ///
    /// The token's signature is not checked here, so this is refused unless
    /// the configuration explicitly trusts unverified assertions.
    pub async fn login_with_google_credential(&self, token: &str) -> Result<User, AppError> {
        if !self.config.trust_unverified_assertions {
            return Err(AppError::UnverifiedAssertion);
        }
        let profile = decode_identity_assertion(token)?;
        tracing::warn!(email = %profile.email, "accepting unverified identity assertion");
        self.login_with_google(profile).await
    }

    /// Sign out. Registered accounts and their expenses stay in the store.
    pub fn logout(&self) -> Result<(), AppError> {
        self.repo.clear_current_user()?;
        if let Some(user) = self.current_user() {
            tracing::info!(user_id = %user.id, "signed out");
        }
        self.current_user.set(None);
        self.authenticated.set(false);
        Ok(())
    }

    // ========================
    // State
    // ========================

    pub fn current_user(&self) -> Option<User> {
        self.current_user.get()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.get()
    }

    pub fn current_user_signal(&self) -> Arc<Observable<Option<User>>> {
        self.current_user.clone()
    }

    pub fn authenticated_signal(&self) -> Arc<Observable<bool>> {
        self.authenticated.clone()
    }

    /// All accounts known to this store.
    pub fn registered_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.repo.list_registered_users()?)
    }

    fn establish(&self, user: User) -> Result<User, AppError> {
        self.repo.save_current_user(&user)?;
        tracing::info!(user_id = %user.id, provider = ?user.provider, "signed in");
        self.current_user.set(Some(user.clone()));
        self.authenticated.set(true);
        Ok(user)
    }

    fn validate_credentials<'a>(&self, email: &'a str, password: &str) -> Result<&'a str, AppError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::MissingCredentials);
        }
        if password.chars().count() < self.config.min_password_len {
            return Err(AppError::PasswordTooShort {
                min: self.config.min_password_len,
            });
        }
        Ok(email)
    }

    async fn simulate_latency(&self) {
        let latency = self.config.simulated_latency();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

/// Decode the claims of a JWT-shaped identity assertion WITHOUT verifying
/// its signature.
pub fn decode_identity_assertion(token: &str) -> Result<GoogleProfile, AppError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    let [_header, payload, _signature] = segments.as_slice() else {
        return Err(AppError::InvalidAssertion(
            "expected three dot-separated segments".to_string(),
        ));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AppError::InvalidAssertion(format!("payload is not base64url: {}", e)))?;
    let profile: GoogleProfile = serde_json::from_slice(&bytes)
        .map_err(|e| AppError::InvalidAssertion(format!("payload is not valid claims: {}", e)))?;

    if profile.email.trim().is_empty() {
        return Err(AppError::InvalidAssertion("missing email claim".to_string()));
    }
    Ok(profile)
}
