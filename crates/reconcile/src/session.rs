//! Explicit session context.
//!
//! Operations take a [`Session`] argument instead of reading a logged-in user
//! from shared state. Accounts are checked up front: an unknown email is
//! registered, then signed in, without using failures for control flow.

use async_trait::async_trait;
use sandgrains_core::{IdentityKey, ParseError};
use tracing::info;

/// Which screen the user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// The calculator form
    #[default]
    Calculator,
    /// Past calculations
    History,
    /// Account settings
    Account,
}

/// An authenticated user plus navigation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    identity: IdentityKey,
    email: String,
    view: View,
}

impl Session {
    /// Session for an email that has already been authenticated.
    pub fn authenticated(email: &str) -> Result<Self, SessionError> {
        Ok(Self {
            identity: IdentityKey::from_email(email)?,
            email: email.to_string(),
            view: View::default(),
        })
    }

    /// Record key for this user.
    pub fn identity(&self) -> IdentityKey {
        self.identity
    }

    /// Authenticated email.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Current view.
    pub fn view(&self) -> View {
        self.view
    }

    /// Move to another view.
    pub fn navigate(self, view: View) -> Self {
        Self { view, ..self }
    }
}

/// Errors while establishing a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Identity string unusable
    #[error(transparent)]
    Identity(#[from] ParseError),

    /// Credentials refused
    #[error("authentication rejected: {0}")]
    Rejected(String),

    /// Account backend failed
    #[error("account provider error: {0}")]
    Provider(String),
}

/// Email and secret submitted at sign-in.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account email
    pub email: String,
    /// Password or token
    pub secret: String,
}

/// External account service.
#[async_trait]
pub trait AccountProvider: Send + Sync {
    /// Whether an account is registered for the email.
    async fn account_exists(&self, email: &str) -> Result<bool, SessionError>;

    /// Register a new account.
    async fn register(&self, credentials: &Credentials) -> Result<(), SessionError>;

    /// Verify credentials, returning the canonical email.
    async fn authenticate(&self, credentials: &Credentials) -> Result<String, SessionError>;
}

/// Sign in, registering the account first if it does not exist yet.
pub async fn establish_session<P: AccountProvider + ?Sized>(
    provider: &P,
    credentials: &Credentials,
) -> Result<Session, SessionError> {
    if !provider.account_exists(&credentials.email).await? {
        provider.register(credentials).await?;
        info!("Registered account for {}", credentials.email);
    }

    let email = provider.authenticate(credentials).await?;
    Session::authenticated(&email)
}

/// Provider for identities that were authenticated before reaching us,
/// e.g. by a fronting proxy or the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustedAccounts;

#[async_trait]
impl AccountProvider for TrustedAccounts {
    async fn account_exists(&self, _email: &str) -> Result<bool, SessionError> {
        Ok(true)
    }

    async fn register(&self, _credentials: &Credentials) -> Result<(), SessionError> {
        Ok(())
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<String, SessionError> {
        Ok(credentials.email.clone())
    }
}
