//! Session store: who is logged in, and with which token.
//!
//! A [`Session`] is an explicit value owned by whatever serves the operator
//! (the web server, or a single `report` invocation). It has exactly two
//! phases: anonymous, or authenticated with a token. Login either completes
//! fully or leaves the session anonymous.

use crate::error::AuthError;

/// Opaque access token issued by `POST /login`.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

// Tokens end up in debug output of surrounding structs; keep them out of logs.
impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

/// Anything that can exchange credentials for a token.
pub trait Authenticate {
    fn authenticate(&self, username: &str, password: &str) -> Result<BearerToken, AuthError>;
}

/// The two observable session phases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated { token: BearerToken, username: String },
}

/// Per-operator session.
#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
    /// Set by a successful login, cleared by the first `take_welcome`.
    welcome_pending: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exchange credentials for a token and enter the authenticated phase.
    ///
    /// Blank credentials are rejected without contacting the service. On any
    /// error the session is left anonymous, discarding a previous login.
    pub fn login(
        &mut self,
        auth: &impl Authenticate,
        username: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        self.logout();

        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let token = auth.authenticate(username, password)?;
        self.state = SessionState::Authenticated {
            token,
            username: username.to_string(),
        };
        self.welcome_pending = true;
        Ok(())
    }

    /// Return to the anonymous phase.
    pub fn logout(&mut self) {
        self.state = SessionState::Anonymous;
        self.welcome_pending = false;
    }

    pub fn current_token(&self) -> Option<&BearerToken> {
        match &self.state {
            SessionState::Authenticated { token, .. } => Some(token),
            SessionState::Anonymous => None,
        }
    }

    pub fn username(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticated { username, .. } => Some(username),
            SessionState::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_token().is_some()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// One-shot greeting shown on the first page after login.
    pub fn take_welcome(&mut self) -> Option<String> {
        if !std::mem::take(&mut self.welcome_pending) {
            return None;
        }
        self.username().map(|u| format!("Welcome back, {u}!"))
    }
}
