//! Access token sources.

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::AuthError;

/// Trait for access token sources.
///
/// Implementations return an OAuth2 bearer token that HTTP clients attach
/// to every request.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Returns the current access token.
    ///
    /// # Returns
    ///
    /// * `Ok(token)` - A token suitable for `Authorization: Bearer`
    /// * `Err(AuthError)` - If no token is available
    async fn token(&self) -> Result<Zeroizing<String>, AuthError>;

    /// Returns the name of this source for logging/debugging.
    fn name(&self) -> &'static str;
}

/// A fixed token, supplied once at startup.
pub struct StaticToken {
    token: Zeroizing<String>,
}

impl StaticToken {
    /// Creates a source that always returns `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Zeroizing::new(token.into()),
        }
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticToken")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<Zeroizing<String>, AuthError> {
        if self.token.is_empty() {
            return Err(AuthError::MissingToken("static token is empty".into()));
        }
        Ok(self.token.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Reads the token from an environment variable on every call, so an
/// external refresher can rotate it without restarting the process.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    /// Creates a source reading `var`.
    pub fn new(var: impl Into<String>) -> Result<Self, AuthError> {
        let var = var.into();
        if var.is_empty() {
            return Err(AuthError::Configuration(
                "environment variable name cannot be empty".into(),
            ));
        }
        Ok(Self { var })
    }

    /// Returns the variable name this source reads.
    pub fn var(&self) -> &str {
        &self.var
    }
}

#[async_trait]
impl TokenSource for EnvToken {
    async fn token(&self) -> Result<Zeroizing<String>, AuthError> {
        match std::env::var(&self.var) {
            Ok(value) if !value.is_empty() => Ok(Zeroizing::new(value)),
            _ => Err(AuthError::MissingToken(format!("{} is not set", self.var))),
        }
    }

    fn name(&self) -> &'static str {
        "env"
    }
}
