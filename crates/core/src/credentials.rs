//! Traits defining the contract for obtaining access tokens.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use log::warn;

use crate::errors::CredentialError;

/// Source of bearer tokens for service requests.
///
/// Login, refresh and key handling live behind this trait. Clients ask for a token
/// before every attempt and report a rejected token with [`mark_stale`](Self::mark_stale).
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Current access token.
    async fn access_token(&self) -> Result<String, CredentialError>;

    /// The server rejected the last token (HTTP 401).
    fn mark_stale(&self);
}

/// A fixed token, e.g. from the environment.
///
/// It cannot refresh, so once the server has rejected the token it stops handing it
/// out and the user is told to log in again.
#[derive(Debug)]
pub struct StaticTokenProvider {
    token: String,
    stale: AtomicBool,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            stale: AtomicBool::new(false),
        }
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, CredentialError> {
        if self.token.trim().is_empty() {
            return Err(CredentialError::Missing(
                "no access token configured".to_string(),
            ));
        }
        if self.is_stale() {
            return Err(CredentialError::Stale);
        }
        Ok(self.token.clone())
    }

    fn mark_stale(&self) {
        if !self.stale.swap(true, Ordering::SeqCst) {
            warn!("Access token marked stale");
        }
    }
}
