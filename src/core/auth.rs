//! Authentication for graph-rest
//!
//! Resolves the acting principal of a request. Deciding whether that principal
//! may act is the job of the permission gate in [`crate::core::permission`].
//! Two providers ship with the crate:
//! - [`NoAuthProvider`]: every request is anonymous
//! - [`TokenAuthProvider`]: static bearer tokens mapped to principals

use anyhow::Result;
use async_trait::async_trait;
use axum::http::{HeaderMap, header::AUTHORIZATION};
use std::collections::{BTreeSet, HashMap};

/// An authenticated actor and the capability tags it holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    capabilities: BTreeSet<String>,
}

impl Principal {
    pub fn new<I, S>(id: impl Into<String>, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            capabilities: capabilities.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_capability(&self, tag: &str) -> bool {
        self.capabilities.contains(tag)
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &str> {
        self.capabilities.iter().map(String::as_str)
    }

    pub fn grant(&mut self, tag: impl Into<String>) {
        self.capabilities.insert(tag.into());
    }
}

/// Trait for auth providers
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve the principal behind a request, `None` when anonymous
    async fn current_principal(&self, headers: &HeaderMap) -> Result<Option<Principal>>;
}

/// Default no-auth provider (for development)
pub struct NoAuthProvider;

#[async_trait]
impl AuthProvider for NoAuthProvider {
    async fn current_principal(&self, _headers: &HeaderMap) -> Result<Option<Principal>> {
        Ok(None)
    }
}

/// Maps `Authorization: Bearer <token>` headers to known principals
///
/// Unknown or malformed tokens resolve to an anonymous request rather than an
/// error, so restricted operations answer with a permission denial.
#[derive(Debug, Clone, Default)]
pub struct TokenAuthProvider {
    tokens: HashMap<String, Principal>,
}

impl TokenAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, principal: Principal) -> Self {
        self.tokens.insert(token.into(), principal);
        self
    }

    fn bearer(headers: &HeaderMap) -> Option<&str> {
        headers
            .get(AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")
            .map(str::trim)
    }
}

#[async_trait]
impl AuthProvider for TokenAuthProvider {
    async fn current_principal(&self, headers: &HeaderMap) -> Result<Option<Principal>> {
        let Some(token) = Self::bearer(headers) else {
            return Ok(None);
        };
        let principal = self.tokens.get(token).cloned();
        if principal.is_none() {
            tracing::debug!("unknown bearer token presented");
        }
        Ok(principal)
    }
}
