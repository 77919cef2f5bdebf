use anyhow::{Context, Result, bail};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::sync::Arc;

use crate::errors::LeagueError;

pub const TOKENS_VAR: &str = "LATE_LEAGUE_ADMIN_TOKENS";
pub const TOKENS_FILE_VAR: &str = "LATE_LEAGUE_ADMIN_TOKENS_FILE";

/// The administrator a request was authenticated as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    pub name: String,
}

pub trait Authenticator: Send + Sync {
    fn authenticate(&self, token: &str) -> Option<AdminIdentity>;
}

/// Static bearer tokens, one per named administrator.
#[derive(Debug, Default)]
pub struct TokenAuthenticator {
    tokens: HashMap<String, String>,
}

impl TokenAuthenticator {
    /// Reads `name:token` pairs from the environment. The inline variable
    /// wins over the file variable. No configuration means no admin access.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(TOKENS_VAR) {
            return Self::parse(&raw).with_context(|| format!("Invalid {}", TOKENS_VAR));
        }
        if let Some(path) = lookup(TOKENS_FILE_VAR) {
            let raw = fs::read_to_string(&path).with_context(|| format!("Failed to read admin tokens from {}", path))?;
            return Self::parse(&raw).with_context(|| format!("Invalid admin tokens file {}", path));
        }
        Ok(Self::default())
    }

    /// Entries are separated by commas or newlines. Blank entries and lines
    /// starting with `#` are skipped.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut tokens = HashMap::new();

        for entry in raw.split([',', '\n']).map(str::trim) {
            if entry.is_empty() || entry.starts_with('#') {
                continue;
            }
            let Some((name, token)) = entry.split_once(':') else {
                bail!("expected `name:token`, got an entry without `:`");
            };
            let (name, token) = (name.trim(), token.trim());
            if name.is_empty() || token.is_empty() {
                bail!("admin name and token must both be non-empty");
            }
            if tokens.insert(token.to_string(), name.to_string()).is_some() {
                bail!("token for `{}` is used more than once", name);
            }
        }

        Ok(Self { tokens })
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }
}

impl Authenticator for TokenAuthenticator {
    fn authenticate(&self, token: &str) -> Option<AdminIdentity> {
        self.tokens.get(token).map(|name| AdminIdentity { name: name.clone() })
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

/// Rejects requests without a known bearer token and hands the identity to
/// the handler as a request extension.
pub async fn require_admin(
    State(authenticator): State<Arc<dyn Authenticator>>,
    mut request: Request,
    next: Next,
) -> Result<Response, LeagueError> {
    let identity = bearer_token(request.headers())
        .and_then(|token| authenticator.authenticate(token))
        .ok_or(LeagueError::Unauthorized)?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
