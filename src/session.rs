use crate::config::Config;
use crate::errors::TrackerError;
use axum::http::{header::AUTHORIZATION, HeaderMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: String,
}

/// Checks the bearer token when one is configured. Without a configured
/// token every request runs as the configured owner.
pub fn authorize(config: &Config, headers: &HeaderMap) -> Result<Session, TrackerError> {
    if let Some(expected) = config.access_token.as_deref() {
        let provided = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim);
        if provided != Some(expected) {
            return Err(TrackerError::AuthenticationRequired);
        }
    }

    Ok(Session {
        user: config.user.clone(),
    })
}
