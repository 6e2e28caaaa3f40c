//! Input validation for user-supplied identifiers
//!
//! Tunnel IDs and subdomains end up in the connection URL and in the public
//! URL the broker routes on, so they are checked before the tunnel is dialed.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Regex for validating tunnel IDs (1-64 chars, alphanumeric first, then `-`/`_` allowed)
static TUNNEL_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,63}$").unwrap());

/// Regex for validating subdomains (a single lowercase DNS label)
static SUBDOMAIN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").unwrap());

/// Validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid tunnel ID format: {0}")]
    InvalidTunnelId(String),

    #[error("Invalid subdomain format: {0}")]
    InvalidSubdomain(String),

    #[error("target must be in format host:port (e.g., localhost:3000), got: {0}")]
    InvalidTarget(String),
}

/// Validate tunnel ID format
///
/// # Examples
///
/// ```
/// use tunny_common::validation::validate_tunnel_id;
///
/// assert!(validate_tunnel_id("my-api").is_ok());
/// assert!(validate_tunnel_id("3f2a9c01d4e5b6a7").is_ok());
/// assert!(validate_tunnel_id("../etc").is_err());
/// ```
pub fn validate_tunnel_id(id: &str) -> Result<(), ValidationError> {
    if !TUNNEL_ID_REGEX.is_match(id) {
        return Err(ValidationError::InvalidTunnelId(
            id.chars().take(50).collect::<String>(), // Limit error message
        ));
    }
    Ok(())
}

/// Validate subdomain format
///
/// An empty subdomain means "let the broker decide" and is accepted.
pub fn validate_subdomain(subdomain: &str) -> Result<(), ValidationError> {
    if !subdomain.is_empty() && !SUBDOMAIN_REGEX.is_match(subdomain) {
        return Err(ValidationError::InvalidSubdomain(
            subdomain.chars().take(50).collect::<String>(),
        ));
    }
    Ok(())
}

/// Validate a local target in `host:port` form
///
/// # Examples
///
/// ```
/// use tunny_common::validation::validate_target;
///
/// assert!(validate_target("localhost:3000").is_ok());
/// assert!(validate_target("[::1]:8080").is_ok());
/// assert!(validate_target("localhost").is_err());
/// ```
pub fn validate_target(target: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidTarget(target.chars().take(100).collect());

    let (host, port) = target.rsplit_once(':').ok_or_else(invalid)?;
    if host.is_empty() || host.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(invalid());
    }
    match port.parse::<u16>() {
        Ok(p) if p > 0 => Ok(()),
        _ => Err(invalid()),
    }
}
