use crate::auth::error::AuthError;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

// Local part (dotted atoms or a quoted string), then an IPv4 literal or a dotted domain.
static MAILBOX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(([^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#,
    )
    .expect("mailbox pattern is valid")
});

/// Checks a mailbox address. Matching is case-insensitive.
pub fn validate_email(user_email: &str) -> Result<(), AuthError> {
    if MAILBOX.is_match(&user_email.to_lowercase()) {
        Ok(())
    } else {
        Err(AuthError::InvalidEmail)
    }
}

/// Parses a server URL and enforces `https` plus a dotted hostname.
///
/// Bare names such as `localhost` are rejected on purpose.
pub fn validate_server_url(server_url: &str) -> Result<Url, AuthError> {
    let url = Url::parse(server_url.trim())
        .map_err(|err| AuthError::InvalidUrl(err.to_string()))?;

    if url.scheme() != "https" {
        return Err(AuthError::InsecureScheme);
    }

    match url.host_str() {
        Some(host) if host.contains('.') => Ok(url),
        _ => Err(AuthError::InvalidHostname),
    }
}
