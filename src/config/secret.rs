//! Redacted holder for channel credentials.

use serde::Deserialize;

/// A channel credential: SMTP password, chat webhook URL, pager routing
/// key, AWS secret key or session token.
///
/// `Debug` prints `[REDACTED]`, so settings structs and notifiers holding
/// one can be logged with `{:?}`. Read the value with [`expose`](Self::expose)
/// only when building a request.
///
/// ```
/// use healthwarden::config::SecretString;
///
/// let key = SecretString::new("R0UT1NGK3Y".to_string());
/// assert_eq!(format!("{:?}", key), "[REDACTED]");
/// assert_eq!(key.expose(), "R0UT1NGK3Y");
/// ```
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(s: String) -> Self {
        SecretString(s)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Blank values (a `${VAR}` set to spaces, say) count as unset, so the
    /// channel is reported not actionable instead of failing on send.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}
