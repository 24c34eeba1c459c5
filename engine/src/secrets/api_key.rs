use reqwest::header::{HeaderValue, InvalidHeaderValue};
use std::fmt;

/// Bearer credential for the completion API
///
/// `Debug` and `Display` never print the value. The key leaves this type
/// only as a sensitive `Authorization` header, or as a masked hint for
/// startup logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, trimming surrounding whitespace
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self(key.trim().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Authorization: Bearer <key>`, flagged sensitive so `http` and
    /// `reqwest` leave it out of their own debug output
    pub fn bearer_header(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.0))?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// Last four characters behind the key's prefix, e.g. `sk-...wxyz`
    ///
    /// Keys too short to mask meaningfully show nothing at all.
    pub fn hint(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() < 12 {
            return "[REDACTED]".to_string();
        }
        let prefix: String = chars.iter().take(3).collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    }

    #[cfg(test)]
    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey([REDACTED])")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}
