use std::fmt;

/// Number of leading characters surfaced in previews.
pub const PREVIEW_LEN: usize = 4;

/// Appended to every preview in place of the hidden remainder.
pub const MASK_MARKER: &str = "****";

/// Opaque secret string.
///
/// `Debug` and `Display` only ever render [`Credential::preview`]; the raw value is reachable
/// exclusively through [`Credential::expose`].
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a secret. Surrounding whitespace is discarded.
    pub fn new(secret: impl Into<String>) -> Self {
        let secret: String = secret.into();
        Self(secret.trim().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw secret, for request headers and command lines only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Fixed-length prefix followed by [`MASK_MARKER`].
    pub fn preview(&self) -> String {
        let prefix: String = self.0.chars().take(PREVIEW_LEN).collect();
        format!("{prefix}{MASK_MARKER}")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.preview()).finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.preview())
    }
}
