use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Credential;

/// Short-lived token issued by the registration-token endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegistrationToken {
    pub token: String,
    /// Informational only; never enforced locally.
    #[serde(default)]
    pub expires_at: Option<String>,
}

impl RegistrationToken {
    pub fn is_usable(&self) -> bool {
        !self.token.trim().is_empty()
    }

    /// The token as a masked secret.
    pub fn secret(&self) -> Credential {
        Credential::new(self.token.clone())
    }
}

impl fmt::Debug for RegistrationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationToken")
            .field("token", &self.secret().preview())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// One entry of the registration listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub busy: bool,
}

/// Registration listing page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunnerList {
    #[serde(default)]
    pub total_count: u64,
    pub runners: Vec<RunnerRecord>,
}

impl RunnerList {
    /// Records whose name matches exactly.
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a RunnerRecord> + 'a {
        self.runners.iter().filter(move |r| r.name == name)
    }
}

/// Error payload shape used by the control plane (`{"message": ..., "documentation_url": ...}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    pub message: String,
    #[serde(default)]
    pub documentation_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_debug_is_masked() {
        let token: RegistrationToken =
            serde_json::from_str(r#"{"token":"AABBCCDDEE","expires_at":"2026-01-01T00:00:00Z"}"#)
                .unwrap();
        assert!(token.is_usable());
        let dbg = format!("{token:?}");
        assert!(dbg.contains("AABB****"));
        assert!(!dbg.contains("AABBCCDDEE"));
    }

    #[test]
    fn error_payload_is_not_a_token() {
        let parsed = serde_json::from_str::<RegistrationToken>(r#"{"message":"Bad credentials"}"#);
        assert!(parsed.is_err());

        let msg: ApiMessage = serde_json::from_str(r#"{"message":"Bad credentials"}"#).unwrap();
        assert_eq!(msg.message, "Bad credentials");
    }

    #[test]
    fn listing_filters_by_exact_name() {
        let list: RunnerList = serde_json::from_str(
            r#"{"total_count":3,"runners":[
                {"id":1,"name":"runner-01","status":"online","busy":false},
                {"id":2,"name":"runner-010"},
                {"id":3,"name":"runner-01","status":"offline"}
            ]}"#,
        )
        .unwrap();

        let ids: Vec<u64> = list.named("runner-01").map(|r| r.id).collect();
        assert_eq!(ids, [1, 3]);
    }
}
