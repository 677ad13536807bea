use ghr_model::TargetRef;

/// Release listing for the worker distribution.
pub const LATEST_RELEASE_URL: &str = "https://api.github.com/repos/actions/runner/releases/latest";

/// Page size used when listing registrations.
pub const RUNNERS_PAGE_SIZE: u32 = 100;

/// Control-plane URLs for one target reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
    scope: String,
}

impl Endpoints {
    /// Endpoints rooted at `api_base`, or at the target host's default API base.
    pub fn new(target: &TargetRef, api_base: Option<&str>) -> Self {
        let base = api_base
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| target.api_base());

        Self {
            base: base.trim_end_matches('/').to_string(),
            scope: target.scope_path(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// `POST` — issues a registration token.
    pub fn registration_token(&self) -> String {
        format!("{}/{}/actions/runners/registration-token", self.base, self.scope)
    }

    /// `GET` — first page of registered workers.
    pub fn runners(&self) -> String {
        format!(
            "{}/{}/actions/runners?per_page={}",
            self.base, self.scope, RUNNERS_PAGE_SIZE
        )
    }

    /// `GET` — one page (1-based) of registered workers.
    pub fn runners_page(&self, page: u32) -> String {
        if page <= 1 {
            return self.runners();
        }
        format!("{}&page={}", self.runners(), page)
    }

    /// `DELETE` — removes one registration.
    pub fn runner(&self, id: u64) -> String {
        format!("{}/{}/actions/runners/{}", self.base, self.scope, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_family() {
        let target = TargetRef::parse("https://github.com/owner/repo").unwrap();
        let ep = Endpoints::new(&target, None);
        assert_eq!(
            ep.registration_token(),
            "https://api.github.com/repos/owner/repo/actions/runners/registration-token"
        );
        assert_eq!(
            ep.runners(),
            "https://api.github.com/repos/owner/repo/actions/runners?per_page=100"
        );
        assert_eq!(ep.runners_page(1), ep.runners());
        assert_eq!(
            ep.runners_page(3),
            "https://api.github.com/repos/owner/repo/actions/runners?per_page=100&page=3"
        );
        assert_eq!(
            ep.runner(42),
            "https://api.github.com/repos/owner/repo/actions/runners/42"
        );
    }

    #[test]
    fn organization_family() {
        let target = TargetRef::parse("https://github.com/acme").unwrap();
        let ep = Endpoints::new(&target, None);
        assert_eq!(
            ep.registration_token(),
            "https://api.github.com/orgs/acme/actions/runners/registration-token"
        );
    }

    #[test]
    fn explicit_base_wins_and_is_normalized() {
        let target = TargetRef::parse("https://control.example/owner/repo").unwrap();
        assert_eq!(Endpoints::new(&target, None).base(), "https://control.example/api/v3");
        assert_eq!(
            Endpoints::new(&target, Some("http://127.0.0.1:8080/")).base(),
            "http://127.0.0.1:8080"
        );
        assert_eq!(
            Endpoints::new(&target, Some("  ")).base(),
            "https://control.example/api/v3"
        );
    }
}
