use std::fmt;
use std::time::Duration;

use workback_core::config::{ValidatedConfig, DEFAULT_API_URL};

/// Connection settings for [`crate::GitHubGateway`].
#[derive(Clone)]
pub struct GitHubConfig {
    pub token: String,
    /// Repository owner (user or organization).
    pub owner: String,
    pub repo: String,
    /// REST base URL, e.g. `https://api.github.com` or `https://ghe.example.com/api/v3`.
    pub api_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl GitHubConfig {
    pub fn new(token: &str, owner: &str, repo: &str) -> Self {
        GitHubConfig {
            token: token.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: format!("workback/{}", workback_core::VERSION),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// GraphQL endpoint for [`Self::api_url`].
    ///
    /// GitHub Enterprise serves REST under `/api/v3` and GraphQL under `/api/graphql`.
    pub fn graphql_url(&self) -> String {
        match self.api_url.strip_suffix("/api/v3") {
            Some(host) => format!("{}/api/graphql", host),
            None => format!("{}/graphql", self.api_url),
        }
    }

    pub(crate) fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}{}", self.api_url, self.owner, self.repo, path)
    }
}

impl From<&ValidatedConfig> for GitHubConfig {
    fn from(config: &ValidatedConfig) -> Self {
        GitHubConfig::new(
            &config.token,
            &config.repository.owner,
            &config.repository.name,
        )
        .with_api_url(&config.api_url)
    }
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &"<redacted>")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_url", &self.api_url)
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use workback_core::SyncConfig;

    #[test]
    fn test_graphql_url_public() {
        let config = GitHubConfig::new("t", "acme", "portal");
        assert_eq!(config.graphql_url(), "https://api.github.com/graphql");
        assert_eq!(
            config.repo_url("/issues"),
            "https://api.github.com/repos/acme/portal/issues"
        );
    }

    #[test]
    fn test_graphql_url_enterprise() {
        let config =
            GitHubConfig::new("t", "acme", "portal").with_api_url("https://ghe.acme.io/api/v3/");
        assert_eq!(config.api_url, "https://ghe.acme.io/api/v3");
        assert_eq!(config.graphql_url(), "https://ghe.acme.io/api/graphql");
    }

    #[test]
    fn test_from_validated_config() {
        let validated = SyncConfig::default()
            .with_token("ghp_secret")
            .with_repository("acme/portal")
            .validate()
            .unwrap();
        let config = GitHubConfig::from(&validated);
        assert_eq!(config.owner, "acme");
        assert_eq!(config.repo, "portal");
        assert!(config.user_agent.starts_with("workback/"));
        assert!(!format!("{:?}", config).contains("ghp_secret"));
    }
}
