use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

use crate::error::PapyraError;

/// A capability-capped HTTP client that only allows requests to approved
/// domains. Every outbound call in the pipeline goes through this client so
/// that a misconfigured URL cannot reach an arbitrary host.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a client with the default allowlist of paper, reference
    /// manager and LLM provider domains.
    pub fn new() -> Result<Self, PapyraError> {
        let mut allowlist = HashSet::new();
        let domains = [
            "export.arxiv.org",   // arXiv Atom API
            "arxiv.org",          // PDF downloads
            "api.zotero.org",     // Zotero Web API v3
            "api.openai.com",     // OpenAI chat/embeddings/TTS
            "api.anthropic.com",  // Anthropic Messages API
            "localhost",          // Ollama local
            "127.0.0.1",          // Localhost alt
        ];

        for d in domains {
            allowlist.insert(d.to_string());
        }

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(120))
            .user_agent(concat!("papyra/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PapyraError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Validates a URL against the current sandbox policy.
    /// Subdomains of an allowed domain are also permitted.
    pub fn is_allowed(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                for allowed in &self.allowlist {
                    if host == allowed || host.ends_with(&format!(".{}", allowed)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, PapyraError> {
        self.check(url)?;
        Ok(self.client.get(url))
    }

    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, PapyraError> {
        self.check(url)?;
        Ok(self.client.post(url))
    }

    fn check(&self, url: &str) -> Result<(), PapyraError> {
        if !self.is_allowed(url) {
            return Err(PapyraError::Security(format!(
                "domain not in allowlist for URL {}",
                url
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arxiv_is_allowed() {
        let c = SandboxClient::new().unwrap();
        assert!(c.is_allowed("https://export.arxiv.org/api/query?search_query=all:test"));
        assert!(c.is_allowed("https://arxiv.org/pdf/2401.00001v1"));
    }

    #[test]
    fn test_unknown_domain_is_blocked() {
        let c = SandboxClient::new().unwrap();
        assert!(!c.is_allowed("https://example.com/evil"));
        assert!(c.get("https://example.com/evil").is_err());
    }

    #[test]
    fn test_allow_domain_extends_policy() {
        let mut c = SandboxClient::new().unwrap();
        assert!(!c.is_allowed("https://api.example.org/v1"));
        c.allow_domain("api.example.org");
        assert!(c.is_allowed("https://api.example.org/v1"));
    }

    #[test]
    fn test_subdomain_of_allowed_domain() {
        let c = SandboxClient::new().unwrap();
        assert!(c.is_allowed("https://static.arxiv.org/something"));
    }
}
