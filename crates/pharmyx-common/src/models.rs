//! Request and record types shared by the ingestion pipeline and the web layer.

use serde::{Deserialize, Serialize};

/// Placeholder for any field PubMed did not supply.
pub const NOT_AVAILABLE: &str = "N/A";

/// Body of `POST /api/fetch-papers`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub email: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_max_results")]
    pub max_results: i64,
    #[serde(default)]
    pub debug: bool,
}

fn default_max_results() -> i64 { 100 }

impl SearchRequest {
    /// Check the fields serde cannot: non-empty strings and a positive limit.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.query.trim().is_empty() {
            return Err("query must not be empty".to_string());
        }
        if self.email.trim().is_empty() {
            return Err("email must not be empty".to_string());
        }
        if self.max_results < 1 {
            return Err(format!(
                "max_results must be a positive integer, got {}",
                self.max_results
            ));
        }
        Ok(())
    }

    /// The requested limit, clamped into `1..=cap`.
    pub fn effective_max_results(&self, cap: usize) -> usize {
        let requested = usize::try_from(self.max_results).unwrap_or(1).max(1);
        requested.min(cap.max(1))
    }

    pub fn credentials(&self, tool: &str) -> EntrezCredentials {
        EntrezCredentials::new(self.email.clone(), self.api_key.clone()).with_tool(tool)
    }
}

/// Caller identity forwarded to NCBI on every E-utilities call.
///
/// Passed by value into each request, never stored globally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrezCredentials {
    pub email: String,
    pub api_key: Option<String>,
    pub tool: String,
}

impl EntrezCredentials {
    pub fn new(email: impl Into<String>, api_key: Option<String>) -> Self {
        // An empty key is the same as no key.
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        Self {
            email: email.into(),
            api_key,
            tool: "pharmyx".to_string(),
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }

    /// Query parameters identifying the caller.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("tool", self.tool.clone()),
            ("email", self.email.clone()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }
}

/// One PubMed article as returned to the client.
///
/// Field names on the wire match the historical response format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    #[serde(rename = "PMID")]
    pub pmid: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Publication Date")]
    pub publication_date: String,
    #[serde(rename = "Corresponding Author Email")]
    pub author_email: String,
    #[serde(rename = "Affiliation")]
    pub affiliation: String,
}

impl ArticleRecord {
    /// True once an industry affiliation was found for this article.
    pub fn has_affiliation(&self) -> bool {
        self.affiliation != NOT_AVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req: SearchRequest =
            serde_json::from_str(r#"{"query": "kinase", "email": "a@b.org"}"#).unwrap();
        assert_eq!(req.max_results, 100);
        assert!(!req.debug);
        assert!(req.api_key.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_request_rejects_non_positive_limit() {
        let req: SearchRequest = serde_json::from_str(
            r#"{"query": "kinase", "email": "a@b.org", "max_results": 0}"#,
        )
        .unwrap();
        assert!(req.validate().unwrap_err().contains("positive"));
    }

    #[test]
    fn test_request_rejects_blank_query() {
        let req: SearchRequest =
            serde_json::from_str(r#"{"query": "  ", "email": "a@b.org"}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_effective_max_results_is_capped() {
        let mut req: SearchRequest =
            serde_json::from_str(r#"{"query": "q", "email": "a@b.org", "max_results": 5}"#)
                .unwrap();
        assert_eq!(req.effective_max_results(10_000), 5);
        req.max_results = 50_000;
        assert_eq!(req.effective_max_results(10_000), 10_000);
    }

    #[test]
    fn test_empty_api_key_is_dropped() {
        let creds = EntrezCredentials::new("a@b.org", Some(String::new()));
        assert!(creds.api_key.is_none());
        let params = creds.params();
        assert!(params.iter().all(|(k, _)| *k != "api_key"));
    }

    #[test]
    fn test_credentials_params_include_key_and_tool() {
        let creds = EntrezCredentials::new("a@b.org", Some("abc123".into())).with_tool("probe");
        let params = creds.params();
        assert!(params.contains(&("tool", "probe".to_string())));
        assert!(params.contains(&("email", "a@b.org".to_string())));
        assert!(params.contains(&("api_key", "abc123".to_string())));
    }

    #[test]
    fn test_record_serialises_with_legacy_keys() {
        let record = ArticleRecord {
            pmid: "1".into(),
            title: "T".into(),
            publication_date: "2024-Jan-N/A".into(),
            author_email: NOT_AVAILABLE.into(),
            affiliation: "Acme Pharma".into(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["PMID"], "1");
        assert_eq!(json["Publication Date"], "2024-Jan-N/A");
        assert_eq!(json["Corresponding Author Email"], "N/A");
        assert!(record.has_affiliation());
    }
}
