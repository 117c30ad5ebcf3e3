//! Web search through the DuckDuckGo instant-answer API.
//!
//! The API returns a JSON document with an abstract, a direct answer, a
//! definition and a tree of related topics. All of it is flattened into plain
//! text lines and truncated to the configured size.

use autolearn_config::SearchConfig;
use autolearn_core::error::CollaboratorError;
use serde_json::Value;
use tracing::{debug, warn};

pub struct DuckDuckGoSearch {
    api_url: String,
    max_chars: usize,
    client: reqwest::Client,
}

impl DuckDuckGoSearch {
    pub fn new(config: &SearchConfig, timeout_secs: u64) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent(concat!("autolearn/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CollaboratorError::Unavailable(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            max_chars: config.max_chars,
            client,
        })
    }

    /// Run one query and return the flattened result text ("" when nothing matched).
    pub async fn search(&self, query: &str) -> Result<String, CollaboratorError> {
        let query = query.trim();
        debug!(query, "Web search");

        let response = self
            .client
            .get(format!("{}/", self.api_url))
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CollaboratorError::Timeout(e.to_string())
                } else {
                    CollaboratorError::Request {
                        port: "web_search".into(),
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(CollaboratorError::RateLimited {
                retry_after_secs: 10,
            });
        }
        if !status.is_success() {
            warn!(status = status.as_u16(), "Search endpoint returned error");
            return Err(CollaboratorError::Request {
                port: "web_search".into(),
                message: format!("HTTP {status}"),
            });
        }

        // The endpoint sometimes labels JSON as javascript, so parse the text.
        let body = response.text().await.map_err(|e| CollaboratorError::Request {
            port: "web_search".into(),
            message: e.to_string(),
        })?;
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| CollaboratorError::InvalidResponse(format!("search reply: {e}")))?;

        Ok(flatten_instant_answer(&value, self.max_chars))
    }
}

/// Turn an instant-answer document into plain text, at most `max_chars` chars.
pub fn flatten_instant_answer(value: &Value, max_chars: usize) -> String {
    let mut lines: Vec<String> = Vec::new();

    let heading = value["Heading"].as_str().unwrap_or("").trim();
    let abstract_text = value["AbstractText"].as_str().unwrap_or("").trim();
    if !abstract_text.is_empty() {
        if heading.is_empty() {
            lines.push(abstract_text.to_string());
        } else {
            lines.push(format!("{heading}: {abstract_text}"));
        }
    }

    for key in ["Answer", "Definition"] {
        if let Some(text) = value[key].as_str().map(str::trim).filter(|t| !t.is_empty()) {
            lines.push(text.to_string());
        }
    }

    if let Some(topics) = value["RelatedTopics"].as_array() {
        collect_topics(topics, &mut lines);
    }

    truncate_chars(&lines.join("\n"), max_chars)
}

fn collect_topics(topics: &[Value], lines: &mut Vec<String>) {
    for topic in topics {
        if let Some(text) = topic["Text"].as_str().map(str::trim).filter(|t| !t.is_empty()) {
            lines.push(format!("- {text}"));
        }
        // Grouped topics nest one level.
        if let Some(nested) = topic["Topics"].as_array() {
            collect_topics(nested, lines);
        }
    }
}

/// Truncate on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
