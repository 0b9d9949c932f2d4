// Web search tool server
//
// Queries a JSON search endpoint (SearxNG-style: `?q=...&format=json`).
// Only textual results are returned; the result count is bounded.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use toolgate_core::{Tool, ToolExecution, ToolServer};

/// Timeout for connecting and receiving the response
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default and maximum number of results returned per query
const DEFAULT_MAX_RESULTS: usize = 5;
const RESULT_CAP: usize = 10;

/// Web search tool server backed by a JSON search endpoint
pub struct WebSearchServer {
    endpoint: String,
}

impl WebSearchServer {
    /// Create a server querying the given endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    /// Create a server from the TOOLGATE_SEARCH_URL environment variable
    pub fn from_env() -> Option<Self> {
        std::env::var("TOOLGATE_SEARCH_URL").ok().map(Self::new)
    }
}

impl ToolServer for WebSearchServer {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web and return titles, URLs and snippets for the top results."
    }

    fn system_prompt_addition(&self) -> Option<&str> {
        Some("You can search the web with the web_search tool. Prefer specific queries over broad ones.")
    }

    fn tools(&self) -> Vec<Box<dyn Tool>> {
        vec![Box::new(WebSearchTool {
            endpoint: self.endpoint.clone(),
        })]
    }
}

/// Tool that queries the search endpoint
pub struct WebSearchTool {
    endpoint: String,
}

impl WebSearchTool {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web. Returns up to max_results entries with title, url and snippet."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results to return (1-10). Defaults to 5."
                }
            },
            "required": ["query"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: Value) -> ToolExecution {
        let Some(query) = arguments.get("query").and_then(|v| v.as_str()) else {
            return ToolExecution::tool_error("Missing required parameter: query");
        };
        if query.trim().is_empty() {
            return ToolExecution::tool_error("query must not be empty");
        }

        let max_results = arguments
            .get("max_results")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .clamp(1, RESULT_CAP);

        let client = match reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
        {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("Failed to create HTTP client: {}", e);
                return ToolExecution::internal_error("Failed to create HTTP client");
            }
        };

        let response = match client
            .get(&self.endpoint)
            .query(&[("q", query), ("format", "json")])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return ToolExecution::tool_error("Search request timed out");
            }
            Err(e) if e.is_connect() => {
                return ToolExecution::tool_error("Failed to connect to the search endpoint");
            }
            Err(e) => {
                return ToolExecution::tool_error(format!("Search request failed: {}", e));
            }
        };

        if !response.status().is_success() {
            return ToolExecution::tool_error(format!(
                "Search endpoint returned status {}",
                response.status()
            ));
        }

        let body: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                return ToolExecution::tool_error(format!(
                    "Search endpoint returned invalid JSON: {}",
                    e
                ));
            }
        };

        let results: Vec<Value> = body
            .get("results")
            .and_then(|v| v.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .take(max_results)
                    .map(|entry| {
                        json!({
                            "title": entry.get("title").and_then(|v| v.as_str()).unwrap_or(""),
                            "url": entry.get("url").and_then(|v| v.as_str()).unwrap_or(""),
                            "snippet": entry.get("content").and_then(|v| v.as_str()).unwrap_or("")
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        ToolExecution::success(json!({
            "query": query,
            "count": results.len(),
            "results": results
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_search_returns_bounded_results() {
        let server = MockServer::start().await;
        let results: Vec<Value> = (0..8)
            .map(|i| {
                json!({
                    "title": format!("Result {i}"),
                    "url": format!("https://example.com/{i}"),
                    "content": format!("Snippet {i}")
                })
            })
            .collect();
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "rust wav parsing"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": results })))
            .mount(&server)
            .await;

        let tool = WebSearchTool::new(format!("{}/search", server.uri()));
        let result = tool
            .execute(json!({"query": "rust wav parsing", "max_results": 3}))
            .await;

        let ToolExecution::Success(value) = result else {
            panic!("Expected success");
        };
        assert_eq!(value["count"], 3);
        assert_eq!(value["results"][0]["title"], "Result 0");
        assert_eq!(value["results"][0]["snippet"], "Snippet 0");
    }

    #[tokio::test]
    async fn test_missing_query_is_a_tool_error() {
        let tool = WebSearchTool::new("http://localhost:1/search");
        let result = tool.execute(json!({})).await;
        assert!(matches!(result, ToolExecution::ToolError(_)));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let tool = WebSearchTool::new(format!("{}/search", server.uri()));
        let result = tool.execute(json!({"query": "anything"})).await;

        let ToolExecution::ToolError(msg) = result else {
            panic!("Expected tool error");
        };
        assert!(msg.contains("503"));
    }
}
