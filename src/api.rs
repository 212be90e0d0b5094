use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    history: &'a [(String, String)],
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Deserialize, Default)]
struct ChatErrorBody {
    error: Option<String>,
}

/// Payload reported by `GET /api/health`. The server may send more fields
/// (GPU flags etc.); only these matter to the client.
#[derive(Deserialize, Debug, Clone)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
    #[serde(default)]
    pub model_type: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Outcome of a health probe that reached the server.
#[derive(Debug, Clone)]
pub enum HealthOutcome {
    /// HTTP 200 with `status == "healthy"`.
    Healthy(HealthStatus),
    /// Reachable but not serving correctly.
    Unhealthy,
}

/// Outcome of a chat round trip that reached the server. Transport failures
/// surface as `Err` from [`ApiClient::chat`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Reply(String),
    /// Non-2xx; carries the server-provided error text or a generic fallback.
    ServerError(String),
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn health(&self) -> Result<HealthOutcome> {
        let url = format!("{}/api/health", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Ok(HealthOutcome::Unhealthy);
        }
        match response.json::<HealthStatus>().await {
            Ok(status) if status.is_healthy() => Ok(HealthOutcome::Healthy(status)),
            Ok(_) | Err(_) => Ok(HealthOutcome::Unhealthy),
        }
    }

    /// Send a message plus the completed history pairs to the chat endpoint.
    pub async fn chat(&self, message: &str, history: &[(String, String)]) -> Result<ChatOutcome> {
        let url = format!("{}/api/chat", self.base_url);

        let request = ChatRequest { message, history };

        let response = self.client.post(&url).json(&request).send().await?;

        if response.status().is_success() {
            let reply: ChatResponse = response.json().await?;
            Ok(ChatOutcome::Reply(reply.response))
        } else {
            let body: ChatErrorBody = response.json().await.unwrap_or_default();
            Ok(ChatOutcome::ServerError(
                body.error.unwrap_or_else(|| "Unknown error".to_string()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_health_payload_with_extra_fields() {
        let json = r#"{
            "status": "healthy",
            "model_loaded": true,
            "gpu_enabled": false,
            "model_type": "TinyLlama-1.1B-Chat"
        }"#;
        let health: HealthStatus = serde_json::from_str(json).unwrap();
        assert!(health.is_healthy());
        assert!(health.model_loaded);
        assert_eq!(health.model_type.as_deref(), Some("TinyLlama-1.1B-Chat"));
    }

    #[test]
    fn non_healthy_status_string_is_not_healthy() {
        let json = r#"{"status": "starting", "model_loaded": false}"#;
        let health: HealthStatus = serde_json::from_str(json).unwrap();
        assert!(!health.is_healthy());
        assert_eq!(health.model_type, None);
    }

    #[test]
    fn chat_request_serializes_history_as_pairs() {
        let history = vec![("Hello".to_string(), "Hi!".to_string())];
        let request = ChatRequest {
            message: "How are you?",
            history: &history,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["message"], "How are you?");
        assert_eq!(value["history"][0][0], "Hello");
        assert_eq!(value["history"][0][1], "Hi!");
    }

    #[test]
    fn error_body_tolerates_a_missing_error_field() {
        let body: ChatErrorBody = serde_json::from_str(r#"{"status": "error"}"#).unwrap();
        assert_eq!(body.error, None);

        let body: ChatErrorBody = serde_json::from_str(r#"{"error": "model crashed"}"#).unwrap();
        assert_eq!(body.error.as_deref(), Some("model crashed"));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:8080/");
        assert_eq!(client.base_url, "http://localhost:8080");
    }
}
