// Gemini 直连网关 - generateContent 接口

use super::{GeminiConfig, LlmGateway, LlmRequest};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

/// Gemini网关
pub struct GeminiGateway {
    client: Client,
    config: GeminiConfig,
}

impl GeminiGateway {
    /// 创建新的Gemini网关（接受共享的HTTP客户端以复用连接池）
    pub fn new(client: Client, config: GeminiConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl LlmGateway for GeminiGateway {
    async fn send(&self, request: &LlmRequest) -> AppResult<String> {
        let api_key = self
            .config
            .resolved_api_key()
            .ok_or_else(|| AppError::Gateway("Gemini API key 未配置".to_string()))?;

        let request_body = json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": request.prompt }]
                }
            ]
        });

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(&body);
            error!("Gemini API 错误: {} - {}", status, message);
            return Err(AppError::Gateway(format!(
                "Gemini API 请求失败({}): {}",
                status.as_u16(),
                message
            )));
        }

        let text = extract_text(&body)?;
        debug!("Gemini 响应 {} 字符", text.chars().count());
        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// 拼接第一个候选的全部文本片段
fn extract_text(body: &str) -> AppResult<String> {
    let response: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Gateway(format!("Gemini 响应格式错误: {}", e)))?;

    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AppError::Gateway("Gemini API 返回空结果".to_string()));
    }
    Ok(text)
}

/// 错误响应里的 error.message，取不到时返回原文
fn error_message(body: &str) -> String {
    serde_json::from_str::<GeminiErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::RequestKind;

    #[test]
    fn test_concatenates_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"{\"suitability\":"},{"text":"80}"}]}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "{\"suitability\":80}");
    }

    #[test]
    fn test_empty_candidates_is_gateway_error() {
        let err = extract_text(r#"{"candidates":[]}"#).unwrap_err();
        assert!(matches!(err, AppError::Gateway(_)));

        let err = extract_text(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap_err();
        assert!(matches!(err, AppError::Gateway(_)));
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "API key not valid");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_endpoint_uses_model() {
        let gateway = GeminiGateway::new(
            Client::new(),
            GeminiConfig {
                base_url: "https://example.test/v1beta/".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(
            gateway.endpoint(),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_request() {
        // 配置了 key 的环境下跳过
        if std::env::var("GEMINI_API_KEY").is_ok() {
            return;
        }
        let gateway = GeminiGateway::new(Client::new(), GeminiConfig::default());
        let request = LlmRequest {
            prompt: "안녕".to_string(),
            kind: RequestKind::Chat {
                message: "안녕".to_string(),
                context: None,
            },
        };
        let err = gateway.send(&request).await.unwrap_err();
        assert!(err.to_string().contains("API key"));
    }
}
