// 中转服务网关 - 由服务端持有 API key 并构建提示词
//
// POST /api/analyze-business  {districtData, categoryMain, categorySub} -> 分析 JSON 原文
// POST /api/gemini-chat       {message, context}                        -> {reply}

use super::{LlmGateway, LlmRequest, RequestKind};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

pub struct RelayGateway {
    client: Client,
    base_url: String,
}

impl RelayGateway {
    pub fn new(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn route(&self, kind: &RequestKind) -> (String, Value) {
        match kind {
            RequestKind::Analysis {
                district,
                category_main,
                category_sub,
            } => (
                format!("{}/api/analyze-business", self.base_url),
                json!({
                    "districtData": district,
                    "categoryMain": category_main,
                    "categorySub": category_sub,
                }),
            ),
            RequestKind::Chat { message, context } => (
                format!("{}/api/gemini-chat", self.base_url),
                json!({
                    "message": message,
                    "context": context,
                }),
            ),
        }
    }
}

#[async_trait]
impl LlmGateway for RelayGateway {
    async fn send(&self, request: &LlmRequest) -> AppResult<String> {
        let (url, body) = self.route(&request.kind);
        debug!("调用中转服务: {}", url);

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = relay_error(&text);
            error!("中转服务错误: {} - {}", status, message);
            return Err(AppError::Gateway(format!(
                "中转服务请求失败({}): {}",
                status.as_u16(),
                message
            )));
        }

        match request.kind {
            // 分析接口直接返回 JSON 原文，交给校验器处理
            RequestKind::Analysis { .. } => {
                if text.trim().is_empty() {
                    return Err(AppError::Gateway("中转服务返回空结果".to_string()));
                }
                Ok(text)
            }
            RequestKind::Chat { .. } => chat_reply(&text),
        }
    }

    fn name(&self) -> &str {
        "relay"
    }
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    reply: Option<String>,
}

fn chat_reply(body: &str) -> AppResult<String> {
    let parsed: ChatReply = serde_json::from_str(body)
        .map_err(|e| AppError::Gateway(format!("中转服务响应格式错误: {}", e)))?;
    match parsed.reply {
        Some(reply) if !reply.trim().is_empty() => Ok(reply),
        _ => Err(AppError::Gateway("中转服务返回空回复".to_string())),
    }
}

fn relay_error(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::{sample_district, sample_result};

    #[test]
    fn test_analysis_route_body() {
        let gateway = RelayGateway::new(Client::new(), "http://localhost:5000/".to_string());
        let (url, body) = gateway.route(&RequestKind::Analysis {
            district: sample_district(),
            category_main: "음식".to_string(),
            category_sub: "카페/디저트".to_string(),
        });
        assert_eq!(url, "http://localhost:5000/api/analyze-business");
        assert_eq!(body["districtData"]["name"], "강남");
        assert_eq!(body["categoryMain"], "음식");
        assert_eq!(body["categorySub"], "카페/디저트");
    }

    #[test]
    fn test_chat_route_body() {
        let gateway = RelayGateway::new(Client::new(), "http://localhost:5000".to_string());
        let (url, body) = gateway.route(&RequestKind::Chat {
            message: "추천해줘".to_string(),
            context: Some(sample_result()),
        });
        assert_eq!(url, "http://localhost:5000/api/gemini-chat");
        assert_eq!(body["message"], "추천해줘");
        assert_eq!(body["context"]["suitability"], 82);

        let (_, body) = gateway.route(&RequestKind::Chat {
            message: "안녕".to_string(),
            context: None,
        });
        assert!(body["context"].is_null());
    }

    #[test]
    fn test_reply_and_error_bodies() {
        assert_eq!(chat_reply(r#"{"reply":"좋아요"}"#).unwrap(), "좋아요");
        assert!(chat_reply(r#"{"reply":""}"#).is_err());
        assert!(chat_reply("not json").is_err());
        assert_eq!(relay_error(r#"{"error":"quota exceeded"}"#), "quota exceeded");
        assert_eq!(relay_error("Internal Server Error"), "Internal Server Error");
    }
}
