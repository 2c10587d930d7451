// LLM模块 - 提示词构建、网关调用与响应校验

pub mod gemini;
pub mod prompts;
pub mod relay;
pub mod validator;

pub use gemini::GeminiGateway;
pub use prompts::{build_analysis_prompt, build_chat_prompt, select_chat_template, ChatTemplate};
pub use relay::RelayGateway;
pub use validator::ResponseValidator;

use crate::error::{AppError, AppResult};
use crate::models::{AnalysisResult, District};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// LLM配置
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LlmSettings {
    /// 当前使用的 provider: "gemini" 或 "relay"
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Gemini配置
    #[serde(default)]
    pub gemini: GeminiConfig,
    /// 中转服务配置
    #[serde(default)]
    pub relay: RelayConfig,
    /// 单次调用超时（秒）
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            gemini: GeminiConfig::default(),
            relay: RelayConfig::default(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

/// Gemini配置
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GeminiConfig {
    /// 为空时读取环境变量 GEMINI_API_KEY
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
        }
    }
}

impl GeminiConfig {
    /// 实际使用的 API key
    pub fn resolved_api_key(&self) -> Option<String> {
        if !self.api_key.trim().is_empty() {
            return Some(self.api_key.trim().to_string());
        }
        std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// 中转服务配置（/api/analyze-business, /api/gemini-chat）
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_relay_url")]
    pub base_url: String,
}

fn default_relay_url() -> String {
    "http://localhost:5000".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_url: default_relay_url(),
        }
    }
}

/// 请求类型（中转服务需要结构化参数，直连模型只使用 prompt）
#[derive(Debug, Clone)]
pub enum RequestKind {
    Analysis {
        district: District,
        category_main: String,
        category_sub: String,
    },
    Chat {
        message: String,
        context: Option<AnalysisResult>,
    },
}

impl RequestKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Analysis { .. } => "analysis",
            Self::Chat { .. } => "chat",
        }
    }
}

/// 一次 LLM 调用
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,
    pub kind: RequestKind,
}

/// LLM网关接口 - 发送请求并返回原始文本，不解释内容
#[async_trait]
pub trait LlmGateway: Send + Sync {
    async fn send(&self, request: &LlmRequest) -> AppResult<String>;

    fn name(&self) -> &str;
}

/// LLM管理器 - 持有当前网关并为每次调用加超时
pub struct LlmManager {
    gateway: RwLock<Arc<dyn LlmGateway>>,
    timeout: RwLock<Duration>,
    http_client: reqwest::Client,
}

impl LlmManager {
    /// 根据配置创建（接受共享的HTTP客户端以复用连接池）
    pub fn new(client: reqwest::Client, settings: &LlmSettings) -> AppResult<Self> {
        let gateway = build_gateway(&client, settings)?;
        Ok(Self {
            gateway: RwLock::new(gateway),
            timeout: RwLock::new(Duration::from_secs(settings.request_timeout_secs.max(1))),
            http_client: client,
        })
    }

    /// 使用指定网关创建（测试或嵌入场景）
    pub fn with_gateway(gateway: Arc<dyn LlmGateway>, timeout: Duration) -> Self {
        Self {
            gateway: RwLock::new(gateway),
            timeout: RwLock::new(timeout),
            http_client: reqwest::Client::new(),
        }
    }

    /// 重新应用配置（切换 provider 或更新 key/超时）
    pub async fn apply_settings(&self, settings: &LlmSettings) -> AppResult<()> {
        let gateway = build_gateway(&self.http_client, settings)?;
        info!("LLM provider 已切换为: {}", gateway.name());
        *self.gateway.write().await = gateway;
        *self.timeout.write().await = Duration::from_secs(settings.request_timeout_secs.max(1));
        Ok(())
    }

    pub async fn provider_name(&self) -> String {
        self.gateway.read().await.name().to_string()
    }

    /// 发送请求，超时转换为网关错误，不重试
    pub async fn send(&self, request: &LlmRequest) -> AppResult<String> {
        let gateway = self.gateway.read().await.clone();
        let timeout = *self.timeout.read().await;

        debug!(
            "调用 {} ({}): prompt {} 字符",
            gateway.name(),
            request.kind.label(),
            request.prompt.chars().count()
        );

        match tokio::time::timeout(timeout, gateway.send(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{} 调用超时({}秒)", gateway.name(), timeout.as_secs());
                Err(AppError::Gateway(format!(
                    "请求超时({}秒)",
                    timeout.as_secs()
                )))
            }
        }
    }
}

fn build_gateway(client: &reqwest::Client, settings: &LlmSettings) -> AppResult<Arc<dyn LlmGateway>> {
    match settings.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiGateway::new(
            client.clone(),
            settings.gemini.clone(),
        ))),
        "relay" => Ok(Arc::new(RelayGateway::new(
            client.clone(),
            settings.relay.base_url.clone(),
        ))),
        other => Err(AppError::Gateway(format!("不支持的 provider: {}", other))),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! 测试用网关

    use super::*;
    use crate::models::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    pub fn sample_district() -> District {
        District {
            name: "강남".to_string(),
            lat: 37.4979,
            lng: 127.0276,
            population: "85.0K".to_string(),
            rent: "520만원".to_string(),
        }
    }

    pub fn sample_result() -> AnalysisResult {
        AnalysisResult {
            name: "강남".to_string(),
            suitability: 82,
            population: PopulationBlock {
                total: "85.0K명".to_string(),
                main_age: "2030 직장인".to_string(),
                gender_ratio: GenderRatio {
                    male: 48.0,
                    female: 52.0,
                },
                time_slots: [20.0, 80.0, 60.0, 90.0, 50.0, 10.0],
            },
            market: MarketBlock {
                avg_sales: "4,500만원".to_string(),
                competition: Competition::High,
                avg_rent: "520만원".to_string(),
                nearby_similar: 14,
            },
            traffic: TrafficBlock {
                subway: "강남역 도보 3분".to_string(),
                bus: "정류장 8개소".to_string(),
                accessibility: Accessibility::Excellent,
            },
        }
    }

    /// 模型返回的合法分析 JSON
    pub fn analysis_json(suitability: u8) -> String {
        serde_json::json!({
            "suitability": suitability,
            "population": {
                "total": "85.0K명",
                "mainAge": "2030 직장인",
                "genderRatio": { "male": 48, "female": 52 },
                "timeSlots": [20, 80, 60, 90, 50, 10]
            },
            "market": {
                "avgSales": "4,500만원",
                "competition": "매우 높음",
                "avgRent": "520만원",
                "nearbySimilar": 14
            },
            "traffic": {
                "subway": "강남역 도보 3분",
                "bus": "정류장 8개소",
                "accessibility": "최상"
            }
        })
        .to_string()
    }

    /// 按顺序返回预设结果的网关
    pub struct ScriptedGateway {
        replies: Mutex<VecDeque<AppResult<String>>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGateway {
        pub fn new(replies: Vec<AppResult<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmGateway for ScriptedGateway {
        async fn send(&self, request: &LlmRequest) -> AppResult<String> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::Gateway("没有预设回复".to_string())))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    /// 每次调用都等待测试放行的网关，进入调用时通过 `entered` 通知
    pub struct GatedGateway {
        gates: Mutex<VecDeque<tokio::sync::oneshot::Receiver<String>>>,
        entered: tokio::sync::mpsc::UnboundedSender<()>,
    }

    impl GatedGateway {
        pub fn new(
            gates: Vec<tokio::sync::oneshot::Receiver<String>>,
        ) -> (Self, tokio::sync::mpsc::UnboundedReceiver<()>) {
            let (entered, entered_rx) = tokio::sync::mpsc::unbounded_channel();
            (
                Self {
                    gates: Mutex::new(gates.into()),
                    entered,
                },
                entered_rx,
            )
        }
    }

    #[async_trait]
    impl LlmGateway for GatedGateway {
        async fn send(&self, _request: &LlmRequest) -> AppResult<String> {
            let gate = self.gates.lock().unwrap().pop_front();
            let _ = self.entered.send(());
            match gate {
                Some(rx) => rx
                    .await
                    .map_err(|_| AppError::Gateway("gate dropped".to_string())),
                None => Err(AppError::Gateway("no gate".to_string())),
            }
        }

        fn name(&self) -> &str {
            "gated"
        }
    }
}
