// 상권분석 核心库
//
// 地区 + 业态 -> LLM 分析结果 -> 追问对话；以及社区帖子列表

pub mod account;
pub mod analysis;
mod app;
pub mod commands;
pub mod community;
pub mod domains;
pub mod error;
pub mod event_bus;
pub mod llm;
pub mod logger;
pub mod models;
pub mod reference;
pub mod selection;
pub mod settings;
pub mod storage;

use std::sync::Arc;

use account::AccountStore;
use analysis::{AnalysisOrchestrator, ConversationSession};
use community::ListingEngine;
use domains::{AnalysisDomain, CommunityDomain, SystemDomain};
use error::AppResult;
use event_bus::EventBus;
use llm::{LlmManager, ResponseValidator};
use logger::LogBroadcaster;
use models::PersistedAppConfig;
use settings::SettingsManager;
use storage::BlobStore;

pub use app::run;

/// 应用状态 - 按领域分组，由入口创建后传给所有命令
pub struct AppState {
    /// 分析领域管理器
    pub analysis_domain: Arc<AnalysisDomain>,
    /// 社区领域管理器
    pub community_domain: Arc<CommunityDomain>,
    /// 系统领域管理器
    pub system_domain: Arc<SystemDomain>,
    /// 事件总线
    pub event_bus: Arc<EventBus>,
}

impl AppState {
    /// 根据持久化配置创建全部组件
    pub async fn new(
        settings: Arc<SettingsManager>,
        store: BlobStore,
        log_broadcaster: Arc<LogBroadcaster>,
        http_client: reqwest::Client,
    ) -> AppResult<Self> {
        let config = settings.get().await;
        let event_bus = Arc::new(EventBus::default());

        let llm = Arc::new(LlmManager::new(http_client.clone(), &config.llm)?);
        let listing = Arc::new(ListingEngine::new(
            http_client,
            store.clone(),
            config.community.clone(),
            event_bus.clone(),
        ));
        let system = SystemDomain::new(settings, log_broadcaster);

        Self::assemble(llm, listing, store, &config, system, event_bus)
    }

    /// 使用已创建的网关与列表引擎组装（测试时注入假实现）
    pub fn assemble(
        llm: Arc<LlmManager>,
        listing: Arc<ListingEngine>,
        store: BlobStore,
        config: &PersistedAppConfig,
        system: SystemDomain,
        event_bus: Arc<EventBus>,
    ) -> AppResult<Self> {
        let orchestrator = Arc::new(AnalysisOrchestrator::new(
            llm.clone(),
            ResponseValidator::new(&config.validation),
            event_bus.clone(),
        ));
        let conversation = Arc::new(ConversationSession::new(llm.clone(), event_bus.clone()));
        let accounts = Arc::new(AccountStore::new(store.clone())?);

        Ok(Self {
            analysis_domain: Arc::new(AnalysisDomain::new(llm, orchestrator, conversation)),
            community_domain: Arc::new(CommunityDomain::new(listing, accounts, store)),
            system_domain: Arc::new(system),
            event_bus,
        })
    }
}
