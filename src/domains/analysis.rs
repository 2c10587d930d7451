// 分析领域管理器
//
// 负责地区/分类选择、商圈分析与对话会话

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::analysis::{AnalysisOrchestrator, ConversationSession};
use crate::llm::LlmManager;
use crate::models::District;
use crate::selection::CategoryCascade;

/// 分析领域管理器
#[derive(Clone)]
pub struct AnalysisDomain {
    llm: Arc<LlmManager>,
    orchestrator: Arc<AnalysisOrchestrator>,
    conversation: Arc<ConversationSession>,
    selection: Arc<RwLock<CategoryCascade>>,
    district: Arc<RwLock<Option<District>>>,
}

impl AnalysisDomain {
    pub fn new(
        llm: Arc<LlmManager>,
        orchestrator: Arc<AnalysisOrchestrator>,
        conversation: Arc<ConversationSession>,
    ) -> Self {
        Self {
            llm,
            orchestrator,
            conversation,
            selection: Arc::new(RwLock::new(CategoryCascade::default())),
            district: Arc::new(RwLock::new(None)),
        }
    }

    /// 获取 LLM 管理器
    pub fn get_llm(&self) -> &Arc<LlmManager> {
        &self.llm
    }

    pub fn get_orchestrator(&self) -> &Arc<AnalysisOrchestrator> {
        &self.orchestrator
    }

    pub fn get_conversation(&self) -> &Arc<ConversationSession> {
        &self.conversation
    }

    /// 获取分类选择器
    pub fn get_selection(&self) -> &Arc<RwLock<CategoryCascade>> {
        &self.selection
    }

    /// 当前选中的地区（由地图组件写入）
    pub fn get_district(&self) -> &Arc<RwLock<Option<District>>> {
        &self.district
    }
}
