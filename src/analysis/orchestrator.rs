// 分析编排器 - 提示词构建 -> 网关调用 -> 响应校验
//
// 只有一个结果槽；每次请求分配递增 token，只有最新 token 的结果可以写入

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::event_bus::{AppEvent, EventBus};
use crate::llm::{build_analysis_prompt, LlmManager, LlmRequest, RequestKind, ResponseValidator};
use crate::models::{AnalysisResult, District, ValidationSettings};
use crate::selection::CategorySelection;

pub struct AnalysisOrchestrator {
    llm: Arc<LlmManager>,
    validator: RwLock<ResponseValidator>,
    result: RwLock<Option<AnalysisResult>>,
    latest_token: AtomicU64,
    event_bus: Arc<EventBus>,
}

impl AnalysisOrchestrator {
    pub fn new(llm: Arc<LlmManager>, validator: ResponseValidator, event_bus: Arc<EventBus>) -> Self {
        Self {
            llm,
            validator: RwLock::new(validator),
            result: RwLock::new(None),
            latest_token: AtomicU64::new(0),
            event_bus,
        }
    }

    /// 当前展示的分析结果
    pub async fn current_result(&self) -> Option<AnalysisResult> {
        self.result.read().await.clone()
    }

    /// 最近一次发出的请求 token
    pub fn latest_token(&self) -> u64 {
        self.latest_token.load(Ordering::SeqCst)
    }

    pub async fn apply_settings(&self, settings: &ValidationSettings) {
        *self.validator.write().await = ResponseValidator::new(settings);
    }

    /// 发起分析
    ///
    /// 任何阶段失败都不会修改已有结果；被更新请求取代的响应返回 `Superseded`
    pub async fn request_analysis(
        &self,
        district: Option<&District>,
        selection: &CategorySelection,
    ) -> AppResult<AnalysisResult> {
        let district = district.ok_or_else(|| {
            warn!("未选择地区，忽略分析请求");
            AppError::Precondition("지도의 마커를 먼저 선택해주세요!".to_string())
        })?;

        let token = self.latest_token.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "开始分析 #{}: {} / {}",
            token, district.name, selection.sub_category
        );
        self.event_bus.publish(AppEvent::AnalysisStarted {
            token,
            district: district.name.clone(),
            category_sub: selection.sub_category.clone(),
        });

        let request = LlmRequest {
            prompt: build_analysis_prompt(district, &selection.sub_category),
            kind: RequestKind::Analysis {
                district: district.clone(),
                category_main: selection.main_category.clone(),
                category_sub: selection.sub_category.clone(),
            },
        };

        let outcome = match self.llm.send(&request).await {
            Ok(raw) => {
                let validator = self.validator.read().await.clone();
                validator.validate(&raw)
            }
            Err(e) => Err(e),
        };

        // 持有写锁后再比较 token，保证检查与写入之间不会插入更新的结果
        let mut slot = self.result.write().await;
        let latest = self.latest_token();
        if token != latest {
            info!("分析 #{} 已被 #{} 取代，丢弃响应", token, latest);
            self.event_bus
                .publish(AppEvent::AnalysisSuperseded { token, latest });
            return Err(AppError::Superseded { token });
        }

        match outcome {
            Ok(mut result) => {
                result.name = district.name.clone();
                *slot = Some(result.clone());
                info!(
                    "分析 #{} 完成: {} 适合度 {}",
                    token, result.name, result.suitability
                );
                self.event_bus.publish(AppEvent::AnalysisCompleted {
                    token,
                    district: result.name.clone(),
                    suitability: result.suitability,
                });
                Ok(result)
            }
            Err(e) => {
                error!("分析 #{} 失败: {}", token, e);
                self.event_bus.publish(AppEvent::AnalysisFailed {
                    token,
                    kind: e.kind(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }
}
