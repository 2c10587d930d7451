//! 配置管理命令
//!
//! 提供应用配置的读取和更新接口，更新后立即应用到运行中的组件：
//! - LLM provider / key / 超时
//! - 响应校验模式
//! - 社区列表（页大小、分页限制、去重、远程接口）

use tracing::info;

use super::CommandResult;
use crate::error::AppError;
use crate::event_bus::AppEvent;
use crate::models::{AppConfig, PersistedAppConfig};
use crate::AppState;

/// 获取应用配置
pub async fn get_app_config(state: &AppState) -> CommandResult<PersistedAppConfig> {
    Ok(state.system_domain.get_settings().get().await)
}

/// 更新配置
pub async fn update_config(state: &AppState, config: AppConfig) -> CommandResult<PersistedAppConfig> {
    if let Some(community) = &config.community {
        community.validate().map_err(AppError::Precondition)?;
    }

    // 先切换 provider，失败时不写入配置文件
    if let Some(llm) = &config.llm {
        state
            .analysis_domain
            .get_llm()
            .apply_settings(llm)
            .await?;
    }

    let (updated, changed) = state
        .system_domain
        .get_settings()
        .update(config)
        .await
        .map_err(AppError::from)?;

    for part in &changed {
        match *part {
            "validation" => {
                state
                    .analysis_domain
                    .get_orchestrator()
                    .apply_settings(&updated.validation)
                    .await;
                info!(
                    "响应校验配置已更新: 修复模式 = {}",
                    updated.validation.repair_malformed_json
                );
            }
            "community" => {
                state
                    .community_domain
                    .get_listing()
                    .apply_settings(updated.community.clone())
                    .await;
                info!("社区列表配置已更新: {:?}", updated.community);
            }
            "store" => {
                info!("本地存储配置将在重启后生效");
            }
            _ => {}
        }

        state.event_bus.publish(AppEvent::ConfigUpdated {
            config_type: part.to_string(),
        });
    }

    Ok(updated)
}

/// 开关日志推送
pub async fn set_log_push_enabled(state: &AppState, enabled: bool) -> CommandResult<()> {
    state.system_domain.get_logger().set_enabled(enabled);
    info!("日志推送 = {}", enabled);
    Ok(())
}
