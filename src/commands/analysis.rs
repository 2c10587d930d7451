//! 分析相关命令
//!
//! 地区选择、分类级联、商圈分析与对话

use serde::Serialize;
use tracing::info;

use super::CommandResult;
use crate::analysis::SessionSnapshot;
use crate::error::AppError;
use crate::event_bus::AppEvent;
use crate::models::{AnalysisResult, ConversationMessage, District};
use crate::reference;
use crate::selection::CategorySelection;
use crate::AppState;

/// 分类面板数据
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPanel {
    pub selection: CategorySelection,
    pub main_categories: Vec<&'static str>,
    pub sub_options: Vec<&'static str>,
}

/// 获取全部地区
pub async fn list_districts() -> CommandResult<Vec<District>> {
    Ok(reference::seoul_districts())
}

/// 地图选中地区
pub async fn select_district(state: &AppState, name: &str) -> CommandResult<District> {
    let district = reference::find_district(name)
        .ok_or_else(|| AppError::Precondition(format!("알 수 없는 지역입니다: {}", name)))?;

    *state.analysis_domain.get_district().write().await = Some(district.clone());
    info!("选中地区: {}", district.name);
    state.event_bus.publish(AppEvent::DistrictSelected {
        district: district.clone(),
    });
    Ok(district)
}

pub async fn get_categories(state: &AppState) -> CommandResult<CategoryPanel> {
    let cascade = state.analysis_domain.get_selection().read().await;
    Ok(CategoryPanel {
        selection: cascade.selection().clone(),
        main_categories: cascade.main_categories(),
        sub_options: cascade.options().to_vec(),
    })
}

/// 切换大分类（小分类重置为第一个）
pub async fn set_main_category(state: &AppState, main: &str) -> CommandResult<CategorySelection> {
    let selection = state
        .analysis_domain
        .get_selection()
        .write()
        .await
        .set_main(main)?
        .clone();
    state.event_bus.publish(AppEvent::CategoryChanged {
        selection: selection.clone(),
    });
    Ok(selection)
}

pub async fn set_sub_category(state: &AppState, sub: &str) -> CommandResult<CategorySelection> {
    let selection = state
        .analysis_domain
        .get_selection()
        .write()
        .await
        .set_sub(sub)?
        .clone();
    state.event_bus.publish(AppEvent::CategoryChanged {
        selection: selection.clone(),
    });
    Ok(selection)
}

/// 对当前地区与分类发起分析
pub async fn request_analysis(state: &AppState) -> CommandResult<AnalysisResult> {
    let district = state.analysis_domain.get_district().read().await.clone();
    let selection = state
        .analysis_domain
        .get_selection()
        .read()
        .await
        .selection()
        .clone();

    Ok(state
        .analysis_domain
        .get_orchestrator()
        .request_analysis(district.as_ref(), &selection)
        .await?)
}

pub async fn get_analysis_result(state: &AppState) -> CommandResult<Option<AnalysisResult>> {
    Ok(state
        .analysis_domain
        .get_orchestrator()
        .current_result()
        .await)
}

/// 更新对话输入框
pub async fn set_chat_input(state: &AppState, text: &str) -> CommandResult<()> {
    state
        .analysis_domain
        .get_conversation()
        .set_input(text)
        .await;
    Ok(())
}

/// 发送对话消息（需要登录），以当前分析结果为上下文
pub async fn send_chat_message(
    state: &AppState,
    text: &str,
) -> CommandResult<Option<ConversationMessage>> {
    state.community_domain.get_accounts().require_user().await?;

    let context = state
        .analysis_domain
        .get_orchestrator()
        .current_result()
        .await;
    Ok(state
        .analysis_domain
        .get_conversation()
        .send_message(text, context)
        .await?)
}

/// 发送输入框中的内容（需要登录）
pub async fn send_chat_input(state: &AppState) -> CommandResult<Option<ConversationMessage>> {
    state.community_domain.get_accounts().require_user().await?;

    let context = state
        .analysis_domain
        .get_orchestrator()
        .current_result()
        .await;
    Ok(state
        .analysis_domain
        .get_conversation()
        .send_input(context)
        .await?)
}

pub async fn get_conversation(state: &AppState) -> CommandResult<SessionSnapshot> {
    Ok(state.analysis_domain.get_conversation().snapshot().await)
}
