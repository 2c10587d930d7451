// 对话会话管理 - 有序的消息历史 + 单条在途消息
//
// Idle -> Sending -> {回复已追加, 失败} -> Idle
// 用户消息先行追加（乐观），失败时不回滚，只把状态标记为 Failed

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::event_bus::{AppEvent, EventBus};
use crate::llm::{build_chat_prompt, LlmManager, LlmRequest, RequestKind};
use crate::models::{AnalysisResult, ConversationMessage, MessageStatus};

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Idle,
    Sending,
}

#[derive(Debug)]
struct SessionState {
    history: Vec<ConversationMessage>,
    turn: TurnState,
    input: String,
}

/// 会话快照
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub state: TurnState,
    pub input: String,
    pub history: Vec<ConversationMessage>,
}

pub struct ConversationSession {
    id: String,
    llm: Arc<LlmManager>,
    state: RwLock<SessionState>,
    event_bus: Arc<EventBus>,
}

impl ConversationSession {
    pub fn new(llm: Arc<LlmManager>, event_bus: Arc<EventBus>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            llm,
            state: RwLock::new(SessionState {
                history: Vec::new(),
                turn: TurnState::Idle,
                input: String::new(),
            }),
            event_bus,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn history(&self) -> Vec<ConversationMessage> {
        self.state.read().await.history.clone()
    }

    pub async fn turn_state(&self) -> TurnState {
        self.state.read().await.turn
    }

    /// 更新输入框内容
    pub async fn set_input(&self, text: impl Into<String>) {
        self.state.write().await.input = text.into();
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        SessionSnapshot {
            id: self.id.clone(),
            state: state.turn,
            input: state.input.clone(),
            history: state.history.clone(),
        }
    }

    /// 发送输入框中的内容
    pub async fn send_input(
        &self,
        context: Option<AnalysisResult>,
    ) -> AppResult<Option<ConversationMessage>> {
        let text = self.state.read().await.input.clone();
        self.send_message(&text, context).await
    }

    /// 发送一条消息
    ///
    /// 空白输入返回 `Ok(None)` 且不改变任何状态；发送中再次调用返回 `Busy`
    pub async fn send_message(
        &self,
        text: &str,
        context: Option<AnalysisResult>,
    ) -> AppResult<Option<ConversationMessage>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let (index, history_len) = {
            let mut state = self.state.write().await;
            if state.turn == TurnState::Sending {
                return Err(AppError::Busy);
            }
            state.history.push(ConversationMessage::user(text));
            state.input.clear();
            state.turn = TurnState::Sending;
            (state.history.len() - 1, state.history.len())
        };
        self.event_bus.publish(AppEvent::ChatTurnStarted {
            session_id: self.id.clone(),
            history_len,
        });

        let request = LlmRequest {
            prompt: build_chat_prompt(text, context.as_ref()),
            kind: RequestKind::Chat {
                message: text.to_string(),
                context,
            },
        };
        let outcome = self.llm.send(&request).await;

        let mut state = self.state.write().await;
        state.turn = TurnState::Idle;

        match outcome {
            Ok(reply) => {
                if let Some(message) = state.history.get_mut(index) {
                    message.status = MessageStatus::Delivered;
                }
                let message = ConversationMessage::model(reply);
                state.history.push(message.clone());
                info!("会话 {} 收到回复（{} 条消息）", self.id, state.history.len());
                self.event_bus.publish(AppEvent::ChatReplied {
                    session_id: self.id.clone(),
                    history_len: state.history.len(),
                });
                Ok(Some(message))
            }
            Err(e) => {
                if let Some(message) = state.history.get_mut(index) {
                    message.status = MessageStatus::Failed;
                }
                error!("会话 {} 回复失败: {}", self.id, e);
                self.event_bus.publish(AppEvent::ChatFailed {
                    session_id: self.id.clone(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }
}
