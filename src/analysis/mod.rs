//! 分析与对话模块
//!
//! - 分析编排：单结果槽，迟到的响应按 token 丢弃
//! - 对话会话：有序历史，同一时间只有一条在途消息

pub mod conversation;
pub mod orchestrator;

pub use conversation::{ConversationSession, SessionSnapshot, TurnState};
pub use orchestrator::AnalysisOrchestrator;
