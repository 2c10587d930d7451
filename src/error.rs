// 错误分类 - 分析/对话/列表引擎共用的错误类型
//
// 引擎内部返回 AppError，命令层统一转换为带 kind 的 CommandError

use serde::Serialize;
use thiserror::Error;

/// 错误类别（传给前端，用于区分展示方式）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Precondition,
    Gateway,
    Extraction,
    Parse,
    Schema,
    InvalidSelection,
    Superseded,
    Busy,
    Unauthenticated,
    Account,
    Storage,
}

#[derive(Debug, Error)]
pub enum AppError {
    /// 前置条件不满足（例如未选择地区）
    #[error("{0}")]
    Precondition(String),

    /// 网络、HTTP 状态码或空响应
    #[error("LLM 网关错误: {0}")]
    Gateway(String),

    /// 响应中找不到 {...} 片段
    #[error("无法从响应中提取 JSON: {0}")]
    Extraction(String),

    #[error("JSON 解析失败: {0}")]
    Parse(String),

    /// 字段缺失或取值不合法，列出全部问题
    #[error("分析结果结构不符合预期: {}", .issues.join("; "))]
    Schema { issues: Vec<String> },

    #[error("无效的分类选择: {0}")]
    InvalidSelection(String),

    /// 已被更新的请求取代，结果被丢弃
    #[error("请求 #{token} 已被新的请求取代")]
    Superseded { token: u64 },

    #[error("上一条消息仍在等待回复")]
    Busy,

    #[error("请先登录")]
    Unauthenticated,

    #[error("{0}")]
    Account(String),

    #[error("存储错误: {0}")]
    Storage(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::Gateway(_) => ErrorKind::Gateway,
            Self::Extraction(_) => ErrorKind::Extraction,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Schema { .. } => ErrorKind::Schema,
            Self::InvalidSelection(_) => ErrorKind::InvalidSelection,
            Self::Superseded { .. } => ErrorKind::Superseded,
            Self::Busy => ErrorKind::Busy,
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Account(_) => ErrorKind::Account,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Gateway(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

/// 命令层错误 - 同时携带类别与消息
#[derive(Debug, Clone, Serialize)]
pub struct CommandError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<AppError> for CommandError {
    fn from(err: AppError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

pub type AppResult<T> = Result<T, AppError>;
