//! 命令模块
//!
//! 界面层调用的全部命令，按功能分组：
//! - analysis: 地区/分类选择、商圈分析、对话
//! - community: 帖子列表、分页、发帖与删帖
//! - account: 注册、登录、登出
//! - config: 配置读取与更新
//!
//! 所有命令返回 `CommandResult`，错误携带类别，界面可按类别区分展示

pub mod account;
pub mod analysis;
pub mod community;
pub mod config;

pub use account::*;
pub use analysis::*;
pub use community::*;
pub use config::*;

use crate::error::CommandError;

pub type CommandResult<T> = Result<T, CommandError>;
