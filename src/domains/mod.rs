// 领域模块 - 按业务领域分组应用状态
//
// 包含3个领域：分析（选择/分析/对话）、社区（帖子/账户）、系统

pub mod analysis;
pub mod community;
pub mod system;

pub use analysis::AnalysisDomain;
pub use community::CommunityDomain;
pub use system::SystemDomain;
