// 社区模块 - 帖子列表、分页与发帖

pub mod listing;
pub mod remote;
pub mod seed;

pub use listing::{ListingEngine, ListingSnapshot, PostDraft};
pub use remote::{HttpPostSource, PostSource};
