// 事件总线 - 核心引擎与界面层之间的单向通知
//
// 引擎只发布事件，不关心谁在监听
// 使用 tokio::sync::broadcast 实现

use crate::models::{District, PostFilter};
use crate::selection::CategorySelection;
use tokio::sync::broadcast;

/// 应用事件枚举
#[derive(Debug, Clone)]
pub enum AppEvent {
    // --- 选择事件 ---

    /// 地图选中了地区
    DistrictSelected { district: District },

    /// 分类选择发生变化
    CategoryChanged { selection: CategorySelection },

    // --- 分析事件 ---

    AnalysisStarted {
        token: u64,
        district: String,
        category_sub: String,
    },

    /// 新结果已写入结果槽
    AnalysisCompleted {
        token: u64,
        district: String,
        suitability: u8,
    },

    /// 分析失败，原结果保留
    AnalysisFailed {
        token: u64,
        kind: crate::error::ErrorKind,
        error: String,
    },

    /// 迟到的响应被丢弃
    AnalysisSuperseded { token: u64, latest: u64 },

    // --- 对话事件 ---

    ChatTurnStarted { session_id: String, history_len: usize },

    ChatReplied { session_id: String, history_len: usize },

    ChatFailed { session_id: String, error: String },

    // --- 社区事件 ---

    /// 帖子列表已重新合并
    PostsLoaded {
        filter: PostFilter,
        total_items: usize,
        from_cache: usize,
        from_seed: usize,
        from_remote: usize,
    },

    /// 页码变化，界面应滚动到顶部
    PageChanged { page: usize, scroll_to_top: bool },

    // --- 系统事件 ---

    /// 配置更新事件
    ConfigUpdated { config_type: String },
}

/// 事件总线
///
/// 支持多个订阅者同时接收事件
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl EventBus {
    /// 创建新的事件总线
    ///
    /// # 参数
    /// - `capacity`: 事件缓冲区大小
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// 发布事件，没有订阅者时直接丢弃
    pub fn publish(&self, event: AppEvent) {
        match self.sender.send(event) {
            Ok(receiver_count) => {
                tracing::trace!("事件已发布，订阅者数量: {}", receiver_count);
            }
            Err(_) => {
                tracing::trace!("事件已发布但无订阅者");
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_basic() {
        let bus = EventBus::new(16);
        let mut receiver = bus.subscribe();

        bus.publish(AppEvent::PageChanged {
            page: 2,
            scroll_to_top: true,
        });

        match receiver.recv().await {
            Ok(AppEvent::PageChanged {
                page,
                scroll_to_top,
            }) => {
                assert_eq!(page, 2);
                assert!(scroll_to_top);
            }
            _ => panic!("未收到预期事件"),
        }
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut receiver1 = bus.subscribe();
        let mut receiver2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(AppEvent::AnalysisSuperseded { token: 1, latest: 2 });

        assert!(receiver1.try_recv().is_ok());
        assert!(receiver2.try_recv().is_ok());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        bus.publish(AppEvent::ConfigUpdated {
            config_type: "llm".to_string(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }
}
