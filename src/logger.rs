// 自定义日志层 - 将日志实时推送给界面层订阅者

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// 日志消息
#[derive(Clone, Debug, serde::Serialize)]
pub struct LogMessage {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
}

/// 日志推送器
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogMessage>,
    enabled: AtomicBool,
}

impl LogBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            enabled: AtomicBool::new(true),
        }
    }

    /// 设置日志推送开关
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogMessage> {
        self.sender.subscribe()
    }

    fn emit_log(&self, log: LogMessage) {
        if !self.is_enabled() {
            return;
        }
        // 没有订阅者时丢弃
        let _ = self.sender.send(log);
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new(512)
    }
}

/// 自定义日志层
pub struct UiLogLayer {
    broadcaster: Arc<LogBroadcaster>,
}

impl UiLogLayer {
    pub fn new(broadcaster: Arc<LogBroadcaster>) -> Self {
        Self { broadcaster }
    }
}

struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
            // 移除首尾引号
            if self.message.len() >= 2 && self.message.starts_with('"') && self.message.ends_with('"') {
                self.message = self.message[1..self.message.len() - 1].to_string();
            }
        }
    }
}

impl<S: Subscriber> Layer<S> for UiLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !self.broadcaster.is_enabled() {
            return;
        }

        let metadata = event.metadata();
        let mut visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut visitor);

        self.broadcaster.emit_log(LogMessage {
            timestamp: chrono::Local::now()
                .format("%Y-%m-%d %H:%M:%S%.3f")
                .to_string(),
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message: visitor.message,
        });
    }
}

/// 初始化日志系统：控制台 + 按天轮转的文件 + 界面推送
///
/// 返回的 guard 需要保持到程序退出，否则文件日志可能丢失
pub fn init_with_broadcaster(log_dir: &Path, broadcaster: Arc<LogBroadcaster>) -> Result<WorkerGuard> {
    use tracing_subscriber::fmt::time::LocalTime;
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "app.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // 同时输出到控制台和文件
    let writer = std::io::stdout.and(non_blocking);

    // 使用本地时区
    let timer = LocalTime::new(time::macros::format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
    ));

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(writer)
        .with_timer(timer)
        .with_ansi(cfg!(debug_assertions))
        .finish()
        .with(UiLogLayer::new(broadcaster));

    tracing::subscriber::set_global_default(subscriber)?;

    eprintln!("日志文件位置: {:?}", log_dir);
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_layer_forwards_messages() {
        let broadcaster = Arc::new(LogBroadcaster::new(16));
        let mut receiver = broadcaster.subscribe();
        let subscriber = tracing_subscriber::registry().with(UiLogLayer::new(broadcaster.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("分析完成: {}", "강남");
        });

        let log = receiver.try_recv().unwrap();
        assert_eq!(log.level, "INFO");
        assert_eq!(log.message, "分析完成: 강남");
    }

    #[test]
    fn test_disabled_broadcaster_drops_logs() {
        let broadcaster = Arc::new(LogBroadcaster::new(16));
        broadcaster.set_enabled(false);
        let mut receiver = broadcaster.subscribe();
        let subscriber = tracing_subscriber::registry().with(UiLogLayer::new(broadcaster.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("不会被推送");
        });

        assert!(receiver.try_recv().is_err());
    }
}
