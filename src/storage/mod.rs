// 存储模块 - 客户端本地键值存储（尽力而为的缓存，不是数据源）
//
// 每个键保存一个 JSON 序列化的数据块

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// 当前登录用户
pub const KEY_CURRENT_USER: &str = "current_user";
/// 已注册用户列表
pub const KEY_REGISTERED_USERS: &str = "registered_users";
/// 本地缓存的帖子列表
pub const KEY_COMMUNITY_POSTS: &str = "community_posts";

/// 键值存储接口 - 所有存储实现必须实现此 trait
#[async_trait]
pub trait KvStore: Send + Sync {
    /// 读取原始字符串
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// 写入（覆盖）
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// 删除
    async fn remove(&self, key: &str) -> Result<()>;

    fn store_type(&self) -> &str;
}

/// 带 JSON 编解码的存储包装器
#[derive(Clone)]
pub struct BlobStore {
    inner: Arc<dyn KvStore>,
}

impl BlobStore {
    pub fn new(inner: Arc<dyn KvStore>) -> Self {
        Self { inner }
    }

    /// 仅用于测试和无持久化场景
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// 读取并反序列化，损坏的数据块会被删除并视为不存在
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.inner.get(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("本地数据 {} 已损坏，将被清除: {}", key, e);
                self.inner.remove(key).await?;
                Ok(None)
            }
        }
    }

    pub async fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.inner.set(key, &json).await
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key).await
    }

    pub fn store_type(&self) -> &str {
        self.inner.store_type()
    }
}
