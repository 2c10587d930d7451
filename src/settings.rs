// 配置管理 - JSON 文件持久化，支持部分更新

use std::path::PathBuf;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::warn;

use crate::models::{AppConfig, PersistedAppConfig};

pub struct SettingsManager {
    path: PathBuf,
    data: RwLock<PersistedAppConfig>,
}

impl SettingsManager {
    pub async fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut initial = match tokio::fs::read(&path).await {
            Ok(bytes) if !bytes.is_empty() => {
                serde_json::from_slice::<PersistedAppConfig>(&bytes).unwrap_or_else(|e| {
                    warn!("配置文件解析失败，使用默认配置: {}", e);
                    PersistedAppConfig::default()
                })
            }
            _ => {
                let default = PersistedAppConfig::default();
                let json = serde_json::to_string_pretty(&default)?;
                tokio::fs::write(&path, json).await?;
                default
            }
        };

        if let Err(e) = initial.community.validate() {
            warn!("社区配置无效，使用默认每页条数: {}", e);
            initial.community = initial.community.normalized();
        }

        Ok(Self {
            path,
            data: RwLock::new(initial),
        })
    }

    pub async fn get(&self) -> PersistedAppConfig {
        self.data.read().await.clone()
    }

    /// 合并部分更新并写回文件，返回更新了哪些部分
    pub async fn update(&self, update: AppConfig) -> Result<(PersistedAppConfig, Vec<&'static str>)> {
        if let Some(community) = &update.community {
            community.validate().map_err(anyhow::Error::msg)?;
        }

        let mut config = self.data.write().await;
        let mut changed = Vec::new();

        if let Some(llm) = update.llm {
            config.llm = llm;
            changed.push("llm");
        }
        if let Some(validation) = update.validation {
            config.validation = validation;
            changed.push("validation");
        }
        if let Some(community) = update.community {
            config.community = community;
            changed.push("community");
        }
        if let Some(store) = update.store {
            config.store = store;
            changed.push("store");
        }

        self.save(&config).await?;
        Ok((config.clone(), changed))
    }

    async fn save(&self, config: &PersistedAppConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}
