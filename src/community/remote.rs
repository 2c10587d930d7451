// 远程帖子接口 - GET {url}[?category=...]，返回帖子数组
//
// 按分类过滤由服务端负责

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::{Post, PostFilter};

/// 帖子来源接口
#[async_trait]
pub trait PostSource: Send + Sync {
    async fn fetch(&self, filter: PostFilter) -> AppResult<Vec<Post>>;

    fn name(&self) -> &str;
}

pub struct HttpPostSource {
    client: Client,
    url: String,
}

impl HttpPostSource {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl PostSource for HttpPostSource {
    async fn fetch(&self, filter: PostFilter) -> AppResult<Vec<Post>> {
        let mut request = self.client.get(&self.url);
        if let Some(category) = filter.query_value() {
            request = request.query(&[("category", category)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Gateway(format!(
                "帖子接口请求失败: {}",
                status
            )));
        }

        let body: Value = response.json().await?;
        let posts = parse_posts(body);
        debug!("远程帖子 {} 条", posts.len());
        Ok(posts)
    }

    fn name(&self) -> &str {
        &self.url
    }
}

/// 非数组响应视为空列表，无法识别的条目跳过
pub fn parse_posts(body: Value) -> Vec<Post> {
    let Value::Array(items) = body else {
        warn!("帖子接口返回的不是数组，按空列表处理");
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Post>(item) {
            Ok(post) => Some(post),
            Err(e) => {
                warn!("跳过无法识别的帖子: {}", e);
                None
            }
        })
        .collect()
}
