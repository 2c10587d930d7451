// 数据模型模块 - 定义所有的数据结构

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// 重新导出其他模块的类型
pub use crate::llm::LlmSettings;

/// 地区参考数据（由地图组件选中，核心逻辑只读）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct District {
    /// 地区名称
    pub name: String,
    /// 纬度
    pub lat: f64,
    /// 经度
    pub lng: f64,
    /// 人口（原样嵌入提示词，如 "85.0K"）
    pub population: String,
    /// 平均租金（如 "520만원"）
    pub rent: String,
}

/// 竞争强度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Competition {
    #[serde(rename = "낮음")]
    Low,
    #[serde(rename = "보통")]
    Medium,
    #[serde(rename = "높음")]
    High,
    #[serde(rename = "매우높음", alias = "매우 높음")]
    VeryHigh,
}

impl Competition {
    pub fn parse(raw: &str) -> Option<Self> {
        // 模型经常输出带空格的 "매우 높음"
        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        match compact.as_str() {
            "낮음" => Some(Self::Low),
            "보통" => Some(Self::Medium),
            "높음" => Some(Self::High),
            "매우높음" => Some(Self::VeryHigh),
            _ => None,
        }
    }
}

/// 交通便利度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Accessibility {
    #[serde(rename = "최상")]
    Excellent,
    #[serde(rename = "우수")]
    Good,
    #[serde(rename = "보통")]
    Fair,
    #[serde(rename = "불량")]
    Poor,
}

impl Accessibility {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "최상" => Some(Self::Excellent),
            "우수" => Some(Self::Good),
            "보통" => Some(Self::Fair),
            "불량" => Some(Self::Poor),
            _ => None,
        }
    }
}

/// 性别比例（男女之和为100）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenderRatio {
    pub male: f64,
    pub female: f64,
}

/// 人口板块
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationBlock {
    pub total: String,
    pub main_age: String,
    pub gender_ratio: GenderRatio,
    /// 오전, 점심, 오후, 저녁, 밤, 심야 六个时段的活跃度（0-100）
    pub time_slots: [f64; 6],
}

/// 商圈板块
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketBlock {
    pub avg_sales: String,
    pub competition: Competition,
    pub avg_rent: String,
    pub nearby_similar: u32,
}

/// 交通板块
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficBlock {
    pub subway: String,
    pub bus: String,
    pub accessibility: Accessibility,
}

/// 分析结果 - 只能由响应校验成功后创建，每次分析整体替换
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// 地区名称（由请求填充，不来自模型）
    #[serde(default)]
    pub name: String,
    /// 综合适合度（0-100）
    pub suitability: u8,
    pub population: PopulationBlock,
    pub market: MarketBlock,
    pub traffic: TrafficBlock,
}

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// 消息状态（用户消息在回复失败时标记为 Failed，不回滚）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Failed,
}

/// 对话消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub text: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            status: MessageStatus::Sent,
            created_at: Utc::now(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
            status: MessageStatus::Delivered,
            created_at: Utc::now(),
        }
    }
}

/// 帖子分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostCategory {
    Free,
    #[serde(alias = "Q&A")]
    Question,
    Review,
}

impl PostCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Question => "Question",
            Self::Review => "Review",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Free" | "free" | "자유게시판" => Some(Self::Free),
            "Question" | "question" | "Q&A" | "질문/답변" => Some(Self::Question),
            "Review" | "review" | "리뷰" => Some(Self::Review),
            _ => None,
        }
    }
}

/// 列表过滤条件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "type", content = "category")]
pub enum PostFilter {
    #[default]
    All,
    Only(PostCategory),
}

impl PostFilter {
    pub fn matches(&self, post: &Post) -> bool {
        match self {
            Self::All => true,
            Self::Only(category) => post.category == *category,
        }
    }

    /// 远程接口的 `?category=` 参数
    pub fn query_value(&self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::Only(category) => Some(category.as_str()),
        }
    }
}

/// 社区帖子
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: PostCategory,
    pub author_id: i64,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub views: u32,
}

/// 用户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// 分页状态（currentPage 从 1 开始）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageState {
    pub current_page: usize,
    pub page_size: usize,
    pub total_items: usize,
}

impl PageState {
    pub fn total_pages(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        self.total_items.div_ceil(self.page_size)
    }
}

/// 响应校验参数
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidationSettings {
    /// 严格解析失败后是否尝试修复 JSON（默认关闭）
    #[serde(default)]
    pub repair_malformed_json: bool,
}

/// 社区列表配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunitySettings {
    /// 每页帖子数
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// 远程帖子接口（如 http://host/api/get_posts.php）
    #[serde(default)]
    pub posts_api_url: Option<String>,
    /// 是否将页码限制在 [1, totalPages]
    #[serde(default = "default_true")]
    pub clamp_pagination: bool,
    /// 是否按 id 去重
    #[serde(default)]
    pub dedupe_posts: bool,
}

fn default_page_size() -> usize {
    8
}

fn default_true() -> bool {
    true
}

impl CommunitySettings {
    /// 每页条数必须为正
    pub fn validate(&self) -> Result<(), String> {
        if self.page_size == 0 {
            return Err("page_size 必须大于 0".to_string());
        }
        Ok(())
    }

    /// 非法的每页条数恢复为默认值
    pub fn normalized(mut self) -> Self {
        if self.page_size == 0 {
            self.page_size = default_page_size();
        }
        self
    }
}

impl Default for CommunitySettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            posts_api_url: None,
            clamp_pagination: true,
            dedupe_posts: false,
        }
    }
}

/// 本地存储配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreSettings {
    /// SQLite 文件路径（为空时使用数据目录下的默认文件）
    #[serde(default)]
    pub db_path: Option<String>,
}

/// 持久化的应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersistedAppConfig {
    /// LLM配置
    #[serde(default)]
    pub llm: LlmSettings,
    /// 响应校验
    #[serde(default)]
    pub validation: ValidationSettings,
    /// 社区列表
    #[serde(default)]
    pub community: CommunitySettings,
    /// 本地存储
    #[serde(default)]
    pub store: StoreSettings,
}

/// 应用配置（部分更新，字段均可选）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub llm: Option<LlmSettings>,
    pub validation: Option<ValidationSettings>,
    pub community: Option<CommunitySettings>,
    pub store: Option<StoreSettings>,
}
