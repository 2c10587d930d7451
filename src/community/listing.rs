// 帖子列表与分页引擎
//
// 合并顺序：本地缓存 -> 内置示例 -> 远程接口
// 缓存与示例由引擎按分类过滤，远程结果由服务端过滤

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::remote::{HttpPostSource, PostSource};
use super::seed::seed_posts;
use crate::error::{AppError, AppResult};
use crate::event_bus::{AppEvent, EventBus};
use crate::models::{CommunitySettings, PageState, Post, PostCategory, PostFilter, User};
use crate::storage::{BlobStore, KEY_COMMUNITY_POSTS};

/// 新帖子内容
#[derive(Debug, Clone, Deserialize)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub category: PostCategory,
}

/// 列表快照（当前页）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSnapshot {
    pub filter: PostFilter,
    pub page: PageState,
    pub total_pages: usize,
    pub posts: Vec<Post>,
}

#[derive(Debug, Default)]
struct ListingState {
    filter: PostFilter,
    posts: Vec<Post>,
    current_page: usize,
}

fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

pub struct ListingEngine {
    store: BlobStore,
    source: RwLock<Option<Arc<dyn PostSource>>>,
    settings: RwLock<CommunitySettings>,
    state: RwLock<ListingState>,
    load_generation: AtomicU64,
    http_client: Option<Client>,
    event_bus: Arc<EventBus>,
}

impl ListingEngine {
    /// 根据配置创建，配置了接口地址时启用远程来源
    pub fn new(
        client: Client,
        store: BlobStore,
        settings: CommunitySettings,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let source = build_source(&client, &settings);
        let mut engine = Self::with_source(store, source, settings, event_bus);
        engine.http_client = Some(client);
        engine
    }

    /// 使用指定的远程来源创建
    pub fn with_source(
        store: BlobStore,
        source: Option<Arc<dyn PostSource>>,
        settings: CommunitySettings,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            store,
            source: RwLock::new(source),
            settings: RwLock::new(settings.normalized()),
            state: RwLock::new(ListingState {
                current_page: 1,
                ..Default::default()
            }),
            load_generation: AtomicU64::new(0),
            http_client: None,
            event_bus,
        }
    }

    pub async fn apply_settings(&self, settings: CommunitySettings) {
        let settings = settings.normalized();
        if let Some(client) = &self.http_client {
            *self.source.write().await = build_source(client, &settings);
        }

        if settings.clamp_pagination {
            let mut state = self.state.write().await;
            let total_pages = PageState {
                current_page: state.current_page,
                page_size: settings.page_size,
                total_items: state.posts.len(),
            }
            .total_pages();
            state.current_page = clamp_page(state.current_page, total_pages);
        }

        *self.settings.write().await = settings;
    }

    pub async fn filter(&self) -> PostFilter {
        self.state.read().await.filter
    }

    /// 切换分类：页码回到 1 并重新加载
    pub async fn set_filter(&self, filter: PostFilter) -> AppResult<ListingSnapshot> {
        {
            let mut state = self.state.write().await;
            state.filter = filter;
            state.current_page = 1;
        }
        self.event_bus.publish(AppEvent::PageChanged {
            page: 1,
            scroll_to_top: false,
        });
        self.load_posts().await
    }

    /// 重新合并三个来源
    pub async fn load_posts(&self) -> AppResult<ListingSnapshot> {
        let generation = self.load_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let filter = self.state.read().await.filter;
        let settings = self.settings.read().await.clone();

        // 本地缓存先行展示
        self.commit(generation, filter, Vec::new(), None).await;

        let seeds: Vec<Post> = seed_posts(Utc::now())
            .into_iter()
            .filter(|post| filter.matches(post))
            .collect();
        let from_seed = seeds.len();

        let source = self.source.read().await.clone();
        let remote = match source {
            Some(source) => match source.fetch(filter).await {
                Ok(posts) => posts,
                Err(e) => {
                    warn!("远程帖子加载失败({}): {}", source.name(), e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        let from_remote = remote.len();

        let mut rest = seeds;
        rest.extend(remote);

        if let Some((total_items, from_cache)) =
            self.commit(generation, filter, rest, Some(&settings)).await
        {
            info!(
                "帖子加载完成: 共 {} 条（缓存 {}，示例 {}，远程 {}）",
                total_items, from_cache, from_seed, from_remote
            );
            self.event_bus.publish(AppEvent::PostsLoaded {
                filter,
                total_items,
                from_cache,
                from_seed,
                from_remote,
            });
        }

        Ok(self.snapshot().await)
    }

    /// 写入工作集：持锁重新读取缓存后拼接 `rest`，已有更新的加载时放弃
    ///
    /// `settings` 为 None 表示中间结果，不去重也不调整页码。返回 (总数, 缓存条数)
    async fn commit(
        &self,
        generation: u64,
        filter: PostFilter,
        rest: Vec<Post>,
        settings: Option<&CommunitySettings>,
    ) -> Option<(usize, usize)> {
        let mut state = self.state.write().await;
        if generation != self.load_generation.load(Ordering::SeqCst) {
            debug!("加载 #{} 已过期，忽略", generation);
            return None;
        }

        // 在锁内读取，加载期间新发的帖子不会被覆盖
        let mut merged: Vec<Post> = self
            .cached_posts()
            .await
            .into_iter()
            .filter(|post| filter.matches(post))
            .collect();
        let from_cache = merged.len();
        merged.extend(rest);

        if let Some(settings) = settings {
            if settings.dedupe_posts {
                let mut seen = HashSet::new();
                merged.retain(|post| seen.insert(post.id));
            }
        }
        state.posts = merged;

        if let Some(settings) = settings.filter(|s| s.clamp_pagination) {
            let total_pages = PageState {
                current_page: state.current_page,
                page_size: settings.page_size,
                total_items: state.posts.len(),
            }
            .total_pages();
            state.current_page = clamp_page(state.current_page, total_pages);
        }
        Some((state.posts.len(), from_cache))
    }

    async fn cached_posts(&self) -> Vec<Post> {
        match self.store.load::<Vec<Post>>(KEY_COMMUNITY_POSTS).await {
            Ok(posts) => posts.unwrap_or_default(),
            Err(e) => {
                warn!("读取本地帖子缓存失败: {}", e);
                Vec::new()
            }
        }
    }

    /// 跳转页码并要求界面滚动到顶部
    pub async fn paginate(&self, page: usize) -> PageState {
        let settings = self.settings.read().await.clone();
        let page_state = {
            let mut state = self.state.write().await;
            let total_pages = PageState {
                current_page: state.current_page,
                page_size: settings.page_size,
                total_items: state.posts.len(),
            }
            .total_pages();

            state.current_page = if settings.clamp_pagination {
                clamp_page(page, total_pages)
            } else {
                page
            };

            PageState {
                current_page: state.current_page,
                page_size: settings.page_size,
                total_items: state.posts.len(),
            }
        };

        self.event_bus.publish(AppEvent::PageChanged {
            page: page_state.current_page,
            scroll_to_top: true,
        });
        page_state
    }

    pub async fn page_state(&self) -> PageState {
        let page_size = self.settings.read().await.page_size;
        let state = self.state.read().await;
        PageState {
            current_page: state.current_page,
            page_size,
            total_items: state.posts.len(),
        }
    }

    /// 当前页的帖子
    pub async fn current_page_posts(&self) -> Vec<Post> {
        let page_size = self.settings.read().await.page_size;
        let state = self.state.read().await;
        if page_size == 0 || state.current_page == 0 {
            return Vec::new();
        }

        let start = (state.current_page - 1).saturating_mul(page_size);
        if start >= state.posts.len() {
            return Vec::new();
        }
        let end = start.saturating_add(page_size).min(state.posts.len());
        state.posts[start..end].to_vec()
    }

    pub async fn snapshot(&self) -> ListingSnapshot {
        let page = self.page_state().await;
        ListingSnapshot {
            filter: self.filter().await,
            page,
            total_pages: page.total_pages(),
            posts: self.current_page_posts().await,
        }
    }

    pub async fn get_post(&self, id: i64) -> Option<Post> {
        self.state
            .read()
            .await
            .posts
            .iter()
            .find(|post| post.id == id)
            .cloned()
    }

    /// 发帖（需要登录），新帖置顶并写入本地缓存
    pub async fn create_post(&self, user: Option<&User>, draft: PostDraft) -> AppResult<Post> {
        let user = user.ok_or(AppError::Unauthenticated)?;
        let title = draft.title.trim();
        let content = draft.content.trim();
        if title.is_empty() || content.is_empty() {
            return Err(AppError::Precondition(
                "제목과 내용을 모두 입력해주세요.".to_string(),
            ));
        }

        let mut cached = self.cached_posts().await;
        let now = Utc::now();
        let mut id = now.timestamp_millis();
        while cached.iter().any(|post| post.id == id) {
            id += 1;
        }

        let post = Post {
            id,
            title: title.to_string(),
            content: content.to_string(),
            category: draft.category,
            author_id: user.id,
            author_name: user.name.clone(),
            created_at: now,
            views: 0,
        };

        cached.insert(0, post.clone());
        self.store.save(KEY_COMMUNITY_POSTS, &cached).await?;

        // 并发的加载可能已从缓存中读到这条帖子
        let mut state = self.state.write().await;
        if state.filter.matches(&post) && !state.posts.iter().any(|p| p.id == post.id) {
            state.posts.insert(0, post.clone());
        }
        info!("{} 发布了帖子 #{}", user.name, post.id);
        Ok(post)
    }

    /// 删除本人发布的帖子，页码回到 1 并重新加载
    pub async fn delete_post(&self, user: Option<&User>, id: i64) -> AppResult<ListingSnapshot> {
        let user = user.ok_or(AppError::Unauthenticated)?;

        let mut cached = self.cached_posts().await;
        let index = cached
            .iter()
            .position(|post| post.id == id)
            .ok_or_else(|| {
                AppError::Precondition("로컬에 저장된 글만 삭제할 수 있습니다.".to_string())
            })?;
        if cached[index].author_id != user.id {
            return Err(AppError::Account(
                "본인이 작성한 글만 삭제할 수 있습니다.".to_string(),
            ));
        }

        cached.remove(index);
        self.store.save(KEY_COMMUNITY_POSTS, &cached).await?;
        info!("{} 删除了帖子 #{}", user.name, id);

        self.state.write().await.current_page = 1;
        self.event_bus.publish(AppEvent::PageChanged {
            page: 1,
            scroll_to_top: false,
        });
        self.load_posts().await
    }
}

fn build_source(client: &Client, settings: &CommunitySettings) -> Option<Arc<dyn PostSource>> {
    settings
        .posts_api_url
        .as_ref()
        .filter(|url| !url.trim().is_empty())
        .map(|url| Arc::new(HttpPostSource::new(client.clone(), url.trim().to_string())) as Arc<dyn PostSource>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::{mpsc, oneshot};

    struct FakeSource {
        reply: AppResult<Vec<Post>>,
        filters: Mutex<Vec<PostFilter>>,
    }

    impl FakeSource {
        fn new(reply: AppResult<Vec<Post>>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                filters: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl PostSource for FakeSource {
        async fn fetch(&self, filter: PostFilter) -> AppResult<Vec<Post>> {
            self.filters.lock().unwrap().push(filter);
            match &self.reply {
                Ok(posts) => Ok(posts.clone()),
                Err(e) => Err(AppError::Gateway(e.to_string())),
            }
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    /// 在 fetch 中等待测试放行的来源
    struct GatedSource {
        gate: Mutex<Option<oneshot::Receiver<Vec<Post>>>>,
        entered: mpsc::UnboundedSender<()>,
    }

    #[async_trait]
    impl PostSource for GatedSource {
        async fn fetch(&self, _filter: PostFilter) -> AppResult<Vec<Post>> {
            let gate = self.gate.lock().unwrap().take();
            let _ = self.entered.send(());
            match gate {
                Some(rx) => rx
                    .await
                    .map_err(|_| AppError::Gateway("gate dropped".to_string())),
                None => Ok(Vec::new()),
            }
        }

        fn name(&self) -> &str {
            "gated"
        }
    }

    fn post(id: i64, category: PostCategory, author_id: i64) -> Post {
        Post {
            id,
            title: format!("글 {}", id),
            content: "내용".to_string(),
            category,
            author_id,
            author_name: format!("user{}", author_id),
            created_at: Utc::now(),
            views: 0,
        }
    }

    fn user(id: i64) -> User {
        User {
            id,
            name: format!("user{}", id),
            email: None,
        }
    }

    fn engine(
        store: BlobStore,
        source: Option<Arc<dyn PostSource>>,
        settings: CommunitySettings,
    ) -> (ListingEngine, Arc<EventBus>) {
        let bus = Arc::new(EventBus::new(64));
        (
            ListingEngine::with_source(store, source, settings, bus.clone()),
            bus,
        )
    }

    fn ids(posts: &[Post]) -> Vec<i64> {
        posts.iter().map(|p| p.id).collect()
    }

    #[tokio::test]
    async fn test_merge_order_and_filtering() {
        let store = BlobStore::in_memory();
        store
            .save(
                KEY_COMMUNITY_POSTS,
                &vec![post(1, PostCategory::Free, 50), post(2, PostCategory::Review, 50)],
            )
            .await
            .unwrap();
        // 远程结果不再过滤
        let source = FakeSource::new(Ok(vec![
            post(900, PostCategory::Free, 60),
            post(901, PostCategory::Review, 60),
        ]));
        let (engine, _) = engine(store, Some(source.clone()), CommunitySettings::default());

        let snapshot = engine
            .set_filter(PostFilter::Only(PostCategory::Free))
            .await
            .unwrap();
        assert_eq!(snapshot.page.total_items, 5);
        assert_eq!(ids(&snapshot.posts), vec![1, 101, 102, 900, 901]);
        assert_eq!(
            source.filters.lock().unwrap().as_slice(),
            &[PostFilter::Only(PostCategory::Free)]
        );
    }

    #[tokio::test]
    async fn test_duplicates_kept_unless_dedupe() {
        let duplicate = || Ok(vec![post(101, PostCategory::Free, 1)]);

        let (engine_a, _) = engine(
            BlobStore::in_memory(),
            Some(FakeSource::new(duplicate())),
            CommunitySettings::default(),
        );
        let snapshot = engine_a.load_posts().await.unwrap();
        assert_eq!(snapshot.page.total_items, 10);

        let (engine_b, _) = engine(
            BlobStore::in_memory(),
            Some(FakeSource::new(duplicate())),
            CommunitySettings {
                dedupe_posts: true,
                ..Default::default()
            },
        );
        let snapshot = engine_b.load_posts().await.unwrap();
        assert_eq!(snapshot.page.total_items, 9);
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_local_sources() {
        let store = BlobStore::in_memory();
        store
            .save(KEY_COMMUNITY_POSTS, &vec![post(1, PostCategory::Free, 50)])
            .await
            .unwrap();
        let source = FakeSource::new(Err(AppError::Gateway("connection refused".into())));
        let (engine, bus) = engine(store, Some(source), CommunitySettings::default());
        let mut events = bus.subscribe();

        let snapshot = engine.load_posts().await.unwrap();
        assert_eq!(snapshot.page.total_items, 10);
        assert!(matches!(
            events.try_recv(),
            Ok(AppEvent::PostsLoaded {
                from_cache: 1,
                from_seed: 9,
                from_remote: 0,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_paginate_clamps_to_total_pages() {
        let (engine, bus) = engine(BlobStore::in_memory(), None, CommunitySettings::default());
        engine.load_posts().await.unwrap();
        let mut events = bus.subscribe();

        let total_pages = engine.page_state().await.total_pages();
        assert_eq!(total_pages, 2);

        let state = engine.paginate(total_pages + 5).await;
        assert_eq!(state.current_page, 2);
        assert!(state.current_page <= state.total_pages());
        assert_eq!(engine.current_page_posts().await.len(), 1);
        assert!(matches!(
            events.try_recv(),
            Ok(AppEvent::PageChanged {
                page: 2,
                scroll_to_top: true
            })
        ));

        assert_eq!(engine.paginate(0).await.current_page, 1);
        assert_eq!(engine.current_page_posts().await.len(), 8);
    }

    #[tokio::test]
    async fn test_paginate_legacy_mode_is_permissive() {
        let (engine, bus) = engine(
            BlobStore::in_memory(),
            None,
            CommunitySettings {
                clamp_pagination: false,
                ..Default::default()
            },
        );
        engine.load_posts().await.unwrap();
        let mut events = bus.subscribe();

        let total_pages = engine.page_state().await.total_pages();
        let state = engine.paginate(total_pages + 5).await;
        assert_eq!(state.current_page, 7);
        assert!(state.current_page > state.total_pages());
        assert!(engine.current_page_posts().await.is_empty());
        assert!(matches!(
            events.try_recv(),
            Ok(AppEvent::PageChanged {
                page: 7,
                scroll_to_top: true
            })
        ));
    }

    #[tokio::test]
    async fn test_filter_change_resets_page() {
        let (engine, _) = engine(
            BlobStore::in_memory(),
            None,
            CommunitySettings {
                page_size: 2,
                ..Default::default()
            },
        );
        engine.load_posts().await.unwrap();
        engine.paginate(3).await;
        assert_eq!(engine.page_state().await.current_page, 3);

        let snapshot = engine
            .set_filter(PostFilter::Only(PostCategory::Review))
            .await
            .unwrap();
        assert_eq!(snapshot.page.current_page, 1);
        assert_eq!(snapshot.page.total_items, 5);
        assert!(snapshot
            .posts
            .iter()
            .all(|p| p.category == PostCategory::Review));

        let snapshot = engine.set_filter(PostFilter::All).await.unwrap();
        assert_eq!(snapshot.page.current_page, 1);
        assert_eq!(snapshot.page.total_items, 9);
    }

    #[tokio::test]
    async fn test_create_and_delete_post() {
        let store = BlobStore::in_memory();
        let (engine, _) = engine(store.clone(), None, CommunitySettings::default());
        engine.load_posts().await.unwrap();

        let draft = || PostDraft {
            title: "홍대 카페 후기".to_string(),
            content: "주말 유동인구가 많아요".to_string(),
            category: PostCategory::Review,
        };

        let err = engine.create_post(None, draft()).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));

        let blank = PostDraft {
            title: "  ".to_string(),
            ..draft()
        };
        assert!(engine.create_post(Some(&user(7)), blank).await.is_err());

        let created = engine.create_post(Some(&user(7)), draft()).await.unwrap();
        assert_eq!(engine.current_page_posts().await[0].id, created.id);
        let cached: Vec<Post> = store.load(KEY_COMMUNITY_POSTS).await.unwrap().unwrap();
        assert_eq!(ids(&cached), vec![created.id]);

        // 示例帖子不在本地缓存中
        assert!(engine.delete_post(Some(&user(1)), 101).await.is_err());

        let err = engine
            .delete_post(Some(&user(8)), created.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Account(_)));

        engine.paginate(2).await;
        let snapshot = engine.delete_post(Some(&user(7)), created.id).await.unwrap();
        assert_eq!(snapshot.page.current_page, 1);
        assert_eq!(snapshot.page.total_items, 9);
        assert!(engine.get_post(created.id).await.is_none());
    }

    #[tokio::test]
    async fn test_post_created_during_load_survives() {
        let (release, gate) = oneshot::channel();
        let (entered_tx, mut entered) = mpsc::unbounded_channel();
        let source = Arc::new(GatedSource {
            gate: Mutex::new(Some(gate)),
            entered: entered_tx,
        });
        let (engine, _) = engine(
            BlobStore::in_memory(),
            Some(source),
            CommunitySettings::default(),
        );
        let engine = Arc::new(engine);

        let loader = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.load_posts().await })
        };
        entered.recv().await.unwrap();

        let draft = PostDraft {
            title: "성수 팝업 후기".to_string(),
            content: "평일 저녁이 한산해요".to_string(),
            category: PostCategory::Review,
        };
        let created = engine.create_post(Some(&user(7)), draft).await.unwrap();
        release.send(vec![post(900, PostCategory::Free, 60)]).unwrap();

        let snapshot = loader.await.unwrap().unwrap();
        // 新帖 + 9 条示例 + 1 条远程，且新帖只出现一次
        assert_eq!(snapshot.page.total_items, 11);
        assert_eq!(snapshot.posts[0].id, created.id);
        assert_eq!(
            snapshot.posts.iter().filter(|p| p.id == created.id).count(),
            1
        );
        assert!(engine.get_post(created.id).await.is_some());
    }

    #[tokio::test]
    async fn test_zero_page_size_uses_default() {
        let settings = CommunitySettings {
            page_size: 0,
            ..Default::default()
        };
        let (engine, _) = engine(BlobStore::in_memory(), None, settings);

        let snapshot = engine.load_posts().await.unwrap();
        assert_eq!(snapshot.page.page_size, 8);
        assert_eq!(snapshot.total_pages, 2);
        assert_eq!(snapshot.posts.len(), 8);

        engine
            .apply_settings(CommunitySettings {
                page_size: 0,
                ..Default::default()
            })
            .await;
        assert_eq!(engine.page_state().await.page_size, 8);
    }
}
