//! 社区相关命令
//!
//! 帖子列表、分类过滤、分页、发帖与删帖

use super::CommandResult;
use crate::community::{ListingSnapshot, PostDraft};
use crate::error::AppError;
use crate::models::{PageState, Post, PostFilter};
use crate::AppState;

/// 重新加载帖子
pub async fn load_posts(state: &AppState) -> CommandResult<ListingSnapshot> {
    Ok(state.community_domain.get_listing().load_posts().await?)
}

/// 切换分类过滤（页码回到 1）
pub async fn set_post_filter(state: &AppState, filter: PostFilter) -> CommandResult<ListingSnapshot> {
    Ok(state.community_domain.get_listing().set_filter(filter).await?)
}

pub async fn paginate(state: &AppState, page: usize) -> CommandResult<PageState> {
    Ok(state.community_domain.get_listing().paginate(page).await)
}

pub async fn get_listing(state: &AppState) -> CommandResult<ListingSnapshot> {
    Ok(state.community_domain.get_listing().snapshot().await)
}

pub async fn get_post(state: &AppState, id: i64) -> CommandResult<Post> {
    state
        .community_domain
        .get_listing()
        .get_post(id)
        .await
        .ok_or_else(|| AppError::Precondition(format!("글을 찾을 수 없습니다: {}", id)).into())
}

/// 发帖（需要登录）
pub async fn create_post(state: &AppState, draft: PostDraft) -> CommandResult<Post> {
    let user = state.community_domain.get_accounts().current_user().await?;
    Ok(state
        .community_domain
        .get_listing()
        .create_post(user.as_ref(), draft)
        .await?)
}

/// 删帖（只能删除本人的帖子）
pub async fn delete_post(state: &AppState, id: i64) -> CommandResult<ListingSnapshot> {
    let user = state.community_domain.get_accounts().current_user().await?;
    Ok(state
        .community_domain
        .get_listing()
        .delete_post(user.as_ref(), id)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::app;
    use crate::commands::{login, register, RegisterForm};
    use crate::error::ErrorKind;
    use crate::models::PostCategory;

    #[tokio::test]
    async fn test_write_requires_login_then_lists_first() {
        let app = app(vec![]).await;
        load_posts(&app.state).await.unwrap();

        let draft = || PostDraft {
            title: "성수 카페 창업 후기".to_string(),
            content: "평일 오후가 한산합니다".to_string(),
            category: PostCategory::Review,
        };
        let err = create_post(&app.state, draft()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthenticated);

        register(
            &app.state,
            RegisterForm {
                username: "writer01".to_string(),
                email: "w@example.com".to_string(),
                password: "pass1234".to_string(),
                confirm_password: "pass1234".to_string(),
            },
        )
        .await
        .unwrap();
        login(&app.state, "writer01", "pass1234").await.unwrap();

        let post = create_post(&app.state, draft()).await.unwrap();
        let listing = set_post_filter(&app.state, PostFilter::Only(PostCategory::Review))
            .await
            .unwrap();
        assert_eq!(listing.posts[0].id, post.id);
        assert_eq!(listing.page.total_items, 6);
        assert_eq!(get_post(&app.state, post.id).await.unwrap().views, 0);

        let listing = delete_post(&app.state, post.id).await.unwrap();
        assert_eq!(listing.page.total_items, 5);
        assert!(get_post(&app.state, post.id).await.is_err());
    }

    #[tokio::test]
    async fn test_paginate_command_clamps_by_default() {
        let app = app(vec![]).await;
        load_posts(&app.state).await.unwrap();
        let page = paginate(&app.state, 99).await.unwrap();
        assert_eq!(page.current_page, 2);
        assert_eq!(get_listing(&app.state).await.unwrap().posts.len(), 1);
    }
}
