// 内置示例帖子 - 创建时间相对于加载时刻

use chrono::{DateTime, Duration, Utc};

use crate::models::{Post, PostCategory};

struct SeedPost {
    id: i64,
    title: &'static str,
    content: &'static str,
    category: PostCategory,
    author_id: i64,
    author_name: &'static str,
    hours_ago: i64,
    views: u32,
}

const SEED_POSTS: &[SeedPost] = &[
    SeedPost {
        id: 101,
        title: "자유1",
        content: "자유게시판 테스트 글입니다...",
        category: PostCategory::Free,
        author_id: 1,
        author_name: "테스트유저A",
        hours_ago: 2,
        views: 25,
    },
    SeedPost {
        id: 102,
        title: "자유2",
        content: "창업 아이디어 공유합니다...",
        category: PostCategory::Free,
        author_id: 2,
        author_name: "창업러A",
        hours_ago: 1,
        views: 12,
    },
    SeedPost {
        id: 201,
        title: "Q&A1 - 카페 창업 문의",
        content: "강남에서 카페 창업하려는데 추천 지역 있을까요?",
        category: PostCategory::Question,
        author_id: 3,
        author_name: "초보창업자",
        hours_ago: 24,
        views: 45,
    },
    SeedPost {
        id: 202,
        title: "Q&A2 - 답변입니다",
        content: "강남역 근처 추천합니다. 유동인구 많아요!",
        category: PostCategory::Question,
        author_id: 4,
        author_name: "전문가B",
        hours_ago: 23,
        views: 38,
    },
    SeedPost {
        id: 301,
        title: "리뷰1 - 홍대 PC방",
        content: "최고예요! 24시간 운영 추천합니다",
        category: PostCategory::Review,
        author_id: 5,
        author_name: "리뷰어C",
        hours_ago: 3,
        views: 67,
    },
    SeedPost {
        id: 302,
        title: "리뷰2 - 신촌 치킨집",
        content: "맛은 좋았으나 배달 느림",
        category: PostCategory::Review,
        author_id: 6,
        author_name: "고객D",
        hours_ago: 5,
        views: 23,
    },
    SeedPost {
        id: 303,
        title: "리뷰3 - 이태원 베이커리",
        content: "빵맛 최고! 매일 줄섬",
        category: PostCategory::Review,
        author_id: 7,
        author_name: "맛집탐방E",
        hours_ago: 10,
        views: 89,
    },
    SeedPost {
        id: 304,
        title: "리뷰4 - 연남동 카페",
        content: "분위기 좋음. 가격대 합리적",
        category: PostCategory::Review,
        author_id: 8,
        author_name: "카페마스터",
        hours_ago: 0,
        views: 5,
    },
    SeedPost {
        id: 305,
        title: "리뷰5 - 합정역 피자",
        content: "치즈 듬뿍! 가족 추천",
        category: PostCategory::Review,
        author_id: 9,
        author_name: "가족파파",
        hours_ago: 7,
        views: 34,
    },
];

/// 生成示例帖子
pub fn seed_posts(now: DateTime<Utc>) -> Vec<Post> {
    SEED_POSTS
        .iter()
        .map(|seed| Post {
            id: seed.id,
            title: seed.title.to_string(),
            content: seed.content.to_string(),
            category: seed.category,
            author_id: seed.author_id,
            author_name: seed.author_name.to_string(),
            created_at: now - Duration::hours(seed.hours_ago),
            views: seed.views,
        })
        .collect()
}
