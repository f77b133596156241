use axum::extract::{Path, State};
use axum::response::Html;
use tera::Context;

use crate::error::AppError;
use crate::posts::{self, PostDetail, PostWithCounts};
use crate::tags::{self, TagWithCount};
use crate::views::{serialize_post, serialize_post_detail, serialize_tag};
use crate::AppState;

/// How many posts/tags the sidebar blocks show.
const SIDEBAR_LIMIT: u64 = 5;
/// Display cap for the tag page; the shown total is not capped by it.
const TAG_PAGE_LIMIT: u64 = 20;

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    tracing::info!("index started");
    let mut conn = state.pool.get_conn()?;

    let most_popular_posts = posts::popular_posts(&mut conn, SIDEBAR_LIMIT)?;
    let page_posts = posts::fresh_posts(&mut conn, SIDEBAR_LIMIT)?;
    let popular_tags = tags::popular_tags(&mut conn, SIDEBAR_LIMIT)?;

    let ctx = index_context(&most_popular_posts, &page_posts, &popular_tags);
    let body = state.templates.render("index.html", &ctx)?;
    Ok(Html(body))
}

pub async fn post_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Html<String>, AppError> {
    tracing::info!("post_detail started for slug {}", slug);
    let mut conn = state.pool.get_conn()?;

    let post = posts::post_by_slug(&mut conn, &slug)?;
    let popular_tags = tags::popular_tags(&mut conn, SIDEBAR_LIMIT)?;
    let most_popular_posts = posts::popular_posts(&mut conn, SIDEBAR_LIMIT)?;

    let ctx = post_detail_context(&post, &popular_tags, &most_popular_posts);
    let body = state.templates.render("post-details.html", &ctx)?;
    Ok(Html(body))
}

pub async fn tag_filter(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Html<String>, AppError> {
    tracing::info!("tag_filter started for tag {}", title);
    let mut conn = state.pool.get_conn()?;

    let tag = tags::tag_by_title(&mut conn, &title)?;
    let related_posts = posts::posts_for_tag(&mut conn, tag.id, TAG_PAGE_LIMIT)?;
    let popular_tags = tags::popular_tags(&mut conn, SIDEBAR_LIMIT)?;
    let most_popular_posts = posts::popular_posts(&mut conn, SIDEBAR_LIMIT)?;

    let ctx = tag_filter_context(&tag, &related_posts, &popular_tags, &most_popular_posts);
    let body = state.templates.render("posts-list.html", &ctx)?;
    Ok(Html(body))
}

pub async fn contacts(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    // TODO: record page visits and accept feedback submissions here
    let body = state.templates.render("contacts.html", &Context::new())?;
    Ok(Html(body))
}

fn index_context(
    most_popular_posts: &[PostWithCounts],
    page_posts: &[PostWithCounts],
    popular_tags: &[TagWithCount],
) -> Context {
    let mut ctx = Context::new();
    ctx.insert(
        "most_popular_posts",
        &most_popular_posts
            .iter()
            .map(serialize_post)
            .collect::<Vec<_>>(),
    );
    ctx.insert(
        "page_posts",
        &page_posts.iter().map(serialize_post).collect::<Vec<_>>(),
    );
    ctx.insert(
        "popular_tags",
        &popular_tags.iter().map(serialize_tag).collect::<Vec<_>>(),
    );
    ctx
}

fn post_detail_context(
    post: &PostDetail,
    popular_tags: &[TagWithCount],
    most_popular_posts: &[PostWithCounts],
) -> Context {
    let mut ctx = Context::new();
    ctx.insert("post", &serialize_post_detail(post));
    ctx.insert(
        "popular_tags",
        &popular_tags.iter().map(serialize_tag).collect::<Vec<_>>(),
    );
    ctx.insert(
        "most_popular_posts",
        &most_popular_posts
            .iter()
            .map(serialize_post)
            .collect::<Vec<_>>(),
    );
    ctx
}

fn tag_filter_context(
    tag: &TagWithCount,
    related_posts: &[PostWithCounts],
    popular_tags: &[TagWithCount],
    most_popular_posts: &[PostWithCounts],
) -> Context {
    let mut ctx = Context::new();
    ctx.insert("tag", &tag.title);
    ctx.insert("posts_with_tag", &tag.num_posts);
    ctx.insert(
        "popular_tags",
        &popular_tags.iter().map(serialize_tag).collect::<Vec<_>>(),
    );
    ctx.insert(
        "posts",
        &related_posts.iter().map(serialize_post).collect::<Vec<_>>(),
    );
    ctx.insert(
        "most_popular_posts",
        &most_popular_posts
            .iter()
            .map(serialize_post)
            .collect::<Vec<_>>(),
    );
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn post(id: u64) -> PostWithCounts {
        PostWithCounts {
            id,
            title: format!("post {id}"),
            text: "body".to_string(),
            slug: format!("post-{id}"),
            author: "alice".to_string(),
            image_url: None,
            published_at: NaiveDate::from_ymd_opt(2024, 5, 17)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            comments_count: 0,
            tags: Vec::new(),
        }
    }

    fn tag(title: &str, num_posts: u64) -> TagWithCount {
        TagWithCount {
            id: 10,
            title: title.to_string(),
            num_posts,
        }
    }

    fn array_len(ctx: &Context, key: &str) -> usize {
        ctx.get(key).unwrap().as_array().unwrap().len()
    }

    #[test]
    fn index_context_carries_every_block() {
        let popular: Vec<_> = (1..=5).map(post).collect();
        let fresh: Vec<_> = (6..=10).map(post).collect();
        let tags = vec![tag("python", 4), tag("web", 2)];

        let ctx = index_context(&popular, &fresh, &tags);

        assert_eq!(array_len(&ctx, "most_popular_posts"), 5);
        assert_eq!(array_len(&ctx, "page_posts"), 5);
        assert_eq!(array_len(&ctx, "popular_tags"), 2);
    }

    #[test]
    fn tag_filter_context_reports_the_true_total_not_the_page_size() {
        let shown = vec![post(1), post(2)];
        let filtered_by = tag("python", 42);

        let ctx = tag_filter_context(&filtered_by, &shown, &[], &[]);

        assert_eq!(ctx.get("tag").unwrap().as_str().unwrap(), "python");
        assert_eq!(ctx.get("posts_with_tag").unwrap().as_u64().unwrap(), 42);
        assert_eq!(array_len(&ctx, "posts"), 2);
    }

    #[test]
    fn post_detail_context_includes_the_comment_thread() {
        let detail = PostDetail {
            id: 1,
            title: "post".to_string(),
            text: "body".to_string(),
            slug: "post".to_string(),
            author: "alice".to_string(),
            image_url: None,
            published_at: NaiveDate::from_ymd_opt(2024, 5, 17)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            likes_count: 7,
            comments_count: 1,
            tags: Vec::new(),
            comments: vec![crate::posts::CommentWithAuthor {
                text: "nice one".to_string(),
                published_at: NaiveDate::from_ymd_opt(2024, 5, 18)
                    .unwrap()
                    .and_hms_opt(9, 0, 0)
                    .unwrap(),
                author: "bob".to_string(),
            }],
        };

        let ctx = post_detail_context(&detail, &[], &[]);

        let rendered = ctx.get("post").unwrap();
        assert_eq!(rendered["likes_amount"].as_u64().unwrap(), 7);
        assert_eq!(rendered["comments"].as_array().unwrap().len(), 1);
        assert_eq!(rendered["comments"][0]["author"], "bob");
    }
}
