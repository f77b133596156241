use chrono::NaiveDateTime;
use mysql::{params, prelude::Queryable, PooledConn};
use std::collections::HashMap;

use crate::error::AppError;
use crate::tags::TagWithCount;

/// Format MySQL is asked to serialize datetimes into, and the format the row
/// mappers parse back out.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const POST_COLUMNS: &str = "p.id, p.title, p.text, p.slug, u.username, p.image_url, \
     DATE_FORMAT(p.published_at, '%Y-%m-%d %H:%i:%s')";

/// A post as shown in list views: base fields plus the request-scoped
/// comment count and the tags-with-counts attached by the batched passes.
#[derive(Debug, Clone)]
pub struct PostWithCounts {
    pub id: u64,
    pub title: String,
    pub text: String,
    pub slug: String,
    pub author: String,
    pub image_url: Option<String>,
    pub published_at: NaiveDateTime,
    pub comments_count: u64,
    pub tags: Vec<TagWithCount>,
}

/// The full detail-page view of a post, comments included.
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub id: u64,
    pub title: String,
    pub text: String,
    pub slug: String,
    pub author: String,
    pub image_url: Option<String>,
    pub published_at: NaiveDateTime,
    pub likes_count: u64,
    pub comments_count: u64,
    pub tags: Vec<TagWithCount>,
    pub comments: Vec<CommentWithAuthor>,
}

#[derive(Debug, Clone)]
pub struct CommentWithAuthor {
    pub text: String,
    pub published_at: NaiveDateTime,
    pub author: String,
}

type PostRow = (
    u64,
    String,
    String,
    String,
    String,
    Option<String>,
    String,
);

/// post_id, tag id, tag title, posts carrying the tag.
type TagRow = (u64, u64, String, u64);

/// Posts ordered by total like count, most liked first, ties broken by id so
/// repeated requests see a stable order.
pub fn popular_posts(conn: &mut PooledConn, limit: u64) -> Result<Vec<PostWithCounts>, AppError> {
    let rows: Vec<PostRow> = conn.exec(
        format!(
            "SELECT {POST_COLUMNS} \
             FROM posts p \
             JOIN users u ON u.id = p.author_id \
             LEFT JOIN posts_likes pl ON pl.post_id = p.id \
             GROUP BY p.id \
             ORDER BY COUNT(pl.id) DESC, p.id \
             LIMIT :limit"
        ),
        params! { "limit" => limit },
    )?;

    let mut posts = collect_posts(rows)?;
    attach_related(conn, &mut posts)?;
    Ok(posts)
}

/// Posts ordered by publication time, newest first.
pub fn fresh_posts(conn: &mut PooledConn, limit: u64) -> Result<Vec<PostWithCounts>, AppError> {
    let rows: Vec<PostRow> = conn.exec(
        format!(
            "SELECT {POST_COLUMNS} \
             FROM posts p \
             JOIN users u ON u.id = p.author_id \
             ORDER BY p.published_at DESC \
             LIMIT :limit"
        ),
        params! { "limit" => limit },
    )?;

    let mut posts = collect_posts(rows)?;
    attach_related(conn, &mut posts)?;
    Ok(posts)
}

/// Posts carrying the given tag, newest first.
pub fn posts_for_tag(
    conn: &mut PooledConn,
    tag_id: u64,
    limit: u64,
) -> Result<Vec<PostWithCounts>, AppError> {
    let rows: Vec<PostRow> = conn.exec(
        format!(
            "SELECT {POST_COLUMNS} \
             FROM posts p \
             JOIN users u ON u.id = p.author_id \
             JOIN posts_tags pt ON pt.post_id = p.id \
             WHERE pt.tag_id = :tag_id \
             ORDER BY p.published_at DESC \
             LIMIT :limit"
        ),
        params! { "tag_id" => tag_id, "limit" => limit },
    )?;

    let mut posts = collect_posts(rows)?;
    attach_related(conn, &mut posts)?;
    Ok(posts)
}

/// Fetches one post by its unique slug, with author, like/comment counts,
/// tags-with-counts and the comment thread. Three queries total.
pub fn post_by_slug(conn: &mut PooledConn, slug: &str) -> Result<PostDetail, AppError> {
    let row: Option<(
        u64,
        String,
        String,
        String,
        String,
        Option<String>,
        String,
        u64,
        u64,
    )> = conn.exec_first(
        format!(
            "SELECT {POST_COLUMNS}, \
             (SELECT COUNT(*) FROM posts_likes pl WHERE pl.post_id = p.id), \
             (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) \
             FROM posts p \
             JOIN users u ON u.id = p.author_id \
             WHERE p.slug = :slug"
        ),
        params! { "slug" => slug },
    )?;

    let (id, title, text, slug, author, image_url, published_at, likes_count, comments_count) =
        row.ok_or(AppError::NotFound)?;

    let tags = fetch_tag_rows(conn, &[id])?
        .into_iter()
        .map(|(_, tag_id, tag_title, num_posts)| TagWithCount {
            id: tag_id,
            title: tag_title,
            num_posts,
        })
        .collect();

    let comment_rows: Vec<(String, String, String)> = conn.exec(
        "SELECT c.text, DATE_FORMAT(c.published_at, '%Y-%m-%d %H:%i:%s'), u.username \
         FROM comments c \
         JOIN users u ON u.id = c.author_id \
         WHERE c.post_id = :post_id \
         ORDER BY c.published_at",
        params! { "post_id" => id },
    )?;
    let comments = comment_rows
        .into_iter()
        .map(|(text, published_at, author)| {
            Ok(CommentWithAuthor {
                text,
                published_at: parse_datetime(&published_at)?,
                author,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    Ok(PostDetail {
        id,
        title,
        text,
        slug,
        author,
        image_url,
        published_at: parse_datetime(&published_at)?,
        likes_count,
        comments_count,
        tags,
        comments,
    })
}

fn parse_datetime(raw: &str) -> Result<NaiveDateTime, AppError> {
    Ok(NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)?)
}

fn post_from_row(row: PostRow) -> Result<PostWithCounts, AppError> {
    let (id, title, text, slug, author, image_url, published_at) = row;
    Ok(PostWithCounts {
        id,
        title,
        text,
        slug,
        author,
        image_url,
        published_at: parse_datetime(&published_at)?,
        comments_count: 0,
        tags: Vec::new(),
    })
}

fn collect_posts(rows: Vec<PostRow>) -> Result<Vec<PostWithCounts>, AppError> {
    rows.into_iter().map(post_from_row).collect()
}

/// Fills in tags and comment counts for a fetched page of posts with one
/// batched query each, never one query per post.
fn attach_related(conn: &mut PooledConn, posts: &mut [PostWithCounts]) -> Result<(), AppError> {
    if posts.is_empty() {
        return Ok(());
    }
    let ids: Vec<u64> = posts.iter().map(|p| p.id).collect();

    let tag_rows = fetch_tag_rows(conn, &ids)?;
    attach_tags(posts, tag_rows);

    let count_rows: Vec<(u64, u64)> = conn.exec(
        format!(
            "SELECT post_id, COUNT(*) \
             FROM comments \
             WHERE post_id IN ({}) \
             GROUP BY post_id",
            placeholders(ids.len())
        ),
        ids,
    )?;
    attach_comment_counts(posts, count_rows);

    Ok(())
}

/// Tag rows for a batch of posts, in attachment order; each tag carries its
/// own overall post count.
fn fetch_tag_rows(conn: &mut PooledConn, post_ids: &[u64]) -> Result<Vec<TagRow>, AppError> {
    let rows = conn.exec(
        format!(
            "SELECT pt.post_id, t.id, t.title, \
             (SELECT COUNT(*) FROM posts_tags pt2 WHERE pt2.tag_id = t.id) \
             FROM posts_tags pt \
             JOIN tags t ON t.id = pt.tag_id \
             WHERE pt.post_id IN ({}) \
             ORDER BY pt.id",
            placeholders(post_ids.len())
        ),
        post_ids.to_vec(),
    )?;
    Ok(rows)
}

fn attach_tags(posts: &mut [PostWithCounts], rows: Vec<TagRow>) {
    let mut by_post: HashMap<u64, Vec<TagWithCount>> = HashMap::new();
    for (post_id, id, title, num_posts) in rows {
        by_post.entry(post_id).or_default().push(TagWithCount {
            id,
            title,
            num_posts,
        });
    }
    for post in posts.iter_mut() {
        if let Some(tags) = by_post.remove(&post.id) {
            post.tags = tags;
        }
    }
}

fn attach_comment_counts(posts: &mut [PostWithCounts], rows: Vec<(u64, u64)>) {
    let counts: HashMap<u64, u64> = rows.into_iter().collect();
    for post in posts.iter_mut() {
        post.comments_count = counts.get(&post.id).copied().unwrap_or(0);
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
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

    #[test]
    fn placeholders_joins_question_marks() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }

    #[test]
    fn attach_tags_groups_rows_by_post_in_row_order() {
        let mut posts = vec![post(1), post(2)];
        let rows = vec![
            (1, 10, "python".to_string(), 4),
            (2, 11, "rust".to_string(), 7),
            (1, 12, "web".to_string(), 2),
        ];

        attach_tags(&mut posts, rows);

        assert_eq!(posts[0].tags.len(), 2);
        assert_eq!(posts[0].tags[0].title, "python");
        assert_eq!(posts[0].tags[1].title, "web");
        assert_eq!(
            posts[1].tags,
            vec![TagWithCount {
                id: 11,
                title: "rust".to_string(),
                num_posts: 7,
            }]
        );
    }

    #[test]
    fn attach_comment_counts_defaults_missing_posts_to_zero() {
        let mut posts = vec![post(1), post(2)];

        attach_comment_counts(&mut posts, vec![(2, 9)]);

        assert_eq!(posts[0].comments_count, 0);
        assert_eq!(posts[1].comments_count, 9);
    }

    #[test]
    fn post_from_row_parses_the_wire_datetime() {
        let row: PostRow = (
            1,
            "Title".to_string(),
            "Body".to_string(),
            "title".to_string(),
            "alice".to_string(),
            None,
            "2024-05-17 10:30:00".to_string(),
        );

        let post = post_from_row(row).unwrap();

        assert_eq!(
            post.published_at,
            NaiveDate::from_ymd_opt(2024, 5, 17)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap()
        );
        assert_eq!(post.comments_count, 0);
        assert!(post.tags.is_empty());
    }

    #[test]
    fn post_from_row_rejects_a_garbage_datetime() {
        let row: PostRow = (
            1,
            "Title".to_string(),
            "Body".to_string(),
            "title".to_string(),
            "alice".to_string(),
            None,
            "yesterday".to_string(),
        );

        assert!(matches!(post_from_row(row), Err(AppError::Timestamp(_))));
    }
}
