use chrono::NaiveDateTime;
use serde::Serialize;

use crate::posts::{CommentWithAuthor, PostDetail, PostWithCounts};
use crate::tags::TagWithCount;

const TEASER_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SerializedTag {
    pub title: String,
    pub posts_with_tag: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SerializedPost {
    pub title: String,
    pub teaser_text: String,
    pub author: String,
    pub comments_amount: u64,
    pub image_url: Option<String>,
    pub published_at: NaiveDateTime,
    pub slug: String,
    pub tags: Vec<SerializedTag>,
    pub first_tag_title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SerializedComment {
    pub text: String,
    pub published_at: NaiveDateTime,
    pub author: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SerializedPostDetail {
    pub title: String,
    pub text: String,
    pub author: String,
    pub comments: Vec<SerializedComment>,
    pub likes_amount: u64,
    pub image_url: Option<String>,
    pub published_at: NaiveDateTime,
    pub slug: String,
    pub tags: Vec<SerializedTag>,
}

pub fn serialize_tag(tag: &TagWithCount) -> SerializedTag {
    SerializedTag {
        title: tag.title.clone(),
        posts_with_tag: tag.num_posts,
    }
}

pub fn serialize_post(post: &PostWithCounts) -> SerializedPost {
    SerializedPost {
        title: post.title.clone(),
        teaser_text: teaser(&post.text).to_string(),
        author: post.author.clone(),
        comments_amount: post.comments_count,
        image_url: post.image_url.clone(),
        published_at: post.published_at,
        slug: post.slug.clone(),
        tags: post.tags.iter().map(serialize_tag).collect(),
        first_tag_title: post
            .tags
            .first()
            .map(|tag| tag.title.clone())
            .unwrap_or_default(),
    }
}

pub fn serialize_post_detail(post: &PostDetail) -> SerializedPostDetail {
    SerializedPostDetail {
        title: post.title.clone(),
        text: post.text.clone(),
        author: post.author.clone(),
        comments: post.comments.iter().map(serialize_comment).collect(),
        likes_amount: post.likes_count,
        image_url: post.image_url.clone(),
        published_at: post.published_at,
        slug: post.slug.clone(),
        tags: post.tags.iter().map(serialize_tag).collect(),
    }
}

fn serialize_comment(comment: &CommentWithAuthor) -> SerializedComment {
    SerializedComment {
        text: comment.text.clone(),
        published_at: comment.published_at,
        author: comment.author.clone(),
    }
}

/// First `TEASER_LEN` characters of the body, never splitting a multi-byte
/// character.
fn teaser(text: &str) -> &str {
    match text.char_indices().nth(TEASER_LEN) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
