use mysql::{params, prelude::Queryable, PooledConn};

use crate::error::AppError;

/// A tag together with the number of posts carrying it.
#[derive(Debug, Clone, PartialEq)]
pub struct TagWithCount {
    pub id: u64,
    pub title: String,
    pub num_posts: u64,
}

/// Tags ordered by how many posts carry them, busiest first.
pub fn popular_tags(conn: &mut PooledConn, limit: u64) -> Result<Vec<TagWithCount>, AppError> {
    let rows: Vec<(u64, String, u64)> = conn.exec(
        "SELECT t.id, t.title, COUNT(pt.id) AS num_posts \
         FROM tags t \
         LEFT JOIN posts_tags pt ON pt.tag_id = t.id \
         GROUP BY t.id \
         ORDER BY num_posts DESC, t.id \
         LIMIT :limit",
        params! { "limit" => limit },
    )?;

    Ok(rows
        .into_iter()
        .map(|(id, title, num_posts)| TagWithCount {
            id,
            title,
            num_posts,
        })
        .collect())
}

/// Looks up one tag by its unique title, with its post count.
pub fn tag_by_title(conn: &mut PooledConn, title: &str) -> Result<TagWithCount, AppError> {
    let row: Option<(u64, String, u64)> = conn.exec_first(
        "SELECT t.id, t.title, COUNT(pt.id) AS num_posts \
         FROM tags t \
         LEFT JOIN posts_tags pt ON pt.tag_id = t.id \
         WHERE t.title = :title \
         GROUP BY t.id",
        params! { "title" => title },
    )?;

    let (id, title, num_posts) = row.ok_or(AppError::NotFound)?;
    Ok(TagWithCount {
        id,
        title,
        num_posts,
    })
}
