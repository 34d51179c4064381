//! Blog content API
//!
//! Proxies blog and article operations to the shop's Admin API using
//! the access token carried by the operator's session. Nothing here is
//! persisted locally; the shop stays the system of record.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::shopify::ArticlePayload;

/// Shopify caps article pages at 250.
const MAX_ARTICLE_PAGE: u32 = 250;
const DEFAULT_ARTICLE_PAGE: u32 = 50;

/// Create content router
///
/// Routes (nested under /api):
/// - GET /blogs - List the shop's blogs
/// - GET/POST /blogs/:blog_id/articles - List or create articles
/// - GET/PUT/DELETE /blogs/:blog_id/articles/:article_id - Single article
pub fn content_router() -> Router<AppState> {
    Router::new()
        .route("/blogs", get(list_blogs))
        .route(
            "/blogs/:blog_id/articles",
            get(list_articles).post(create_article),
        )
        .route(
            "/blogs/:blog_id/articles/:article_id",
            get(get_article).put(update_article).delete(delete_article),
        )
}

// =============================================================================
// Request types
// =============================================================================

/// Tags arrive either as a JSON array or a pre-joined string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagsInput {
    Many(Vec<String>),
    One(String),
}

impl TagsInput {
    /// Shopify stores tags as one comma-separated string.
    fn join(self) -> String {
        match self {
            TagsInput::Many(tags) => tags.join(", "),
            TagsInput::One(tags) => tags,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ArticleInput {
    title: Option<String>,
    /// HTML body. Mapped to Shopify's `body_html`.
    content: Option<String>,
    author: Option<String>,
    tags: Option<TagsInput>,
    summary: Option<String>,
    published: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ListArticlesQuery {
    limit: Option<u32>,
}

fn parse_blog_id(raw: &str) -> Result<i64, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation("Invalid blog ID".to_string()))
}

fn parse_article_path(blog_id: &str, article_id: &str) -> Result<(i64, i64), AppError> {
    match (blog_id.parse(), article_id.parse()) {
        (Ok(blog_id), Ok(article_id)) => Ok((blog_id, article_id)),
        _ => Err(AppError::Validation(
            "Invalid blog ID or article ID".to_string(),
        )),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/blogs
/// List the shop's blogs
async fn list_blogs(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Value>, AppError> {
    let blogs = state
        .shopify
        .list_blogs(&session.shop, &session.access_token)
        .await?;

    Ok(Json(json!({ "blogs": blogs })))
}

/// GET /api/blogs/:blog_id/articles
/// List articles in a blog, newest page first
async fn list_articles(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(blog_id): Path<String>,
    Query(query): Query<ListArticlesQuery>,
) -> Result<Json<Value>, AppError> {
    let blog_id = parse_blog_id(&blog_id)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ARTICLE_PAGE)
        .min(MAX_ARTICLE_PAGE);

    let articles = state
        .shopify
        .list_articles(&session.shop, &session.access_token, blog_id, limit)
        .await?;

    Ok(Json(json!({ "articles": articles })))
}

/// POST /api/blogs/:blog_id/articles
/// Create an article
async fn create_article(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(blog_id): Path<String>,
    Json(input): Json<ArticleInput>,
) -> Result<Json<Value>, AppError> {
    let blog_id = parse_blog_id(&blog_id)?;

    let (Some(title), Some(content)) = (input.title, input.content) else {
        return Err(AppError::Validation(
            "Title and content are required".to_string(),
        ));
    };
    if title.trim().is_empty() || content.trim().is_empty() {
        return Err(AppError::Validation(
            "Title and content are required".to_string(),
        ));
    }

    // Byline falls back to the session profile.
    let author = input
        .author
        .or_else(|| session.user.full_name.clone())
        .unwrap_or_else(|| session.user.email.clone());

    let payload = ArticlePayload {
        title: Some(title),
        body_html: Some(content),
        author: Some(author),
        tags: input.tags.map(TagsInput::join),
        summary: input.summary,
        published: Some(input.published.unwrap_or(false)),
    };

    let article = state
        .shopify
        .create_article(&session.shop, &session.access_token, blog_id, &payload)
        .await?;

    Ok(Json(json!({ "article": article })))
}

/// GET /api/blogs/:blog_id/articles/:article_id
/// Fetch a single article
async fn get_article(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path((blog_id, article_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let (blog_id, article_id) = parse_article_path(&blog_id, &article_id)?;

    let article = state
        .shopify
        .get_article(&session.shop, &session.access_token, blog_id, article_id)
        .await?;

    Ok(Json(json!({ "article": article })))
}

/// PUT /api/blogs/:blog_id/articles/:article_id
/// Update an article; absent fields are left untouched
async fn update_article(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path((blog_id, article_id)): Path<(String, String)>,
    Json(input): Json<ArticleInput>,
) -> Result<Json<Value>, AppError> {
    let (blog_id, article_id) = parse_article_path(&blog_id, &article_id)?;

    let payload = ArticlePayload {
        title: input.title,
        body_html: input.content,
        author: input.author,
        tags: input.tags.map(TagsInput::join),
        summary: input.summary,
        published: input.published,
    };

    let article = state
        .shopify
        .update_article(
            &session.shop,
            &session.access_token,
            blog_id,
            article_id,
            &payload,
        )
        .await?;

    Ok(Json(json!({ "article": article })))
}

/// DELETE /api/blogs/:blog_id/articles/:article_id
/// Delete an article
async fn delete_article(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path((blog_id, article_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let (blog_id, article_id) = parse_article_path(&blog_id, &article_id)?;

    state
        .shopify
        .delete_article(&session.shop, &session.access_token, blog_id, article_id)
        .await?;

    Ok(Json(json!({ "success": true })))
}
