use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{normalize_search_query, validate_post_id};
use super::{
    ApiError, ApiResponse, AppState, CommentDto, LikeResponse, PostDetailDto, PostDto,
};
use crate::services::{Identity, NewPost, gate};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub content: String,
}

/// GET /posts?q=
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<PostDto>>>, ApiError> {
    let search = normalize_search_query(query.q.as_deref());
    let posts = state.blog_service().list_posts(search).await?;

    let dtos: Vec<PostDto> = posts.into_iter().map(PostDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

/// POST /posts
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(payload): Json<NewPost>,
) -> Result<impl IntoResponse, ApiError> {
    let user = gate::require(&identity)?;

    let post = state.blog_service().create_post(user, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(PostDto::from(post))),
    ))
}

/// GET /posts/{id}
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<PostDetailDto>>, ApiError> {
    let id = validate_post_id(id)?;

    let post = state.blog_service().get_post(id).await?;
    let comments = state.blog_service().list_comments(id).await?;

    Ok(Json(ApiResponse::success(PostDetailDto {
        post: PostDto::from(post),
        comments: comments.into_iter().map(CommentDto::from).collect(),
    })))
}

/// POST /posts/{id}/comments
pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    identity: Identity,
    Json(payload): Json<AddCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = gate::require(&identity)?;
    let id = validate_post_id(id)?;

    let comment = state
        .blog_service()
        .add_comment(id, user, &payload.content)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CommentDto::from(comment))),
    ))
}

/// POST /posts/{id}/like
pub async fn like_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    identity: Identity,
) -> Result<Json<ApiResponse<LikeResponse>>, ApiError> {
    let user = gate::require(&identity)?;
    let id = validate_post_id(id)?;

    let likes = state.blog_service().like_post(id, user).await?;

    Ok(Json(ApiResponse::success(LikeResponse { likes })))
}
