//! Form-post routes for a server-rendered frontend.
//!
//! Every handler answers with a redirect and reports outcomes through flash
//! messages. Unauthenticated access to a gated route redirects to `/login`.

use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::flash::{self, FlashLevel};
use super::{ApiError, AppState};
use crate::services::{AuthError, BlogError, Identity, NewPost, gate};

#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub content: String,
}

async fn redirect_with_flash(
    session: &Session,
    to: &str,
    level: FlashLevel,
    message: impl Into<String>,
) -> Response {
    flash::push(session, level, message).await;
    Redirect::to(to).into_response()
}

async fn redirect_to_login(session: &Session, next: &str) -> Response {
    redirect_with_flash(
        session,
        &format!("/login?next={next}"),
        FlashLevel::Info,
        "Please log in to access this page.",
    )
    .await
}

/// POST /register
pub async fn register(
    State(state): State<Arc<AppState>>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Response {
    match state
        .auth_service()
        .register(&form.username, &form.password)
        .await
    {
        Ok(_) => {
            redirect_with_flash(
                &session,
                "/login",
                FlashLevel::Info,
                "Registration successful. Please login.",
            )
            .await
        }
        Err(AuthError::DuplicateUsername(_)) => {
            redirect_with_flash(
                &session,
                "/register",
                FlashLevel::Error,
                "That username is already taken.",
            )
            .await
        }
        Err(AuthError::Validation(msg)) => {
            redirect_with_flash(&session, "/register", FlashLevel::Error, msg).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Response {
    match state
        .sessions()
        .login(&session, &form.username, &form.password)
        .await
    {
        Ok(_) => Redirect::to("/").into_response(),
        Err(AuthError::InvalidCredentials | AuthError::Validation(_)) => {
            redirect_with_flash(
                &session,
                "/login",
                FlashLevel::Error,
                "Invalid username or password.",
            )
            .await
        }
        Err(e @ AuthError::TooManyAttempts { .. }) => {
            redirect_with_flash(&session, "/login", FlashLevel::Error, e.to_string()).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// GET /logout
pub async fn logout(State(state): State<Arc<AppState>>, session: Session) -> Response {
    match state.sessions().logout(&session).await {
        Ok(()) => Redirect::to("/").into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// POST /post/new
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    session: Session,
    identity: Identity,
    Form(form): Form<PostForm>,
) -> Response {
    let Ok(user) = gate::require(&identity) else {
        return redirect_to_login(&session, "/post/new").await;
    };

    let post = NewPost {
        title: form.title,
        content: form.content,
        tags: form.tags,
    };

    match state.blog_service().create_post(user, post).await {
        Ok(_) => {
            redirect_with_flash(&session, "/", FlashLevel::Info, "Post created successfully.")
                .await
        }
        Err(BlogError::Validation(msg)) => {
            redirect_with_flash(&session, "/post/new", FlashLevel::Error, msg).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// POST /post/{id}
pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i32>,
    identity: Identity,
    Form(form): Form<CommentForm>,
) -> Response {
    let detail_path = format!("/post/{id}");

    let Ok(user) = gate::require(&identity) else {
        return redirect_to_login(&session, &detail_path).await;
    };

    match state
        .blog_service()
        .add_comment(id, user, &form.content)
        .await
    {
        Ok(_) => {
            redirect_with_flash(&session, &detail_path, FlashLevel::Info, "Comment added.").await
        }
        Err(BlogError::Validation(msg)) => {
            redirect_with_flash(&session, &detail_path, FlashLevel::Error, msg).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
