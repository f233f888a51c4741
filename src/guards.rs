// ABOUTME: Route guards applied as axum middleware on specific route groups
// ABOUTME: Login, admin-only and comment-owner-only checks over the resolved Identity

use axum::{
    extract::{Path, Request, State},
    http::Uri,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::session::Identity;
use crate::AppState;

/// Redirect to the login page carrying the originally requested path.
pub fn redirect_to_login(uri: &Uri) -> Redirect {
    let original = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    Redirect::to(&format!("/login?next={}", urlencoding::encode(original)))
}

pub async fn require_login(
    Extension(identity): Extension<Identity>,
    request: Request,
    next: Next,
) -> Response {
    match identity {
        Identity::Anonymous => redirect_to_login(request.uri()).into_response(),
        Identity::User(_) => next.run(request).await,
    }
}

/// Only the administrator passes; other signed-in users get 403.
pub async fn require_admin(
    Extension(identity): Extension<Identity>,
    request: Request,
    next: Next,
) -> Response {
    match &identity {
        Identity::Anonymous => redirect_to_login(request.uri()).into_response(),
        Identity::User(_) if identity.is_admin() => next.run(request).await,
        Identity::User(user) => AppError::Forbidden(format!(
            "user {} requested admin route {}",
            user.id,
            request.uri().path()
        ))
        .into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentPath {
    pub category_id: i32,
    pub post_id: i32,
    pub comment_id: i32,
}

/// Compares the author of the comment named in the route with the current user.
pub async fn require_comment_owner(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(path): Path<CommentPath>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let comment = state
        .storage
        .find_comment(path.comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("comment {}", path.comment_id)))?;

    match identity.user_id() {
        Some(user_id) if user_id == comment.author_id => Ok(next.run(request).await),
        Some(user_id) => Err(AppError::Forbidden(format!(
            "user {} does not own comment {}",
            user_id, comment.id
        ))),
        None => Err(AppError::Forbidden(format!(
            "anonymous request to delete comment {}",
            comment.id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::LOCATION;

    #[test]
    fn test_login_redirect_keeps_original_path() {
        let uri: Uri = "/category/3/new-post?draft=1".parse().unwrap();
        let response = redirect_to_login(&uri).into_response();

        assert_eq!(
            response.headers()[LOCATION],
            "/login?next=%2Fcategory%2F3%2Fnew-post%3Fdraft%3D1"
        );
    }
}
