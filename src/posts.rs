// ABOUTME: Post handlers: reading a post with its comments, commenting, admin authoring
// ABOUTME: Post deletion removes the post's comments first

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};

use crate::entities::{blog_category, blog_post};
use crate::error::{AppError, Result};
use crate::forms::{CommentForm, FormErrors, PostForm};
use crate::guards::CommentPath;
use crate::session::Identity;
use crate::views::{
    gravatar_url, render, CommentView, ConfirmDeleteTemplate, PageContext, PostFormTemplate,
    PostTemplate,
};
use crate::AppState;

const DUPLICATE_TITLE: &str = "A post with this title already exists.";

pub fn post_url(category_id: i32, post_id: i32) -> String {
    format!("/category/{}/post/{}", category_id, post_id)
}

async fn post_page(
    state: &AppState,
    identity: &Identity,
    category: blog_category::Model,
    post: blog_post::Model,
    form: CommentForm,
    errors: FormErrors,
) -> Result<Response> {
    let author_name = state
        .storage
        .find_user(post.author_id)
        .await?
        .map(|user| user.username)
        .unwrap_or_else(|| "unknown".to_string());

    let viewer_id = identity.user_id();
    let comments = state
        .storage
        .comments_for_post(post.id)
        .await?
        .into_iter()
        .map(|(comment, author)| {
            let (author_name, avatar_url) = match author {
                Some(user) => (user.username, gravatar_url(&user.email)),
                None => ("unknown".to_string(), gravatar_url("")),
            };
            CommentView {
                id: comment.id,
                can_delete: viewer_id == Some(comment.author_id),
                text: comment.text,
                author_name,
                avatar_url,
                posted_time: comment.posted_time,
            }
        })
        .collect();

    render(&PostTemplate {
        page: PageContext::new(&state.config, identity),
        category,
        post,
        author_name,
        comments,
        form,
        errors,
    })
}

pub async fn show_post(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((category_id, post_id)): Path<(i32, i32)>,
) -> Result<Response> {
    let category = state.storage.get_category(category_id).await?;
    let post = state
        .storage
        .get_post_in_category(category_id, post_id)
        .await?;

    post_page(
        &state,
        &identity,
        category,
        post,
        CommentForm::default(),
        FormErrors::new(),
    )
    .await
}

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((category_id, post_id)): Path<(i32, i32)>,
    Form(form): Form<CommentForm>,
) -> Result<Response> {
    let category = state.storage.get_category(category_id).await?;
    let post = state
        .storage
        .get_post_in_category(category_id, post_id)
        .await?;

    if let Err(errors) = form.validate() {
        return post_page(&state, &identity, category, post, form, errors).await;
    }

    let author_id = identity.require_user_id()?;
    let comment = state
        .storage
        .create_comment(form.text.trim(), author_id, post.id)
        .await?;
    tracing::info!(comment_id = comment.id, post_id = post.id, "Added comment");

    Ok(Redirect::to(&post_url(category.id, post.id)).into_response())
}

pub async fn new_post_page(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(category_id): Path<i32>,
) -> Result<Response> {
    let category = state.storage.get_category(category_id).await?;

    render(&PostFormTemplate {
        page: PageContext::new(&state.config, &identity),
        action: format!("/category/{}/new-post", category.id),
        category,
        edit: false,
        form: PostForm::default(),
        errors: FormErrors::new(),
    })
}

async fn title_taken(state: &AppState, title: &str, editing: Option<i32>) -> Result<bool> {
    Ok(match state.storage.find_post_by_title(title.trim()).await? {
        Some(existing) => Some(existing.id) != editing,
        None => false,
    })
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(category_id): Path<i32>,
    Form(form): Form<PostForm>,
) -> Result<Response> {
    let category = state.storage.get_category(category_id).await?;

    let mut errors = form.validate().err().unwrap_or_default();
    if errors.get("title").is_none() && title_taken(&state, &form.title, None).await? {
        errors.add("title", DUPLICATE_TITLE);
    }

    if !errors.is_empty() {
        return render(&PostFormTemplate {
            page: PageContext::new(&state.config, &identity),
            action: format!("/category/{}/new-post", category.id),
            category,
            edit: false,
            form,
            errors,
        });
    }

    let author_id = identity.require_user_id()?;
    let post = state
        .storage
        .create_post(form.to_fields(), author_id, category.id)
        .await?;
    tracing::info!(post_id = post.id, category_id = category.id, "Created post");

    Ok(Redirect::to(&post_url(category.id, post.id)).into_response())
}

pub async fn edit_post_page(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((category_id, post_id)): Path<(i32, i32)>,
) -> Result<Response> {
    let category = state.storage.get_category(category_id).await?;
    let post = state
        .storage
        .get_post_in_category(category_id, post_id)
        .await?;

    render(&PostFormTemplate {
        page: PageContext::new(&state.config, &identity),
        action: format!("/category/{}/edit-post/{}", category.id, post.id),
        category,
        edit: true,
        form: post.into(),
        errors: FormErrors::new(),
    })
}

pub async fn update_post(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((category_id, post_id)): Path<(i32, i32)>,
    Form(form): Form<PostForm>,
) -> Result<Response> {
    let category = state.storage.get_category(category_id).await?;
    let post = state
        .storage
        .get_post_in_category(category_id, post_id)
        .await?;

    let mut errors = form.validate().err().unwrap_or_default();
    if errors.get("title").is_none() && title_taken(&state, &form.title, Some(post.id)).await? {
        errors.add("title", DUPLICATE_TITLE);
    }

    if !errors.is_empty() {
        return render(&PostFormTemplate {
            page: PageContext::new(&state.config, &identity),
            action: format!("/category/{}/edit-post/{}", category.id, post.id),
            category,
            edit: true,
            form,
            errors,
        });
    }

    let post = state.storage.update_post(post.id, form.to_fields()).await?;
    tracing::info!(post_id = post.id, "Updated post");

    Ok(Redirect::to(&post_url(category.id, post.id)).into_response())
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path((category_id, post_id)): Path<(i32, i32)>,
) -> Result<Response> {
    let post = state
        .storage
        .get_post_in_category(category_id, post_id)
        .await?;
    state.storage.delete_post(post.id).await?;

    Ok(Redirect::to(&format!("/category/{}", category_id)).into_response())
}

/// Runs behind `require_comment_owner`; only checks that the comment sits under this post.
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(path): Path<CommentPath>,
) -> Result<Response> {
    let post = state
        .storage
        .get_post_in_category(path.category_id, path.post_id)
        .await?;

    let belongs = state
        .storage
        .find_comment(path.comment_id)
        .await?
        .is_some_and(|comment| comment.parent_post_id == post.id);
    if !belongs {
        return Err(AppError::NotFound(format!(
            "comment {} under post {}",
            path.comment_id, post.id
        )));
    }

    state.storage.delete_comment(path.comment_id).await?;
    tracing::info!(comment_id = path.comment_id, post_id = post.id, "Deleted comment");

    Ok(Redirect::to(&post_url(path.category_id, post.id)).into_response())
}

/// Target of the generic `/delete/:item/:id` route.
enum DeleteTarget {
    Category(blog_category::Model),
    Post(blog_post::Model),
}

impl DeleteTarget {
    async fn load(state: &AppState, item: &str, id: i32) -> Result<Self> {
        match item {
            "category" => Ok(Self::Category(state.storage.get_category(id).await?)),
            "post" => state
                .storage
                .find_post(id)
                .await?
                .map(Self::Post)
                .ok_or_else(|| AppError::NotFound(format!("post {}", id))),
            other => Err(AppError::NotFound(format!("deletable item '{}'", other))),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Category(_) => "category",
            Self::Post(_) => "post",
        }
    }

    fn title(&self) -> &str {
        match self {
            Self::Category(category) => &category.title,
            Self::Post(post) => &post.title,
        }
    }

    fn cancel_url(&self) -> String {
        match self {
            Self::Category(category) => format!("/category/{}", category.id),
            Self::Post(post) => post_url(post.category_id, post.id),
        }
    }
}

pub async fn delete_item_page(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((item, id)): Path<(String, i32)>,
) -> Result<Response> {
    let target = DeleteTarget::load(&state, &item, id).await?;

    render(&ConfirmDeleteTemplate {
        page: PageContext::new(&state.config, &identity),
        item: target.label().to_string(),
        title: target.title().to_string(),
        action: format!("/delete/{}/{}", target.label(), id),
        cancel_url: target.cancel_url(),
    })
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path((item, id)): Path<(String, i32)>,
) -> Result<Response> {
    let destination = match DeleteTarget::load(&state, &item, id).await? {
        DeleteTarget::Category(category) => {
            state.storage.delete_category(category.id).await?;
            "/".to_string()
        }
        DeleteTarget::Post(post) => {
            state.storage.delete_post(post.id).await?;
            format!("/category/{}", post.category_id)
        }
    };

    Ok(Redirect::to(&destination).into_response())
}
