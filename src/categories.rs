// ABOUTME: Category handlers: home page listing, category page, admin create and edit
// ABOUTME: Listings read whole tables; there is no pagination

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use axum_extra::extract::cookie::SignedCookieJar;

use crate::error::Result;
use crate::forms::{CategoryForm, FormErrors};
use crate::session::{self, Identity};
use crate::views::{render, CategoryFormTemplate, CategoryTemplate, IndexTemplate, PageContext};
use crate::AppState;

const DUPLICATE_TITLE: &str = "A category with this title already exists.";

pub async fn index(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    jar: SignedCookieJar,
) -> Result<Response> {
    let (jar, flash) = session::take_flash(jar);
    let page = IndexTemplate {
        page: PageContext::new(&state.config, &identity).with_flash(flash),
        categories: state.storage.list_categories().await?,
    };

    Ok((jar, render(&page)?).into_response())
}

pub async fn show_category(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(category_id): Path<i32>,
) -> Result<Response> {
    let category = state.storage.get_category(category_id).await?;
    let posts = state.storage.posts_in_category(category.id).await?;

    render(&CategoryTemplate {
        page: PageContext::new(&state.config, &identity),
        category,
        posts,
    })
}

pub async fn new_category_page(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Response> {
    render(&CategoryFormTemplate {
        page: PageContext::new(&state.config, &identity),
        action: "/new-category".to_string(),
        edit: false,
        form: CategoryForm::default(),
        errors: FormErrors::new(),
    })
}

pub async fn create_category(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<CategoryForm>,
) -> Result<Response> {
    let mut errors = form.validate().err().unwrap_or_default();
    if errors.get("title").is_none()
        && state
            .storage
            .find_category_by_title(form.title.trim())
            .await?
            .is_some()
    {
        errors.add("title", DUPLICATE_TITLE);
    }

    if !errors.is_empty() {
        return render(&CategoryFormTemplate {
            page: PageContext::new(&state.config, &identity),
            action: "/new-category".to_string(),
            edit: false,
            form,
            errors,
        });
    }

    let author_id = identity.require_user_id()?;
    let category = state
        .storage
        .create_category(form.to_fields(), author_id)
        .await?;
    tracing::info!(category_id = category.id, "Created category");

    Ok(Redirect::to("/").into_response())
}

pub async fn edit_category_page(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(category_id): Path<i32>,
) -> Result<Response> {
    let category = state.storage.get_category(category_id).await?;

    render(&CategoryFormTemplate {
        page: PageContext::new(&state.config, &identity),
        action: format!("/edit-category/{}", category.id),
        edit: true,
        form: category.into(),
        errors: FormErrors::new(),
    })
}

pub async fn update_category(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(category_id): Path<i32>,
    Form(form): Form<CategoryForm>,
) -> Result<Response> {
    let category = state.storage.get_category(category_id).await?;

    let mut errors = form.validate().err().unwrap_or_default();
    if errors.get("title").is_none() {
        if let Some(existing) = state
            .storage
            .find_category_by_title(form.title.trim())
            .await?
        {
            if existing.id != category.id {
                errors.add("title", DUPLICATE_TITLE);
            }
        }
    }

    if !errors.is_empty() {
        return render(&CategoryFormTemplate {
            page: PageContext::new(&state.config, &identity),
            action: format!("/edit-category/{}", category.id),
            edit: true,
            form,
            errors,
        });
    }

    let category = state
        .storage
        .update_category(category.id, form.to_fields())
        .await?;
    tracing::info!(category_id = category.id, "Updated category");

    Ok(Redirect::to(&format!("/category/{}", category.id)).into_response())
}
