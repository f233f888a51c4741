// ABOUTME: Server-rendered page templates (askama) and the context every page shares
// ABOUTME: Handlers build a template struct and hand it to `render`

use askama::Template;
use axum::response::{Html, IntoResponse, Response};
use chrono::Datelike;
use md5::{Digest, Md5};

use crate::config::Config;
use crate::entities::{blog_category, blog_post};
use crate::error::Result;
use crate::forms::{CategoryForm, CommentForm, FormErrors, LoginForm, PostForm, RegisterForm};
use crate::session::Identity;

pub fn render<T: Template>(template: &T) -> Result<Response> {
    Ok(Html(template.render()?).into_response())
}

#[derive(Debug, Clone)]
pub struct Viewer {
    pub username: String,
    pub is_admin: bool,
}

/// Values used by the shared layout: who is signed in, footer data, flash message.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub viewer: Option<Viewer>,
    pub year: i32,
    pub author: String,
    pub flash: Option<String>,
}

impl PageContext {
    pub fn new(config: &Config, identity: &Identity) -> Self {
        Self {
            viewer: identity.user().map(|user| Viewer {
                username: user.username.clone(),
                is_admin: identity.is_admin(),
            }),
            year: chrono::Utc::now().year(),
            author: config.site_author.clone(),
            flash: None,
        }
    }

    pub fn with_flash(mut self, flash: Option<String>) -> Self {
        self.flash = flash;
        self
    }

    pub fn is_admin(&self) -> bool {
        self.viewer.as_ref().map(|v| v.is_admin).unwrap_or(false)
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub page: PageContext,
    pub categories: Vec<blog_category::Model>,
}

#[derive(Template)]
#[template(path = "category.html")]
pub struct CategoryTemplate {
    pub page: PageContext,
    pub category: blog_category::Model,
    pub posts: Vec<blog_post::Model>,
}

/// Retro-style 100px avatar, rated G, keyed by the normalised email.
pub fn gravatar_url(email: &str) -> String {
    let digest = Md5::digest(email.trim().to_lowercase().as_bytes());
    format!(
        "https://www.gravatar.com/avatar/{:x}?s=100&d=retro&r=g",
        digest
    )
}

pub struct CommentView {
    pub id: i32,
    pub text: String,
    pub author_name: String,
    pub avatar_url: String,
    pub posted_time: String,
    pub can_delete: bool,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub page: PageContext,
    pub category: blog_category::Model,
    pub post: blog_post::Model,
    pub author_name: String,
    pub comments: Vec<CommentView>,
    pub form: CommentForm,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "category_form.html")]
pub struct CategoryFormTemplate {
    pub page: PageContext,
    pub action: String,
    pub edit: bool,
    pub form: CategoryForm,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub page: PageContext,
    pub category: blog_category::Model,
    pub action: String,
    pub edit: bool,
    pub form: PostForm,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub form: RegisterForm,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub action: String,
    pub form: LoginForm,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "confirm_delete.html")]
pub struct ConfirmDeleteTemplate {
    pub page: PageContext,
    pub item: String,
    pub title: String,
    pub action: String,
    pub cancel_url: String,
}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub page: PageContext,
}

#[derive(Template)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub page: PageContext,
    pub sent: bool,
    pub failed: bool,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gravatar_url_normalises_email() {
        let url = gravatar_url("test@example.com");
        assert_eq!(
            url,
            "https://www.gravatar.com/avatar/55502f40dc8b7c769880b10874abc9d0?s=100&d=retro&r=g"
        );
        assert_eq!(gravatar_url("  Test@Example.COM "), url);
        assert_ne!(gravatar_url("other@example.com"), url);
    }
}
