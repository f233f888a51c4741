// ABOUTME: Form payloads submitted by the site's pages and their field validation
// ABOUTME: Validation failures are collected per field and rendered back into the form

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::entities::{blog_category, blog_post};
use crate::storage::{CategoryFields, PostFields, DEFAULT_IMAGE_URL};

const MAX_NAME_LEN: usize = 100;
const MAX_LINE_LEN: usize = 250;
const MIN_PASSWORD_LEN: usize = 8;

/// Field name -> first error message for that field.
#[derive(Debug, Default, Clone)]
pub struct FormErrors(BTreeMap<&'static str, String>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn required(&mut self, field: &'static str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "This field is required.");
        }
    }

    fn max_len(&mut self, field: &'static str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(field, format!("Must be at most {} characters.", max));
        }
    }

    fn optional_url(&mut self, field: &'static str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        let valid = url::Url::parse(value)
            .map(|parsed| matches!(parsed.scheme(), "http" | "https") && parsed.has_host())
            .unwrap_or(false);
        if !valid {
            self.add(field, "Enter a valid http(s) URL.");
        } else {
            self.max_len(field, value, MAX_LINE_LEN);
        }
    }

    fn email(&mut self, field: &'static str, value: &str) {
        let value = value.trim();
        let shaped = match value.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !value.contains(char::is_whitespace)
            }
            None => false,
        };
        if !shaped {
            self.add(field, "Enter a valid email address.");
        }
    }

    fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// The built-in placeholder is not a URL the form would accept back.
fn stored_image(img_url: String) -> String {
    if img_url == DEFAULT_IMAGE_URL {
        String::new()
    } else {
        img_url
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        errors.required("username", &self.username);
        errors.max_len("username", &self.username, MAX_NAME_LEN);
        errors.required("email", &self.email);
        errors.email("email", &self.email);
        errors.max_len("email", &self.email, MAX_LINE_LEN);
        errors.required("password", &self.password);
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.add(
                "password",
                format!("Must be at least {} characters.", MIN_PASSWORD_LEN),
            );
        }
        errors.into_result()
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        errors.required("email", &self.email);
        errors.required("password", &self.password);
        errors.into_result()
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LoginQuery {
    pub next: Option<String>,
}

impl LoginQuery {
    /// Post-login destination; only local paths are honoured.
    pub fn destination(&self) -> &str {
        match self.next.as_deref() {
            Some(next) if is_local_path(next) => next,
            _ => "/",
        }
    }
}

// Browsers read `\` as `/`, so `/\host` is as off-site as `//host`.
fn is_local_path(next: &str) -> bool {
    next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && !next.chars().any(char::is_control)
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct CategoryForm {
    pub title: String,
    pub subtitle: String,
    pub img_url: String,
}

impl CategoryForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        errors.required("title", &self.title);
        errors.max_len("title", &self.title, MAX_LINE_LEN);
        errors.required("subtitle", &self.subtitle);
        errors.max_len("subtitle", &self.subtitle, MAX_LINE_LEN);
        errors.optional_url("img_url", &self.img_url);
        errors.into_result()
    }

    pub fn to_fields(&self) -> CategoryFields {
        CategoryFields {
            title: self.title.trim().to_string(),
            subtitle: self.subtitle.trim().to_string(),
            img_url: optional(&self.img_url),
        }
    }
}

impl From<blog_category::Model> for CategoryForm {
    fn from(category: blog_category::Model) -> Self {
        Self {
            title: category.title,
            subtitle: category.subtitle,
            img_url: stored_image(category.img_url),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub img_url: String,
}

impl PostForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        errors.required("title", &self.title);
        errors.max_len("title", &self.title, MAX_LINE_LEN);
        errors.required("subtitle", &self.subtitle);
        errors.max_len("subtitle", &self.subtitle, MAX_LINE_LEN);
        errors.required("body", &self.body);
        errors.optional_url("img_url", &self.img_url);
        errors.into_result()
    }

    pub fn to_fields(&self) -> PostFields {
        PostFields {
            title: self.title.trim().to_string(),
            subtitle: self.subtitle.trim().to_string(),
            body: self.body.clone(),
            img_url: optional(&self.img_url),
        }
    }
}

impl From<blog_post::Model> for PostForm {
    fn from(post: blog_post::Model) -> Self {
        Self {
            title: post.title,
            subtitle: post.subtitle,
            body: post.body,
            img_url: stored_image(post.img_url),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        errors.required("text", &self.text);
        errors.into_result()
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(username: &str, email: &str, password: &str) -> RegisterForm {
        RegisterForm {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn test_register_valid() {
        assert!(register("ada", "ada@example.com", "analytical").validate().is_ok());
    }

    #[test]
    fn test_register_field_errors() {
        let errors = register("", "not-an-email", "short").validate().unwrap_err();

        assert_eq!(errors.get("username"), Some("This field is required."));
        assert_eq!(errors.get("email"), Some("Enter a valid email address."));
        assert_eq!(errors.get("password"), Some("Must be at least 8 characters."));
    }

    #[test]
    fn test_first_error_per_field_wins() {
        let errors = register("ada", "", "analytical").validate().unwrap_err();
        assert_eq!(errors.get("email"), Some("This field is required."));
    }

    #[test]
    fn test_username_length_limit() {
        let long_name = "a".repeat(MAX_NAME_LEN + 1);
        let errors = register(&long_name, "ada@example.com", "analytical")
            .validate()
            .unwrap_err();
        assert!(errors.get("username").unwrap().contains("at most 100"));
    }

    #[test]
    fn test_image_url_shape() {
        let mut form = CategoryForm {
            title: "Rust".into(),
            subtitle: "Systems notes".into(),
            img_url: "javascript:alert(1)".into(),
        };
        assert!(form.validate().unwrap_err().get("img_url").is_some());

        form.img_url = "https://images.example.com/rust.png".into();
        assert!(form.validate().is_ok());

        form.img_url = "   ".into();
        assert!(form.validate().is_ok());
        assert_eq!(form.to_fields().img_url, None);
    }

    #[test]
    fn test_post_requires_body() {
        let form = PostForm {
            title: "Hello".into(),
            subtitle: "First".into(),
            body: "  ".into(),
            img_url: String::new(),
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.get("body").is_some());
        assert!(errors.get("title").is_none());
    }

    #[test]
    fn test_login_destination_only_local() {
        let query = |next: Option<&str>| LoginQuery {
            next: next.map(str::to_string),
        };

        assert_eq!(query(Some("/new-category")).destination(), "/new-category");
        assert_eq!(query(Some("//evil.example")).destination(), "/");
        assert_eq!(query(Some("https://evil.example")).destination(), "/");
        assert_eq!(query(Some("/\\evil.example")).destination(), "/");
        assert_eq!(query(Some("/about\\..\\x")).destination(), "/");
        assert_eq!(query(Some("/\t/evil.example")).destination(), "/");
        assert_eq!(
            query(Some("/category/1/post/2?x=1")).destination(),
            "/category/1/post/2?x=1"
        );
        assert_eq!(query(None).destination(), "/");
    }

    #[test]
    fn test_edit_form_hides_placeholder_image() {
        let post = blog_post::Model {
            id: 1,
            title: "Hello".into(),
            subtitle: "First".into(),
            body: "<p>Hi</p>".into(),
            img_url: DEFAULT_IMAGE_URL.into(),
            date: "March 01, 2024".into(),
            author_id: 1,
            category_id: 1,
        };

        let form = PostForm::from(post.clone());
        assert_eq!(form.img_url, "");
        assert!(form.validate().is_ok());

        let custom = PostForm::from(blog_post::Model {
            img_url: "https://example.com/a.png".into(),
            ..post
        });
        assert_eq!(custom.img_url, "https://example.com/a.png");
    }
}
