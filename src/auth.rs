// ABOUTME: Registration, login and logout handlers backed by argon2 password hashes
// ABOUTME: Successful registration or login establishes a signed session cookie

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use axum_extra::extract::cookie::SignedCookieJar;

use crate::crypto;
use crate::error::Result;
use crate::forms::{FormErrors, LoginForm, LoginQuery, RegisterForm};
use crate::session::{self, Identity, SESSION_COOKIE_NAME};
use crate::views::{render, LoginTemplate, PageContext, RegisterTemplate};
use crate::AppState;

fn login_action(query: &LoginQuery) -> String {
    match query.next.as_deref() {
        Some(next) => format!("/login?next={}", urlencoding::encode(next)),
        None => "/login".to_string(),
    }
}

fn start_session(state: &AppState, jar: SignedCookieJar, user_id: i32) -> SignedCookieJar {
    let session_id = state.sessions.create_session(user_id);
    jar.add(session::create_session_cookie(
        session_id,
        state.config.cookie_secure,
    ))
}

pub async fn register_page(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    jar: SignedCookieJar,
) -> Result<Response> {
    let (jar, flash) = session::take_flash(jar);
    let page = RegisterTemplate {
        page: PageContext::new(&state.config, &identity).with_flash(flash),
        form: RegisterForm::default(),
        errors: FormErrors::new(),
    };

    Ok((jar, render(&page)?).into_response())
}

pub async fn register(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    jar: SignedCookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    if let Err(errors) = form.validate() {
        let page = RegisterTemplate {
            page: PageContext::new(&state.config, &identity),
            form: RegisterForm {
                password: String::new(),
                ..form
            },
            errors,
        };
        return render(&page);
    }

    let email = form.email.trim();
    if state.storage.find_user_by_email(email).await?.is_some() {
        tracing::info!("Registration refused, email already in use");
        let jar = session::set_flash(jar, "Email already in use");
        return Ok((jar, Redirect::to("/register")).into_response());
    }

    let password_hash = crypto::hash_password(&form.password)?;
    let user = state
        .storage
        .create_user(form.username.trim(), email, &password_hash)
        .await?;
    tracing::info!(user_id = user.id, "Registered new user");

    let jar = start_session(&state, jar, user.id);
    Ok((jar, Redirect::to("/")).into_response())
}

pub async fn login_page(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<LoginQuery>,
    jar: SignedCookieJar,
) -> Result<Response> {
    let (jar, flash) = session::take_flash(jar);
    let page = LoginTemplate {
        page: PageContext::new(&state.config, &identity).with_flash(flash),
        action: login_action(&query),
        form: LoginForm::default(),
        errors: FormErrors::new(),
    };

    Ok((jar, render(&page)?).into_response())
}

pub async fn login(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<LoginQuery>,
    jar: SignedCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let mut errors = match form.validate() {
        Ok(()) => FormErrors::new(),
        Err(errors) => errors,
    };

    let mut authenticated = None;
    if errors.is_empty() {
        match state.storage.find_user_by_email(form.email.trim()).await? {
            None => errors.add("email", "That email does not exist, please try again."),
            Some(user) if !crypto::verify_password(&form.password, &user.password) => {
                errors.add("password", "Password incorrect, please try again.")
            }
            Some(user) => authenticated = Some(user),
        }
    }

    let Some(user) = authenticated else {
        let page = LoginTemplate {
            page: PageContext::new(&state.config, &identity),
            action: login_action(&query),
            form: LoginForm {
                password: String::new(),
                ..form
            },
            errors,
        };
        return render(&page);
    };

    tracing::info!(user_id = user.id, "User logged in");
    let jar = start_session(&state, jar, user.id);
    Ok((jar, Redirect::to(query.destination())).into_response())
}

pub async fn logout(State(state): State<AppState>, jar: SignedCookieJar) -> impl IntoResponse {
    if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
        state.sessions.remove_session(cookie.value());
    }

    let jar = jar.add(session::create_logout_cookie(state.config.cookie_secure));
    (jar, Redirect::to("/"))
}
