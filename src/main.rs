// ABOUTME: Main entry point for the portfolio blog with categories, posts and comments
// ABOUTME: Builds the application state, wires routes and guards, and starts the server

use axum::{
    extract::FromRef,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::Key;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

mod auth;
mod categories;
mod config;
mod crypto;
mod entities;
mod error;
mod forms;
mod guards;
mod mail;
mod middleware;
mod migration;
mod pages;
mod posts;
mod session;
mod storage;
mod views;

#[cfg(test)]
mod storage_tests;

use config::Config;
use mail::{Mailer, SmtpMailer};
use session::SessionStore;
use storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub sessions: SessionStore,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
    cookie_key: Key,
}

impl AppState {
    pub fn new(config: Config, storage: Storage, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            cookie_key: Key::derive_from(config.secret_key.as_bytes()),
            storage: Arc::new(storage),
            sessions: SessionStore::new(),
            mailer,
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

pub fn build_router(state: AppState) -> Router {
    let admin = Router::new()
        .route(
            "/new-category",
            get(categories::new_category_page).post(categories::create_category),
        )
        .route(
            "/edit-category/:category_id",
            get(categories::edit_category_page).post(categories::update_category),
        )
        .route(
            "/category/:category_id/new-post",
            get(posts::new_post_page).post(posts::create_post),
        )
        .route(
            "/category/:category_id/edit-post/:post_id",
            get(posts::edit_post_page).post(posts::update_post),
        )
        .route(
            "/category/:category_id/delete/:post_id",
            get(posts::delete_post),
        )
        .route(
            "/delete/:item/:id",
            get(posts::delete_item_page).post(posts::delete_item),
        )
        .route_layer(from_fn(guards::require_admin));

    Router::new()
        .route("/", get(categories::index))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login))
        .route(
            "/logout",
            get(auth::logout).route_layer(from_fn(guards::require_login)),
        )
        .route("/category/:category_id", get(categories::show_category))
        .route(
            "/category/:category_id/post/:post_id",
            get(posts::show_post)
                .merge(post(posts::add_comment).route_layer(from_fn(guards::require_login))),
        )
        .route(
            "/category/:category_id/post/:post_id/delete-comment/:comment_id",
            get(posts::delete_comment).route_layer(from_fn_with_state(
                state.clone(),
                guards::require_comment_owner,
            )),
        )
        .route("/about", get(pages::about))
        .route("/contact", get(pages::contact_page).post(pages::contact))
        .merge(admin)
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .layer(from_fn_with_state(state.clone(), session::resolve_identity))
        .layer(from_fn(middleware::security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("portfolio_blog=info,tower_http=info")),
        )
        .init();

    let config = Config::load()?;
    let storage = Storage::connect(&config.database_url).await?;
    let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::new(&config.mail)?);
    let bind_addr = config.bind_addr;

    let app = build_router(AppState::new(config, storage, mailer));

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("Server running on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
