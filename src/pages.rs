// ABOUTME: Static pages and the contact form
// ABOUTME: A contact submission is mailed to the site owner's inbox

use axum::{extract::State, response::Response, Extension, Form};

use crate::error::Result;
use crate::forms::ContactForm;
use crate::mail::{self, ContactMessage};
use crate::session::Identity;
use crate::views::{render, AboutTemplate, ContactTemplate, PageContext};
use crate::AppState;

pub async fn about(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Response> {
    render(&AboutTemplate {
        page: PageContext::new(&state.config, &identity),
    })
}

pub async fn contact_page(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Response> {
    render(&ContactTemplate {
        page: PageContext::new(&state.config, &identity),
        sent: false,
        failed: false,
    })
}

pub async fn contact(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<ContactForm>,
) -> Result<Response> {
    let message = ContactMessage::from(form);
    let sent = mail::send_contact_message(state.mailer.as_ref(), &message).await;

    render(&ContactTemplate {
        page: PageContext::new(&state.config, &identity),
        sent,
        failed: !sent,
    })
}
