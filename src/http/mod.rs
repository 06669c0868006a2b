//! Public HTTP surface for the user resource.
//!
//! # Routes
//!
//! | Method | Path | Success | Failure |
//! |---|---|---|---|
//! | GET | `/api/users` | 200, JSON array | — |
//! | GET | `/api/users/:id` | 200, JSON object | 400 malformed id, 404 unknown |
//! | POST | `/api/users` | 201, JSON object | 400 bad or missing field |
//! | PUT | `/api/users/:id` | 200, JSON object | 400 malformed id/body, 404 unknown |
//! | DELETE | `/api/users/:id` | 204, empty | 400 malformed id, 404 unknown |
//!
//! Anything else, unknown paths and unsupported verbs alike, is a 404.
//! The same router serves single mode and every worker; only the store
//! implementation behind [`AppState`] differs.

pub mod handlers;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::response::Response;
use axum::routing::get;
use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use crate::store::UserStore;

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
}

/// Builds the user API router for one listener.
///
/// `port` identifies this listener in the `x-served-by` response header,
/// which is how the spread of traffic across workers stays observable from
/// the outside.
pub fn router(store: Arc<dyn UserStore>, port: u16) -> Router {
    let state = AppState { store };

    Router::new()
        .route(
            "/api/users",
            get(handlers::list_users)
                .post(handlers::create_user)
                .fallback(handlers::not_found),
        )
        .route(
            "/api/users/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user)
                .fallback(handlers::not_found),
        )
        .fallback(handlers::not_found)
        .layer(middleware::map_response(move |mut response: Response| async move {
            response
                .headers_mut()
                .insert("x-served-by", HeaderValue::from(port));
            response
        }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
