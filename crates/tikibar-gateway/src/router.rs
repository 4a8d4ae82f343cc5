//! Axum router wiring.
//!
//! [`toolbar_routes`] serves the toolbar pages under `/tikibar/`;
//! [`profiled`] wraps a host router with the profiling middleware.

use axum::{
    middleware,
    routing::get,
    Router,
};

use crate::{access, app_state::AppState, middleware::profile_request, views};

/// Toolbar pages, to be merged into the host router.
pub fn toolbar_routes(state: AppState) -> Router {
    Router::new()
        .route("/tikibar/", get(views::tikibar))
        .route("/tikibar/settings/", get(views::tikibar_settings))
        .route("/tikibar/on/", get(views::tikibar_on).post(views::tikibar_on))
        .route("/tikibar/off/", get(views::tikibar_off).post(views::tikibar_off))
        .route("/tikibar/set-for-api-domain/", get(views::set_for_api_domain))
        .route("/tikibar/set-token/", get(views::set_token))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            access::ssl_required,
        ))
        .with_state(state)
}

/// Host router plus the toolbar pages, every request passing through the
/// profiling middleware.
pub fn profiled(host: Router, state: AppState) -> Router {
    host.merge(toolbar_routes(state.clone()))
        .layer(middleware::from_fn_with_state(state, profile_request))
}
