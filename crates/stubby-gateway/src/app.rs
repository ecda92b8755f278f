use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{health_handler, info_handler, redirect_handler, save_link_handler};
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/", post(save_link_handler))
            .route("/{key}", get(redirect_handler));
        if state.expose_info() {
            router = router.route("/info/{key}", get(info_handler));
        }

        router.layer(TraceLayer::new_for_http()).with_state(state)
    }
}
