use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let image_body_limit = state.config.image_body_limit();

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/shops", get(handlers::shops::list_shops))
        .route("/api/shops/:id", get(handlers::shops::get_shop))
        .route(
            "/api/shops/:id/services",
            get(handlers::shops::list_shop_services),
        )
        .route(
            "/api/shops/:id/reviews",
            get(handlers::reviews::list_shop_reviews),
        )
        .route(
            "/api/bookings",
            post(handlers::bookings::create_booking).get(handlers::bookings::list_bookings),
        )
        .route(
            "/api/bookings/:id",
            get(handlers::bookings::get_booking).patch(handlers::bookings::patch_booking),
        )
        .route(
            "/api/bookings/:id/confirm",
            post(handlers::bookings::confirm_booking),
        )
        .route(
            "/api/bookings/:id/cancel",
            post(handlers::bookings::cancel_booking),
        )
        .route(
            "/api/bookings/:id/complete",
            post(handlers::bookings::complete_booking),
        )
        .route(
            "/api/bookings/:id/images",
            post(handlers::bookings::attach_images)
                .layer(DefaultBodyLimit::max(image_body_limit)),
        )
        .route("/api/reviews", post(handlers::reviews::create_review))
        .route(
            "/api/services",
            get(handlers::services::list_own_services)
                .post(handlers::services::create_service)
                .put(handlers::services::replace_services),
        )
        .route(
            "/api/services/:id",
            patch(handlers::services::update_service).delete(handlers::services::delete_service),
        )
        .route(
            "/api/vehicles",
            get(handlers::vehicles::list_vehicles).post(handlers::vehicles::add_vehicle),
        )
        .route(
            "/api/vehicles/:id",
            delete(handlers::vehicles::delete_vehicle),
        )
        .route("/api/admin/users", post(handlers::admin::provision_user))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
