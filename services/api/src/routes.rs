use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::handlers;
use crate::middleware::auth_middleware;
use crate::services::AppState;

pub fn create_routes(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/tutors", get(handlers::list_tutors))
        .route("/tutors/:tutor_id", get(handlers::get_tutor))
        .route("/tutors/:tutor_id/reviews", get(handlers::get_tutor_reviews));

    let protected = Router::new()
        .route("/auth/me", get(handlers::get_me))
        .route("/tutors/profile/me", get(handlers::get_my_tutor_profile))
        .route("/tutors/profile", put(handlers::update_tutor_profile))
        .route(
            "/bookings",
            post(handlers::create_booking).get(handlers::get_my_bookings),
        )
        .route("/bookings/tutor/my-bookings", get(handlers::get_tutor_bookings))
        .route("/bookings/:booking_id", put(handlers::update_booking))
        .route("/bookings/:booking_id/confirm", post(handlers::confirm_booking))
        .route("/bookings/:booking_id/cancel", post(handlers::cancel_booking))
        .route(
            "/bookings/:booking_id/meet-link",
            put(handlers::update_meeting_link),
        )
        .route("/bookings/reviews", post(handlers::create_review))
        .route(
            "/payments/booking/:booking_id",
            get(handlers::get_booking_payment),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public)
        .merge(protected)
        .with_state(state)
}
