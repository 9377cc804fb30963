use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use tutorlink_auth::Claims;
use tutorlink_common::{ApiResponse, AppError};

use crate::models::*;
use crate::services::{AppState, BookingService, ReviewService, TutorService, UserService};

/// Maps a domain error to the wire. Server-side failures are logged and
/// surfaced with a generic message; client errors carry their own text.
fn error_response(err: AppError) -> (StatusCode, Json<ApiResponse<()>>) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let message = if err.is_client_facing() {
        err.to_string()
    } else {
        tracing::error!("{}: {}", err.error_code(), err);
        "Internal server error".to_string()
    };

    (status, Json(ApiResponse::error(message)))
}

fn validation_error(e: validator::ValidationErrors) -> (StatusCode, Json<ApiResponse<()>>) {
    error_response(AppError::Validation(e.to_string()))
}

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "tutorlink-api"
    }))
}

// ---- Auth ----

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> impl IntoResponse {
    if let Err(e) = request.validate() {
        return Err(validation_error(e));
    }

    match UserService::new(&state).register_user(request).await {
        Ok(auth) => Ok((StatusCode::CREATED, Json(ApiResponse::success(auth)))),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> impl IntoResponse {
    if let Err(e) = request.validate() {
        return Err(validation_error(e));
    }

    match UserService::new(&state).login_user(request).await {
        Ok(auth) => Ok(Json(ApiResponse::success(auth))),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    match UserService::new(&state).current_user(&claims).await {
        Ok(user) => Ok(Json(ApiResponse::success(UserResponse::from(user)))),
        Err(e) => Err(error_response(e)),
    }
}

// ---- Tutors ----

pub async fn list_tutors(
    State(state): State<AppState>,
    Query(query): Query<TutorListQuery>,
) -> impl IntoResponse {
    match TutorService::new(&state)
        .list_tutors(query.subject.as_deref())
        .await
    {
        Ok(tutors) => Ok(Json(ApiResponse::success(
            tutors
                .into_iter()
                .map(TutorProfileResponse::from)
                .collect::<Vec<_>>(),
        ))),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn get_tutor(
    State(state): State<AppState>,
    Path(tutor_id): Path<Uuid>,
) -> impl IntoResponse {
    match TutorService::new(&state).get_tutor(tutor_id).await {
        Ok(tutor) => Ok(Json(ApiResponse::success(TutorProfileResponse::from(tutor)))),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn get_tutor_reviews(
    State(state): State<AppState>,
    Path(tutor_id): Path<Uuid>,
) -> impl IntoResponse {
    match TutorService::new(&state).get_tutor_reviews(tutor_id).await {
        Ok(reviews) => Ok(Json(ApiResponse::success(
            reviews
                .into_iter()
                .map(ReviewResponse::from)
                .collect::<Vec<_>>(),
        ))),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn get_my_tutor_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiResponse<()>>)> {
    let user_id = claims.user_id().map_err(error_response)?;

    match TutorService::new(&state).get_my_profile(user_id).await {
        Ok(tutor) => Ok(Json(ApiResponse::success(TutorProfileResponse::from(tutor)))),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn update_tutor_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<UpdateTutorProfileRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiResponse<()>>)> {
    request.validate().map_err(validation_error)?;
    let user_id = claims.user_id().map_err(error_response)?;

    match TutorService::new(&state)
        .update_my_profile(user_id, request)
        .await
    {
        Ok(tutor) => Ok(Json(ApiResponse::success(TutorProfileResponse::from(tutor)))),
        Err(e) => Err(error_response(e)),
    }
}

// ---- Bookings ----

pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiResponse<()>>)> {
    request.validate().map_err(validation_error)?;

    let student = UserService::new(&state)
        .current_user(&claims)
        .await
        .map_err(error_response)?;

    match BookingService::new(&state)
        .create_booking(&student, request)
        .await
    {
        Ok(booking) => Ok((
            StatusCode::CREATED,
            Json(ApiResponse::success(BookingResponse::from(booking))),
        )),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn get_my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiResponse<()>>)> {
    let user_id = claims.user_id().map_err(error_response)?;

    match BookingService::new(&state).get_my_bookings(user_id).await {
        Ok(bookings) => Ok(Json(ApiResponse::success(
            bookings
                .into_iter()
                .map(BookingResponse::from)
                .collect::<Vec<_>>(),
        ))),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn get_tutor_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiResponse<()>>)> {
    let user_id = claims.user_id().map_err(error_response)?;

    match BookingService::new(&state).get_tutor_bookings(user_id).await {
        Ok(bookings) => Ok(Json(ApiResponse::success(
            bookings
                .into_iter()
                .map(BookingResponse::from)
                .collect::<Vec<_>>(),
        ))),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn update_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<UpdateBookingRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiResponse<()>>)> {
    request.validate().map_err(validation_error)?;
    let user_id = claims.user_id().map_err(error_response)?;

    match BookingService::new(&state)
        .update_booking(user_id, booking_id, request)
        .await
    {
        Ok(booking) => Ok(Json(ApiResponse::success(BookingResponse::from(booking)))),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn confirm_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiResponse<()>>)> {
    let user_id = claims.user_id().map_err(error_response)?;

    match BookingService::new(&state)
        .confirm_booking(user_id, booking_id)
        .await
    {
        Ok(booking) => Ok(Json(ApiResponse::success(BookingResponse::from(booking)))),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn update_meeting_link(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<UpdateMeetingLinkRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiResponse<()>>)> {
    request.validate().map_err(validation_error)?;
    let user_id = claims.user_id().map_err(error_response)?;

    match BookingService::new(&state)
        .update_meeting_link(user_id, booking_id, request.meeting_link)
        .await
    {
        Ok(booking) => Ok(Json(ApiResponse::success(BookingResponse::from(booking)))),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiResponse<()>>)> {
    let user = UserService::new(&state)
        .current_user(&claims)
        .await
        .map_err(error_response)?;

    match BookingService::new(&state)
        .cancel_booking(&user, booking_id)
        .await
    {
        Ok(booking) => Ok(Json(ApiResponse::success(BookingResponse::from(booking)))),
        Err(e) => Err(error_response(e)),
    }
}

// ---- Reviews ----

pub async fn create_review(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiResponse<()>>)> {
    request.validate().map_err(validation_error)?;

    let student = UserService::new(&state)
        .current_user(&claims)
        .await
        .map_err(error_response)?;

    match ReviewService::new(&state)
        .create_review(&student, request)
        .await
    {
        Ok(review) => Ok((
            StatusCode::CREATED,
            Json(ApiResponse::success(ReviewResponse::from(review))),
        )),
        Err(e) => Err(error_response(e)),
    }
}

// ---- Payments ----

pub async fn get_booking_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiResponse<()>>)> {
    let user_id = claims.user_id().map_err(error_response)?;

    match BookingService::new(&state)
        .get_booking_payment(user_id, booking_id)
        .await
    {
        Ok(payment) => Ok(Json(ApiResponse::success(PaymentResponse::from(payment)))),
        Err(e) => Err(error_response(e)),
    }
}
