use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use tutorlink_auth::{Claims, JwtService, PasswordService};
use tutorlink_common::{AppError, BookingStatus, UserRole};
use tutorlink_database::{Booking, DbPool, Review, TutorProfile, User};

use crate::config::AppConfig;
use crate::meet::{build_event_request, MeetService};
use crate::models::*;
use crate::notifications::NotificationService;
use crate::payments::PaymentService;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub jwt_service: JwtService,
    pub payment_service: PaymentService,
    pub meet_service: MeetService,
    pub notification_service: NotificationService,
    pub config: AppConfig,
}

/// Session price: hourly rate prorated over the booked minutes, rounded to
/// the currency's minor unit.
pub fn session_price(hourly_rate: Decimal, duration_minutes: i32) -> Decimal {
    (hourly_rate * Decimal::from(duration_minutes) / Decimal::from(60))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// The caller's relationship to a booking. The tutor side is always resolved
/// through TutorProfile ownership, never by comparing the caller's user id
/// against the booking's tutor (profile) id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingRole {
    Student,
    Tutor,
}

pub fn classify_booking_role(
    caller_id: Uuid,
    booking_student_id: Uuid,
    caller_profile_id: Option<Uuid>,
    booking_tutor_id: Uuid,
) -> Option<BookingRole> {
    if caller_id == booking_student_id {
        return Some(BookingRole::Student);
    }
    if caller_profile_id == Some(booking_tutor_id) {
        return Some(BookingRole::Tutor);
    }
    None
}

pub fn ensure_can_confirm(status: BookingStatus) -> Result<(), AppError> {
    match status {
        BookingStatus::Pending => Ok(()),
        BookingStatus::Confirmed => Err(AppError::BadRequest(
            "Booking is already confirmed".to_string(),
        )),
        BookingStatus::Cancelled => Err(AppError::BadRequest(
            "Cannot confirm a cancelled booking".to_string(),
        )),
    }
}

pub fn ensure_can_cancel(status: BookingStatus) -> Result<(), AppError> {
    match status {
        BookingStatus::Cancelled => Err(AppError::BadRequest(
            "Booking is already cancelled".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Exact mean of a review set, rounded to 2 places. Full recompute keeps the
/// aggregate correct regardless of insertion order.
pub fn mean_rating(ratings: &[i32]) -> Decimal {
    if ratings.is_empty() {
        return Decimal::ZERO;
    }
    let total: i64 = ratings.iter().map(|r| *r as i64).sum();
    (Decimal::from(total) / Decimal::from(ratings.len() as i64))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn parse_status(booking: &Booking) -> Result<BookingStatus, AppError> {
    BookingStatus::parse(&booking.status).ok_or_else(|| {
        AppError::Internal(format!(
            "Booking {} has unknown status '{}'",
            booking.booking_id, booking.status
        ))
    })
}

pub struct UserService {
    db_pool: DbPool,
    jwt_service: JwtService,
    notification_service: NotificationService,
    config: AppConfig,
}

impl UserService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
            jwt_service: state.jwt_service.clone(),
            notification_service: state.notification_service.clone(),
            config: state.config.clone(),
        }
    }

    pub async fn register_user(&self, request: RegisterRequest) -> Result<AuthResponse, AppError> {
        PasswordService::validate_password_strength(&request.password)?;

        let existing = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(&request.email)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        if existing {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let hashed_password = PasswordService::hash_password(&request.password)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (user_id, email, hashed_password, full_name, role, phone)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.email)
        .bind(&hashed_password)
        .bind(&request.full_name)
        .bind(request.role.as_str())
        .bind(&request.phone)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        // Tutors get a profile at registration, denormalizing name and email
        // at this instant.
        if request.role == UserRole::Tutor {
            sqlx::query(
                r#"
                INSERT INTO tutor_profiles (tutor_id, user_id, full_name, email, avatar)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(user.user_id)
            .bind(&user.full_name)
            .bind(&user.email)
            .bind(&user.avatar)
            .execute(&self.db_pool)
            .await
            .map_err(AppError::Database)?;
        }

        if let Err(e) = self
            .notification_service
            .send_welcome_email(&user.email, &user.full_name, request.role == UserRole::Tutor)
            .await
        {
            tracing::warn!("Failed to send welcome email to {}: {}", user.email, e);
        }

        let token = self.issue_token(&user, request.role)?;

        tracing::info!("User registered: {} ({:?})", user.email, request.role);

        Ok(AuthResponse {
            access_token: token,
            user: user.into(),
        })
    }

    pub async fn login_user(&self, request: LoginRequest) -> Result<AuthResponse, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(&request.email)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| {
                AppError::Authentication("Invalid email or password".to_string())
            })?;

        if !PasswordService::verify_password(&request.password, &user.hashed_password)? {
            return Err(AppError::Authentication(
                "Invalid email or password".to_string(),
            ));
        }

        if !user.is_active {
            return Err(AppError::Authentication("Account is disabled".to_string()));
        }

        let role = UserRole::parse(&user.role)
            .ok_or_else(|| AppError::Internal(format!("Unknown role '{}'", user.role)))?;
        let token = self.issue_token(&user, role)?;

        tracing::info!("User logged in: {}", user.email);

        Ok(AuthResponse {
            access_token: token,
            user: user.into(),
        })
    }

    pub async fn get_user_by_id(&self, user_id: Uuid) -> Result<User, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn current_user(&self, claims: &Claims) -> Result<User, AppError> {
        self.get_user_by_id(claims.user_id()?).await
    }

    fn issue_token(&self, user: &User, role: UserRole) -> Result<String, AppError> {
        let claims = Claims::new(
            user.user_id,
            user.email.clone(),
            user.full_name.clone(),
            role,
            &self.config.jwt,
        );
        self.jwt_service.generate_token(&claims)
    }
}

pub struct TutorService {
    db_pool: DbPool,
}

impl TutorService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
        }
    }

    pub async fn list_tutors(
        &self,
        subject: Option<&str>,
    ) -> Result<Vec<TutorProfile>, AppError> {
        let tutors = match subject {
            Some(subject) => {
                sqlx::query_as::<_, TutorProfile>(
                    r#"
                    SELECT * FROM tutor_profiles
                    WHERE is_available = TRUE AND $1 = ANY(subjects)
                    ORDER BY rating DESC, total_reviews DESC
                    "#,
                )
                .bind(subject)
                .fetch_all(&self.db_pool)
                .await
            }
            None => {
                sqlx::query_as::<_, TutorProfile>(
                    r#"
                    SELECT * FROM tutor_profiles
                    WHERE is_available = TRUE
                    ORDER BY rating DESC, total_reviews DESC
                    "#,
                )
                .fetch_all(&self.db_pool)
                .await
            }
        }
        .map_err(AppError::Database)?;

        Ok(tutors)
    }

    pub async fn get_tutor(&self, tutor_id: Uuid) -> Result<TutorProfile, AppError> {
        sqlx::query_as::<_, TutorProfile>("SELECT * FROM tutor_profiles WHERE tutor_id = $1")
            .bind(tutor_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Tutor not found".to_string()))
    }

    pub async fn find_profile_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<TutorProfile>, AppError> {
        sqlx::query_as::<_, TutorProfile>("SELECT * FROM tutor_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn get_my_profile(&self, user_id: Uuid) -> Result<TutorProfile, AppError> {
        self.find_profile_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Tutor profile not found".to_string()))
    }

    pub async fn update_my_profile(
        &self,
        user_id: Uuid,
        request: UpdateTutorProfileRequest,
    ) -> Result<TutorProfile, AppError> {
        // Ensure the caller owns a profile before touching anything.
        self.get_my_profile(user_id).await?;

        let tutor = sqlx::query_as::<_, TutorProfile>(
            r#"
            UPDATE tutor_profiles SET
                headline = COALESCE($2, headline),
                bio = COALESCE($3, bio),
                experience_years = COALESCE($4, experience_years),
                education = COALESCE($5, education),
                hourly_rate = COALESCE($6, hourly_rate),
                currency = COALESCE($7, currency),
                languages = COALESCE($8, languages),
                subjects = COALESCE($9, subjects),
                offers_private = COALESCE($10, offers_private),
                offers_group = COALESCE($11, offers_group),
                is_available = COALESCE($12, is_available),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&request.headline)
        .bind(&request.bio)
        .bind(request.experience_years)
        .bind(&request.education)
        .bind(request.hourly_rate)
        .bind(&request.currency)
        .bind(&request.languages)
        .bind(&request.subjects)
        .bind(request.offers_private)
        .bind(request.offers_group)
        .bind(request.is_available)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(tutor)
    }

    pub async fn get_tutor_reviews(&self, tutor_id: Uuid) -> Result<Vec<Review>, AppError> {
        // Existence check keeps a 404 for unknown tutors instead of an
        // empty list.
        self.get_tutor(tutor_id).await?;

        sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE tutor_id = $1 ORDER BY created_at DESC",
        )
        .bind(tutor_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }
}

pub struct BookingService {
    db_pool: DbPool,
    payment_service: PaymentService,
    meet_service: MeetService,
    notification_service: NotificationService,
}

impl BookingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
            payment_service: state.payment_service.clone(),
            meet_service: state.meet_service.clone(),
            notification_service: state.notification_service.clone(),
        }
    }

    async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE booking_id = $1")
            .bind(booking_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))
    }

    async fn find_profile_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<TutorProfile>, AppError> {
        sqlx::query_as::<_, TutorProfile>("SELECT * FROM tutor_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)
    }

    /// Single ownership-resolution point consulted by every booking
    /// operation.
    async fn resolve_role(
        &self,
        user_id: Uuid,
        booking: &Booking,
    ) -> Result<Option<BookingRole>, AppError> {
        let profile = self.find_profile_by_user(user_id).await?;
        Ok(classify_booking_role(
            user_id,
            booking.student_id,
            profile.map(|p| p.tutor_id),
            booking.tutor_id,
        ))
    }

    pub async fn create_booking(
        &self,
        student: &User,
        request: CreateBookingRequest,
    ) -> Result<Booking, AppError> {
        let tutor = sqlx::query_as::<_, TutorProfile>(
            "SELECT * FROM tutor_profiles WHERE tutor_id = $1",
        )
        .bind(request.tutor_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Tutor not found".to_string()))?;

        let price = session_price(tutor.hourly_rate, request.duration_minutes);
        let now = Utc::now();

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (
                booking_id, student_id, tutor_id, subject, session_type,
                scheduled_at, duration_minutes, price, currency, status, notes,
                student_name, tutor_name, student_email, tutor_email,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $16)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student.user_id)
        .bind(tutor.tutor_id)
        .bind(&request.subject)
        .bind(request.session_type.as_str())
        .bind(request.scheduled_at)
        .bind(request.duration_minutes)
        .bind(price)
        .bind(&tutor.currency)
        .bind(BookingStatus::Pending.as_str())
        .bind(&request.notes)
        .bind(&student.full_name)
        .bind(&tutor.full_name)
        .bind(&student.email)
        .bind(&tutor.email)
        .bind(now)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        // Side effects are best-effort: the booking stands even if every one
        // of them fails.
        if let Err(e) = self
            .payment_service
            .create_payment(
                booking.booking_id,
                student.user_id,
                tutor.tutor_id,
                price,
                &tutor.currency,
            )
            .await
        {
            tracing::error!(
                "Failed to create payment record for booking {}: {}",
                booking.booking_id,
                e
            );
        }

        if let Err(e) = self
            .notification_service
            .notify_new_booking(
                &tutor.email,
                &tutor.full_name,
                &student.full_name,
                &booking.subject,
                booking.scheduled_at,
            )
            .await
        {
            tracing::warn!(
                "Failed to send new-booking notification for {}: {}",
                booking.booking_id,
                e
            );
        }

        Ok(booking)
    }

    /// Bookings where the caller is the student, or the tutor through an
    /// owned profile. Newest-created first.
    pub async fn get_my_bookings(&self, user_id: Uuid) -> Result<Vec<Booking>, AppError> {
        let profile_id = self
            .find_profile_by_user(user_id)
            .await?
            .map(|p| p.tutor_id);

        sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE student_id = $1 OR tutor_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(profile_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    // Descending scheduled_at, matching the dashboard's expectation.
    pub async fn get_tutor_bookings(&self, user_id: Uuid) -> Result<Vec<Booking>, AppError> {
        let tutor = self
            .find_profile_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Tutor profile not found".to_string()))?;

        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE tutor_id = $1 ORDER BY scheduled_at DESC",
        )
        .bind(tutor.tutor_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn update_booking(
        &self,
        user_id: Uuid,
        booking_id: Uuid,
        request: UpdateBookingRequest,
    ) -> Result<Booking, AppError> {
        let booking = self.get_booking(booking_id).await?;

        if self.resolve_role(user_id, &booking).await?.is_none() {
            return Err(AppError::Authorization("Not authorized".to_string()));
        }

        sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET notes = COALESCE($2, notes), updated_at = NOW()
            WHERE booking_id = $1
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(&request.notes)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn confirm_booking(
        &self,
        user_id: Uuid,
        booking_id: Uuid,
    ) -> Result<Booking, AppError> {
        let booking = self.get_booking(booking_id).await?;

        match self.resolve_role(user_id, &booking).await? {
            Some(BookingRole::Tutor) => {}
            _ => {
                return Err(AppError::Authorization(
                    "Only the tutor can confirm this booking".to_string(),
                ));
            }
        }

        ensure_can_confirm(parse_status(&booking)?)?;

        let session_type = booking.session_type.as_str();
        let session_label = tutorlink_common::SessionType::parse(session_type)
            .map(|t| t.label())
            .unwrap_or("Session");
        let event_request = build_event_request(
            &booking.subject,
            session_label,
            &booking.tutor_name,
            &booking.student_name,
            booking.notes.as_deref(),
            booking.scheduled_at,
            booking.duration_minutes,
            &booking.tutor_email,
            &booking.student_email,
        );

        // A failed or disabled provider still lets the confirmation through,
        // just without a meeting link.
        let event = match self.meet_service.create_event(&event_request).await {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    "Meeting event creation failed for booking {}: {}",
                    booking_id,
                    e
                );
                None
            }
        };

        // Compare-and-swap on status closes the double-confirm race window.
        let confirmed = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = $2, meeting_link = COALESCE($3, meeting_link),
                external_event_id = COALESCE($4, external_event_id),
                updated_at = NOW()
            WHERE booking_id = $1 AND status = $5
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(BookingStatus::Confirmed.as_str())
        .bind(event.as_ref().map(|e| e.meet_link.clone()))
        .bind(event.as_ref().map(|e| e.event_id.clone()))
        .bind(BookingStatus::Pending.as_str())
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| {
            AppError::Conflict("Booking status changed concurrently".to_string())
        })?;

        if let Err(e) = self.complete_booking_payment(booking_id).await {
            tracing::error!(
                "Failed to complete payment for booking {}: {}",
                booking_id,
                e
            );
        }

        if let Err(e) = self
            .notification_service
            .notify_booking_confirmed(
                &confirmed.student_email,
                &confirmed.student_name,
                &confirmed.tutor_name,
                &confirmed.subject,
                confirmed.scheduled_at,
                confirmed.meeting_link.as_deref(),
            )
            .await
        {
            tracing::warn!(
                "Failed to send confirmation notification for {}: {}",
                booking_id,
                e
            );
        }

        Ok(confirmed)
    }

    async fn complete_booking_payment(&self, booking_id: Uuid) -> Result<(), AppError> {
        if let Some(payment) = self.payment_service.get_payment_by_booking(booking_id).await? {
            self.payment_service
                .complete_payment(payment.payment_id)
                .await?;
        }
        Ok(())
    }

    /// Manual meeting-link override. Callable in any status; does not touch
    /// the external event id.
    pub async fn update_meeting_link(
        &self,
        user_id: Uuid,
        booking_id: Uuid,
        meeting_link: String,
    ) -> Result<Booking, AppError> {
        let booking = self.get_booking(booking_id).await?;

        match self.resolve_role(user_id, &booking).await? {
            Some(BookingRole::Tutor) => {}
            _ => {
                return Err(AppError::Authorization(
                    "Only the tutor can update the meeting link".to_string(),
                ));
            }
        }

        sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET meeting_link = $2, updated_at = NOW()
            WHERE booking_id = $1
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(&meeting_link)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn cancel_booking(
        &self,
        user: &User,
        booking_id: Uuid,
    ) -> Result<Booking, AppError> {
        let booking = self.get_booking(booking_id).await?;

        let role = self
            .resolve_role(user.user_id, &booking)
            .await?
            .ok_or_else(|| AppError::Authorization("Not authorized".to_string()))?;

        ensure_can_cancel(parse_status(&booking)?)?;

        // Best-effort teardown of the external event; the result is ignored.
        if let Some(event_id) = &booking.external_event_id {
            self.meet_service.cancel_event(event_id).await;
        }

        let cancelled = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = $2, updated_at = NOW()
            WHERE booking_id = $1 AND status <> $2
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(BookingStatus::Cancelled.as_str())
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| {
            AppError::Conflict("Booking status changed concurrently".to_string())
        })?;

        // Notify the counter-party.
        let (recipient_email, recipient_name) = match role {
            BookingRole::Student => (&cancelled.tutor_email, &cancelled.tutor_name),
            BookingRole::Tutor => (&cancelled.student_email, &cancelled.student_name),
        };

        if let Err(e) = self
            .notification_service
            .notify_booking_cancelled(
                recipient_email,
                recipient_name,
                &user.full_name,
                &cancelled.subject,
                cancelled.scheduled_at,
            )
            .await
        {
            tracing::warn!(
                "Failed to send cancellation notification for {}: {}",
                booking_id,
                e
            );
        }

        Ok(cancelled)
    }

    pub async fn get_booking_payment(
        &self,
        user_id: Uuid,
        booking_id: Uuid,
    ) -> Result<tutorlink_database::Payment, AppError> {
        let booking = self.get_booking(booking_id).await?;

        if self.resolve_role(user_id, &booking).await?.is_none() {
            return Err(AppError::Authorization("Not authorized".to_string()));
        }

        self.payment_service
            .get_payment_by_booking(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))
    }
}

pub struct ReviewService {
    db_pool: DbPool,
    notification_service: NotificationService,
}

impl ReviewService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
            notification_service: state.notification_service.clone(),
        }
    }

    pub async fn create_review(
        &self,
        student: &User,
        request: CreateReviewRequest,
    ) -> Result<Review, AppError> {
        let tutor = sqlx::query_as::<_, TutorProfile>(
            "SELECT * FROM tutor_profiles WHERE tutor_id = $1",
        )
        .bind(request.tutor_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Tutor not found".to_string()))?;

        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (
                review_id, student_id, tutor_id, booking_id, rating, comment,
                student_name, student_avatar, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student.user_id)
        .bind(request.tutor_id)
        .bind(request.booking_id)
        .bind(request.rating)
        .bind(&request.comment)
        .bind(&student.full_name)
        .bind(&student.avatar)
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        // Full recompute from the complete review set on every insertion.
        let ratings = sqlx::query_scalar::<_, i32>(
            "SELECT rating FROM reviews WHERE tutor_id = $1",
        )
        .bind(request.tutor_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        sqlx::query(
            r#"
            UPDATE tutor_profiles
            SET rating = $2, total_reviews = $3, updated_at = NOW()
            WHERE tutor_id = $1
            "#,
        )
        .bind(request.tutor_id)
        .bind(mean_rating(&ratings))
        .bind(ratings.len() as i32)
        .execute(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        if let Err(e) = self
            .notification_service
            .notify_review_received(
                &tutor.email,
                &tutor.full_name,
                &student.full_name,
                request.rating,
            )
            .await
        {
            tracing::warn!(
                "Failed to send review notification to tutor {}: {}",
                tutor.tutor_id,
                e
            );
        }

        Ok(review)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn price_is_rate_prorated_over_duration() {
        // 60/hr for 30 minutes -> 30.00
        assert_eq!(
            session_price(Decimal::from(60), 30),
            Decimal::from_str("30.00").unwrap()
        );
        assert_eq!(
            session_price(Decimal::from_str("45.50").unwrap(), 60),
            Decimal::from_str("45.50").unwrap()
        );
        // 50/hr for 40 minutes -> 33.333... -> 33.33
        assert_eq!(
            session_price(Decimal::from(50), 40),
            Decimal::from_str("33.33").unwrap()
        );
    }

    #[test]
    fn caller_matching_the_student_id_is_the_student() {
        let caller = Uuid::new_v4();
        let tutor_profile = Uuid::new_v4();
        assert_eq!(
            classify_booking_role(caller, caller, None, tutor_profile),
            Some(BookingRole::Student)
        );
    }

    #[test]
    fn tutor_side_resolves_through_profile_ownership() {
        let caller = Uuid::new_v4();
        let student = Uuid::new_v4();
        let profile = Uuid::new_v4();

        // Owning the booked profile makes the caller the tutor.
        assert_eq!(
            classify_booking_role(caller, student, Some(profile), profile),
            Some(BookingRole::Tutor)
        );
        // Owning some other profile does not.
        assert_eq!(
            classify_booking_role(caller, student, Some(Uuid::new_v4()), profile),
            None
        );
        // A third party with no profile resolves to nothing.
        assert_eq!(classify_booking_role(caller, student, None, profile), None);
    }

    #[test]
    fn confirm_guard_rejects_terminal_and_repeat_states() {
        assert!(ensure_can_confirm(BookingStatus::Pending).is_ok());
        assert!(matches!(
            ensure_can_confirm(BookingStatus::Confirmed),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            ensure_can_confirm(BookingStatus::Cancelled),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn cancel_guard_rejects_only_cancelled() {
        assert!(ensure_can_cancel(BookingStatus::Pending).is_ok());
        assert!(ensure_can_cancel(BookingStatus::Confirmed).is_ok());
        assert!(matches!(
            ensure_can_cancel(BookingStatus::Cancelled),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn mean_rating_is_order_independent() {
        let forward = [5, 4, 3, 5, 4];
        let mut reversed = forward;
        reversed.reverse();
        assert_eq!(mean_rating(&forward), mean_rating(&reversed));
        assert_eq!(mean_rating(&forward), Decimal::from_str("4.20").unwrap());
    }

    #[test]
    fn mean_rating_handles_edges() {
        assert_eq!(mean_rating(&[]), Decimal::ZERO);
        assert_eq!(mean_rating(&[5]), Decimal::from(5));
        assert_eq!(mean_rating(&[4, 5]), Decimal::from_str("4.50").unwrap());
        // 1, 2, 2 -> 1.666... -> 1.67
        assert_eq!(mean_rating(&[1, 2, 2]), Decimal::from_str("1.67").unwrap());
    }
}
