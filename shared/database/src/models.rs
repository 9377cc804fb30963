use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub full_name: String,
    pub role: String,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Tutor-specific attributes keyed by the owning user.
/// full_name/email/avatar are denormalized from the User at creation time
/// and may drift if the user record is later edited.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TutorProfile {
    pub tutor_id: Uuid,
    pub user_id: Uuid,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub experience_years: i32,
    pub education: Option<String>,
    pub hourly_rate: Decimal,
    pub currency: String,
    pub languages: Vec<String>,
    pub subjects: Vec<String>,
    pub offers_private: bool,
    pub offers_group: bool,
    pub total_students: i32,
    pub total_lessons: i32,
    pub rating: Decimal,
    pub total_reviews: i32,
    pub is_verified: bool,
    pub is_available: bool,
    pub full_name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A booked session. `tutor_id` references the TutorProfile, not the
/// tutor's user record. Party names/emails are denormalized at creation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub booking_id: Uuid,
    pub student_id: Uuid,
    pub tutor_id: Uuid,
    pub subject: String,
    pub session_type: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub price: Decimal,
    pub currency: String,
    pub status: String,
    pub notes: Option<String>,
    pub meeting_link: Option<String>,
    pub external_event_id: Option<String>,
    pub student_name: String,
    pub tutor_name: String,
    pub student_email: String,
    pub tutor_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub payment_id: Uuid,
    pub booking_id: Uuid,
    pub student_id: Uuid,
    pub tutor_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub commission_fee: Decimal,
    pub admission_fee: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

// booking_id is informational only; it is not validated against an
// existing booking.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub review_id: Uuid,
    pub student_id: Uuid,
    pub tutor_id: Uuid,
    pub booking_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub student_name: String,
    pub student_avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}
