use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use tutorlink_common::{SessionType, UserRole};
use tutorlink_database::{Booking, Payment, Review, TutorProfile, User};

// Request/Response DTOs. Public ids surface as strings only.

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8))]
    pub password: String,

    #[validate(length(min = 1, max = 100))]
    pub full_name: String,

    pub role: UserRole,

    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.user_id.to_string(),
            email: user.email,
            full_name: user.full_name,
            role: UserRole::parse(&user.role).unwrap_or(UserRole::Student),
            phone: user.phone,
            avatar: user.avatar,
            is_active: user.is_active,
            is_verified: user.is_verified,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TutorProfileResponse {
    pub id: String,
    pub user_id: String,
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

impl From<TutorProfile> for TutorProfileResponse {
    fn from(tutor: TutorProfile) -> Self {
        Self {
            id: tutor.tutor_id.to_string(),
            user_id: tutor.user_id.to_string(),
            headline: tutor.headline,
            bio: tutor.bio,
            experience_years: tutor.experience_years,
            education: tutor.education,
            hourly_rate: tutor.hourly_rate,
            currency: tutor.currency,
            languages: tutor.languages,
            subjects: tutor.subjects,
            offers_private: tutor.offers_private,
            offers_group: tutor.offers_group,
            total_students: tutor.total_students,
            total_lessons: tutor.total_lessons,
            rating: tutor.rating,
            total_reviews: tutor.total_reviews,
            is_verified: tutor.is_verified,
            is_available: tutor.is_available,
            full_name: tutor.full_name,
            email: tutor.email,
            avatar: tutor.avatar,
            created_at: tutor.created_at,
            updated_at: tutor.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateTutorProfileRequest {
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub experience_years: Option<i32>,
    pub education: Option<String>,
    pub hourly_rate: Option<Decimal>,
    pub currency: Option<String>,
    pub languages: Option<Vec<String>>,
    pub subjects: Option<Vec<String>>,
    pub offers_private: Option<bool>,
    pub offers_group: Option<bool>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct TutorListQuery {
    pub subject: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub tutor_id: Uuid,

    #[validate(length(min = 1, max = 200))]
    pub subject: String,

    pub session_type: SessionType,

    pub scheduled_at: DateTime<Utc>,

    #[validate(range(min = 15, max = 480))]
    pub duration_minutes: i32,

    pub notes: Option<String>,
}

/// Only notes are updatable through the generic endpoint; status moves
/// exclusively through the confirm/cancel transitions.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateBookingRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateMeetingLinkRequest {
    #[validate(length(min = 1, max = 500))]
    pub meeting_link: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingResponse {
    pub id: String,
    pub student_id: String,
    pub tutor_id: String,
    pub student_name: String,
    pub tutor_name: String,
    pub student_email: String,
    pub tutor_email: String,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            id: b.booking_id.to_string(),
            student_id: b.student_id.to_string(),
            tutor_id: b.tutor_id.to_string(),
            student_name: b.student_name,
            tutor_name: b.tutor_name,
            student_email: b.student_email,
            tutor_email: b.tutor_email,
            subject: b.subject,
            session_type: b.session_type,
            scheduled_at: b.scheduled_at,
            duration_minutes: b.duration_minutes,
            price: b.price,
            currency: b.currency,
            status: b.status,
            notes: b.notes,
            meeting_link: b.meeting_link,
            external_event_id: b.external_event_id,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub tutor_id: Uuid,
    pub booking_id: Uuid,
    pub rating: i32,

    #[validate(length(max = 2000))]
    pub comment: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub id: String,
    pub student_id: String,
    pub tutor_id: String,
    pub booking_id: String,
    pub student_name: String,
    pub student_avatar: Option<String>,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl From<Review> for ReviewResponse {
    fn from(r: Review) -> Self {
        Self {
            id: r.review_id.to_string(),
            student_id: r.student_id.to_string(),
            tutor_id: r.tutor_id.to_string(),
            booking_id: r.booking_id.to_string(),
            student_name: r.student_name,
            student_avatar: r.student_avatar,
            rating: r.rating,
            comment: r.comment,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub id: String,
    pub booking_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub commission_fee: Decimal,
    pub admission_fee: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: p.payment_id.to_string(),
            booking_id: p.booking_id.to_string(),
            amount: p.amount,
            currency: p.currency,
            commission_fee: p.commission_fee,
            admission_fee: p.admission_fee,
            status: p.status,
            created_at: p.created_at,
            completed_at: p.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::str::FromStr;

    #[test]
    fn booking_response_exposes_string_ids() {
        let booking = Booking {
            booking_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            tutor_id: Uuid::new_v4(),
            subject: "Algebra".into(),
            session_type: "private".into(),
            scheduled_at: Utc::now(),
            duration_minutes: 60,
            price: Decimal::from_str("60.00").unwrap(),
            currency: "USD".into(),
            status: "pending".into(),
            notes: None,
            meeting_link: None,
            external_event_id: None,
            student_name: "Student".into(),
            tutor_name: "Tutor".into(),
            student_email: "s@example.com".into(),
            tutor_email: "t@example.com".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let id = booking.booking_id;

        let response = BookingResponse::from(booking);
        assert_eq!(response.id, id.to_string());
        assert_eq!(response.status, "pending");

        let json = serde_json::to_value(&response).unwrap();
        assert!(json["id"].is_string());
        assert!(json["student_id"].is_string());
        assert!(json["tutor_id"].is_string());
    }
}
