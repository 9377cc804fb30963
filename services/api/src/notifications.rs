use chrono::{DateTime, Utc};
use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::{authentication::Credentials, PoolConfig},
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};

use tutorlink_common::AppError;

use crate::config::EmailConfig;

/// Fire-and-forget email dispatch for booking and review events. Callers
/// log and swallow any error; a failed notification never fails the
/// operation that triggered it.
#[derive(Clone)]
pub struct NotificationService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: EmailConfig,
}

impl NotificationService {
    pub fn new(config: &EmailConfig) -> Result<Self, AppError> {
        if !config.enabled {
            return Ok(Self {
                transport: AsyncSmtpTransport::<Tokio1Executor>::unencrypted_localhost(),
                config: config.clone(),
            });
        }

        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| AppError::Internal(format!("SMTP relay error: {}", e)))?
            .credentials(creds)
            .pool_config(PoolConfig::new().max_size(10))
            .build();

        Ok(Self {
            transport,
            config: config.clone(),
        })
    }

    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        if !self.config.enabled {
            tracing::info!("Email disabled, skipping '{}' to {}", subject, to);
            return Ok(());
        }

        let from_mailbox: Mailbox =
            format!("{} <{}>", self.config.from_name, self.config.from_email)
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        let message = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to send email: {}", e)))?;

        tracing::info!("Email '{}' sent to {}", subject, to);
        Ok(())
    }

    pub async fn send_welcome_email(
        &self,
        to: &str,
        user_name: &str,
        is_tutor: bool,
    ) -> Result<(), AppError> {
        let body = if is_tutor {
            format!(
                "Hi {},\n\nWelcome to TutorLink! Complete your tutor profile \
                 to start receiving booking requests.\n",
                user_name
            )
        } else {
            format!(
                "Hi {},\n\nWelcome to TutorLink! Browse tutors and book your \
                 first session whenever you're ready.\n",
                user_name
            )
        };
        self.send_email(to, "Welcome to TutorLink", &body).await
    }

    pub async fn notify_new_booking(
        &self,
        tutor_email: &str,
        tutor_name: &str,
        student_name: &str,
        subject: &str,
        scheduled_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let body = format!(
            "Hi {},\n\n{} requested a {} session on {}.\n\nConfirm the \
             booking from your dashboard to lock it in.\n",
            tutor_name,
            student_name,
            subject,
            scheduled_at.format("%Y-%m-%d %H:%M UTC")
        );
        self.send_email(tutor_email, "New booking request", &body)
            .await
    }

    pub async fn notify_booking_confirmed(
        &self,
        student_email: &str,
        student_name: &str,
        tutor_name: &str,
        subject: &str,
        scheduled_at: DateTime<Utc>,
        meeting_link: Option<&str>,
    ) -> Result<(), AppError> {
        let mut body = format!(
            "Hi {},\n\n{} confirmed your {} session on {}.\n",
            student_name,
            tutor_name,
            subject,
            scheduled_at.format("%Y-%m-%d %H:%M UTC")
        );
        if let Some(link) = meeting_link {
            body.push_str(&format!("\nJoin here: {}\n", link));
        }
        self.send_email(student_email, "Booking confirmed", &body)
            .await
    }

    pub async fn notify_booking_cancelled(
        &self,
        recipient_email: &str,
        recipient_name: &str,
        cancelled_by_name: &str,
        subject: &str,
        scheduled_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let body = format!(
            "Hi {},\n\n{} cancelled the {} session scheduled for {}.\n",
            recipient_name,
            cancelled_by_name,
            subject,
            scheduled_at.format("%Y-%m-%d %H:%M UTC")
        );
        self.send_email(recipient_email, "Booking cancelled", &body)
            .await
    }

    pub async fn notify_review_received(
        &self,
        tutor_email: &str,
        tutor_name: &str,
        student_name: &str,
        rating: i32,
    ) -> Result<(), AppError> {
        let body = format!(
            "Hi {},\n\n{} left you a {}-star review.\n",
            tutor_name, student_name, rating
        );
        self.send_email(tutor_email, "You received a new review", &body)
            .await
    }
}
