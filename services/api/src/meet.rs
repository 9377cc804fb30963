use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tutorlink_common::AppError;

use crate::config::MeetConfig;

#[derive(Debug, Clone, Serialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub organizer_email: String,
    pub attendee_email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeetEvent {
    pub meet_link: String,
    pub event_id: String,
}

/// Builds the event payload for a confirmed session from its booking fields.
pub fn build_event_request(
    subject: &str,
    session_label: &str,
    tutor_name: &str,
    student_name: &str,
    notes: Option<&str>,
    start_time: DateTime<Utc>,
    duration_minutes: i32,
    tutor_email: &str,
    student_email: &str,
) -> CreateEventRequest {
    CreateEventRequest {
        title: format!("{} Tutoring Session - {}", subject, session_label),
        description: format!(
            "Tutoring session with {}\nStudent: {}\nSubject: {}\n\nNotes: {}",
            tutor_name,
            student_name,
            subject,
            notes.unwrap_or("None")
        ),
        start_time,
        duration_minutes,
        organizer_email: tutor_email.to_string(),
        attendee_email: student_email.to_string(),
    }
}

/// Client for the external calendar/meeting API. When disabled or failing,
/// event creation yields no link and the booking flow proceeds without one.
#[derive(Clone)]
pub struct MeetService {
    client: reqwest::Client,
    config: MeetConfig,
}

impl MeetService {
    pub fn new(config: &MeetConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
        }
    }

    pub async fn create_event(
        &self,
        request: &CreateEventRequest,
    ) -> Result<Option<MeetEvent>, AppError> {
        if !self.config.enabled {
            tracing::info!("Meeting provider disabled, skipping event creation");
            return Ok(None);
        }

        let url = format!("{}/events", self.config.api_base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Meeting provider error: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Meeting provider returned status {}",
                response.status()
            )));
        }

        let event = response
            .json::<MeetEvent>()
            .await
            .map_err(|e| AppError::ExternalService(format!("Invalid provider response: {}", e)))?;

        Ok(Some(event))
    }

    /// Cancels an external event. Failure is reported as `false` and
    /// otherwise ignored by callers.
    pub async fn cancel_event(&self, event_id: &str) -> bool {
        if !self.config.enabled {
            return false;
        }

        let url = format!("{}/events/{}", self.config.api_base_url, event_id);
        match self
            .client
            .delete(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(
                    "Failed to cancel event {}: provider returned {}",
                    event_id,
                    response.status()
                );
                false
            }
            Err(e) => {
                tracing::warn!("Failed to cancel event {}: {}", event_id, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_request_includes_both_parties() {
        let request = build_event_request(
            "Algebra",
            "1-on-1",
            "Alice Teaches",
            "Bob Learns",
            Some("Chapter 4 homework"),
            Utc::now(),
            30,
            "alice@example.com",
            "bob@example.com",
        );

        assert_eq!(request.title, "Algebra Tutoring Session - 1-on-1");
        assert!(request.description.contains("Alice Teaches"));
        assert!(request.description.contains("Student: Bob Learns"));
        assert!(request.description.contains("Chapter 4 homework"));
        assert_eq!(request.organizer_email, "alice@example.com");
        assert_eq!(request.attendee_email, "bob@example.com");
    }

    #[test]
    fn missing_notes_render_as_none() {
        let request = build_event_request(
            "Physics",
            "Group",
            "T",
            "S",
            None,
            Utc::now(),
            60,
            "t@example.com",
            "s@example.com",
        );
        assert!(request.description.ends_with("Notes: None"));
    }

    #[tokio::test]
    async fn disabled_provider_creates_no_event() {
        let service = MeetService::new(&MeetConfig {
            enabled: false,
            api_base_url: "http://localhost:9100".into(),
            api_key: String::new(),
        });

        let request = build_event_request(
            "Algebra",
            "1-on-1",
            "T",
            "S",
            None,
            Utc::now(),
            30,
            "t@example.com",
            "s@example.com",
        );

        assert!(service.create_event(&request).await.unwrap().is_none());
        assert!(!service.cancel_event("abc").await);
    }
}
