//! Tutor LMS (`tutor/v1`).

use tracing::instrument;

use deskops_core::{CourseId, WpUserId};

use super::types::{TutorCoursePage, TutorEnrollment, TutorEnvelope};
use super::{Course, RestClient, WordPressError};
use crate::config::WordPressConfig;

/// Tutor LMS REST client.
///
/// Tutor answers `200` with `code != "success"` for some failures, so the
/// envelope is checked as well as the HTTP status.
#[derive(Clone, Debug)]
pub struct TutorClient {
    rest: RestClient,
}

impl TutorClient {
    /// Create a new Tutor client using the WordPress credentials.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &WordPressConfig) -> Result<Self, WordPressError> {
        let rest = RestClient::new(
            &config.url,
            "tutor/v1",
            &config.username,
            &config.app_password,
        )?;
        Ok(Self { rest })
    }

    /// List published courses.
    ///
    /// # Errors
    ///
    /// Returns `WordPressError` if the request fails.
    #[instrument(skip(self))]
    pub async fn list_courses(&self) -> Result<Vec<Course>, WordPressError> {
        let envelope: TutorEnvelope<TutorCoursePage> = self
            .rest
            .get("courses", &[("per_page", "100")])
            .await?;

        let envelope = check_envelope(envelope)?;
        Ok(envelope.data.map(|d| d.posts).unwrap_or_default())
    }

    /// Enroll a user in a course.
    ///
    /// # Errors
    ///
    /// Returns `WordPressError::Api` if Tutor refuses, including when the user
    /// is already enrolled (see [`WordPressError::is_already_enrolled`]).
    #[instrument(skip(self))]
    pub async fn enroll(&self, user_id: WpUserId, course_id: CourseId) -> Result<(), WordPressError> {
        let envelope: TutorEnvelope<serde_json::Value> = self
            .rest
            .post("enrollments", &TutorEnrollment { user_id, course_id })
            .await?;

        check_envelope(envelope)?;
        Ok(())
    }
}

fn check_envelope<T>(envelope: TutorEnvelope<T>) -> Result<TutorEnvelope<T>, WordPressError> {
    if envelope.code.is_empty() || envelope.code == "success" {
        return Ok(envelope);
    }

    Err(WordPressError::Api {
        status: 200,
        code: envelope.code,
        message: envelope.message,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_check_envelope() {
        let ok = TutorEnvelope::<()> {
            code: "success".to_owned(),
            message: String::new(),
            data: None,
        };
        assert!(check_envelope(ok).is_ok());

        let refused = TutorEnvelope::<()> {
            code: "already_enrolled".to_owned(),
            message: "User already enrolled".to_owned(),
            data: None,
        };
        let err = check_envelope(refused).unwrap_err();
        assert!(err.is_already_enrolled());
    }
}
