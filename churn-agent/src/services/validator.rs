//! Request validation
//!
//! Rules are checked in order and the first failure wins:
//! rating present → rating in 0..=10 → (strict mode) non-blank text.

use crate::models::{FeedbackCommand, ValidatedFeedback};
use thiserror::Error;

pub const MIN_RATING: i64 = 0;
pub const MAX_RATING: i64 = 10;

/// Caller-fixable request errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("NLS score is required.")]
    MissingRating,

    #[error("NLS score must be between 0 and 10.")]
    RatingOutOfRange(i64),

    #[error("Feedback text cannot be empty.")]
    EmptyFeedback,
}

/// Validates inbound feedback commands
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedbackValidator {
    require_feedback_text: bool,
}

impl FeedbackValidator {
    /// Empty feedback text is accepted (enrichment degrades to defaults)
    pub fn lenient() -> Self {
        Self {
            require_feedback_text: false,
        }
    }

    /// Blank feedback text is rejected with `EmptyFeedback`
    pub fn strict() -> Self {
        Self {
            require_feedback_text: true,
        }
    }

    pub fn new(require_feedback_text: bool) -> Self {
        Self {
            require_feedback_text,
        }
    }

    pub fn validate(&self, command: FeedbackCommand) -> Result<ValidatedFeedback, ValidationError> {
        let rating = command.rating.ok_or(ValidationError::MissingRating)?;

        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(ValidationError::RatingOutOfRange(rating));
        }

        if self.require_feedback_text && command.feedback_text.trim().is_empty() {
            return Err(ValidationError::EmptyFeedback);
        }

        Ok(ValidatedFeedback {
            // In range, so the narrowing cannot truncate
            rating: rating as u8,
            feedback_text: command.feedback_text,
        })
    }
}
