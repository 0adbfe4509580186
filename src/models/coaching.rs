// SPDX-License-Identifier: MIT

//! Coach relationship lifecycle.
//!
//! One [`CoachRequest`] slot exists per (user, nutritionist) pair, keyed
//! deterministically so duplicate-request prevention is a transactional read
//! of a single document rather than a query-then-insert. The slot carries the
//! full lifecycle: `pending -> accepted -> selected -> ended/blocked`, with
//! `rated` reachable from `selected` or an ended state.
//!
//! `User.active_coach_id` must be set iff exactly one of the user's slots is
//! `selected`. Transitions that touch both (select, end, block) return the
//! writes to perform and are applied inside a single Firestore transaction;
//! nothing outside this module flips a status or the active-coach field.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a coach request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Selected,
    EndedByUser,
    EndedByCoach,
    BlockedByUser,
    Rated,
}

impl RequestStatus {
    /// Non-terminal states occupy the pair's single request slot.
    pub fn is_non_terminal(self) -> bool {
        matches!(self, Self::Pending | Self::Accepted | Self::Selected)
    }

    /// States from which a rating may still flip the slot to `rated`.
    pub fn is_ratable(self) -> bool {
        matches!(self, Self::Selected | Self::EndedByUser | Self::EndedByCoach)
    }

    /// Wire name, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Selected => "selected",
            Self::EndedByUser => "ended_by_user",
            Self::EndedByCoach => "ended_by_coach",
            Self::BlockedByUser => "blocked_by_user",
            Self::Rated => "rated",
        }
    }
}

/// Request slot document.
///
/// Stored at `coach_requests/{user_uid}_{nutritionist_uid}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachRequest {
    pub user_uid: String,
    pub nutritionist_id: String,
    pub status: RequestStatus,
    /// When the request was made (ISO 8601)
    pub requested_at: String,
    /// When the relationship ended, for ended/blocked states (ISO 8601)
    pub ended_at: Option<String>,
    /// Score attached when the slot was flipped to `rated`
    pub rating_given: Option<u32>,
}

impl CoachRequest {
    /// Fresh pending request.
    pub fn new(user_uid: &str, nutritionist_id: &str, now: &str) -> Self {
        Self {
            user_uid: user_uid.to_string(),
            nutritionist_id: nutritionist_id.to_string(),
            status: RequestStatus::Pending,
            requested_at: now.to_string(),
            ended_at: None,
            rating_given: None,
        }
    }

    /// Deterministic document ID for the pair's single slot.
    pub fn doc_id(user_uid: &str, nutritionist_id: &str) -> String {
        format!("{}_{}", user_uid, nutritionist_id)
    }

    /// `pending -> accepted`, performed by the nutritionist.
    pub fn accept(&mut self) -> Result<(), TransitionError> {
        if self.status != RequestStatus::Pending {
            return Err(TransitionError::WrongStatus {
                expected: RequestStatus::Pending,
                actual: self.status,
            });
        }
        self.status = RequestStatus::Accepted;
        Ok(())
    }

    /// `accepted -> selected`, performed by the user. The caller must also
    /// set `active_coach_id` on the user document in the same transaction.
    pub fn select(&mut self) -> Result<(), TransitionError> {
        if self.status != RequestStatus::Accepted {
            return Err(TransitionError::WrongStatus {
                expected: RequestStatus::Accepted,
                actual: self.status,
            });
        }
        self.status = RequestStatus::Selected;
        Ok(())
    }

    /// `selected -> ended_by_user | ended_by_coach | blocked_by_user`.
    pub fn end(&mut self, terminal: RequestStatus, now: &str) -> Result<(), TransitionError> {
        debug_assert!(matches!(
            terminal,
            RequestStatus::EndedByUser | RequestStatus::EndedByCoach | RequestStatus::BlockedByUser
        ));
        if self.status != RequestStatus::Selected {
            return Err(TransitionError::WrongStatus {
                expected: RequestStatus::Selected,
                actual: self.status,
            });
        }
        self.status = terminal;
        self.ended_at = Some(now.to_string());
        Ok(())
    }

    /// Flip a ratable slot to `rated`, recording the score.
    pub fn mark_rated(&mut self, rating: u32) -> Result<(), TransitionError> {
        if !self.status.is_ratable() {
            return Err(TransitionError::NotRatable(self.status));
        }
        self.status = RequestStatus::Rated;
        self.rating_given = Some(rating);
        Ok(())
    }
}

/// A guard violation on a lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("request status is {actual:?}, expected {expected:?}")]
    WrongStatus {
        expected: RequestStatus,
        actual: RequestStatus,
    },
    #[error("request status {0:?} cannot be rated")]
    NotRatable(RequestStatus),
}

/// One user's rating of one nutritionist.
///
/// Stored at `ratings/{nutritionist_uid}_{rater_uid}`; overwritten on re-rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    pub nutritionist_id: String,
    pub rater_uid: String,
    /// Integer score in 1..=5
    pub rating: u32,
    /// When this score was given (ISO 8601)
    pub rated_at: String,
}

impl Rating {
    pub fn doc_id(nutritionist_id: &str, rater_uid: &str) -> String {
        format!("{}_{}", nutritionist_id, rater_uid)
    }
}

/// Block marker. Presence of the document means the coach is blocked.
///
/// Stored at `blocked_coaches/{user_uid}_{nutritionist_uid}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedCoach {
    pub user_uid: String,
    pub nutritionist_id: String,
    /// When the block was set (ISO 8601)
    pub blocked_at: String,
}

impl BlockedCoach {
    pub fn doc_id(user_uid: &str, nutritionist_id: &str) -> String {
        format!("{}_{}", user_uid, nutritionist_id)
    }
}

/// Recompute a nutritionist's rating aggregate for a new score.
///
/// A re-rate replaces the rater's previous score in the running sum without
/// changing the count; a first rate increments the count. The average is
/// rounded to one decimal place.
pub fn apply_rating(
    average: f64,
    count: u32,
    prior: Option<u32>,
    new: u32,
) -> (f64, u32) {
    let sum = average * f64::from(count);
    // A stale rating doc with a zeroed aggregate counts as a first rating.
    let (sum, count) = match prior {
        Some(old) if count > 0 => (sum - f64::from(old) + f64::from(new), count),
        _ => (sum + f64::from(new), count + 1),
    };
    let average = if count == 0 {
        0.0
    } else {
        (sum / f64::from(count) * 10.0).round() / 10.0
    };
    (average, count)
}
