//! Page classification labels and the per-page attempt state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label the classifier assigns to one fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Real results; hand to the extractor.
    Ok,
    /// HTTP-successful but degraded (CAPTCHA, interstitial, empty shell).
    SoftBlocked,
    /// The request itself failed; retrying the same request will not help.
    Fatal,
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::SoftBlocked => write!(f, "soft_blocked"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}

/// States of the retry engine for a single page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    /// Not started.
    #[default]
    Pending,
    /// Request in flight.
    Fetching,
    /// Response received, being labelled.
    Classifying,
    /// Page was `Ok` and extracted.
    Extracted,
    /// Soft block seen; waiting before the next fetch.
    Retrying,
    /// Gave up on this page.
    Aborted,
}

impl AttemptState {
    /// Returns true if no further transition is allowed.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Extracted | Self::Aborted)
    }

    /// Whether `next` is a legal successor of `self`.
    ///
    /// Any non-terminal state may abort (cancellation can land anywhere).
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        match (self, next) {
            (s, Self::Aborted) => !s.is_terminal(),
            (Self::Pending | Self::Retrying, Self::Fetching)
            | (Self::Fetching, Self::Classifying)
            | (Self::Classifying, Self::Extracted | Self::Retrying) => true,
            _ => false,
        }
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Fetching => write!(f, "fetching"),
            Self::Classifying => write!(f, "classifying"),
            Self::Extracted => write!(f, "extracted"),
            Self::Retrying => write!(f, "retrying"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Final disposition of a page as reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageDisposition {
    /// A record was emitted for this page.
    Extracted,
    /// The page was given up on; no record.
    Aborted,
    /// Never fetched because the run was cancelled.
    NotAttempted,
}

impl fmt::Display for PageDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extracted => write!(f, "extracted"),
            Self::Aborted => write!(f, "aborted"),
            Self::NotAttempted => write!(f, "not_attempted"),
        }
    }
}
