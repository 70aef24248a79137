//! Motivation banner: when to ask for a message, and how long to show it.
//!
//! The banner fires once per threshold crossing. A finished day asks for a
//! celebration, a day at 75% or more asks for encouragement, and falling
//! under 75% clears whatever is shown and re-arms the trigger.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::stats::Progress;

/// Share of the day's tasks that must be done before encouragement is sent.
pub const ENCOURAGEMENT_THRESHOLD: f64 = 0.75;

/// How long a delivered message stays visible.
pub const BANNER_TTL: Duration = Duration::from_secs(40);

/// Returned by the server when no AI key is configured.
pub const NO_KEY_MESSAGE: &str = "Great job! (Configure API Key for AI)";
/// Returned by the server when the model call fails.
pub const PROVIDER_FAILURE_MESSAGE: &str = "Stay focused. Keep pushing.";
/// Used when the model answers with nothing, and by the client when the
/// request itself fails.
pub const EMPTY_MESSAGE_FALLBACK: &str = "Keep pushing forward.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotivationKind {
    Encouragement,
    Celebration,
}

impl MotivationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Encouragement => "encouragement",
            Self::Celebration => "celebration",
        }
    }
}

impl fmt::Display for MotivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotivationRequest {
    pub completed_count: usize,
    pub total_count: usize,
    #[serde(rename = "type")]
    pub kind: MotivationKind,
}

impl MotivationRequest {
    #[must_use]
    pub fn new(progress: Progress, kind: MotivationKind) -> Self {
        Self {
            completed_count: progress.completed,
            total_count: progress.total,
            kind,
        }
    }

    /// Prompt sent to the language model.
    #[must_use]
    pub fn prompt(&self) -> String {
        match self.kind {
            MotivationKind::Celebration => format!(
                "I just finished 100% of my daily tasks ({} tasks). \
                 Give me a short, punchy, professional congratulatory message (max 1 sentence).",
                self.total_count
            ),
            MotivationKind::Encouragement => format!(
                "I have completed {} out of {} tasks today. \
                 Give me a short, stern but motivating stoic quote to make me finish \
                 the remaining tasks immediately. (max 1 sentence).",
                self.completed_count, self.total_count
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotivationResponse {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAction {
    /// Nothing to do.
    Idle,
    Fetch(MotivationKind),
    /// Progress fell below the threshold; hide any message.
    Clear,
}

/// Decide what the banner should do for today's progress.
#[must_use]
pub fn evaluate(progress: Progress, quote_visible: bool) -> TriggerAction {
    if progress.is_empty() {
        return TriggerAction::Idle;
    }
    let kind = if progress.completed >= progress.total {
        MotivationKind::Celebration
    } else if progress.ratio() >= ENCOURAGEMENT_THRESHOLD {
        MotivationKind::Encouragement
    } else {
        return TriggerAction::Clear;
    };
    if quote_visible {
        TriggerAction::Idle
    } else {
        TriggerAction::Fetch(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BannerState {
    Hidden,
    Fetching(MotivationKind),
    Showing {
        quote: String,
        kind: MotivationKind,
        shown_at: Instant,
    },
    /// Expired or closed; stays quiet until the trigger asks for a
    /// different kind or is cleared.
    Dismissed(MotivationKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotivationBanner {
    state: BannerState,
}

impl Default for MotivationBanner {
    fn default() -> Self {
        Self {
            state: BannerState::Hidden,
        }
    }
}

impl MotivationBanner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed today's progress. Returns a request when a message should be
    /// fetched; at most one fetch is outstanding at a time.
    pub fn observe(&mut self, progress: Progress, now: Instant) -> Option<MotivationRequest> {
        self.expire(now);

        let visible = matches!(self.state, BannerState::Showing { .. });
        match evaluate(progress, visible) {
            TriggerAction::Idle => None,
            TriggerAction::Clear => {
                self.state = BannerState::Hidden;
                None
            }
            TriggerAction::Fetch(kind) => match self.state {
                BannerState::Fetching(_) => None,
                BannerState::Dismissed(done) if done == kind => None,
                _ => {
                    self.state = BannerState::Fetching(kind);
                    Some(MotivationRequest::new(progress, kind))
                }
            },
        }
    }

    /// Show a fetched message. Ignored unless a fetch is outstanding.
    pub fn deliver(&mut self, quote: impl Into<String>, now: Instant) {
        if let BannerState::Fetching(kind) = self.state {
            self.state = BannerState::Showing {
                quote: quote.into(),
                kind,
                shown_at: now,
            };
        }
    }

    /// Abandon an outstanding fetch so the next observation may retry.
    pub fn abandon(&mut self) {
        if matches!(self.state, BannerState::Fetching(_)) {
            self.state = BannerState::Hidden;
        }
    }

    pub fn dismiss(&mut self) {
        if let BannerState::Showing { kind, .. } = self.state {
            self.state = BannerState::Dismissed(kind);
        }
    }

    fn expire(&mut self, now: Instant) {
        if let BannerState::Showing { shown_at, .. } = self.state
            && now.saturating_duration_since(shown_at) >= BANNER_TTL
        {
            self.dismiss();
        }
    }

    #[must_use]
    pub fn quote(&self) -> Option<&str> {
        match &self.state {
            BannerState::Showing { quote, .. } => Some(quote),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_fetching(&self) -> bool {
        matches!(self.state, BannerState::Fetching(_))
    }
}
