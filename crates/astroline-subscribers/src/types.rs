use serde::{Deserialize, Serialize};

use astroline_core::{NotifyTime, Sign, TimeZoneOffset};

/// A subscriber profile as the delivery core sees it.
///
/// `sign`, `offset` and `notify_at` stay `None` until the subscriber
/// finishes preference setup; the delivery path treats a missing sign as
/// "not configured" and no-ops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    /// Chat id of the recipient — primary key.
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
    /// Selected content subject.
    pub sign: Option<Sign>,
    /// Fixed UTC offset for the delivery trigger.
    pub offset: Option<TimeZoneOffset>,
    /// Local wall-clock delivery time.
    pub notify_at: Option<NotifyTime>,
    /// Opt-in state. Flipped to false on permanent delivery rejection.
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Subscriber {
    /// True when the profile is complete enough to schedule deliveries.
    pub fn is_configured(&self) -> bool {
        self.sign.is_some() && self.offset.is_some() && self.notify_at.is_some()
    }
}

/// Statically-typed partial update for a subscriber.
///
/// Only the fields the domain allows to mutate exist here; a typo'd or
/// unknown field is a compile error, not a silently-ignored column.
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct SubscriberPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
    pub sign: Option<Sign>,
    pub offset: Option<TimeZoneOffset>,
    pub notify_at: Option<NotifyTime>,
    pub is_active: Option<bool>,
}

impl SubscriberPatch {
    pub fn deactivate() -> Self {
        Self {
            is_active: Some(false),
            ..Default::default()
        }
    }

    pub fn activate() -> Self {
        Self {
            is_active: Some(true),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.username.is_none()
            && self.language_code.is_none()
            && self.sign.is_none()
            && self.offset.is_none()
            && self.notify_at.is_none()
            && self.is_active.is_none()
    }
}
