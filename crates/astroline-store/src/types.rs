use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use astroline_core::{Period, Sign};

/// One named section of a horoscope (business / health / love / lunar),
/// with an optional rating string like `"4/5"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub text: Option<String>,
    pub rating: Option<String>,
}

impl Section {
    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// The payload extracted from one upstream page, without identity.
///
/// An empty `general_text` means the upstream has not published content for
/// this period yet — a valid "not ready" state, never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoroscopeContent {
    pub general_text: Option<String>,
    pub business: Section,
    pub health: Section,
    pub love: Section,
    pub lunar: Section,
}

impl HoroscopeContent {
    pub fn is_ready(&self) -> bool {
        self.general_text
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }
}

/// A stored horoscope: identity `(sign, period, date)` plus payload.
///
/// Identity is immutable once written; a later harvest of the same identity
/// replaces the payload in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoroscopeRecord {
    pub sign: Sign,
    pub period: Period,
    pub date: NaiveDate,
    pub content: HoroscopeContent,
}

impl HoroscopeRecord {
    pub fn new(sign: Sign, period: Period, date: NaiveDate, content: HoroscopeContent) -> Self {
        Self {
            sign,
            period,
            date,
            content,
        }
    }
}
