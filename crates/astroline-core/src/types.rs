use chrono::{Datelike, Duration, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The twelve zodiac signs, with the numeric ids the upstream site uses in
/// its URLs. The ids are not sequential — they come straight from the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

impl Sign {
    /// Full harvest universe, in zodiac order.
    pub const ALL: [Sign; 12] = [
        Sign::Aries,
        Sign::Taurus,
        Sign::Gemini,
        Sign::Cancer,
        Sign::Leo,
        Sign::Virgo,
        Sign::Libra,
        Sign::Scorpio,
        Sign::Sagittarius,
        Sign::Capricorn,
        Sign::Aquarius,
        Sign::Pisces,
    ];

    /// Upstream site id, appended to the period base endpoint.
    pub fn id(self) -> i64 {
        match self {
            Sign::Aries => 3,
            Sign::Taurus => 5,
            Sign::Gemini => 7,
            Sign::Cancer => 8,
            Sign::Leo => 1,
            Sign::Virgo => 2,
            Sign::Libra => 6,
            Sign::Scorpio => 4,
            Sign::Sagittarius => 12,
            Sign::Capricorn => 9,
            Sign::Aquarius => 10,
            Sign::Pisces => 11,
        }
    }

    pub fn from_id(id: i64) -> Option<Sign> {
        Sign::ALL.into_iter().find(|s| s.id() == id)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Sign::Aries => "Aries",
            Sign::Taurus => "Taurus",
            Sign::Gemini => "Gemini",
            Sign::Cancer => "Cancer",
            Sign::Leo => "Leo",
            Sign::Virgo => "Virgo",
            Sign::Libra => "Libra",
            Sign::Scorpio => "Scorpio",
            Sign::Sagittarius => "Sagittarius",
            Sign::Capricorn => "Capricorn",
            Sign::Aquarius => "Aquarius",
            Sign::Pisces => "Pisces",
        }
    }
}

impl std::fmt::Display for Sign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for Sign {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sign::ALL
            .into_iter()
            .find(|sign| sign.display_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::UnknownSign(s.to_string()))
    }
}

/// Recurrence class of a horoscope, each with its own effective-date anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Period {
    pub fn as_str(self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::Yearly => "yearly",
        }
    }

    /// The date a freshly harvested horoscope is stored under.
    ///
    /// `today` is the current calendar date in the reference zone of the
    /// upstream site (see [`TimeZoneOffset`]). Daily content is published
    /// for tomorrow; the longer periods anchor to their period start.
    pub fn effective_date(self, today: NaiveDate) -> NaiveDate {
        match self {
            Period::Daily => today + Duration::days(1),
            Period::Weekly => {
                today - Duration::days(today.weekday().num_days_from_monday() as i64)
            }
            Period::Monthly => today.with_day(1).unwrap_or(today),
            Period::Yearly => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Period {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Period::Daily),
            "weekly" => Ok(Period::Weekly),
            "monthly" => Ok(Period::Monthly),
            "yearly" => Ok(Period::Yearly),
            other => Err(CoreError::UnknownPeriod(other.to_string())),
        }
    }
}

/// A fixed whole-hour UTC offset, written `"UTC+3"` / `"UTC-5"` / `"UTC+0"`.
///
/// Subscribers pick an offset rather than a named zone, so there is no
/// daylight-saving adjustment anywhere in the system. The valid range is
/// UTC-12 through UTC+14. Parsing handles multi-digit offsets (`"UTC+10"`,
/// `"UTC-12"`) — the whole suffix after the sign is parsed, not one char.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeZoneOffset {
    hours: i8,
}

impl TimeZoneOffset {
    pub const UTC: TimeZoneOffset = TimeZoneOffset { hours: 0 };

    pub fn new(hours: i8) -> Result<Self, CoreError> {
        if (-12..=14).contains(&hours) {
            Ok(Self { hours })
        } else {
            Err(CoreError::InvalidOffset(format!("UTC{hours:+}")))
        }
    }

    pub fn hours(self) -> i8 {
        self.hours
    }

    /// The chrono offset used for all wall-clock arithmetic.
    pub fn to_fixed_offset(self) -> FixedOffset {
        // hours is range-checked in new(); ±14 h is always representable.
        FixedOffset::east_opt(self.hours as i32 * 3600)
            .expect("offset range is validated on construction")
    }
}

impl std::fmt::Display for TimeZoneOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UTC{:+}", self.hours)
    }
}

impl std::str::FromStr for TimeZoneOffset {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("UTC")
            .ok_or_else(|| CoreError::InvalidOffset(s.to_string()))?;
        let hours: i8 = rest
            .parse()
            .map_err(|_| CoreError::InvalidOffset(s.to_string()))?;
        TimeZoneOffset::new(hours).map_err(|_| CoreError::InvalidOffset(s.to_string()))
    }
}

impl TryFrom<String> for TimeZoneOffset {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TimeZoneOffset> for String {
    fn from(o: TimeZoneOffset) -> String {
        o.to_string()
    }
}

/// A subscriber's local wall-clock delivery time, stored as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NotifyTime {
    pub hour: u8,
    pub minute: u8,
}

impl NotifyTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self, CoreError> {
        if hour < 24 && minute < 60 {
            Ok(Self { hour, minute })
        } else {
            Err(CoreError::InvalidNotifyTime(format!("{hour:02}:{minute:02}")))
        }
    }
}

impl std::fmt::Display for NotifyTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl std::str::FromStr for NotifyTime {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| CoreError::InvalidNotifyTime(s.to_string()))?;
        let hour: u8 = h
            .parse()
            .map_err(|_| CoreError::InvalidNotifyTime(s.to_string()))?;
        let minute: u8 = m
            .parse()
            .map_err(|_| CoreError::InvalidNotifyTime(s.to_string()))?;
        NotifyTime::new(hour, minute).map_err(|_| CoreError::InvalidNotifyTime(s.to_string()))
    }
}

impl TryFrom<String> for NotifyTime {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<NotifyTime> for String {
    fn from(t: NotifyTime) -> String {
        t.to_string()
    }
}
