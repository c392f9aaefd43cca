//! Pure message rendering — no I/O, no side effects.

use chrono::Datelike;

use astroline_core::{Period, Sign};
use astroline_store::{HoroscopeRecord, Section};

/// Render a horoscope record into the message body sent to a subscriber.
///
/// A missing record or one without general text yields a fixed "not ready"
/// message — never an error. Output uses `*bold*` inline emphasis, the
/// subset the transport accepts.
pub fn render(record: Option<&HoroscopeRecord>, sign: Sign, period: Period) -> String {
    let Some(record) = record.filter(|r| r.content.is_ready()) else {
        return format!(
            "Unfortunately, the {} horoscope for {} is not ready yet. Please try again later.",
            period,
            sign.display_name()
        );
    };

    let mut parts: Vec<String> = Vec::new();
    parts.push(format!(
        "🔮 *{} horoscope for {} — {}*\n",
        period_label(period),
        sign.display_name(),
        date_display(record, period)
    ));
    if let Some(ref general) = record.content.general_text {
        parts.push(format!("*{}*\n", general.trim()));
    }

    let sections: [(&str, &str, &Section); 4] = [
        ("💼", "Business", &record.content.business),
        ("💪", "Health", &record.content.health),
        ("❤️", "Love", &record.content.love),
        ("🌙", "Lunar calendar", &record.content.lunar),
    ];
    for (emoji, label, section) in sections {
        if !section.has_text() {
            continue;
        }
        let rating = section.rating.as_deref().unwrap_or("-");
        let text = section.text.as_deref().unwrap_or_default().trim().to_string();
        parts.push(format!("{emoji} *{label} ({rating})*\n{text}\n"));
    }

    parts.join("\n")
}

fn period_label(period: Period) -> &'static str {
    match period {
        Period::Daily => "Daily",
        Period::Weekly => "Weekly",
        Period::Monthly => "Monthly",
        Period::Yearly => "Yearly",
    }
}

/// Period-specific date formatting for the header line.
fn date_display(record: &HoroscopeRecord, period: Period) -> String {
    let date = record.date;
    match period {
        Period::Daily => date.format("%d.%m.%Y").to_string(),
        Period::Weekly => format!("week of {}", date.format("%d.%m.%Y")),
        Period::Monthly => date.format("%Y-%m").to_string(),
        Period::Yearly => date.year().to_string(),
    }
}
