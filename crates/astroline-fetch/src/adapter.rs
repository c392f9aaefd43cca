//! Upstream page-structure extraction.
//!
//! The adapter owns every CSS selector and markup assumption for one
//! upstream source. Swapping sources means writing a new adapter; the
//! transport and scheduling layers never see HTML.

use scraper::{ElementRef, Html, Selector};

use astroline_store::{HoroscopeContent, Section};

/// Extracts horoscope fields from one raw page body.
///
/// Parsing never fails: a page with no recognisable content yields empty
/// fields, which consumers treat as "not ready".
pub trait ContentAdapter: Send + Sync {
    fn parse(&self, body: &str) -> HoroscopeContent;
}

/// Adapter for globalmsk.ru horoscope pages.
///
/// The site renders one general text block plus titled sub-blocks
/// (business / health / love / lunar) with optional rating widgets. Section
/// titles are matched on Russian keyword stems since the site is Russian.
pub struct GlobalmskAdapter;

impl ContentAdapter for GlobalmskAdapter {
    fn parse(&self, body: &str) -> HoroscopeContent {
        let doc = Html::parse_document(body);
        let mut content = HoroscopeContent::default();

        if let Some(block) = select_first(&doc, "div.horoscope_text") {
            let text = collapse_text(&block);
            if !text.is_empty() {
                content.general_text = Some(text);
            }
        }

        let Some(container) = select_first(&doc, "div.horoscope_text_sub") else {
            return content;
        };
        let Ok(block_sel) = Selector::parse("div.business_block") else {
            return content;
        };
        for block in container.select(&block_sel) {
            let Some(title_el) = select_first_in(&block, "h2") else {
                continue;
            };
            let title = collapse_text(&title_el).to_lowercase();
            let section = Section {
                text: Some(section_text(&block, &title)),
                rating: section_rating(&block),
            };

            if title.contains("бизнес") {
                content.business = section;
            } else if title.contains("здоров") {
                content.health = section;
            } else if title.contains("любов") {
                content.love = section;
            } else if title.contains("лун") {
                content.lunar = section;
            }
        }

        content
    }
}

/// Paragraph text of one sub-block. The lunar block appends a generic
/// "today" tail the site reuses everywhere; cut it off.
fn section_text(block: &ElementRef<'_>, title: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(items) = select_first_in(block, "div.horoscope_items") {
        if let Ok(p_sel) = Selector::parse("p") {
            for p in items.select(&p_sel) {
                let text = collapse_text(&p);
                if title.contains("лун") && text.starts_with("Сегодня") {
                    break;
                }
                if !text.is_empty() {
                    parts.push(text);
                }
            }
        }
    }
    parts.join(" ")
}

/// Rating widget: the non-empty inner divs joined as "filled/total".
fn section_rating(block: &ElementRef<'_>) -> Option<String> {
    let rate = select_first_in(block, "div.rate_block")?;
    let div_sel = Selector::parse("div").ok()?;
    let parts: Vec<String> = rate
        .select(&div_sel)
        .map(|d| collapse_text(&d))
        .filter(|t| !t.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn select_first<'a>(doc: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(css).ok()?;
    doc.select(&sel).next()
}

fn select_first_in<'a>(el: &ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(css).ok()?;
    el.select(&sel).next()
}

/// All text under an element with whitespace collapsed to single spaces.
fn collapse_text(el: &ElementRef<'_>) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
