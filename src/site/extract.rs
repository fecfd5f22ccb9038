//! Tolerant field extraction over `scraper` documents
//!
//! Every helper degrades to an empty value when a selector is invalid or
//! matches nothing; adapters never abort a parse over a missing field.

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;

static TRAILING_NUMBER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"([.\d]+)\s*$").ok());

static DIGIT_RUN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\d[\d,]*").ok());

/// Parses a CSS selector, `None` if it is invalid
pub fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::warn!("Invalid selector '{}': {:?}", css, e);
            None
        }
    }
}

/// Trimmed, non-empty text of every element matching `css`
pub fn select_texts(html: &Html, css: &str) -> Vec<String> {
    let Some(sel) = selector(css) else {
        return Vec::new();
    };

    html.select(&sel)
        .map(|el| clean_text(&el.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect()
}

/// Non-empty values of `attr` on every element matching `css`
pub fn select_attrs(html: &Html, css: &str, attr: &str) -> Vec<String> {
    let Some(sel) = selector(css) else {
        return Vec::new();
    };

    html.select(&sel)
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

/// First non-empty value of `attr` on an element matching `css`
pub fn select_attr(html: &Html, css: &str, attr: &str) -> Option<String> {
    select_attrs(html, css, attr).into_iter().next()
}

/// Trimmed, non-empty texts of descendants of `element` matching `css`
pub fn texts_within(element: &ElementRef<'_>, css: &str) -> Vec<String> {
    let Some(sel) = selector(css) else {
        return Vec::new();
    };

    element
        .select(&sel)
        .map(|el| clean_text(&el.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect()
}

/// Text of the element's direct text-node children, excluding nested tags
pub fn own_text(element: &ElementRef<'_>) -> String {
    let joined: String = element
        .children()
        .filter_map(|child| match child.value() {
            Node::Text(text) => Some(&**text),
            _ => None,
        })
        .collect();
    clean_text(&joined)
}

/// The `li` row whose `label` child contains `label`
///
/// Detail pages list series metadata as `<li><label>Status:</label>Ongoing</li>`.
pub fn labelled_row<'a>(html: &'a Html, label: &str) -> Option<ElementRef<'a>> {
    let rows = selector("li")?;
    let labels = selector("label")?;

    html.select(&rows).find(|row| {
        row.select(&labels)
            .any(|l| l.text().collect::<String>().contains(label))
    })
}

/// Splits `text` on `sep`, trimming and dropping empty parts
pub fn split_list(text: &str, sep: char) -> Vec<String> {
    text.split(sep)
        .map(clean_text)
        .filter(|part| !part.is_empty())
        .collect()
}

/// Collapses runs of whitespace into single spaces and trims the ends
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Number at the end of `text`, e.g. `Angel Densetsu 12.5` gives 12.5
pub fn trailing_number(text: &str) -> Option<f64> {
    let caps = TRAILING_NUMBER.as_ref()?.captures(text)?;
    caps.get(1)?.as_str().parse::<f64>().ok()
}

/// Loose unsigned integer: the first run of digits, ignoring separators
///
/// `"1,234th"` gives 1234.
pub fn loose_u32(text: &str) -> Option<u32> {
    let found = DIGIT_RUN.as_ref()?.find(text)?;
    found.as_str().replace(',', "").parse().ok()
}
