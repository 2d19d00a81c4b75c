//! Internal helpers for date windows and name normalization.
//!
//! These utilities are **not** part of the public API. They centralize the
//! month-window math the quota counters use and the category key folding.

use chrono::{Datelike, Months, NaiveDate};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Short month names as shown to users (pt-BR).
const MONTHS_SHORT: [&str; 12] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];

/// First and last day (both inclusive) of the calendar month containing
/// `date`. Monthly quotas count stored dates inside this window.
pub(crate) fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date);
    (first, last)
}

/// Display label for the month a quota was evaluated against, e.g.
/// `Ago/2026`.
pub(crate) fn month_label(date: NaiveDate) -> String {
    format!("{}/{}", MONTHS_SHORT[date.month0() as usize], date.year())
}

/// Collapses whitespace runs; `None` when nothing printable remains.
pub(crate) fn normalize_display(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut out = String::new();
    for token in trimmed.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(token);
    }
    if out.is_empty() { None } else { Some(out) }
}

/// NFKD-folded lookup key: accents stripped, lowercased, punctuation
/// collapsed to single spaces. `None` when nothing alphanumeric remains.
pub(crate) fn normalize_key(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut out = String::new();
    let mut prev_space = false;
    for ch in trimmed.nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
            prev_space = false;
        } else if !out.is_empty() && !prev_space {
            out.push(' ');
            prev_space = true;
        }
    }
    let normalized = out.trim();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized.to_string())
    }
}
