// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Mapping of fetched API objects to result rows. Everything here is pure.

use crate::models::api::{VideoItem, VideoSnippet};
use crate::models::row::{LanguageSource, ResultRow, VideoType};
use crate::services::language::detect_language;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// License value that, together with embedding, allows reuse on third-party sites
pub const CREATIVE_COMMON_LICENSE: &str = "creativeCommon";

/// Parse an ISO-8601 duration (`PT1M5S`, `P1DT2H`, `PT4.5S`) to whole seconds.
/// Year and month components are rejected since their length is ambiguous.
pub fn parse_iso8601_duration(duration: &str) -> Option<u64> {
    let rest = duration.strip_prefix('P')?;
    let mut total_seconds = 0.0;
    let mut in_time = false;
    let mut seen_component = false;
    let mut number = String::new();

    for ch in rest.chars() {
        match ch {
            'T' if !in_time && number.is_empty() => in_time = true,
            '0'..='9' | '.' => number.push(ch),
            ',' => number.push('.'),
            unit => {
                let value: f64 = number.parse().ok()?;
                number.clear();
                let scale = match (in_time, unit) {
                    (false, 'W') => 604_800.0,
                    (false, 'D') => 86_400.0,
                    (true, 'H') => 3_600.0,
                    (true, 'M') => 60.0,
                    (true, 'S') => 1.0,
                    _ => return None,
                };
                total_seconds += value * scale;
                seen_component = true;
            }
        }
    }

    if !number.is_empty() || !seen_component {
        return None;
    }
    Some(total_seconds as u64)
}

/// `HH:MM:SS`; hours are not wrapped at 24
pub fn format_hms(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Duration column pair: formatted string and total seconds. Missing or
/// malformed input yields `("", 0)`.
pub fn duration_fields(duration: &str) -> (String, u64) {
    if duration.is_empty() {
        return (String::new(), 0);
    }
    match parse_iso8601_duration(duration) {
        Some(seconds) => (format_hms(seconds), seconds),
        None => {
            tracing::debug!(duration, "unparseable duration");
            (String::new(), 0)
        }
    }
}

/// Age since publishing in whole 365-day years and 30-day months, years
/// omitted when zero: "2 years 3 months", "5 months".
pub fn format_age(published_at: &str, now: DateTime<Utc>) -> String {
    let Ok(published) = DateTime::parse_from_rfc3339(published_at) else {
        return String::new();
    };

    let days = (now - published.with_timezone(&Utc)).num_days().max(0);
    let years = days / 365;
    let months = (days % 365) / 30;

    if years > 0 {
        format!("{years} years {months} months")
    } else {
        format!("{months} months")
    }
}

/// Language and where it came from: audio tag, then default tag, then detection
pub fn resolve_language(snippet: &VideoSnippet) -> (String, LanguageSource) {
    let tagged = |tag: &Option<String>| tag.as_ref().filter(|t| !t.is_empty()).cloned();

    if let Some(lang) = tagged(&snippet.default_audio_language) {
        (lang, LanguageSource::Audio)
    } else if let Some(lang) = tagged(&snippet.default_language) {
        (lang, LanguageSource::Default)
    } else {
        let text = format!("{} {}", snippet.title, snippet.description);
        (detect_language(&text), LanguageSource::Detect)
    }
}

pub fn is_live_or_upcoming(snippet: &VideoSnippet) -> bool {
    matches!(
        snippet.live_broadcast_content.as_deref(),
        Some("live") | Some("upcoming")
    )
}

pub fn fallback_embed(video_id: &str) -> String {
    format!("<iframe src=\"https://www.youtube.com/embed/{video_id}\" allowfullscreen></iframe>")
}

/// Build the result row for one video, or `None` for live and upcoming broadcasts.
///
/// `avatars` maps channel id to the channel's default thumbnail URL.
pub fn video_to_row(
    keyword: &str,
    source_url: &str,
    item: &VideoItem,
    avatars: &HashMap<String, String>,
    now: DateTime<Utc>,
) -> Option<ResultRow> {
    let snippet = &item.snippet;
    if is_live_or_upcoming(snippet) {
        return None;
    }

    let (duration, duration_seconds) = duration_fields(&item.content_details.duration);
    let (language, language_source) = resolve_language(snippet);
    let embeddable = item.status.embeddable;
    let license = item.status.license.clone();
    let iframe = item
        .player
        .as_ref()
        .and_then(|p| p.embed_html.clone())
        .filter(|html| !html.is_empty())
        .unwrap_or_else(|| fallback_embed(&item.id));

    Some(ResultRow {
        keyword: keyword.to_string(),
        input_url: source_url.to_string(),
        video_id: item.id.clone(),
        title: snippet.title.clone(),
        description: snippet.description.clone(),
        language,
        language_source,
        video_type: VideoType::from_seconds(duration_seconds),
        duration,
        duration_seconds,
        age: format_age(&snippet.published_at, now),
        author: snippet.channel_title.clone(),
        author_avatar: avatars.get(&snippet.channel_id).cloned().unwrap_or_default(),
        view_count: item.statistics.view_count.clone().unwrap_or_default(),
        like_count: item.statistics.like_count.clone().unwrap_or_default(),
        dislike_count: item.statistics.dislike_count.clone().unwrap_or_default(),
        embeddable,
        allowed_on_third_party: embeddable && license == CREATIVE_COMMON_LICENSE,
        license,
        iframe,
    })
}
