// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Column names of the tabular output, in order
pub const RESULT_COLUMNS: [&str; 20] = [
    "keyword",
    "input_url",
    "videoId",
    "title",
    "description",
    "language",
    "language_source",
    "video_type",
    "duration",
    "duration_seconds",
    "age",
    "author",
    "author_avatar",
    "view_count",
    "like_count",
    "dislike_count",
    "embeddable",
    "license",
    "allowed_on_third_party",
    "iframe",
];

/// Where a row's language value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageSource {
    /// `snippet.defaultAudioLanguage`
    Audio,
    /// `snippet.defaultLanguage`
    Default,
    /// Guessed from title and description
    Detect,
}

impl std::fmt::Display for LanguageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LanguageSource::Audio => write!(f, "audio"),
            LanguageSource::Default => write!(f, "default"),
            LanguageSource::Detect => write!(f, "detect"),
        }
    }
}

/// Duration bucket of a video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoType {
    Short,
    Video,
}

impl VideoType {
    /// Anything under a minute counts as a short
    pub fn from_seconds(seconds: u64) -> Self {
        if seconds < 60 {
            VideoType::Short
        } else {
            VideoType::Video
        }
    }
}

impl std::fmt::Display for VideoType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoType::Short => write!(f, "short"),
            VideoType::Video => write!(f, "video"),
        }
    }
}

/// One matched video, ready for the CSV file and the results sheet.
///
/// Field order matches [`RESULT_COLUMNS`]; the serde names are the header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub keyword: String,
    pub input_url: String,
    #[serde(rename = "videoId")]
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub language: String,
    pub language_source: LanguageSource,
    pub video_type: VideoType,
    pub duration: String,
    pub duration_seconds: u64,
    pub age: String,
    pub author: String,
    pub author_avatar: String,
    pub view_count: String,
    pub like_count: String,
    pub dislike_count: String,
    pub embeddable: bool,
    pub license: String,
    pub allowed_on_third_party: bool,
    pub iframe: String,
}

impl ResultRow {
    /// Cell values for a raw spreadsheet append
    pub fn to_sheet_values(&self) -> Vec<Value> {
        vec![
            json!(self.keyword),
            json!(self.input_url),
            json!(self.video_id),
            json!(self.title),
            json!(self.description),
            json!(self.language),
            json!(self.language_source.to_string()),
            json!(self.video_type.to_string()),
            json!(self.duration),
            json!(self.duration_seconds),
            json!(self.age),
            json!(self.author),
            json!(self.author_avatar),
            json!(self.view_count),
            json!(self.like_count),
            json!(self.dislike_count),
            json!(self.embeddable),
            json!(self.license),
            json!(self.allowed_on_third_party),
            json!(self.iframe),
        ]
    }
}
