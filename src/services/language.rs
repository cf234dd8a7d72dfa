// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Best-effort language guess for videos that carry no language metadata.

/// Returned when the text is empty or no language could be detected
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Detect the language of `text` as an ISO 639-1 code where one exists
/// ("en", "ru"), else the ISO 639-3 code, else [`UNKNOWN_LANGUAGE`].
pub fn detect_language(text: &str) -> String {
    if text.trim().is_empty() {
        return UNKNOWN_LANGUAGE.to_string();
    }

    match whatlang::detect(text) {
        Some(info) => {
            let code = info.lang().code();
            isolang::Language::from_639_3(code)
                .and_then(|lang| lang.to_639_1())
                .unwrap_or(code)
                .to_string()
        }
        None => UNKNOWN_LANGUAGE.to_string(),
    }
}
