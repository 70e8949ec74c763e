//! Heuristic category detection for generated requirements
//!
//! An ordered rule table; the first rule whose keyword appears in the text
//! wins. Callers must tolerate [`UNKNOWN`].

/// Category when no rule matches.
pub const UNKNOWN: &str = "unknown";

/// Category recorded for units skipped because their existing output passed
/// the gate; their text is never classified.
pub const EXISTING: &str = "existing";

/// One `(keyword, category)` pair. Matching is case-sensitive substring.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub keyword: &'static str,
    pub category: &'static str,
}

const fn rule(keyword: &'static str, category: &'static str) -> Rule {
    Rule { keyword, category }
}

/// Evaluated top to bottom.
pub const RULES: &[Rule] = &[
    rule("Chrome Extension", "chrome-extension"),
    rule("API Service", "api-service"),
    rule("Mobile App", "mobile-app"),
    rule("Web Application", "web-app"),
    rule("Discord Bot", "discord-bot"),
    rule("CLI Tool", "cli-tool"),
];

#[must_use]
pub fn classify(text: &str) -> &'static str {
    classify_with(RULES, text)
}

#[must_use]
pub fn classify_with(rules: &[Rule], text: &str) -> &'static str {
    rules
        .iter()
        .find(|r| text.contains(r.keyword))
        .map_or(UNKNOWN, |r| r.category)
}
