//! Keyword-based intent extraction.
//!
//! The mention is the text following the first matching keyword, up to the
//! next sentence punctuation. Keywords are tried in priority order, so
//! "suffering from" wins over a "have" earlier in the sentence. The
//! timeframe is the first number followed by "year" or "years".

use std::sync::LazyLock;

use regex::Regex;

use trajectory_contracts::query::Intent;
use trajectory_core::traits::IntentExtractor;

pub const DEFAULT_KEYWORDS: [&str; 3] = ["diagnosed with", "suffering from", "have"];

static TIMEFRAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*years?\b").expect("timeframe pattern is valid"));

/// Whole-word, case-insensitive keyword; group 1 runs to the next punctuation.
fn keyword_pattern(keyword: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b{}\b([^.,;?!]*)", regex::escape(keyword)))
        .expect("escaped keyword is a valid pattern")
}

pub struct KeywordIntentExtractor {
    keywords: Vec<Regex>,
}

impl KeywordIntentExtractor {
    /// Build an extractor for `keywords`, in priority order.
    pub fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| keyword_pattern(k)).collect(),
        }
    }

    fn mention(&self, question: &str) -> Option<String> {
        self.keywords.iter().find_map(|pattern| {
            let captures = pattern.captures(question)?;
            let mention = captures.get(1)?.as_str().trim().to_lowercase();
            (!mention.is_empty()).then_some(mention)
        })
    }

    fn timeframe(&self, question: &str) -> Option<u32> {
        let captures = TIMEFRAME.captures(question)?;
        captures.get(1)?.as_str().parse().ok()
    }
}

impl Default for KeywordIntentExtractor {
    fn default() -> Self {
        Self::new(&DEFAULT_KEYWORDS)
    }
}

impl IntentExtractor for KeywordIntentExtractor {
    fn extract(&self, question: &str) -> Intent {
        Intent {
            diagnosis_mention: self.mention(question),
            timeframe_years: self.timeframe(question),
        }
    }
}
