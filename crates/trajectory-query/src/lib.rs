//! # trajectory-query
//!
//! The read side of the trajectory graph:
//!
//! - `ComplicationQuery`: diagnosis resolution (cached) and complication
//!   retrieval with an optional timeframe
//! - `KeywordIntentExtractor`: question text → diagnosis mention, timeframe
//! - `TemplateNarrator` and prompt building for language-model narrators
//! - `QuestionAnswerer`: the whole question → `Answer` flow
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trajectory_query::{ComplicationQuery, QuestionAnswerer};
//!
//! let query = ComplicationQuery::new(store, &config.query);
//! let answer = QuestionAnswerer::with_defaults(query).answer("I have diabetes. What within 5 years?");
//! ```

pub mod answer;
pub mod facade;
pub mod intent;
pub mod narrate;

pub use answer::QuestionAnswerer;
pub use facade::ComplicationQuery;
pub use intent::KeywordIntentExtractor;
pub use narrate::TemplateNarrator;

// ── Tests ─────────────────────────────────────────────────────────────────────
