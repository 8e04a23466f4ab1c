//! Read-side result types handed to the application layer.
//!
//! Every value here is plain data, ready for prompt templating or rendering.
//! Query-time failures are variants, never raw store errors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diagnosis::DiagnosisCode;

/// Outcome of resolving a free-text diagnosis mention to a code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Found(DiagnosisCode),
    NotFound,
}

impl Resolution {
    pub fn code(&self) -> Option<&DiagnosisCode> {
        match self {
            Resolution::Found(code) => Some(code),
            Resolution::NotFound => None,
        }
    }
}

/// One outgoing progression edge, flattened for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complication {
    pub complication_code: DiagnosisCode,
    pub name: String,
    pub avg_years: f64,
    pub median_years: f64,
    pub min_years: u32,
    pub max_years: u32,
    pub frequency: u64,
}

/// What a question is about, as understood by an intent extractor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Intent {
    pub diagnosis_mention: Option<String>,
    pub timeframe_years: Option<u32>,
}

/// Why a question could not be answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerFailure {
    /// No diagnosis could be identified in the question.
    NoDiagnosisMentioned,
    /// The mention did not resolve to any diagnosis in the graph.
    DiagnosisNotFound { mention: String },
    /// The diagnosis exists but no edge falls within the timeframe.
    NoComplicationsWithin { mention: String, years: u32 },
    /// The diagnosis exists but has no outgoing edges at all.
    NoComplicationData { mention: String },
    /// The store could not be queried.
    StoreUnavailable { reason: String },
}

impl fmt::Display for AnswerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerFailure::NoDiagnosisMentioned => write!(
                f,
                "I couldn't identify the diagnosis from your query. \
                 Please specify what condition you're asking about."
            ),
            AnswerFailure::DiagnosisNotFound { mention } => write!(
                f,
                "I couldn't find information about '{mention}' in our database. \
                 Please check the spelling or try a different term."
            ),
            AnswerFailure::NoComplicationsWithin { mention, years } => write!(
                f,
                "Based on our data, there are no common complications from {mention} \
                 that typically occur within {years} years."
            ),
            AnswerFailure::NoComplicationData { mention } => {
                write!(f, "No complication data found for {mention} in our database.")
            }
            AnswerFailure::StoreUnavailable { reason } => {
                write!(f, "The trajectory database is currently unavailable ({reason}).")
            }
        }
    }
}

/// Everything a narrator needs to turn retrieved rows into prose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptContext {
    pub question: String,
    pub diagnosis: String,
    pub timeframe_years: Option<u32>,
    /// Instructions for a language-model narrator.
    pub system_prompt: String,
    /// One bullet line per complication.
    pub formatted_data: String,
    pub complications: Vec<Complication>,
}

/// The full answer to a natural-language question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Answer {
    Success {
        /// The mention as it appeared in the question.
        diagnosis: String,
        code: DiagnosisCode,
        timeframe_years: Option<u32>,
        complications: Vec<Complication>,
        /// Narrated text produced from `complications`.
        response: String,
    },
    Failure(AnswerFailure),
}

impl Answer {
    pub fn is_success(&self) -> bool {
        matches!(self, Answer::Success { .. })
    }
}
