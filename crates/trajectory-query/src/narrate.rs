//! Prompt construction and the template narrator.

use std::fmt::Write as _;

use trajectory_contracts::{
    error::TrajectoryResult,
    query::{Complication, PromptContext},
};
use trajectory_core::traits::Narrator;

/// Instructions for a language-model narrator.
pub const SYSTEM_PROMPT: &str = "You help patients understand which conditions commonly follow a diagnosis. \
Answer clearly and with compassion, using only the data provided. \
Be specific about timeframes and frequencies where the data gives them. \
Remind the reader that this is general population data and that they should talk to their doctor.";

/// Closing line of every templated answer.
pub const CAUTION: &str =
    "This is general information drawn from population data. Please discuss your own situation with your doctor.";

/// One bullet per complication, in the given order.
pub fn format_complications(complications: &[Complication]) -> String {
    let mut out = String::new();
    for c in complications {
        let _ = writeln!(
            out,
            "- {}: typically occurs in {} years on average (frequency: {})",
            c.name, c.avg_years, c.frequency
        );
    }
    out
}

pub fn prompt_context(
    question: &str,
    diagnosis: &str,
    timeframe_years: Option<u32>,
    complications: Vec<Complication>,
) -> PromptContext {
    PromptContext {
        question: question.to_string(),
        diagnosis: diagnosis.to_string(),
        timeframe_years,
        system_prompt: SYSTEM_PROMPT.to_string(),
        formatted_data: format_complications(&complications),
        complications,
    }
}

/// Renders the retrieved data directly, without a language model.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateNarrator;

impl TemplateNarrator {
    pub fn render(context: &PromptContext) -> String {
        let heading = match context.timeframe_years {
            Some(years) => format!(
                "Conditions that commonly follow {} within {} years:",
                context.diagnosis, years
            ),
            None => format!("Conditions that commonly follow {}:", context.diagnosis),
        };
        format!("{}\n{}\n{}", heading, context.formatted_data, CAUTION)
    }
}

impl Narrator for TemplateNarrator {
    fn narrate(&self, context: &PromptContext) -> TrajectoryResult<String> {
        Ok(Self::render(context))
    }
}
