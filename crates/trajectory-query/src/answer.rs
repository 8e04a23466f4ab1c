//! Question answering: intent → resolution → retrieval → narration.
//!
//! Every outcome is an `Answer`. Store failures become
//! `AnswerFailure::StoreUnavailable`; a failing narrator falls back to the
//! template so retrieved data is never lost.

use tracing::{info, warn};

use trajectory_contracts::{
    error::TrajectoryError,
    query::{Answer, AnswerFailure, Resolution},
};
use trajectory_core::traits::{IntentExtractor, Narrator};

use crate::{
    facade::ComplicationQuery,
    intent::KeywordIntentExtractor,
    narrate::{prompt_context, TemplateNarrator},
};

pub struct QuestionAnswerer {
    query: ComplicationQuery,
    extractor: Box<dyn IntentExtractor>,
    narrator: Box<dyn Narrator>,
}

impl QuestionAnswerer {
    pub fn new(
        query: ComplicationQuery,
        extractor: Box<dyn IntentExtractor>,
        narrator: Box<dyn Narrator>,
    ) -> Self {
        Self {
            query,
            extractor,
            narrator,
        }
    }

    /// Keyword extraction and template narration.
    pub fn with_defaults(query: ComplicationQuery) -> Self {
        Self::new(
            query,
            Box::new(KeywordIntentExtractor::default()),
            Box::new(TemplateNarrator),
        )
    }

    pub fn query(&self) -> &ComplicationQuery {
        &self.query
    }

    pub fn answer(&self, question: &str) -> Answer {
        match self.try_answer(question) {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "question could not be answered");
                Answer::Failure(AnswerFailure::StoreUnavailable { reason: e.to_string() })
            }
        }
    }

    fn try_answer(&self, question: &str) -> Result<Answer, TrajectoryError> {
        let intent = self.extractor.extract(question);
        let Some(mention) = intent.diagnosis_mention else {
            return Ok(Answer::Failure(AnswerFailure::NoDiagnosisMentioned));
        };
        let timeframe = intent.timeframe_years;

        let code = match self.query.resolve_diagnosis(&mention)? {
            Resolution::Found(code) => code,
            Resolution::NotFound => {
                return Ok(Answer::Failure(AnswerFailure::DiagnosisNotFound { mention }));
            }
        };

        let complications = self.query.get_complications(&code, timeframe)?;
        if complications.is_empty() {
            let failure = match timeframe {
                Some(years) => AnswerFailure::NoComplicationsWithin { mention, years },
                None => AnswerFailure::NoComplicationData { mention },
            };
            return Ok(Answer::Failure(failure));
        }

        let context = prompt_context(question, &mention, timeframe, complications);
        let response = self.narrator.narrate(&context).unwrap_or_else(|e| {
            warn!(error = %e, "narrator failed, using template");
            TemplateNarrator::render(&context)
        });

        info!(
            mention = %mention,
            code = %code,
            timeframe = ?timeframe,
            complications = context.complications.len(),
            "question answered"
        );
        Ok(Answer::Success {
            diagnosis: mention,
            code,
            timeframe_years: timeframe,
            complications: context.complications,
            response,
        })
    }
}
