//! The five-stage article generation pipeline.
//!
//! Each stage is one round trip to the completion backend: render a prompt,
//! generate, recover structured output, validate, return. Stages share no
//! mutable state; every function takes its collaborators as parameters.

pub mod completion;
pub mod html;
pub mod prompts;
pub mod recovery;
pub mod schema;
pub mod stages;

pub use completion::{CompletionClient, CompletionError, GenerateText};
pub use schema::{
    OutlineSection, SeoReport, Step1Request, Step1Result, Step2Request, Step2Result,
    Step3Request, Step3Result, Step4Request, Step5Request,
};

use std::fmt;

use thiserror::Error;

/// One of the five generation stages. Carried on every error so a caller
/// can resume the pipeline from the failing point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Keywords,
    Outline,
    Research,
    Article,
    SeoReport,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Keywords => "step1-keywords",
            Self::Outline => "step2-outline",
            Self::Research => "step3-research",
            Self::Article => "step4-article",
            Self::SeoReport => "step5-seo-report",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pipeline-level errors, stage-labeled.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The caller's request violates a stage schema. Never retried.
    #[error("{stage}: validation error: {message}")]
    Validation { stage: Stage, message: String },

    /// Model output could not be coerced to the required structure after
    /// the full recovery attempt.
    #[error("{stage}: unusable model output: {message}")]
    Parse { stage: Stage, message: String },

    /// Completion backend failure after retry exhaustion.
    #[error(transparent)]
    Completion(#[from] CompletionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_labels_are_stable() {
        assert_eq!(Stage::Keywords.label(), "step1-keywords");
        assert_eq!(Stage::SeoReport.label(), "step5-seo-report");
    }

    #[test]
    fn errors_carry_the_stage_label() {
        let err = PipelineError::Validation {
            stage: Stage::Outline,
            message: "\"keywords\" is required".into(),
        };
        assert!(err.to_string().contains("step2-outline"));

        let err = PipelineError::Parse {
            stage: Stage::Research,
            message: "no JSON object found".into(),
        };
        assert!(err.to_string().contains("step3-research"));
    }
}
