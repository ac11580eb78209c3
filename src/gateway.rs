//! Generation gateway: one stateless operation per feature.
//!
//! Each operation validates its input, renders the feature's user prompt,
//! prepends the shared style directive to the system instruction and makes
//! exactly one remote call. Failures follow a single policy for every
//! feature:
//!
//! - a failed remote call becomes [`Error::Generation`] carrying only the
//!   feature's generic message;
//! - a successful call with no text yields the feature's placeholder string.

use crate::client::{
    GenerateRequest, GenerateResponse, GenerativeClient, GroundingSource, InlineData, Part,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::preset::{CitationStandard, Feature, ModelTier, PromptPreset, WorkType};
use crate::template::PromptRenderer;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Marker placed between analyses handed to the consolidation pass.
pub const CONSOLIDATION_SEPARATOR: &str = "\n\n--- NOVO ARTIGO ---\n\n";

/// Minimum number of analyses a comparative synthesis needs.
pub const MIN_CONSOLIDATION_INPUTS: usize = 2;

/// Result of a grounded academic search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchResult {
    /// Generated text
    pub content: String,
    /// Grounding sources, in the order returned by the service
    pub sources: Vec<GroundingSource>,
}

/// Input of the project builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectBrief {
    /// Working title
    pub title: String,
    /// Research problem
    pub problem: String,
    /// Objectives
    pub objectives: String,
}

/// Client-facing entry point for every generation feature.
pub struct Gateway {
    client: Arc<dyn GenerativeClient>,
    renderer: PromptRenderer,
    pro_model: String,
    flash_model: String,
}

impl Gateway {
    /// Creates a gateway over an explicit client, taking model names from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt templates fail to load.
    pub fn new(client: Arc<dyn GenerativeClient>, config: &Config) -> Result<Self> {
        Self::with_models(client, &config.pro_model, &config.flash_model)
    }

    /// Creates a gateway with explicit model names.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt templates fail to load.
    pub fn with_models(
        client: Arc<dyn GenerativeClient>,
        pro_model: &str,
        flash_model: &str,
    ) -> Result<Self> {
        Ok(Self {
            client,
            renderer: PromptRenderer::new()?,
            pro_model: pro_model.to_string(),
            flash_model: flash_model.to_string(),
        })
    }

    /// Searches recent scholarly literature with search grounding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank query and
    /// [`Error::Generation`] ("academic search failed") when the remote call fails.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<ResearchResult> {
        let query = require("query", query)?;
        let response = self
            .call(Feature::Search, &json!({ "query": query }), None)
            .await?;

        Ok(ResearchResult {
            content: text_or_placeholder(Feature::Search, response.text),
            sources: response.sources,
        })
    }

    /// Structures a methodology plan for `topic` as the given kind of work.
    ///
    /// # Errors
    ///
    /// Returns an error for a blank topic or a failed remote call.
    #[instrument(skip(self))]
    pub async fn methodology(&self, topic: &str, work_type: WorkType) -> Result<String> {
        let topic = require("topic", topic)?;
        let context = json!({ "topic": topic, "work_type": work_type.label() });
        self.generate_text(Feature::Methodology, &context, None).await
    }

    /// Answers an academic question as an advisor would.
    ///
    /// # Errors
    ///
    /// Returns an error for a blank question or a failed remote call.
    #[instrument(skip(self))]
    pub async fn advise(&self, question: &str) -> Result<String> {
        let question = require("question", question)?;
        self.generate_text(Feature::Advice, &json!({ "question": question }), None)
            .await
    }

    /// Builds a complete research project outline.
    ///
    /// # Errors
    ///
    /// Returns an error when both title and problem are blank, or when the
    /// remote call fails.
    #[instrument(skip(self))]
    pub async fn project(&self, brief: &ProjectBrief) -> Result<String> {
        if brief.title.trim().is_empty() && brief.problem.trim().is_empty() {
            return Err(Error::invalid_input(
                "a project needs at least a title or a research problem",
            ));
        }
        let context = json!({
            "title": brief.title.trim(),
            "problem": brief.problem.trim(),
            "objectives": brief.objectives.trim(),
        });
        self.generate_text(Feature::Project, &context, None).await
    }

    /// Formats a raw reference in the given citation standard.
    ///
    /// # Errors
    ///
    /// Returns an error for a blank reference or a failed remote call.
    #[instrument(skip(self))]
    pub async fn format_reference(&self, raw: &str, standard: CitationStandard) -> Result<String> {
        let raw = require("reference", raw)?;
        let context = json!({ "reference": raw, "standard": standard.label() });
        self.generate_text(Feature::CitationFormat, &context, None)
            .await
    }

    /// Produces a structured fichamento of one encoded document.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty document or a failed remote call.
    #[instrument(skip(self, document), fields(mime_type = %document.mime_type, encoded_len = document.data.len()))]
    pub async fn analyze_document(
        &self,
        document: InlineData,
        standard: CitationStandard,
    ) -> Result<String> {
        if document.data.is_empty() {
            return Err(Error::invalid_input("document is empty"));
        }
        let context = json!({ "standard": standard.label() });
        self.generate_text(Feature::DocumentAnalysis, &context, Some(document))
            .await
    }

    /// Writes a comparative synthesis of several fichamentos, in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CannotConsolidate`] with fewer than two analyses (no
    /// remote call is made) and [`Error::Generation`] when the call fails.
    #[instrument(skip(self, analyses), fields(count = analyses.len()))]
    pub async fn consolidate(&self, analyses: &[String]) -> Result<String> {
        if analyses.len() < MIN_CONSOLIDATION_INPUTS {
            return Err(Error::CannotConsolidate {
                completed: analyses.len(),
            });
        }
        let documents = analyses.join(CONSOLIDATION_SEPARATOR);
        self.generate_text(Feature::Consolidation, &json!({ "documents": documents }), None)
            .await
    }

    async fn generate_text(
        &self,
        feature: Feature,
        context: &serde_json::Value,
        inline: Option<InlineData>,
    ) -> Result<String> {
        let response = self.call(feature, context, inline).await?;
        Ok(text_or_placeholder(feature, response.text))
    }

    async fn call(
        &self,
        feature: Feature,
        context: &serde_json::Value,
        inline: Option<InlineData>,
    ) -> Result<GenerateResponse> {
        let preset = PromptPreset::for_feature(feature);
        let prompt = self.renderer.render(&preset.template, context)?;

        let mut parts = Vec::with_capacity(2);
        if let Some(data) = inline {
            parts.push(Part::InlineData(data));
        }
        parts.push(Part::Text(prompt));

        let model = match preset.model_tier {
            ModelTier::Pro => &self.pro_model,
            ModelTier::Flash => &self.flash_model,
        };

        let request = GenerateRequest {
            model: model.clone(),
            system_instruction: preset.system_instruction(),
            parts,
            grounded: preset.grounded,
        };

        info!(
            feature = %feature,
            preset = preset.name.as_str(),
            model = model.as_str(),
            "Requesting generation"
        );

        self.client.generate(request).await.map_err(|e| {
            error!(feature = %feature, error = %e, "Generation request failed");
            Error::generation(feature, &e)
        })
    }
}

fn require<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_input(format!("{field} must not be empty")));
    }
    Ok(trimmed)
}

fn text_or_placeholder(feature: Feature, text: String) -> String {
    if text.trim().is_empty() {
        warn!(feature = %feature, "Generation returned no content; using placeholder");
        feature.placeholder().to_string()
    } else {
        text
    }
}
