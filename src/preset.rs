//! Prompt presets for each generation feature.
//!
//! Every feature composes the shared [`STYLE_DIRECTIVE`] with its own
//! instruction, picks a model tier and decides whether search grounding is
//! requested. Fixed option sets offered to the user (citation standards and
//! academic work types) live here as well.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Formatting rules embedded in every system instruction.
///
/// Generated text is rendered as plain preformatted text, so markup symbols
/// are forbidden outright.
pub const STYLE_DIRECTIVE: &str = "\
Você é Aurora, pesquisadora metodológica rigorosa e orientadora acadêmica sênior.
REGRAS DE FORMATAÇÃO DO TEXTO:
1. NÃO use '#', '##' ou '###' para títulos.
2. NÃO use '*' ou '_' para negrito ou itálico.
3. NÃO use '-' ou '*' para listas de tópicos.
4. TÍTULOS E SEÇÕES: escreva em CAIXA ALTA seguidos de uma linha em branco.
5. LISTAS: use apenas numeração direta (1., 2., 3.) sem outros símbolos.
6. Entregue um documento limpo, pronto para ser colado em um editor de texto científico.";

/// Generation feature offered by the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Feature {
    /// Grounded academic literature search
    Search,
    /// Methodology plan for a topic and work type
    Methodology,
    /// Academic advice for a free-form question
    Advice,
    /// Full research project outline
    Project,
    /// Reference formatting in a citation standard
    CitationFormat,
    /// Structured analysis (fichamento) of one document
    DocumentAnalysis,
    /// Comparative synthesis across several analyses
    Consolidation,
}

impl Feature {
    /// Returns the ID string for this feature.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Methodology => "methodology",
            Self::Advice => "advice",
            Self::Project => "project",
            Self::CitationFormat => "citation-format",
            Self::DocumentAnalysis => "document-analysis",
            Self::Consolidation => "consolidation",
        }
    }

    /// Returns all features.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Search,
            Self::Methodology,
            Self::Advice,
            Self::Project,
            Self::CitationFormat,
            Self::DocumentAnalysis,
            Self::Consolidation,
        ]
    }

    /// Parse a feature from its string ID.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::all().iter().copied().find(|f| f.id() == id)
    }

    /// Generic user-facing message when the remote call for this feature fails.
    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::Search => "academic search failed",
            Self::Methodology => "methodology generation failed",
            Self::Advice => "academic advice failed",
            Self::Project => "project generation failed",
            Self::CitationFormat => "reference formatting failed",
            Self::DocumentAnalysis => "document analysis failed",
            Self::Consolidation => "comparative synthesis failed",
        }
    }

    /// Text substituted when the remote call succeeds but returns no content.
    #[must_use]
    pub const fn placeholder(self) -> &'static str {
        match self {
            Self::Search => "Nenhum conteúdo gerado.",
            Self::Methodology => "Não foi possível estruturar a metodologia.",
            Self::Advice => "Não foi possível gerar uma orientação.",
            Self::Project => "Não foi possível montar o projeto de pesquisa.",
            Self::CitationFormat => "Não foi possível formatar a referência.",
            Self::DocumentAnalysis => "Não foi possível analisar o documento.",
            Self::Consolidation => "Não foi possível consolidar as informações.",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Which configured model a feature runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelTier {
    /// Larger model for long structured output
    Pro,
    /// Faster model for short answers
    Flash,
}

/// Citation standard offered for formatting and document analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CitationStandard {
    /// ABNT NBR 6023
    #[default]
    Abnt,
    /// APA, 7th edition
    Apa,
    /// Vancouver
    Vancouver,
    /// Chicago
    Chicago,
}

impl CitationStandard {
    /// Label used in prompts and in saved metadata.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Abnt => "ABNT (NBR 6023)",
            Self::Apa => "APA (7th Edition)",
            Self::Vancouver => "Vancouver",
            Self::Chicago => "Chicago Style",
        }
    }
}

impl fmt::Display for CitationStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of academic work a methodology plan is structured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WorkType {
    /// Scientific article
    #[default]
    Article,
    /// Research project
    ResearchProject,
    /// Undergraduate thesis
    Monograph,
    /// Master's dissertation
    Dissertation,
    /// Doctoral thesis
    Thesis,
    /// Technical report
    TechnicalReport,
    /// Theoretical essay
    Essay,
}

impl WorkType {
    /// Label used in prompts and saved metadata.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Article => "Artigo Científico",
            Self::ResearchProject => "Projeto de Pesquisa",
            Self::Monograph => "TCC / Monografia",
            Self::Dissertation => "Dissertação de Mestrado",
            Self::Thesis => "Tese de Doutorado",
            Self::TechnicalReport => "Relatório Técnico",
            Self::Essay => "Ensaio Teórico",
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Prompt configuration for one feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptPreset {
    /// Feature this preset drives
    pub feature: Feature,
    /// Human-readable name
    pub name: String,
    /// Feature-specific instruction appended to the style directive
    pub instruction: String,
    /// Name of the user prompt template
    pub template: String,
    /// Model tier to run on
    pub model_tier: ModelTier,
    /// Whether search grounding is requested
    pub grounded: bool,
}

impl PromptPreset {
    /// Creates the preset for the given feature.
    #[must_use]
    pub fn for_feature(feature: Feature) -> Self {
        match feature {
            Feature::Search => Self::search(),
            Feature::Methodology => Self::methodology(),
            Feature::Advice => Self::advice(),
            Feature::Project => Self::project(),
            Feature::CitationFormat => Self::citation_format(),
            Feature::DocumentAnalysis => Self::document_analysis(),
            Feature::Consolidation => Self::consolidation(),
        }
    }

    /// Full system instruction: style directive followed by the feature instruction.
    #[must_use]
    pub fn system_instruction(&self) -> String {
        if self.instruction.is_empty() {
            STYLE_DIRECTIVE.to_string()
        } else {
            format!("{STYLE_DIRECTIVE}\n\n{}", self.instruction)
        }
    }

    fn new(
        feature: Feature,
        name: &str,
        instruction: &str,
        model_tier: ModelTier,
        grounded: bool,
    ) -> Self {
        Self {
            feature,
            name: name.to_string(),
            instruction: instruction.to_string(),
            template: feature.id().to_string(),
            model_tier,
            grounded,
        }
    }

    fn search() -> Self {
        Self::new(
            Feature::Search,
            "Pesquisa Acadêmica",
            "Sua missão é fornecer referências científicas REAIS.
Utilize a busca do Google para encontrar artigos em bases confiáveis.
Informe o DOI e o link de cada trabalho e formate cada referência em ABNT e APA 7.",
            ModelTier::Pro,
            true,
        )
    }

    fn methodology() -> Self {
        Self::new(
            Feature::Methodology,
            "Estrutura Metodológica",
            "Você é especialista em metodologia científica.",
            ModelTier::Pro,
            false,
        )
    }

    fn advice() -> Self {
        Self::new(
            Feature::Advice,
            "Orientação Acadêmica",
            "Você é empática, porém rigorosa com a qualidade científica.",
            ModelTier::Flash,
            false,
        )
    }

    fn project() -> Self {
        Self::new(Feature::Project, "Projeto de Pesquisa", "", ModelTier::Pro, false)
    }

    fn citation_format() -> Self {
        Self::new(
            Feature::CitationFormat,
            "Formatador de Referências",
            "",
            ModelTier::Flash,
            false,
        )
    }

    fn document_analysis() -> Self {
        Self::new(
            Feature::DocumentAnalysis,
            "Fichamento",
            "",
            ModelTier::Pro,
            false,
        )
    }

    fn consolidation() -> Self {
        Self::new(
            Feature::Consolidation,
            "Síntese Comparativa",
            "",
            ModelTier::Pro,
            false,
        )
    }
}
