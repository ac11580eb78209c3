//! Named views and their plain-text rendering.

use crate::batch::{ItemStatus, UploadItem};
use crate::gateway::ResearchResult;
use crate::store::{ArtifactType, SavedArtifact};
use once_cell::sync::Lazy;
use std::fmt::{self, Write};

/// A screen of the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum View {
    /// Grounded literature search
    #[default]
    Search,
    /// Academic advisor
    Advisor,
    /// Research project builder
    Project,
    /// Batch document analysis
    Fichamento,
    /// Methodology structuring
    Methodology,
    /// Reference formatter
    Formatter,
    /// Saved artifacts
    Library,
    /// About the assistant
    About,
}

impl View {
    /// Short identifier.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Advisor => "advisor",
            Self::Project => "project",
            Self::Fichamento => "fichamento",
            Self::Methodology => "methodology",
            Self::Formatter => "formatter",
            Self::Library => "library",
            Self::About => "about",
        }
    }

    /// Title shown to the user.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Search => "Busca Acadêmica",
            Self::Advisor => "Orientador IA",
            Self::Project => "Criar Projeto",
            Self::Fichamento => "Fichamento",
            Self::Methodology => "Estruturação",
            Self::Formatter => "Formatador",
            Self::Library => "Minha Biblioteca",
            Self::About => "Sobre Aurora",
        }
    }

    /// All views in menu order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Search,
            Self::Advisor,
            Self::Project,
            Self::Fichamento,
            Self::Methodology,
            Self::Formatter,
            Self::Library,
            Self::About,
        ]
    }

    /// Parse a view from its identifier.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::all().iter().copied().find(|v| v.id() == id)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Holds the single active view.
#[derive(Debug, Clone, Copy, Default)]
pub struct Navigator {
    active: View,
}

impl Navigator {
    /// Starts on the search view.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `view` the active one.
    pub fn select(&mut self, view: View) {
        self.active = view;
    }

    /// The active view.
    #[must_use]
    pub const fn active(&self) -> View {
        self.active
    }
}

/// Library label of an artifact type.
#[must_use]
pub const fn type_label(artifact_type: ArtifactType) -> &'static str {
    match artifact_type {
        ArtifactType::Search => "Pesquisa",
        ArtifactType::Fichamento => "Fichamento",
        ArtifactType::Methodology => "Estrutura",
        ArtifactType::Formatter => "Citação",
        ArtifactType::Advisor => "Orientação",
        ArtifactType::Project => "Projeto",
    }
}

/// Queue label of an item status.
#[must_use]
pub const fn status_label(status: &ItemStatus) -> &'static str {
    match status {
        ItemStatus::Pending => "Aguardando",
        ItemStatus::Reading => "Processando Arquivo",
        ItemStatus::Analyzing => "Aurora Interpretando",
        ItemStatus::Done(_) => "Fichamento Pronto",
        ItemStatus::Error(_) => "Erro de Leitura",
    }
}

/// Search result followed by its numbered sources.
#[must_use]
pub fn render_research(result: &ResearchResult) -> String {
    let mut out = result.content.clone();
    if result.sources.is_empty() {
        return out;
    }

    out.push_str("\n\nFONTES CONSULTADAS\n");
    for (i, source) in result.sources.iter().enumerate() {
        let title = source.title.as_deref().unwrap_or("Fonte sem título");
        let _ = write!(out, "\n{}. {}", i + 1, title);
        if let Some(uri) = &source.uri {
            let _ = write!(out, "\n   {uri}");
        }
    }
    out
}

/// One line per queued document.
#[must_use]
pub fn render_queue(items: &[UploadItem]) -> String {
    if items.is_empty() {
        return "Nenhum documento na fila.".to_string();
    }

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "{}. [{}] {}",
                i + 1,
                status_label(&item.status),
                item.file.name
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compact listing row: date, type, title and id.
#[must_use]
pub fn render_artifact_row(artifact: &SavedArtifact) -> String {
    format!(
        "{}  {:<11} {}  ({})",
        artifact.date.format("%d/%m/%Y"),
        type_label(artifact.artifact_type),
        artifact.title,
        artifact.id
    )
}

/// The whole library, one row per artifact.
#[must_use]
pub fn render_library(artifacts: &[SavedArtifact]) -> String {
    if artifacts.is_empty() {
        return "Sua biblioteca está vazia.".to_string();
    }
    artifacts
        .iter()
        .map(render_artifact_row)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Full artifact: header, content, then sources when the metadata has them.
#[must_use]
pub fn render_artifact(artifact: &SavedArtifact) -> String {
    let mut out = format!(
        "{}\n{} • {}\n\n{}",
        artifact.title,
        type_label(artifact.artifact_type),
        artifact.date.format("%d/%m/%Y"),
        artifact.content
    );

    let sources = artifact
        .metadata
        .as_ref()
        .and_then(|m| m.get("sources"))
        .and_then(|s| s.as_array())
        .filter(|s| !s.is_empty());

    if let Some(sources) = sources {
        out.push_str("\n\nFONTES CONSULTADAS\n");
        for (i, source) in sources.iter().enumerate() {
            let title = source
                .get("title")
                .and_then(|t| t.as_str())
                .unwrap_or("Fonte sem título");
            let _ = write!(out, "\n{}. {}", i + 1, title);
            if let Some(uri) = source.get("uri").and_then(|u| u.as_str()) {
                let _ = write!(out, "\n   {uri}");
            }
        }
    }
    out
}

static ABOUT: Lazy<String> = Lazy::new(|| {
    let mut text = String::from(
        "AURORA\n\
         Pesquisadora Metodológica Sênior\n\n\
         NOSSA MISSÃO\n\n\
         Aurora foi concebida para elevar o nível da produção científica brasileira, \
         com rigor metodológico e conexão direta com bases de dados consagradas.\n\n\
         FONTES DE DADOS\n\n\
         Scopus, Web of Science, PubMed, SciELO, JSTOR, IEEE Xplore, Google Scholar \
         e bases de dados governamentais.\n\n\
         COMO FUNCIONA\n\n\
         1. Processamento crítico: analisa lacunas na literatura atual.\n\
         2. Busca em tempo real: evita citações obsoletas ou inexistentes.\n\
         3. Padronização normativa: referências em ABNT NBR 6023, APA, Vancouver ou Chicago.\n\n\
         SEÇÕES\n",
    );
    for (i, view) in View::all().iter().enumerate() {
        let _ = write!(text, "\n{}. {} ({})", i + 1, view.title(), view.id());
    }
    text
});

/// Text of the about view.
#[must_use]
pub fn about_text() -> &'static str {
    &ABOUT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::DocumentFile;
    use crate::client::GroundingSource;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn artifact(metadata: Option<serde_json::Value>) -> SavedArtifact {
        SavedArtifact {
            id: "abc".to_string(),
            artifact_type: ArtifactType::Search,
            title: "evasão escolar".to_string(),
            content: "CONTEÚDO".to_string(),
            date: Utc.with_ymd_and_hms(2025, 3, 7, 12, 0, 0).unwrap(),
            metadata,
        }
    }

    #[test]
    fn test_navigator_defaults_to_search() {
        let mut nav = Navigator::new();
        assert_eq!(nav.active(), View::Search);

        nav.select(View::Library);
        assert_eq!(nav.active(), View::Library);
    }

    #[test]
    fn test_view_ids_round_trip() {
        assert_eq!(View::all().len(), 8);
        for view in View::all() {
            assert_eq!(View::from_id(view.id()), Some(*view));
        }
        assert_eq!(View::from_id("settings"), None);
    }

    #[test]
    fn test_research_lists_numbered_sources() {
        let result = ResearchResult {
            content: "TEXTO".to_string(),
            sources: vec![
                GroundingSource {
                    title: Some("SciELO".to_string()),
                    uri: Some("https://scielo.br/a".to_string()),
                },
                GroundingSource {
                    title: None,
                    uri: Some("https://doi.org/x".to_string()),
                },
            ],
        };

        let text = render_research(&result);

        assert!(text.starts_with("TEXTO"));
        assert!(text.contains("1. SciELO\n   https://scielo.br/a"));
        assert!(text.contains("2. Fonte sem título\n   https://doi.org/x"));
    }

    #[test]
    fn test_research_without_sources_is_just_content() {
        let result = ResearchResult {
            content: "TEXTO".to_string(),
            sources: Vec::new(),
        };
        assert_eq!(render_research(&result), "TEXTO");
    }

    #[test]
    fn test_artifact_uses_type_label_and_date() {
        let text = render_artifact(&artifact(None));
        assert!(text.contains("Pesquisa • 07/03/2025"));

        let row = render_artifact_row(&artifact(None));
        assert!(row.starts_with("07/03/2025  Pesquisa"));
        assert!(row.ends_with("(abc)"));
    }

    #[test]
    fn test_artifact_renders_saved_sources() {
        let text = render_artifact(&artifact(Some(json!({
            "sources": [{ "title": "PubMed", "uri": "https://pubmed.gov/1" }]
        }))));

        assert!(text.contains("1. PubMed\n   https://pubmed.gov/1"));
    }

    #[test]
    fn test_queue_shows_status_labels() {
        let mut failed = UploadItem::new(DocumentFile::from_bytes("b.pdf", "application/pdf", vec![2]));
        failed.status = ItemStatus::Error("failed to process file".to_string());
        let items = vec![
            UploadItem::new(DocumentFile::from_bytes("artigo.pdf", "application/pdf", vec![1])),
            failed,
        ];

        assert_eq!(
            render_queue(&items),
            "1. [Aguardando] artigo.pdf\n2. [Erro de Leitura] b.pdf"
        );
        assert_eq!(render_queue(&[]), "Nenhum documento na fila.");
    }

    #[test]
    fn test_empty_library_message() {
        assert_eq!(render_library(&[]), "Sua biblioteca está vazia.");
    }

    #[test]
    fn test_about_lists_every_view() {
        let text = about_text();
        for view in View::all() {
            assert!(text.contains(view.title()));
        }
    }
}
