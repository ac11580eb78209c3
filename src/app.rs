//! Application facade: generation plus saving to the library.
//!
//! The save helpers apply the library's title conventions, so every caller
//! stores artifacts the same way.

use crate::batch::BatchController;
use crate::client::{GeminiClient, GenerativeClient};
use crate::config::Config;
use crate::error::Result;
use crate::gateway::{Gateway, ProjectBrief, ResearchResult};
use crate::preset::{CitationStandard, WorkType};
use crate::store::{ArtifactStore, ArtifactType, Library, NewArtifact, SavedArtifact};
use chrono::{Local, NaiveDate};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

const TITLE_EXCERPT_CHARS: usize = 30;
const UNTITLED_PROJECT: &str = "Sem título";

/// Title made of a prefix and the first characters of user input.
#[must_use]
pub fn excerpt_title(prefix: &str, text: &str) -> String {
    let excerpt: String = text.trim().chars().take(TITLE_EXCERPT_CHARS).collect();
    format!("{prefix}: {excerpt}...")
}

/// Title of a saved group synthesis.
#[must_use]
pub fn synthesis_title(date: NaiveDate) -> String {
    format!("Síntese de Grupo: {}", date.format("%d/%m/%Y"))
}

/// Gateway and library behind one handle.
pub struct Assistant {
    gateway: Arc<Gateway>,
    store: Box<dyn ArtifactStore>,
}

impl Assistant {
    /// Couples a gateway with a store.
    #[must_use]
    pub fn new(gateway: Arc<Gateway>, store: Box<dyn ArtifactStore>) -> Self {
        Self { gateway, store }
    }

    /// Builds the production assistant: Gemini client and file-backed library.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or the prompt templates cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client: Arc<dyn GenerativeClient> = Arc::new(GeminiClient::new(config)?);
        let gateway = Gateway::new(client, config)?;
        let store = Library::open(&config.library_dir);

        Ok(Self::new(Arc::new(gateway), Box::new(store)))
    }

    /// The generation gateway.
    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// The artifact store.
    #[must_use]
    pub fn store(&self) -> &dyn ArtifactStore {
        self.store.as_ref()
    }

    /// A fresh upload queue sharing this assistant's gateway.
    #[must_use]
    pub fn batch(&self, standard: CitationStandard) -> BatchController {
        BatchController::new(Arc::clone(&self.gateway), standard)
    }

    fn save(&self, artifact: NewArtifact) -> Result<SavedArtifact> {
        let saved = self.store.save(artifact)?;
        info!(id = saved.id.as_str(), title = saved.title.as_str(), "Saved to library");
        Ok(saved)
    }

    /// Saves a search result under its query, keeping the sources.
    ///
    /// # Errors
    ///
    /// Returns an error if the library cannot be written.
    pub fn save_search(&self, query: &str, result: &ResearchResult) -> Result<SavedArtifact> {
        self.save(
            NewArtifact::new(ArtifactType::Search, query.trim(), &result.content)
                .with_metadata(json!({ "sources": result.sources })),
        )
    }

    /// Saves a methodology plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the library cannot be written.
    pub fn save_methodology(
        &self,
        topic: &str,
        work_type: WorkType,
        content: &str,
    ) -> Result<SavedArtifact> {
        self.save(
            NewArtifact::new(
                ArtifactType::Methodology,
                excerpt_title("Estrutura", topic),
                content,
            )
            .with_metadata(json!({ "workType": work_type.label() })),
        )
    }

    /// Saves a formatted reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the library cannot be written.
    pub fn save_reference(
        &self,
        raw: &str,
        standard: CitationStandard,
        content: &str,
    ) -> Result<SavedArtifact> {
        self.save(
            NewArtifact::new(ArtifactType::Formatter, excerpt_title("Referência", raw), content)
                .with_metadata(json!({ "standard": standard.label() })),
        )
    }

    /// Saves an advisor answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the library cannot be written.
    pub fn save_advice(&self, question: &str, content: &str) -> Result<SavedArtifact> {
        self.save(NewArtifact::new(
            ArtifactType::Advisor,
            excerpt_title("Orientação", question),
            content,
        ))
    }

    /// Saves a project outline.
    ///
    /// # Errors
    ///
    /// Returns an error if the library cannot be written.
    pub fn save_project(&self, brief: &ProjectBrief, content: &str) -> Result<SavedArtifact> {
        let title = match brief.title.trim() {
            "" => UNTITLED_PROJECT,
            title => title,
        };
        self.save(NewArtifact::new(
            ArtifactType::Project,
            format!("Projeto: {title}"),
            content,
        ))
    }

    /// Saves the fichamento of one document.
    ///
    /// # Errors
    ///
    /// Returns an error if the library cannot be written.
    pub fn save_fichamento(
        &self,
        file_name: &str,
        standard: CitationStandard,
        content: &str,
    ) -> Result<SavedArtifact> {
        self.save(
            NewArtifact::new(
                ArtifactType::Fichamento,
                format!("Fichamento: {file_name}"),
                content,
            )
            .with_metadata(json!({ "standard": standard.label() })),
        )
    }

    /// Saves a group synthesis dated today.
    ///
    /// # Errors
    ///
    /// Returns an error if the library cannot be written.
    pub fn save_synthesis(&self, content: &str) -> Result<SavedArtifact> {
        self.save(NewArtifact::new(
            ArtifactType::Fichamento,
            synthesis_title(Local::now().date_naive()),
            content,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::DocumentFile;
    use crate::client::GroundingSource;
    use crate::client::fake::ScriptedClient;

    fn assistant(client: ScriptedClient) -> Assistant {
        let gateway = Gateway::with_models(Arc::new(client), "pro", "flash").unwrap();
        Assistant::new(Arc::new(gateway), Box::new(Library::in_memory()))
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let title = excerpt_title("Orientação", "ética é fundamental em pesquisas com seres humanos");
        assert_eq!(title, "Orientação: ética é fundamental em pesquis...");

        assert_eq!(excerpt_title("Estrutura", "curto"), "Estrutura: curto...");
    }

    #[test]
    fn test_synthesis_title_uses_day_month_year() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 4).unwrap();
        assert_eq!(synthesis_title(date), "Síntese de Grupo: 04/11/2025");
    }

    #[tokio::test]
    async fn test_search_is_saved_with_sources() {
        let sources = vec![GroundingSource {
            title: Some("SciELO".to_string()),
            uri: Some("https://scielo.br/a".to_string()),
        }];
        let app = assistant(ScriptedClient::new().reply_with_sources("RESULTADO", sources));

        let result = app.gateway().search("metodologias ativas").await.unwrap();
        let saved = app.save_search("metodologias ativas", &result).unwrap();

        assert_eq!(saved.title, "metodologias ativas");
        assert_eq!(saved.artifact_type, ArtifactType::Search);
        assert_eq!(
            saved.metadata.unwrap()["sources"][0]["uri"],
            "https://scielo.br/a"
        );
    }

    #[test]
    fn test_reference_keeps_standard_label() {
        let app = assistant(ScriptedClient::new());

        let saved = app
            .save_reference("SILVA, João. Metodologia. 2020", CitationStandard::Apa, "Silva, J. (2020).")
            .unwrap();

        assert_eq!(saved.title, "Referência: SILVA, João. Metodologia. 2020...");
        let listed = app.store().list_by_type(ArtifactType::Formatter);
        assert_eq!(
            listed[0].metadata,
            Some(json!({ "standard": "APA (7th Edition)" }))
        );
    }

    #[test]
    fn test_project_without_title_is_untitled() {
        let app = assistant(ScriptedClient::new());

        let saved = app
            .save_project(
                &ProjectBrief {
                    problem: "Por que alunos evadem?".to_string(),
                    ..ProjectBrief::default()
                },
                "PROJETO",
            )
            .unwrap();

        assert_eq!(saved.title, "Projeto: Sem título");
    }

    #[test]
    fn test_methodology_records_work_type() {
        let app = assistant(ScriptedClient::new());

        let saved = app
            .save_methodology("letramento digital", WorkType::Dissertation, "PLANO")
            .unwrap();

        assert_eq!(saved.title, "Estrutura: letramento digital...");
        assert_eq!(
            saved.metadata,
            Some(json!({ "workType": "Dissertação de Mestrado" }))
        );
    }

    #[tokio::test]
    async fn test_batch_results_can_be_saved() {
        let app = assistant(ScriptedClient::new().reply("F1").reply("F2").reply("SÍNTESE"));
        let batch = app.batch(CitationStandard::Abnt);
        batch
            .enqueue([
                DocumentFile::from_bytes("a.pdf", "application/pdf", vec![1]),
                DocumentFile::from_bytes("b.pdf", "application/pdf", vec![2]),
            ])
            .await;
        batch.process_pending().await.unwrap();
        let synthesis = batch.consolidate().await.unwrap();

        for item in batch.items().await {
            let content = item.result().unwrap();
            app.save_fichamento(&item.file.name, batch.standard().await, content)
                .unwrap();
        }
        let saved = app.save_synthesis(&synthesis).unwrap();

        assert!(saved.title.starts_with("Síntese de Grupo: "));
        let titles: Vec<_> = app
            .store()
            .list_by_type(ArtifactType::Fichamento)
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles.len(), 3);
        assert_eq!(titles[1], "Fichamento: b.pdf");
        assert_eq!(titles[2], "Fichamento: a.pdf");
    }
}
