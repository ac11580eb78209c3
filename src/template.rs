use crate::{
    error::{Error, Result},
    preset::Feature,
};
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera, Value};

/// Renders the user prompt of each feature from its built-in template.
pub(crate) struct PromptRenderer {
    tera: Tera,
}

impl PromptRenderer {
    /// Creates a renderer with every built-in prompt template registered.
    ///
    /// # Errors
    ///
    /// Returns an error if a template fails to parse.
    pub(crate) fn new() -> Result<Self> {
        let mut tera = Tera::default();

        Self::register_builtin_templates(&mut tera)?;
        tera.register_filter("squash", Self::squash_filter);

        Ok(Self { tera })
    }

    fn register_builtin_templates(tera: &mut Tera) -> Result<()> {
        let templates = [
            (Feature::Search, include_str!("../templates/search.tera")),
            (Feature::Methodology, include_str!("../templates/methodology.tera")),
            (Feature::Advice, include_str!("../templates/advice.tera")),
            (Feature::Project, include_str!("../templates/project.tera")),
            (
                Feature::CitationFormat,
                include_str!("../templates/citation-format.tera"),
            ),
            (
                Feature::DocumentAnalysis,
                include_str!("../templates/document-analysis.tera"),
            ),
            (
                Feature::Consolidation,
                include_str!("../templates/consolidation.tera"),
            ),
        ];

        for (feature, source) in templates {
            tera.add_raw_template(feature.id(), source)
                .map_err(|e| Error::template(feature.id(), e))?;
        }

        Ok(())
    }

    /// Collapses runs of whitespace (including newlines) into single spaces.
    ///
    /// Keeps free-form user input from breaking the prompt layout.
    fn squash_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        match value.as_str() {
            Some(s) => Ok(Value::String(
                s.split_whitespace().collect::<Vec<_>>().join(" "),
            )),
            None => Ok(value.clone()),
        }
    }

    /// Renders the template registered for `template` with the given context.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is unknown or rendering fails.
    pub(crate) fn render<T: Serialize>(&self, template: &str, data: &T) -> Result<String> {
        let context = Context::from_serialize(data).map_err(|e| Error::template(template, e))?;

        self.tera
            .render(template, &context)
            .map(|s| s.trim_end().to_string())
            .map_err(|e| Error::template(template, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_renderer_creation() {
        assert!(PromptRenderer::new().is_ok());
    }

    #[test]
    fn test_render_search() {
        let renderer = PromptRenderer::new().unwrap();
        let rendered = renderer
            .render("search", &json!({ "query": "aprendizagem ativa" }))
            .unwrap();

        assert!(rendered.contains("\"aprendizagem ativa\""));
    }

    #[test]
    fn test_quotes_are_not_escaped() {
        let renderer = PromptRenderer::new().unwrap();
        let rendered = renderer
            .render(
                "citation-format",
                &json!({ "standard": "APA (7th Edition)", "reference": "Silva & \"Souza\" <2020>" }),
            )
            .unwrap();

        assert!(rendered.contains("Silva & \"Souza\" <2020>"));
        assert!(rendered.contains("APA (7th Edition)"));
    }

    #[test]
    fn test_document_analysis_sections_in_order() {
        let renderer = PromptRenderer::new().unwrap();
        let rendered = renderer
            .render("document-analysis", &json!({ "standard": "Vancouver" }))
            .unwrap();

        let sections = [
            "REFERÊNCIA BIBLIOGRÁFICA (norma: Vancouver)",
            "RESUMO INFORMATIVO",
            "PROBLEMA E OBJETIVOS",
            "METODOLOGIA",
            "PRINCIPAIS RESULTADOS",
            "CONCLUSÃO E CONTRIBUIÇÃO",
            "CITAÇÕES DIRETAS",
        ];
        let positions: Vec<usize> = sections
            .iter()
            .map(|s| rendered.find(s).unwrap_or_else(|| panic!("missing {s}")))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_missing_variable_is_an_error() {
        let renderer = PromptRenderer::new().unwrap();
        let result = renderer.render("project", &json!({ "title": "only title" }));

        assert!(matches!(result, Err(Error::Template { .. })));
    }

    #[test]
    fn test_squash_filter() {
        let value = Value::String("  linha um\n\n  linha   dois ".to_string());
        let result = PromptRenderer::squash_filter(&value, &HashMap::new()).unwrap();

        assert_eq!(result.as_str().unwrap(), "linha um linha dois");
    }
}
