//! Natural-language answer synthesis.
//!
//! Turns a [`LookupResult`] into a Markdown answer with one chat-completion
//! call. The user prompt is picked from three templates:
//!
//! | Template | When |
//! |----------|------|
//! | single link | records found and the query asks for one link |
//! | list | records found otherwise |
//! | no results | the lookup returned nothing |
//!
//! When the call fails the lookup's status message is returned instead.

use serde::Serialize;
use std::sync::Arc;

use crate::catalog::LookupResult;
use crate::config::AnswerConfig;
use crate::llm::ChatModel;
use crate::models::{ChatMessage, ResourceRecord};

const SYSTEM_PROMPT: &str = "Eres un asistente que recomienda recursos de aprendizaje. \
Responde de forma natural y breve en el mismo idioma de la consulta del usuario, usando Markdown.";

/// What the user is asking for, as far as the answer template is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    SingleLink,
    List,
}

/// Phrase → intent rules, matched as substrings of the lowercased query.
const INTENT_RULES: &[(&str, Intent)] = &[
    ("cual es el link", Intent::SingleLink),
    ("cuál es el link", Intent::SingleLink),
    ("dame el link", Intent::SingleLink),
    ("pasame el link", Intent::SingleLink),
    ("pásame el link", Intent::SingleLink),
];

pub fn detect_intent(query: &str) -> Intent {
    let lowered = query.to_lowercase();
    INTENT_RULES
        .iter()
        .find(|(phrase, _)| lowered.contains(phrase))
        .map(|(_, intent)| *intent)
        .unwrap_or(Intent::List)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// The model produced the answer.
    Generated,
    /// The answer is the lookup status message.
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub outcome: AnswerOutcome,
}

impl Answer {
    pub fn degraded(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            outcome: AnswerOutcome::Degraded,
        }
    }
}

pub struct AnswerSynthesizer {
    model: Arc<dyn ChatModel>,
    max_tokens: u32,
    config: AnswerConfig,
}

impl AnswerSynthesizer {
    pub fn new(model: Arc<dyn ChatModel>, max_tokens: u32, config: &AnswerConfig) -> Self {
        Self {
            model,
            max_tokens,
            config: config.clone(),
        }
    }

    /// Build the user prompt for `query` (the original, unsanitized text).
    pub fn build_prompt(&self, query: &str, lookup: &LookupResult) -> String {
        if lookup.records.is_empty() {
            return format!(
                "Con la consulta '{}', no se encontró información en la base de datos. \
                 Indícale al usuario amablemente que no hay recursos disponibles sobre ese tema.",
                query
            );
        }

        let context = render_records(&lookup.records, self.config.max_context_chars);
        let intent = if self.config.detect_single_link {
            detect_intent(query)
        } else {
            Intent::List
        };

        match intent {
            Intent::SingleLink => format!(
                "Con la consulta '{}', se encontraron estos recursos: {}. \
                 El usuario quiere un único enlace: responde con el enlace más relevante \
                 y una frase que explique por qué, en Markdown.",
                query, context
            ),
            Intent::List => format!(
                "Con la consulta '{}', los siguientes resultados fueron encontrados: {}. \
                 Genera una respuesta clara y concisa en Markdown que resuma los recursos \
                 con sus enlaces.",
                query, context
            ),
        }
    }

    pub async fn synthesize(&self, query: &str, lookup: &LookupResult) -> Answer {
        let prompt = self.build_prompt(query, lookup);
        tracing::info!(prompt = %prompt, "answer prompt");

        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];

        match self.model.complete(&messages, self.max_tokens).await {
            Ok(text) if !text.trim().is_empty() => Answer {
                text,
                outcome: AnswerOutcome::Generated,
            },
            Ok(_) => {
                tracing::warn!(model = self.model.model_name(), "answer model returned empty text");
                Answer::degraded(lookup.message.clone())
            }
            Err(e) => {
                tracing::error!(
                    model = self.model.model_name(),
                    error = %e,
                    "answer synthesis failed, returning lookup status"
                );
                Answer::degraded(lookup.message.clone())
            }
        }
    }
}

/// `"1. Nombre: …, URL: …; 2. …; "`, cut to `max_chars` characters plus `...`.
pub fn render_records(records: &[ResourceRecord], max_chars: usize) -> String {
    let mut rendered = String::new();
    for (i, record) in records.iter().enumerate() {
        let fields: Vec<String> = record
            .labeled_fields()
            .into_iter()
            .map(|(label, value)| format!("{}: {}", label, value))
            .collect();
        rendered.push_str(&format!("{}. {}; ", i + 1, fields.join(", ")));
    }

    if rendered.chars().count() > max_chars {
        let mut truncated: String = rendered.chars().take(max_chars).collect();
        truncated.push_str("...");
        truncated
    } else {
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{found_message, LookupStatus};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records the last user prompt and replies with a fixed answer, or fails.
    struct RecordingModel {
        reply: Option<&'static str>,
        last_prompt: Mutex<Option<String>>,
    }

    impl RecordingModel {
        fn new(reply: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                last_prompt: Mutex::new(None),
            })
        }

        fn last_prompt(&self) -> String {
            self.last_prompt.lock().unwrap().clone().unwrap_or_default()
        }
    }

    #[async_trait]
    impl ChatModel for RecordingModel {
        fn model_name(&self) -> &str {
            "recording"
        }

        async fn complete(&self, messages: &[ChatMessage], _max_tokens: u32) -> Result<String> {
            *self.last_prompt.lock().unwrap() = messages.last().map(|m| m.content.clone());
            match self.reply {
                Some(reply) => Ok(reply.to_string()),
                None => anyhow::bail!("503 service unavailable"),
            }
        }
    }

    fn found(records: Vec<ResourceRecord>) -> LookupResult {
        LookupResult {
            status: LookupStatus::Found(records.len()),
            message: found_message(records.len()),
            records,
        }
    }

    fn empty() -> LookupResult {
        LookupResult {
            records: Vec::new(),
            status: LookupStatus::NoResults,
            message: "No se encontraron recursos para 'cobol' ni 'cobol'.".to_string(),
        }
    }

    fn synthesizer(model: Arc<RecordingModel>, detect: bool) -> AnswerSynthesizer {
        let config = AnswerConfig {
            detect_single_link: detect,
            ..AnswerConfig::default()
        };
        AnswerSynthesizer::new(model, 300, &config)
    }

    #[test]
    fn test_detect_intent() {
        assert_eq!(detect_intent("Cual es el link para Python"), Intent::SingleLink);
        assert_eq!(detect_intent("¿Cuál es el link de Docker?"), Intent::SingleLink);
        assert_eq!(detect_intent("PÁSAME EL LINK para git"), Intent::SingleLink);
        assert_eq!(detect_intent("links para machine learning"), Intent::List);
        assert_eq!(detect_intent("recursos de rust"), Intent::List);
    }

    #[test]
    fn test_render_records() {
        let records = vec![
            ResourceRecord::new("Curso Python", "http://x").with_category("Cursos"),
            ResourceRecord::new("Guía", "http://g").with_description("Intro"),
        ];
        assert_eq!(
            render_records(&records, 500),
            "1. Nombre: Curso Python, URL: http://x, Categoría: Cursos; \
             2. Nombre: Guía, URL: http://g, Descripción: Intro; "
        );
    }

    #[test]
    fn test_render_records_truncates_on_char_boundary() {
        let records = vec![ResourceRecord::new("Ñandú".repeat(200), "http://x")];
        let rendered = render_records(&records, 500);
        assert!(rendered.ends_with("..."));
        assert_eq!(rendered.chars().count(), 503);
    }

    #[tokio::test]
    async fn test_no_results_template() {
        let model = RecordingModel::new(Some("No encontré recursos sobre COBOL."));
        let answer = synthesizer(model.clone(), true)
            .synthesize("dame el link para cobol", &empty())
            .await;

        assert_eq!(answer.outcome, AnswerOutcome::Generated);
        assert_eq!(answer.text, "No encontré recursos sobre COBOL.");
        let prompt = model.last_prompt();
        assert!(prompt.contains("no se encontró información"));
        assert!(!prompt.contains("1. Nombre"));
    }

    #[tokio::test]
    async fn test_single_link_template() {
        let model = RecordingModel::new(Some("[Curso Python](http://x)"));
        let lookup = found(vec![ResourceRecord::new("Curso Python", "http://x")]);
        synthesizer(model.clone(), true)
            .synthesize("cual es el link para Python", &lookup)
            .await;

        let prompt = model.last_prompt();
        assert!(prompt.contains("único enlace"));
        assert!(prompt.contains("1. Nombre: Curso Python, URL: http://x; "));
    }

    #[tokio::test]
    async fn test_single_link_detection_disabled_uses_list() {
        let model = RecordingModel::new(Some("ok"));
        let lookup = found(vec![ResourceRecord::new("Curso Python", "http://x")]);
        synthesizer(model.clone(), false)
            .synthesize("cual es el link para Python", &lookup)
            .await;

        let prompt = model.last_prompt();
        assert!(!prompt.contains("único enlace"));
        assert!(prompt.contains("los siguientes resultados fueron encontrados"));
    }

    #[tokio::test]
    async fn test_failure_returns_lookup_message() {
        let model = RecordingModel::new(None);
        let lookup = found(vec![ResourceRecord::new("Curso Python", "http://x")]);
        let answer = synthesizer(model, true).synthesize("python", &lookup).await;

        assert_eq!(answer.outcome, AnswerOutcome::Degraded);
        assert_eq!(answer.text, "Se encontró 1 recurso relacionado.");
    }

    #[tokio::test]
    async fn test_blank_reply_is_degraded() {
        let model = RecordingModel::new(Some("   "));
        let answer = synthesizer(model, true).synthesize("cobol", &empty()).await;
        assert_eq!(answer.outcome, AnswerOutcome::Degraded);
        assert_eq!(answer.text, empty().message);
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_prompt_logged_at_default_level() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let model = RecordingModel::new(Some("ok"));
        let lookup = found(vec![ResourceRecord::new("Curso Python", "http://x")]);
        synthesizer(model, true).synthesize("recursos de python", &lookup).await;

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("answer prompt"), "logs: {}", output);
        assert!(output.contains("Con la consulta 'recursos de python'"), "logs: {}", output);
    }
}
