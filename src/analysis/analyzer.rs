use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use super::client::{CompletionClient, CompletionError, CompletionRequest, build_completion_client};
use super::extractive::extractive_analysis;
use super::prompts::{
    ChunkPosition, SYSTEM_PROMPT, chunk_prompt, consolidation_prompt, paper_analysis_prompt,
};
use super::response::parse_analysis;
use super::tokens::{TokenCounter, build_token_counter, truncate_prompt};
use super::{Analysis, fields};
use crate::config::Config;
use crate::extraction::PaperMetadata;
use crate::output::merge_results;
use crate::preprocessing::{Chunk, structure_text};

/// Errors raised while analyzing a paper.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The completion provider failed after exhausting its retries.
    #[error(transparent)]
    Completion(#[from] CompletionError),
    /// The paper carried no text to analyze.
    #[error("nothing to analyze in {0}")]
    NothingToAnalyze(String),
}

/// Parameters of the analysis step.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    /// Model identifier, also used to pick a tokenizer.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens per answer.
    pub max_tokens: u32,
    /// Token budget of a single prompt.
    pub prompt_token_budget: usize,
    /// Pause between consecutive chunk requests.
    pub chunk_delay: Duration,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4".into(),
            temperature: 0.2,
            max_tokens: 1000,
            prompt_token_budget: 6500,
            chunk_delay: Duration::from_secs(1),
        }
    }
}

/// A paper ready for analysis.
#[derive(Debug, Clone)]
pub struct PreparedPaper {
    /// Display name, usually the PDF file name.
    pub name: String,
    /// Metadata recovered during extraction.
    pub metadata: PaperMetadata,
    /// Full cleaned text.
    pub text: String,
    /// Chunk series produced by the preprocessor.
    pub chunks: Vec<Chunk>,
}

/// Runs the analysis step for one paper at a time.
pub struct PaperAnalyzer {
    client: Option<Box<dyn CompletionClient>>,
    settings: AnalysisSettings,
    token_counter: TokenCounter,
}

impl PaperAnalyzer {
    /// Analyzer backed by `client`; `None` selects extractive analysis.
    pub fn new(client: Option<Box<dyn CompletionClient>>, settings: AnalysisSettings) -> Self {
        let token_counter = build_token_counter(&settings.model);
        Self {
            client,
            settings,
            token_counter,
        }
    }

    /// Analyzer that never calls a model.
    pub fn extractive(settings: AnalysisSettings) -> Self {
        Self::new(None, settings)
    }

    /// Analyzer for the provider selected by `config`.
    pub fn from_config(config: &Config) -> Result<Self, CompletionError> {
        let client = build_completion_client(config)?;
        Ok(Self::new(client, config.analysis_settings()))
    }

    /// Replace the token counter used for prompt budgeting.
    pub fn with_token_counter(mut self, token_counter: TokenCounter) -> Self {
        self.token_counter = token_counter;
        self
    }

    /// True when no completion provider is attached.
    pub fn is_extractive(&self) -> bool {
        self.client.is_none()
    }

    /// Analyze `paper`.
    ///
    /// A single chunk is analyzed with one request. A longer series is analyzed chunk by chunk
    /// and then consolidated; if consolidation fails, the partial analyses are merged instead and
    /// the failure is recorded under `error`.
    pub async fn analyze(&self, paper: &PreparedPaper) -> Result<Analysis, AnalysisError> {
        if paper.text.trim().is_empty() && paper.chunks.is_empty() {
            return Err(AnalysisError::NothingToAnalyze(paper.name.clone()));
        }

        let Some(client) = self.client.as_deref() else {
            tracing::info!(paper = %paper.name, "Building extractive analysis");
            return Ok(extractive_analysis(&paper.text, &paper.metadata, &paper.name));
        };

        match paper.chunks.as_slice() {
            [] => {
                let text = structure_text(&paper.text, &paper.metadata, None);
                self.analyze_whole(client, &text, &paper.name).await
            }
            [chunk] => {
                let text = structure_text(&chunk.text, &paper.metadata, Some(chunk));
                self.analyze_whole(client, &text, &paper.name).await
            }
            chunks => self.analyze_chunked(client, chunks, paper).await,
        }
    }

    async fn analyze_whole(
        &self,
        client: &dyn CompletionClient,
        text: &str,
        paper_name: &str,
    ) -> Result<Analysis, AnalysisError> {
        tracing::info!(paper = paper_name, "Analyzing paper in a single request");
        let content = self.complete(client, paper_analysis_prompt(text)).await?;
        Ok(parse_analysis(&content, paper_name))
    }

    async fn analyze_chunked(
        &self,
        client: &dyn CompletionClient,
        chunks: &[Chunk],
        paper: &PreparedPaper,
    ) -> Result<Analysis, AnalysisError> {
        let total = chunks.len();
        tracing::info!(paper = %paper.name, chunks = total, "Analyzing paper in chunks");

        let mut partials = Vec::with_capacity(total);
        for (index, chunk) in chunks.iter().enumerate() {
            if index > 0 && !self.settings.chunk_delay.is_zero() {
                tokio::time::sleep(self.settings.chunk_delay).await;
            }
            let chunk_info = format!(
                "Part {}/{total} - Section: {} (part {})",
                index + 1,
                chunk.section,
                chunk.chunk_part
            );
            tracing::info!(paper = %paper.name, chunk = %chunk_info, "Analyzing chunk");

            let text = structure_text(&chunk.text, &paper.metadata, Some(chunk));
            let prompt = chunk_prompt(ChunkPosition::of(index, total), &text, &chunk_info);
            let content = self.complete(client, prompt).await?;
            partials.push(parse_analysis(
                &content,
                &format!("{}_chunk_{}", paper.name, index + 1),
            ));
        }

        let prompt = consolidation_prompt(&partials, &paper.name);
        match self.complete(client, prompt).await {
            Ok(content) => Ok(parse_analysis(&content, &paper.name)),
            Err(error) => {
                tracing::warn!(
                    paper = %paper.name,
                    error = %error,
                    "Consolidation failed; merging partial analyses"
                );
                let mut merged = merge_results(&partials);
                merged.insert(fields::NAME.into(), Value::String(paper.name.clone()));
                merged.insert(
                    fields::ERROR.into(),
                    Value::String(format!("consolidation failed: {error}")),
                );
                Ok(merged)
            }
        }
    }

    async fn complete(
        &self,
        client: &dyn CompletionClient,
        prompt: String,
    ) -> Result<String, CompletionError> {
        let prompt = truncate_prompt(
            &prompt,
            self.settings.prompt_token_budget,
            &self.token_counter,
        );
        client
            .complete(CompletionRequest {
                system: SYSTEM_PROMPT.to_string(),
                prompt,
                temperature: self.settings.temperature,
                max_tokens: self.settings.max_tokens,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tokens::whitespace_token_counter;
    use crate::extraction::SectionKind;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct ScriptedClient {
        answers: Arc<Mutex<VecDeque<Result<String, CompletionError>>>>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedClient {
        fn with_answers(answers: Vec<Result<String, CompletionError>>) -> Self {
            Self {
                answers: Arc::new(Mutex::new(answers.into())),
                prompts: Arc::default(),
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
            self.prompts.lock().unwrap().push(request.prompt);
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(CompletionError::GenerationFailed("script exhausted".into())))
        }
    }

    fn settings() -> AnalysisSettings {
        AnalysisSettings {
            chunk_delay: Duration::ZERO,
            ..AnalysisSettings::default()
        }
    }

    fn analyzer(client: &ScriptedClient) -> PaperAnalyzer {
        PaperAnalyzer::new(Some(Box::new(client.clone())), settings())
            .with_token_counter(whitespace_token_counter())
    }

    fn chunk(text: &str, section: SectionKind, part: usize, total: usize) -> Chunk {
        Chunk {
            text: text.into(),
            section,
            chunk_part: part,
            total_chunks: total,
            offset: 0,
        }
    }

    fn paper(chunks: Vec<Chunk>) -> PreparedPaper {
        PreparedPaper {
            name: "paper.pdf".into(),
            metadata: PaperMetadata {
                title: Some("Paper Title".into()),
                ..PaperMetadata::default()
            },
            text: chunks.iter().map(|chunk| chunk.text.as_str()).collect(),
            chunks,
        }
    }

    #[tokio::test]
    async fn single_chunk_uses_one_request() {
        let client = ScriptedClient::with_answers(vec![Ok(r#"{"summary": "short"}"#.into())]);
        let paper = paper(vec![chunk("The whole paper.", SectionKind::Full, 1, 1)]);

        let analysis = analyzer(&client).analyze(&paper).await.unwrap();
        assert_eq!(analysis["summary"], "short");
        assert_eq!(analysis["name"], "paper.pdf");

        let prompts = client.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Title: Paper Title\n\nThe whole paper."));
    }

    #[tokio::test]
    async fn chunked_papers_are_consolidated() {
        let client = ScriptedClient::with_answers(vec![
            Ok(r#"{"summary": "part one"}"#.into()),
            Ok(r#"{"summary": "part two"}"#.into()),
            Ok(r#"{"name": "Paper Title", "summary": "whole"}"#.into()),
        ]);
        let paper = paper(vec![
            chunk("Abstract text.", SectionKind::Abstract, 1, 2),
            chunk("Results text.", SectionKind::Results, 1, 2),
        ]);

        let analysis = analyzer(&client).analyze(&paper).await.unwrap();
        assert_eq!(analysis["summary"], "whole");

        let prompts = client.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[0].contains("FIRST part"));
        assert!(prompts[0].contains("[Part 1/2 - Section: abstract (part 1)]"));
        assert!(prompts[1].contains("LAST part"));
        assert!(prompts[2].contains("- Summary: part one"));
        assert!(prompts[2].contains("- Summary: part two"));
    }

    #[tokio::test]
    async fn failed_consolidation_merges_partials() {
        let client = ScriptedClient::with_answers(vec![
            Ok(r#"{"summary": "part one", "success": false}"#.into()),
            Ok(r#"{"summary": "part two", "success": true}"#.into()),
            Err(CompletionError::GenerationFailed("overloaded".into())),
        ]);
        let paper = paper(vec![
            chunk("First.", SectionKind::Introduction, 1, 2),
            chunk("Second.", SectionKind::Introduction, 2, 2),
        ]);

        let analysis = analyzer(&client).analyze(&paper).await.unwrap();
        assert_eq!(analysis["summary"], "part one\n\npart two");
        assert_eq!(analysis["success"], true);
        assert_eq!(analysis["name"], "paper.pdf");
        assert!(analysis["error"].as_str().unwrap().contains("overloaded"));
    }

    #[tokio::test]
    async fn chunk_failures_propagate() {
        let client = ScriptedClient::with_answers(vec![Err(CompletionError::Rejected(
            "bad key".into(),
        ))]);
        let paper = paper(vec![
            chunk("First.", SectionKind::Abstract, 1, 2),
            chunk("Second.", SectionKind::Conclusion, 1, 2),
        ]);

        let error = analyzer(&client).analyze(&paper).await.unwrap_err();
        assert!(matches!(
            error,
            AnalysisError::Completion(CompletionError::Rejected(_))
        ));
        assert_eq!(client.prompts().len(), 1);
    }

    #[tokio::test]
    async fn without_provider_analysis_is_extractive() {
        let analyzer = PaperAnalyzer::extractive(settings());
        assert!(analyzer.is_extractive());
        let paper = paper(vec![chunk(
            "Abstract\nWe did a thing. It worked.",
            SectionKind::Full,
            1,
            1,
        )]);

        let analysis = analyzer.analyze(&paper).await.unwrap();
        assert_eq!(analysis["summary"], "We did a thing. It worked.");
        assert_eq!(analysis["name"], "Paper Title");
    }

    #[tokio::test]
    async fn empty_papers_are_rejected() {
        let analyzer = PaperAnalyzer::extractive(settings());
        let error = analyzer.analyze(&paper(Vec::new())).await.unwrap_err();
        assert!(matches!(error, AnalysisError::NothingToAnalyze(name) if name == "paper.pdf"));
    }
}
