//! Pipeline coordinating extraction, preprocessing, analysis, and result persistence.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::analysis::{Analysis, AnalysisError, CompletionError, PaperAnalyzer, PreparedPaper};
use crate::config::Config;
use crate::extraction::{ExtractionError, PaperSource, PdfExtractor};
use crate::input::{discover_papers, is_processed};
use crate::output::{OutputError, save_human_report, save_paper_analysis};
use crate::preprocessing::{ChunkingError, TextPreprocessor};

/// Errors that fail a single paper.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Text extraction failed.
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    /// Chunking rejected the text.
    #[error("Chunking failed: {0}")]
    Chunking(#[from] ChunkingError),
    /// The analysis step failed.
    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
    /// Results could not be written.
    #[error("Saving results failed: {0}")]
    Output(#[from] OutputError),
    /// The blocking extraction task panicked or was cancelled.
    #[error("Extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Batch parameters.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Directory scanned by [`Pipeline::process_all`].
    pub input_dir: PathBuf,
    /// Directory receiving results.
    pub output_dir: PathBuf,
    /// Skip papers whose JSON result already exists.
    pub skip_processed: bool,
    /// Also write a `.txt` report for every result.
    pub write_text_reports: bool,
    /// Pause between papers.
    pub paper_delay: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input/papers"),
            output_dir: PathBuf::from("output/results"),
            skip_processed: true,
            write_text_reports: true,
            paper_delay: Duration::from_secs(2),
        }
    }
}

/// Files written for one successfully processed paper.
#[derive(Debug, Clone)]
pub struct ProcessedPaper {
    /// Paper file name.
    pub name: String,
    /// JSON result.
    pub json_path: PathBuf,
    /// Human-readable report, when enabled.
    pub report_path: Option<PathBuf>,
    /// The saved analysis (without envelope).
    pub analysis: Analysis,
}

/// Result of one paper within a batch.
#[derive(Debug, Clone)]
pub enum PaperOutcome {
    /// Processed and saved.
    Success {
        /// Paper file name.
        name: String,
        /// JSON result.
        json_path: PathBuf,
        /// Human-readable report, when enabled.
        report_path: Option<PathBuf>,
    },
    /// A result already existed.
    Skipped {
        /// Paper file name.
        name: String,
    },
    /// Processing failed; the batch moved on.
    Failed {
        /// Paper file name.
        name: String,
        /// Failure description.
        error: String,
    },
}

impl PaperOutcome {
    /// File name of the paper this outcome refers to.
    pub fn name(&self) -> &str {
        match self {
            Self::Success { name, .. } | Self::Skipped { name } | Self::Failed { name, .. } => name,
        }
    }
}

/// Runs papers through extraction, chunking, analysis, and saving.
pub struct Pipeline {
    source: Arc<dyn PaperSource>,
    preprocessor: TextPreprocessor,
    analyzer: PaperAnalyzer,
    settings: PipelineSettings,
}

impl Pipeline {
    /// Assemble a pipeline from its parts.
    pub fn new(
        source: Arc<dyn PaperSource>,
        preprocessor: TextPreprocessor,
        analyzer: PaperAnalyzer,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            preprocessor,
            analyzer,
            settings,
        }
    }

    /// Pipeline reading PDFs with [`PdfExtractor`] and analyzing with the configured provider.
    pub fn from_config(config: &Config) -> Result<Self, CompletionError> {
        Ok(Self::new(
            Arc::new(PdfExtractor::new()),
            TextPreprocessor::new(config.preprocess_settings()),
            PaperAnalyzer::from_config(config)?,
            config.pipeline_settings(),
        ))
    }

    /// Batch parameters in use.
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Process the paper at `path` and save its results.
    pub async fn process_paper(&self, path: &Path) -> Result<ProcessedPaper, PipelineError> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        tracing::info!(paper = %name, "Processing paper");

        let source = Arc::clone(&self.source);
        let owned_path = path.to_path_buf();
        let extracted = tokio::task::spawn_blocking(move || source.extract(&owned_path)).await??;
        tracing::debug!(
            paper = %name,
            chars = extracted.text.chars().count(),
            metadata = ?extracted.metadata,
            "Text extracted"
        );

        let text = self.preprocessor.clean(&extracted.text);
        let chunks = self.preprocessor.split_into_chunks(&text)?;
        tracing::debug!(paper = %name, chunks = chunks.len(), "Text chunked");

        let prepared = PreparedPaper {
            name: name.clone(),
            metadata: extracted.metadata,
            text,
            chunks,
        };
        let analysis = self.analyzer.analyze(&prepared).await?;

        let json_path = save_paper_analysis(&analysis, &name, &self.settings.output_dir)?;
        let report_path = if self.settings.write_text_reports {
            Some(save_human_report(&analysis, &name, &self.settings.output_dir)?)
        } else {
            None
        };

        tracing::info!(paper = %name, path = %json_path.display(), "Paper processed");
        Ok(ProcessedPaper {
            name,
            json_path,
            report_path,
            analysis,
        })
    }

    /// Process every PDF in the input directory, one at a time.
    ///
    /// A failing paper is logged and recorded as [`PaperOutcome::Failed`]; the batch continues.
    pub async fn process_all(&self) -> Vec<PaperOutcome> {
        let papers = discover_papers(&self.settings.input_dir);
        if papers.is_empty() {
            tracing::warn!(dir = %self.settings.input_dir.display(), "No PDF papers to process");
            return Vec::new();
        }
        tracing::info!(count = papers.len(), "Starting batch");

        let mut outcomes = Vec::with_capacity(papers.len());
        let mut attempted = false;
        for path in papers {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            if self.settings.skip_processed && is_processed(&path, &self.settings.output_dir) {
                tracing::info!(paper = %name, "Skipping paper (already processed)");
                outcomes.push(PaperOutcome::Skipped { name });
                continue;
            }

            if attempted && !self.settings.paper_delay.is_zero() {
                tokio::time::sleep(self.settings.paper_delay).await;
            }
            attempted = true;

            match self.process_paper(&path).await {
                Ok(processed) => outcomes.push(PaperOutcome::Success {
                    name: processed.name,
                    json_path: processed.json_path,
                    report_path: processed.report_path,
                }),
                Err(error) => {
                    tracing::error!(paper = %name, error = %error, "Paper failed");
                    outcomes.push(PaperOutcome::Failed {
                        name,
                        error: error.to_string(),
                    });
                }
            }
        }

        tracing::info!(results = outcomes.len(), "Batch complete");
        outcomes
    }
}

/// Totals over a batch, printable as a plain-text report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingSummary {
    /// Names of papers processed successfully.
    pub succeeded: Vec<String>,
    /// Names of papers skipped because a result existed.
    pub skipped: Vec<String>,
    /// Failed papers with their error.
    pub failed: Vec<(String, String)>,
}

impl ProcessingSummary {
    /// Tally `outcomes`.
    pub fn from_outcomes(outcomes: &[PaperOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match outcome {
                PaperOutcome::Success { name, .. } => summary.succeeded.push(name.clone()),
                PaperOutcome::Skipped { name } => summary.skipped.push(name.clone()),
                PaperOutcome::Failed { name, error } => {
                    summary.failed.push((name.clone(), error.clone()))
                }
            }
        }
        summary
    }

    /// Papers that were attempted (successes and failures).
    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// True when no paper failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for ProcessingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.processed() == 0 && self.skipped.is_empty() {
            return writeln!(f, "No files were processed.");
        }
        writeln!(f, "Processing complete.")?;
        writeln!(f, "Total processed: {}", self.processed())?;
        writeln!(f, "Succeeded: {}", self.succeeded.len())?;
        writeln!(f, "Failed: {}", self.failed.len())?;
        writeln!(f, "Skipped: {}", self.skipped.len())?;
        if !self.succeeded.is_empty() {
            writeln!(f, "\nPapers processed successfully:")?;
            for name in &self.succeeded {
                writeln!(f, "- {name}")?;
            }
        }
        if !self.failed.is_empty() {
            writeln!(f, "\nPapers with errors:")?;
            for (name, error) in &self.failed {
                writeln!(f, "- {name}: {error}")?;
            }
        }
        Ok(())
    }
}
