//! Command-line entrypoint: analyze one PDF or every PDF in the input directory.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use paperdigest::{
    config::{self, Config},
    logging,
    pipeline::{Pipeline, ProcessingSummary},
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "paperdigest",
    about = "Analyze arXiv papers and write JSON summaries",
    version
)]
struct Cli {
    /// Process a single PDF file.
    #[arg(long, value_name = "PATH")]
    pdf: Option<PathBuf>,
    /// Process every PDF in the input directory.
    #[arg(long)]
    process_all: bool,
    /// Reprocess papers that already have a result.
    #[arg(long)]
    force: bool,
    /// Override the input directory.
    #[arg(long, value_name = "DIR")]
    input_dir: Option<PathBuf>,
    /// Override the output directory.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.input_dir {
            config.input_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if self.force {
            config.skip_processed = false;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let env_file = config::load_env_file(None);
    logging::init_tracing(cli.verbose);
    if let Some(path) = env_file {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            tracing::error!("{error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    if cli.pdf.is_none() && !cli.process_all {
        tracing::info!("No action given; use --pdf or --process-all");
        Cli::command()
            .print_help()
            .context("failed to print help")?;
        return Ok(ExitCode::SUCCESS);
    }

    config::init_config().context("invalid configuration")?;
    let mut config = config::get_config().clone();
    cli.apply_overrides(&mut config);
    config::ensure_directories(&config).context("failed to prepare directories")?;

    let pipeline =
        Pipeline::from_config(&config).context("failed to initialize the analysis provider")?;

    if let Some(pdf) = &cli.pdf {
        if !pdf.is_file() {
            anyhow::bail!("file {} does not exist", pdf.display());
        }
        let processed = pipeline
            .process_paper(pdf)
            .await
            .with_context(|| format!("failed to process {}", pdf.display()))?;
        tracing::info!(
            paper = %processed.name,
            path = %processed.json_path.display(),
            "Result saved"
        );
        return Ok(ExitCode::SUCCESS);
    }

    let outcomes = pipeline.process_all().await;
    let summary = ProcessingSummary::from_outcomes(&outcomes);
    println!("{summary}");
    Ok(ExitCode::SUCCESS)
}
