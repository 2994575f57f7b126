#![forbid(unsafe_code)]

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use rankcentral::criteria;
use rankcentral::evaluator::{Evaluator, GatewayEvaluator};
use rankcentral::gateway::usage::TracingUsageSink;
use rankcentral::gateway::ProviderGateway;
use rankcentral::rank::{
    build_report, load_request, load_rubric, render_report_markdown, JsonlTraceSink, RankConfig,
    RankingEngine, RankingOutcome, TraceSink,
};
use rankcentral::Attribution;

#[derive(Parser)]
#[command(name = "rankcentral", version, about = "Pairwise LLM document ranking")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank the documents in a request JSON file (LLM calls)
    Rank {
        #[arg(long)]
        request: PathBuf,
        #[arg(long)]
        out: PathBuf,
        /// Rubric JSON; overrides the request's criteria
        #[arg(long)]
        rubric: Option<PathBuf>,
        /// Write one JSON line per judged pair
        #[arg(long)]
        trace: Option<PathBuf>,
        /// Write a markdown report
        #[arg(long)]
        report: Option<PathBuf>,
        #[arg(long)]
        model: Option<String>,
        /// Judge every criterion with the custom-instructions template
        #[arg(long)]
        custom_prompt: bool,
        /// Sort merge halves concurrently
        #[arg(long)]
        parallel: bool,
    },
    /// Print a rubric after repair and weight normalization
    Normalize {
        #[arg(long)]
        rubric: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Rank {
            request,
            out,
            rubric,
            trace,
            report,
            model,
            custom_prompt,
            parallel,
        } => {
            let req = load_request(&request)?;
            let rubric = match rubric {
                Some(path) => load_rubric(&path)?,
                None if req.criteria.is_empty() => criteria::default_criteria(),
                None => req.criteria.clone(),
            };

            let mut config = RankConfig::from_env();
            if let Some(model) = model {
                config.model = model;
            }
            config.custom_prompt_mode |= custom_prompt;
            config.parallel_merge |= parallel;

            let gateway = ProviderGateway::from_env(Arc::new(TracingUsageSink))?;
            let evaluator: Arc<dyn Evaluator> = Arc::new(
                GatewayEvaluator::new(gateway, config.model.clone())
                    .with_attribution(Attribution::new("rankcentral::rank")),
            );

            let mut engine = RankingEngine::new(evaluator, &rubric, config);
            let trace_writer = if let Some(path) = trace {
                let (sink, writer) = JsonlTraceSink::create(path)?;
                engine = engine.with_trace(Arc::new(sink) as Arc<dyn TraceSink>);
                Some(writer)
            } else {
                None
            };

            let outcome = engine.rank(&req.documents).await;
            let written = write_outputs(&out, report.as_deref(), &outcome);

            // The trace file is flushed even when the outputs failed.
            drop(engine);
            if let Some(writer) = trace_writer {
                writer.finish()?;
            }
            written?;
        }
        Commands::Normalize { rubric } => {
            let normalized = criteria::normalize(&load_rubric(&rubric)?);
            let json = serde_json::to_string_pretty(&normalized)?;
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }

    Ok(())
}

fn write_outputs(out: &Path, report: Option<&Path>, outcome: &RankingOutcome) -> io::Result<()> {
    write_json(out, outcome)?;
    if let Some(path) = report {
        std::fs::write(path, render_report_markdown(&build_report(outcome)))?;
    }
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), io::Error> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    std::fs::write(path, json)
}
