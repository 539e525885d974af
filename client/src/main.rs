use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use tokio::sync::mpsc;
use url::Url;

use client::analysis::{AnalysisArtifact, AnalysisClient};
use client::config::{ApiConfig, DEFAULT_BACKEND_URL, SessionContext};
use client::feedback::FeedbackClient;
use client::images::RemoteImageFetcher;
use client::progress::ProgressSimulator;
use client::report::{ReportAssembler, render_pdf};
use shared::Confidence;

#[derive(Parser)]
#[command(
    name = "dfa",
    about = "Submit a video or image for deepfake analysis and export a PDF report"
)]
struct Cli {
    /// Media file to analyze
    file: PathBuf,

    /// Backend base URL
    #[arg(long, env = "DFA_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    backend_url: String,

    /// Bearer token attached to the submission when present
    #[arg(long, env = "DFA_AUTH_TOKEN")]
    auth_token: Option<String>,

    /// User id used by the feedback side-channel
    #[arg(long, env = "DFA_USER_ID")]
    user_id: Option<String>,

    /// The media contains on-screen text (analysis may take longer)
    #[arg(long)]
    has_text: bool,

    /// Where to write the PDF report; defaults to the deterministic
    /// Deepfake_Report_{content_hash}.pdf in the working directory
    #[arg(long)]
    report: Option<PathBuf>,

    /// Skip report generation
    #[arg(long)]
    no_report: bool,

    /// Logo embedded at the top of the report, fetched best-effort
    #[arg(long, env = "DFA_LOGO_URL")]
    logo_url: Option<String>,

    /// Record feedback for the completed analysis
    #[arg(long, value_parser = ["liked", "disliked"])]
    feedback: Option<String>,

    /// Storage service base URL for the feedback side-channel
    #[arg(long, env = "DFA_STORAGE_URL")]
    storage_url: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            log::error!("{message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let config =
        ApiConfig::new(&cli.backend_url).map_err(|err| format!("Invalid backend URL: {err}"))?;
    let session = SessionContext {
        bearer_token: cli.auth_token.clone(),
        user_id: cli.user_id.clone(),
    };

    let bytes = std::fs::read(&cli.file)
        .map_err(|err| format!("Cannot read {}: {err}", cli.file.display()))?;
    let file_name = cli
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.dat".to_string());
    let artifact = AnalysisArtifact::new(bytes, file_name, cli.has_text);
    info!(
        "Submitting {} as {} ({})",
        cli.file.display(),
        artifact.content_hash,
        artifact.kind
    );

    // Staged progress display while the request is outstanding. The bar is
    // purely cosmetic and is cancelled the moment the real request resolves.
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let simulator = ProgressSimulator::spawn(progress_tx);
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg:24} [{bar:40}] {pos}%")
            .map_err(|err| err.to_string())?
            .progress_chars("=> "),
    );
    let bar_handle = bar.clone();
    let bar_task = tokio::spawn(async move {
        while let Some(state) = progress_rx.recv().await {
            bar_handle.set_position(state.percent as u64);
            bar_handle.set_message(state.stage_label());
        }
        bar_handle.finish_and_clear();
    });

    let outcome = AnalysisClient::new(config.clone())
        .submit(artifact, &session)
        .await;
    simulator.cancel();
    let _ = bar_task.await;

    let result = outcome.map_err(|err| err.user_message(&config))?;

    println!("Prediction:  {} ({})", result.prediction, result.verdict());
    match result.confidence {
        Confidence::NoFace => println!("Confidence:  no face detected"),
        Confidence::Unknown => println!("Confidence:  not reported"),
        Confidence::Score(score) => println!("Confidence:  {:.1}%", score * 100.0),
    }
    println!(
        "Analyzed {} frame(s) in {:.2}s",
        result.total_frames, result.inference_time_seconds
    );
    for (label, value) in [
        ("Real score", result.avg_real_confidence),
        ("DF (from original) score", result.avg_deepfake_og_confidence),
        ("DF (latest) score", result.avg_deepfake_confidence),
    ] {
        if let Some(value) = value {
            println!("{label}:  {value:.3}");
        }
    }

    if !cli.no_report {
        let mut assembler = ReportAssembler::new(RemoteImageFetcher::new());
        if let Some(url) = &cli.logo_url {
            assembler = assembler.with_logo_url(url);
        }
        let document = assembler.assemble(&result).await;
        let pdf = render_pdf(&document)
            .map_err(|err| format!("Failed to generate report, try again: {err}"))?;
        let path = cli
            .report
            .unwrap_or_else(|| PathBuf::from(&document.file_name));
        std::fs::write(&path, pdf)
            .map_err(|err| format!("Cannot write report to {}: {err}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    if let Some(feedback) = cli.feedback {
        match cli.storage_url.as_deref().map(Url::parse) {
            Some(Ok(storage_url)) => {
                // Fire and forget: feedback failures never affect the run.
                let client = FeedbackClient::new(storage_url);
                if let Err(err) = client
                    .record(&session, &result.content_hash, feedback == "liked")
                    .await
                {
                    warn!("Feedback not recorded: {err}");
                }
            }
            Some(Err(err)) => warn!("Invalid storage URL, feedback skipped: {err}"),
            None => warn!("No storage URL configured, feedback skipped"),
        }
    }

    Ok(())
}
