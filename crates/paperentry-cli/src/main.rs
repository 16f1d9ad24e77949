use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use paperentry_core::{Config, DocumentPayload, PDF_MIME_TYPE, Phase, Session, SessionSnapshot};

mod output;

use output::ColorMode;

/// Paper Entry Converter - Turn a PDF of papers into \paperentrynum LaTeX blocks
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert every paper in a PDF into a \paperentrynum block
    Convert {
        /// Path to the PDF to convert
        file_path: PathBuf,

        /// Write blocks to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Gemini model name
        #[arg(long)]
        model: Option<String>,

        /// Gemini API key
        #[arg(long)]
        api_key: Option<String>,

        /// Emit per-paper results, with parsed fields, as JSON instead of LaTeX
        #[arg(long)]
        json: bool,
    },

    /// List the papers found in a PDF without extracting them
    Analyze {
        /// Path to the PDF to analyze
        file_path: PathBuf,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Gemini model name
        #[arg(long)]
        model: Option<String>,

        /// Gemini API key
        #[arg(long)]
        api_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Convert {
            file_path,
            output,
            no_color,
            model,
            api_key,
            json,
        } => {
            let config = resolve_config(model, api_key);
            convert(config, file_path, output, no_color, json).await
        }
        Command::Analyze {
            file_path,
            no_color,
            model,
            api_key,
        } => {
            let config = resolve_config(model, api_key);
            analyze(config, file_path, no_color).await
        }
    }
}

/// CLI flags > env vars > config files > defaults.
fn resolve_config(model: Option<String>, api_key: Option<String>) -> Config {
    let mut config = Config::resolve();
    if let Some(model) = model {
        config.model = model;
    }
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        config.api_key = Some(key);
    }
    tracing::debug!(?config, "resolved configuration");
    config
}

/// Read and validate the PDF at `path`.
fn load_document(path: &Path, config: &Config) -> anyhow::Result<DocumentPayload> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    let bytes = std::fs::read(path)?;
    if !bytes.starts_with(b"%PDF-") {
        anyhow::bail!(
            "{} doesn't appear to be a PDF. Please provide a PDF file.",
            path.display()
        );
    }
    let document = DocumentPayload::from_bytes(&bytes, PDF_MIME_TYPE)
        .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
    document
        .validate(config.max_document_bytes())
        .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
    Ok(document)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

async fn convert(
    config: Config,
    file_path: PathBuf,
    output: Option<PathBuf>,
    no_color: bool,
    json: bool,
) -> anyhow::Result<()> {
    // Progress and summary go to stderr so stdout stays pipeable.
    let color = ColorMode(!no_color && std::io::stderr().is_terminal());

    let document = Arc::new(load_document(&file_path, &config)?);
    let capability = config.build_capability()?;

    eprintln!("Converting {}...", display_name(&file_path));

    let progress_writer: Arc<Mutex<Box<dyn Write + Send>>> =
        Arc::new(Mutex::new(Box::new(std::io::stderr())));
    let last_seen: Arc<Mutex<Option<SessionSnapshot>>> = Arc::new(Mutex::new(None));

    let progress_cb = {
        let pw = Arc::clone(&progress_writer);
        let last_seen = Arc::clone(&last_seen);
        move |snapshot: SessionSnapshot| {
            let Ok(mut last) = last_seen.lock() else {
                return;
            };
            let lines = output::describe_changes(last.as_ref(), &snapshot);
            *last = Some(snapshot);
            if let Ok(mut w) = pw.lock() {
                for line in &lines {
                    let _ = output::print_progress(&mut *w, line, color);
                }
                let _ = w.flush();
            }
        }
    };

    let session = Arc::new(Session::new());
    let snapshot = tokio::select! {
        snapshot = paperentry_core::run_session(
            &session,
            capability.as_ref(),
            document,
            config.max_papers,
            progress_cb,
        ) => snapshot,
        _ = tokio::signal::ctrl_c() => {
            session.reset();
            anyhow::bail!("Interrupted");
        }
    };

    write_results(&snapshot, output.as_deref(), json)?;

    let mut stderr = std::io::stderr();
    output::print_summary(&mut stderr, &snapshot, color)?;

    if let Some(path) = output {
        eprintln!("Wrote {} blocks to {}", snapshot.success_count(), path.display());
    }

    Ok(())
}

/// Write the blocks (or the JSON report) of a completed run.
///
/// A failed run is an error and the output file is not touched, so an
/// earlier result at that path survives.
fn write_results(
    snapshot: &SessionSnapshot,
    output: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    if snapshot.phase == Phase::Failed {
        anyhow::bail!(
            "{}",
            snapshot
                .error
                .as_deref()
                .unwrap_or("Something went wrong during conversion.")
        );
    }

    let mut writer: Box<dyn Write> = if let Some(output_path) = output {
        Box::new(std::fs::File::create(output_path)?)
    } else {
        Box::new(std::io::stdout())
    };

    if json {
        serde_json::to_writer_pretty(&mut writer, &output::json_report(snapshot))?;
        writeln!(writer)?;
    } else {
        output::print_blocks(&mut *writer, snapshot)?;
    }
    writer.flush()?;
    Ok(())
}

async fn analyze(config: Config, file_path: PathBuf, no_color: bool) -> anyhow::Result<()> {
    let color = ColorMode(!no_color && std::io::stdout().is_terminal());

    let document = load_document(&file_path, &config)?;
    let capability = config.build_capability()?;

    let papers =
        paperentry_core::analyze_document(capability.as_ref(), &document, config.max_papers)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e.user_message()))?;

    let mut stdout = std::io::stdout();
    output::print_paper_list(&mut stdout, &display_name(&file_path), &papers, color)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperentry_core::{ItemStatus, PaperMetadata, PaperResult};

    fn finished() -> SessionSnapshot {
        let mut result = PaperResult::pending(PaperMetadata {
            index: 1,
            title: "A".into(),
        });
        result.status = ItemStatus::Success {
            content: r"\paperentrynum{A}{B}{C}{D}{E}".into(),
        };
        SessionSnapshot {
            generation: 1,
            phase: Phase::Finished,
            results: vec![result],
            error: None,
        }
    }

    #[test]
    fn failed_run_leaves_existing_output_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tex");
        std::fs::write(&path, "previous result\n").unwrap();

        let failed = SessionSnapshot {
            generation: 2,
            phase: Phase::Failed,
            results: Vec::new(),
            error: Some(
                "Failed to analyze PDF structure. Could not identify papers in the PDF.".into(),
            ),
        };
        let err = write_results(&failed, Some(&path), false).unwrap_err();
        assert!(err.to_string().contains("Could not identify papers"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous result\n");
    }

    #[test]
    fn finished_run_replaces_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tex");
        std::fs::write(&path, "previous result\n").unwrap();

        write_results(&finished(), Some(&path), false).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "% 1. A\n\\paperentrynum{A}{B}{C}{D}{E}\n");
    }
}
