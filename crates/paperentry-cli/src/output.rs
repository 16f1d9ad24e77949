use std::io::Write;

use owo_colors::OwoColorize;
use paperentry_core::{ItemStatus, PaperEntry, PaperMetadata, Phase, SessionSnapshot};
use serde::Serialize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// A user-visible change between two consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressLine {
    Analyzing,
    Found(usize),
    Extracting {
        position: usize,
        total: usize,
        title: String,
    },
    Done {
        position: usize,
        total: usize,
    },
    Failed {
        position: usize,
        total: usize,
        message: String,
    },
    AnalysisFailed(String),
}

/// Compare `next` against the previously seen snapshot and list what changed.
///
/// Snapshots from a different generation are diffed against an empty session.
pub fn describe_changes(
    prev: Option<&SessionSnapshot>,
    next: &SessionSnapshot,
) -> Vec<ProgressLine> {
    let prev = prev.filter(|p| p.generation == next.generation);
    let prev_phase = prev.map(|p| p.phase).unwrap_or(Phase::Idle);
    let mut lines = Vec::new();

    if next.phase != prev_phase {
        match next.phase {
            Phase::Analyzing => lines.push(ProgressLine::Analyzing),
            Phase::Processing if prev_phase == Phase::Analyzing => {
                lines.push(ProgressLine::Found(next.results.len()))
            }
            Phase::Failed => lines.push(ProgressLine::AnalysisFailed(
                next.error.clone().unwrap_or_default(),
            )),
            _ => {}
        }
    }

    let total = next.results.len();
    for (position, item) in next.results.iter().enumerate() {
        let before = prev
            .and_then(|p| p.results.get(position))
            .map(|r| &r.status);
        if before == Some(&item.status) {
            continue;
        }
        match &item.status {
            ItemStatus::Pending => {}
            ItemStatus::Processing => lines.push(ProgressLine::Extracting {
                position,
                total,
                title: item.metadata.title.clone(),
            }),
            ItemStatus::Success { .. } => lines.push(ProgressLine::Done { position, total }),
            ItemStatus::Error { message } => lines.push(ProgressLine::Failed {
                position,
                total,
                message: message.clone(),
            }),
        }
    }

    lines
}

/// Print a single progress line.
pub fn print_progress(
    w: &mut dyn Write,
    line: &ProgressLine,
    color: ColorMode,
) -> std::io::Result<()> {
    match line {
        ProgressLine::Analyzing => writeln!(w, "Analyzing PDF structure...")?,
        ProgressLine::Found(count) => {
            writeln!(w, "Found {} papers to extract", count)?;
            writeln!(w)?;
        }
        ProgressLine::Extracting {
            position,
            total,
            title,
        } => {
            writeln!(
                w,
                "[{}/{}] Extracting: \"{}\"",
                position + 1,
                total,
                shorten(title, 60)
            )?;
        }
        ProgressLine::Done { position, total } => {
            if color.enabled() {
                writeln!(w, "[{}/{}] -> {}", position + 1, total, "OK".green())?;
            } else {
                writeln!(w, "[{}/{}] -> OK", position + 1, total)?;
            }
        }
        ProgressLine::Failed {
            position,
            total,
            message,
        } => {
            if color.enabled() {
                writeln!(w, "[{}/{}] -> {} ({})", position + 1, total, "ERROR".red(), message)?;
            } else {
                writeln!(w, "[{}/{}] -> ERROR ({})", position + 1, total, message)?;
            }
        }
        ProgressLine::AnalysisFailed(message) => {
            if color.enabled() {
                writeln!(w, "{} {}", "FAILED:".red().bold(), message)?;
            } else {
                writeln!(w, "FAILED: {}", message)?;
            }
        }
    }
    Ok(())
}

fn shorten(title: &str, max_chars: usize) -> String {
    if title.chars().count() > max_chars {
        let cut: String = title.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        title.to_string()
    }
}

/// Write every successful block, separated by blank lines.
///
/// The output is meant to be pasted into a LaTeX document, so it is never colored.
pub fn print_blocks(w: &mut dyn Write, snapshot: &SessionSnapshot) -> std::io::Result<()> {
    let mut first = true;
    for result in &snapshot.results {
        if let Some(block) = result.content() {
            if !first {
                writeln!(w)?;
            }
            writeln!(w, "% {}. {}", result.metadata.index, result.metadata.title)?;
            writeln!(w, "{}", block)?;
            first = false;
        }
    }
    Ok(())
}

/// Print the end-of-run summary, listing papers that could not be converted.
pub fn print_summary(
    w: &mut dyn Write,
    snapshot: &SessionSnapshot,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{}", "═".repeat(60).dimmed())?;
        writeln!(w, "{}", "SUMMARY".bold())?;
        writeln!(w, "{}", "═".repeat(60).dimmed())?;
    } else {
        writeln!(w, "{}", "=".repeat(60))?;
        writeln!(w, "SUMMARY")?;
        writeln!(w, "{}", "=".repeat(60))?;
    }

    writeln!(w, "  Papers found: {}", snapshot.results.len())?;
    if color.enabled() {
        writeln!(w, "  {} {}", "Converted:".green(), snapshot.success_count())?;
        writeln!(w, "  {} {}", "Failed:".red(), snapshot.error_count())?;
    } else {
        writeln!(w, "  Converted: {}", snapshot.success_count())?;
        writeln!(w, "  Failed: {}", snapshot.error_count())?;
    }

    for result in &snapshot.results {
        if let Some(message) = result.error_message() {
            writeln!(
                w,
                "    {}. {}: {}",
                result.metadata.index,
                shorten(&result.metadata.title, 50),
                message
            )?;
        }
    }
    Ok(())
}

/// `--json` output: one entry per paper, with the block split into fields
/// when it parses.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub phase: Phase,
    pub papers: Vec<JsonPaper<'a>>,
}

#[derive(Debug, Serialize)]
pub struct JsonPaper<'a> {
    pub index: u32,
    pub title: &'a str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<JsonFields>,
}

#[derive(Debug, Serialize)]
pub struct JsonFields {
    pub title: String,
    pub authors: Vec<String>,
    pub affiliations: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub keywords: Vec<String>,
}

impl From<PaperEntry> for JsonFields {
    fn from(entry: PaperEntry) -> Self {
        let owned = |items: Vec<&str>| items.into_iter().map(String::from).collect();
        Self {
            authors: owned(entry.author_list()),
            affiliations: owned(entry.affiliation_list()),
            keywords: owned(entry.keyword_list()),
            title: entry.title,
            abstract_text: entry.abstract_text,
        }
    }
}

pub fn json_report(snapshot: &SessionSnapshot) -> JsonReport<'_> {
    let papers = snapshot
        .results
        .iter()
        .map(|result| {
            let fields = result.content().and_then(|block| match PaperEntry::parse(block) {
                Ok(entry) => Some(JsonFields::from(entry)),
                Err(e) => {
                    tracing::warn!(
                        index = result.metadata.index,
                        error = %e,
                        "block did not parse"
                    );
                    None
                }
            });
            JsonPaper {
                index: result.metadata.index,
                title: &result.metadata.title,
                status: result.status.label(),
                content: result.content(),
                message: result.error_message(),
                fields,
            }
        })
        .collect();
    JsonReport {
        phase: snapshot.phase,
        papers,
    }
}

/// Print the paper list produced by analysis alone.
pub fn print_paper_list(
    w: &mut dyn Write,
    file_name: &str,
    papers: &[PaperMetadata],
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} ({} papers)\n", file_name.bold(), papers.len())?;
    } else {
        writeln!(w, "{} ({} papers)\n", file_name, papers.len())?;
    }
    for paper in papers {
        if color.enabled() {
            writeln!(w, "{} {}", format!("[{}]", paper.index).bold().yellow(), paper.title)?;
        } else {
            writeln!(w, "[{}] {}", paper.index, paper.title)?;
        }
    }
    Ok(())
}
