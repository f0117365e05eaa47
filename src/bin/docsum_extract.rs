use std::{fs, io::Write, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use docsum::{
    extract::{self, Extracted},
    logging, prompt,
};

#[derive(Parser)]
#[command(
    name = "docsum-extract",
    about = "Run the document extractor on a local file and print what the model would see"
)]
struct Cli {
    /// File to extract (.pdf, .csv, .xlsx, .html).
    path: PathBuf,
    /// Print a short description and the leading content instead of the full prompt text.
    #[arg(long)]
    preview: bool,
    /// Apply the prompt character limit used by the server.
    #[arg(long)]
    max_chars: Option<usize>,
    /// Log extractor diagnostics to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_cli_tracing(cli.verbose);

    let bytes = fs::read(&cli.path)
        .with_context(|| format!("failed to read {}", cli.path.display()))?;
    let filename = cli
        .path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let (format, content) = extract::extract_file(filename, &bytes)
        .with_context(|| format!("failed to extract {}", cli.path.display()))?;
    tracing::debug!(%format, bytes = bytes.len(), chars = content.char_count(), "Extracted file");

    let text = content.to_prompt_text();
    let text = match cli.max_chars {
        Some(limit) => prompt::truncate_content(&text, limit).into_owned(),
        None => text,
    };

    let mut stdout = std::io::stdout().lock();
    if cli.preview {
        writeln!(stdout, "{}", describe(format.label(), &content))?;
        let leading: String = text.chars().take(500).collect();
        writeln!(stdout, "\n{leading}")?;
    } else {
        stdout.write_all(text.as_bytes())?;
        if !text.ends_with('\n') {
            writeln!(stdout)?;
        }
    }
    Ok(())
}

fn describe(label: &str, content: &Extracted) -> String {
    match content {
        Extracted::Text { pages: Some(pages), .. } => {
            format!("{label}: {} characters across {pages} pages", content.char_count())
        }
        Extracted::Text { pages: None, .. } => {
            format!("{label}: {} characters", content.char_count())
        }
        Extracted::Table { sheets } => {
            let rows: usize = sheets.iter().map(|sheet| sheet.rows.len()).sum();
            format!("{label}: {} sheet(s), {rows} rows", sheets.len())
        }
    }
}
