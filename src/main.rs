use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use console::style;
use pdf_rag::config::{Config, get_config_dir};
use pdf_rag::pipeline::RagPipeline;
use pdf_rag::{RagError, Result};

#[derive(Parser)]
#[command(name = "pdf-rag")]
#[command(about = "Answer questions from a directory of PDFs using retrieval-augmented generation")]
#[command(version)]
struct Cli {
    /// Directory containing config.toml
    #[arg(long)]
    config_dir: Option<PathBuf>,
    /// Override the directory scanned for PDF files
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Override the directory holding the vector index
    #[arg(long)]
    persist_dir: Option<PathBuf>,
    /// Number of chunks to retrieve
    #[arg(short, long)]
    k: Option<usize>,
    /// Also print the source PDF and page of every retrieved chunk
    #[arg(long)]
    sources: bool,
    /// Print the answer and its sources as JSON
    #[arg(long, conflicts_with = "sources")]
    json: bool,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let config_dir = match &self.config_dir {
            Some(dir) => dir.clone(),
            None => get_config_dir().map_err(|e| RagError::Config(e.to_string()))?,
        };

        let mut config = Config::load(&config_dir)?;
        if let Some(data_dir) = &self.data_dir {
            config.paths.data_dir.clone_from(data_dir);
        }
        if let Some(persist_dir) = &self.persist_dir {
            config.paths.vectorstore_dir.clone_from(persist_dir);
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;
    let pipeline = RagPipeline::new(&config)?;

    eprintln!("{}", style("Enter your query here:").bold());
    let mut question = String::new();
    io::stdin().lock().read_line(&mut question)?;
    let question = question.trim_end_matches(['\r', '\n']);

    let mut stdout = io::stdout().lock();
    if cli.json {
        let result = pipeline.query_with_sources(question, cli.k)?;
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| RagError::Other(anyhow::anyhow!("Failed to serialize answer: {}", e)))?;
        writeln!(stdout, "{json}")?;
    } else if cli.sources {
        let result = pipeline.query_with_sources(question, cli.k)?;
        writeln!(stdout, "\nAnswer:\n")?;
        writeln!(stdout, "{}", result.answer)?;
        writeln!(stdout, "\n{}", style("Sources:").bold())?;
        for source in &result.sources {
            writeln!(
                stdout,
                "  {} (page {})",
                style(&source.source).cyan(),
                source.page
            )?;
        }
    } else {
        let answer = pipeline.query(question, cli.k)?;
        writeln!(stdout, "\nAnswer:\n")?;
        writeln!(stdout, "{answer}")?;
    }

    Ok(())
}
