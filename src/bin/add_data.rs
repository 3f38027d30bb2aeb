use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use rag_web::config::AppConfig;
use rag_web::indexer::{ingest, FieldNames, IngestProgress, ItemOutcome};
use rag_web::logger;
use rag_web::rag::connect_memory;
use rag_web::rag::store::StoreBackend;

#[derive(Parser, Debug)]
#[command(name = "add-data")]
#[command(about = "Embed a JSON array of documents into the RAG document store")]
struct Args {
    /// Path to the JSON file containing the data
    #[arg(short, long, default_value = "./data/text-sample.json")]
    file: PathBuf,

    /// The id field to identify the data
    #[arg(long, default_value = "id")]
    id_field: String,

    /// The text field to generate the embedding from
    #[arg(long, default_value = "content")]
    text_field: String,

    /// The description field for the data
    #[arg(long, default_value = "title")]
    description_field: String,

    /// Overrides the configured Qdrant URL
    #[arg(long, env = "QDRANT_URL")]
    qdrant_url: Option<String>,
}

struct BarProgress(ProgressBar);

impl IngestProgress for BarProgress {
    fn start(&self, total: usize) {
        self.0.set_length(total as u64);
    }

    fn item(&self, index: usize, total: usize, outcome: ItemOutcome) {
        let message = match outcome {
            ItemOutcome::Inserted => format!("Generating embeddings and saving new item: {index}/{total}"),
            ItemOutcome::Skipped => format!("Skipping item already exists: {index}/{total}"),
        };
        self.0.set_position(index as u64);
        self.0.set_message(message);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logger::init_tracing();

    let args = Args::parse();

    if !args.file.exists() {
        anyhow::bail!("File does not exist: {}", args.file.display());
    }

    let mut config = AppConfig::load()?;
    if let Some(url) = args.qdrant_url {
        config.store.url = url;
    }

    println!("Connecting to document store at {}...", config.store.url);
    let memory = connect_memory(&config).await?;
    if memory.backend() == StoreBackend::Volatile {
        println!("Warning: Qdrant is unreachable, data will only live for this run");
    }

    let collection = config.store.qualified_collection();
    let fields = FieldNames {
        id: args.id_field,
        text: args.text_field,
        description: args.description_field,
    };

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    let progress = BarProgress(pb);

    let report = ingest(&memory, &collection, &args.file, &fields, &progress).await?;
    progress.0.finish_with_message("done");

    println!("\nAdded the data successfully...");
    println!("  Records in file: {}", report.total);
    println!("  Inserted:        {}", report.inserted);
    println!("  Skipped:         {}", report.skipped);
    println!("  Collection:      {}", collection);
    println!("  Store:           {}", memory.backend());

    Ok(())
}
