use clap::Parser;
use faq_chat::Result;
use faq_chat::commands::ingest_faq;
use faq_chat::config::{Config, Credentials, get_config_dir};
use tracing::error;

#[derive(Parser)]
#[command(name = "ingest")]
#[command(about = "Embed the FAQ dataset and upsert it into the vector index")]
#[command(version)]
struct Cli {}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let _cli = Cli::parse();

    // Failures are reported on stdout and still exit 0
    match run().await {
        Ok((written, index_name)) => {
            println!("Successfully upserted {} vectors into {}.", written, index_name);
        }
        Err(e) => {
            error!("Ingestion failed: {:?}", e);
            println!("An error occurred: {}", e);
        }
    }
}

async fn run() -> Result<(usize, String)> {
    let config = Config::load(get_config_dir()?)?;
    let credentials = Credentials::from_env(config.index.provider)?;
    let written = ingest_faq(&config, &credentials).await?;
    Ok((written, config.index.name))
}
