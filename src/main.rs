use clap::Parser;
use console::style;
use faq_chat::Result;
use faq_chat::commands::run_chat;
use faq_chat::config::{Config, Credentials, get_config_dir};

#[derive(Parser)]
#[command(name = "faq-chat")]
#[command(about = "Chat with a support assistant that answers from the FAQ index")]
#[command(version)]
struct Cli {}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let _cli = Cli::parse();

    if let Err(e) = run().await {
        eprintln!("{}", style(format!("Error: {}", e)).red().bold());
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = Config::load(get_config_dir()?)?;
    let credentials = Credentials::from_env(config.index.provider)?;
    run_chat(&config, &credentials).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing_without_arguments() {
        let cli = Cli::try_parse_from(["faq-chat"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn unexpected_argument() {
        let cli = Cli::try_parse_from(["faq-chat", "serve"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["faq-chat", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }

    #[test]
    fn version_flag() {
        let cli = Cli::try_parse_from(["faq-chat", "--version"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayVersion);
        }
    }
}
