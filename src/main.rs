use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use herald_relay::voice::{DeepgramBackend, GoogleSynthesizer};
use herald_relay::{ApiServer, Config};

/// Herald - streaming speech relay
#[derive(Parser)]
#[command(name = "herald", version, about)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "HERALD_PORT")]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,herald_relay=info",
        1 => "info,herald_relay=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load();
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    tracing::info!(
        port = config.server.port,
        model = %config.recognizer.model,
        language = %config.recognizer.language,
        "starting herald relay"
    );

    let recognizer = Arc::new(DeepgramBackend::new(
        config.api_keys.deepgram.clone().unwrap_or_default(),
    )?);
    let synthesizer = Arc::new(GoogleSynthesizer::new(
        config.api_keys.google.clone().unwrap_or_default(),
        config.voice.clone(),
    )?);

    let server = ApiServer::new(&config, recognizer, synthesizer);
    server.run().await?;

    Ok(())
}
