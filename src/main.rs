use anyhow::Result;
use clap::{Parser, Subcommand};
use imagegen_relay::client::{ClientConfig, FileSaver, ImageGenerator, TerminalPresenter};
use imagegen_relay::models::{Config, DEFAULT_MODEL};
use imagegen_relay::proxy;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "imagegen-relay")]
#[command(about = "Relay text prompts to a hosted image-generation model")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the proxy server.
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Overrides PORT from the environment.
        #[arg(long)]
        port: Option<u16>,

        /// Overrides STATIC_DIR from the environment.
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
    /// Generate one image and save it locally.
    Generate {
        #[arg(long)]
        prompt: String,

        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,

        /// Relay origin to send the request through.
        #[arg(
            long,
            env = "IMAGEGEN_PROXY_URL",
            default_value = "http://localhost:3000",
            conflicts_with = "direct"
        )]
        proxy_url: String,

        /// Call the provider directly with credentials from the environment.
        #[arg(long)]
        direct: bool,

        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imagegen_relay=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    if let Err(e) = run(args.command).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Serve {
            host,
            port,
            static_dir,
        } => {
            let mut config = Config::from_env()?;
            if let Some(port) = port {
                config.port = port;
            }
            let static_dir = static_dir.unwrap_or_else(|| config.static_dir.clone());

            info!("Starting imagegen-relay proxy");
            proxy::serve(&config, &host, Some(&static_dir)).await?;
        }
        Command::Generate {
            prompt,
            model,
            proxy_url,
            direct,
            out_dir,
        } => {
            let client_config = if direct {
                ClientConfig::direct(&Config::from_env()?)?
            } else {
                ClientConfig::proxy(&proxy_url)
            };

            let generator = ImageGenerator::new(
                client_config,
                Arc::new(TerminalPresenter),
                Arc::new(FileSaver::new(&out_dir)?),
            )?;

            generator.submit(&prompt, &model).await?;
            if let Some(filename) = generator.download()? {
                info!("Wrote {}", out_dir.join(filename).display());
            }
        }
    }
    Ok(())
}
