mod snapshot;

use base64::Engine;
use capsolv_client::settings::SettingsStore;
use capsolv_client::transport::{DEFAULT_SERVICE_URL, HttpTransport};
use capsolv_client::{CaptchaRelay, SolvingClient};
use capsolv_common::protocol::PageSnapshot;
use capsolv_common::relay::ChallengePayload;
use capsolv_engine::detector::ChallengeDetector;
use capsolv_engine::page_handle;
use capsolv_engine::resolver::ChallengeResolver;
use clap::{Parser, Subcommand};
use snapshot::SnapshotBackend;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

#[derive(Parser)]
#[command(name = "capsolv", version, about = "Image CAPTCHA detection and solving pipeline")]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Settings file (defaults to ./capsolv.yaml, then ~/.capsolv/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Mode {
    /// Detect and solve challenges in a page snapshot JSON file
    Page {
        snapshot: PathBuf,

        /// Enable solving for this run regardless of the settings file
        #[arg(long)]
        enable: bool,
    },
    /// Submit a single image file and print the solution
    Image { file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log to stderr so stdout stays clean for results
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => SettingsStore::load_from(path).await?,
        None => SettingsStore::load_default().await?,
    };
    let base_url = settings
        .current()
        .service_url
        .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string());
    let client = SolvingClient::new(HttpTransport::with_base_url(base_url), settings.clone());

    match args.mode {
        Mode::Image { file } => {
            let bytes = tokio::fs::read(&file).await?;
            let body = base64::engine::general_purpose::STANDARD.encode(&bytes);
            let solution = client.solve(&ChallengePayload::base64(body)).await?;
            println!("{solution}");
        }
        Mode::Page { snapshot, enable } => {
            if enable {
                settings.set_enabled(true);
            } else if !settings.current().enabled {
                warn!("solving is disabled in settings; requests will be refused");
            }

            let content = tokio::fs::read_to_string(&snapshot).await?;
            let page: PageSnapshot = serde_json::from_str(&content)?;
            let page = page_handle(page);

            let backend = Arc::new(SnapshotBackend::new(page.clone()));
            let relay = Arc::new(CaptchaRelay::new(client, settings.clone()));
            let resolver = Arc::new(ChallengeResolver::new(page.clone(), backend, relay));
            let mut detector = ChallengeDetector::new(page.clone(), resolver);

            match detector.activate().await {
                Some(resolution) => {
                    resolution.await?;
                    let page = page.read().await;
                    for node in page.nodes() {
                        if let Some(value) = &node.value {
                            println!("#{} {} = {}", node.id, node.tag, value);
                        }
                    }
                }
                None => println!("no challenge image detected"),
            }
        }
    }

    Ok(())
}
