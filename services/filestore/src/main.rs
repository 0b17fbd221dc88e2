use anyhow::{bail, Context, Result};
use file_store::{FileStore, Settings, StorageConfig};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const USAGE: &str = "usage: file-store <files <path>... | clipboard | urls <url>...>";

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load().context("Failed to load configuration")?;

    init_tracing(&settings.log_level, &settings.log_format);

    let config = StorageConfig::from_settings(&settings);
    info!(
        storage_type = config.backend.kind().as_str(),
        "Starting file store"
    );

    let store = FileStore::from_config(&config)
        .await
        .context("Failed to initialize file store")?;

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_default();
    let rest: Vec<String> = args.collect();

    let report = match command.as_str() {
        "files" => store.upload_files(&rest).await?,
        "clipboard" => store.upload_clipboard_files().await?,
        "urls" => store.upload_url_files(&rest).await?,
        "" => bail!("missing command\n{}", USAGE),
        other => bail!("unknown command: {}\n{}", other, USAGE),
    };

    println!("{}", report);
    Ok(())
}

/// Logs go to stderr so stdout only carries the upload report.
fn init_tracing(log_level: &str, log_format: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if log_format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .init();
    }
}
