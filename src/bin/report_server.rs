use anyhow::Context;
use bubble_etl::server::{self, AppState};
use bubble_etl::utils::{logger, validation::Validate};
use bubble_etl::ReportConfig;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(name = "report_server")]
#[command(about = "Upload case CSVs and view generated bubble maps over HTTP")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Override server.bind_address
    #[arg(long)]
    bind: Option<String>,

    /// Override server.upload_dir
    #[arg(long)]
    upload_dir: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_server_logger(args.verbose, args.json_logs);

    let mut config = ReportConfig::load(args.config.as_deref())
        .with_context(|| format!("loading config {:?}", args.config))?;

    // 應用命令列覆蓋設定
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }
    if let Some(upload_dir) = args.upload_dir {
        config.server.upload_dir = upload_dir;
    }

    config.validate().context("validating configuration")?;
    server::prepare_upload_dir(&config.server).context("creating upload directory")?;

    let geocoder = config.geocoder.build().context("building geocoder client")?;
    let state = Arc::new(AppState::new(&config, geocoder));

    let listener = TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("binding {}", config.server.bind_address))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("🛑 Ctrl-C received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    server::serve(listener, state, shutdown_rx).await?;
    Ok(())
}
