use bubble_etl::utils::error::ErrorSeverity;
use bubble_etl::utils::{logger, validation::Validate};
use bubble_etl::{BubbleMapPipeline, CliConfig, EtlEngine, EtlError, LocalStorage, ReportConfig};
use clap::Parser;

fn exit_with(e: &EtlError) -> ! {
    tracing::error!(
        "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose);
    tracing::debug!("CLI config: {:?}", cli);

    let config = match ReportConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };

    if let Err(e) = cli.validate().and_then(|_| config.validate()) {
        exit_with(&e);
    }

    let geocoder = match config.geocoder.build() {
        Ok(geocoder) => geocoder,
        Err(e) => exit_with(&e),
    };

    let storage = LocalStorage::new(".");
    let pipeline = BubbleMapPipeline::new(storage, geocoder, cli.run_parameters())
        .with_renderer(config.map.renderer())
        .with_location_column(config.input.location_column.clone());

    let engine = EtlEngine::new(pipeline);

    match engine.run().await {
        Ok(paths) => {
            println!("✅ Bubble map generated");
            println!("📁 CSV:  {}", paths.csv);
            println!("📁 HTML: {}", paths.html);
        }
        Err(e) => exit_with(&e),
    }

    Ok(())
}
