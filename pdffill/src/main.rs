use clap::Parser;
use pdffill::{Config, ReqwestFillClient, fill_and_report, telemetry};

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, abandoning fill request");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, abandoning fill request");
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Populate the environment from .env before configuration reads it
    dotenv::dotenv().ok();

    let args = pdffill::config::Args::parse();
    let config = Config::load(&args)?;
    let request = config.fill_request()?;

    if args.validate {
        println!("Configuration is valid.");
        println!("POST fill/{}.pdf", request.template_id);
        println!("{}", serde_json::to_string_pretty(&request.payload)?);
        return Ok(());
    }

    telemetry::init_telemetry()?;

    tracing::debug!("{:?}", args);

    let client = ReqwestFillClient::new(
        config.base_url.clone(),
        config.api_key.clone(),
        config.request_timeout,
    )?;

    let outcome = fill_and_report(
        &client,
        &request,
        &config.output,
        config.write_policy,
        shutdown_signal(),
        &mut std::io::stdout(),
    )
    .await?;

    tracing::info!(
        output = %outcome.output.display(),
        bytes = outcome.bytes_written,
        "Saved filled PDF"
    );

    Ok(())
}
