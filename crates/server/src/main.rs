mod bootstrap;
mod health;
mod webhook;

use anyhow::Result;
use police_core::config::{AppConfig, LoadOptions, TransportMode};

use crate::bootstrap::Application;

fn init_logging(config: &AppConfig) {
    use police_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            // No config means no log settings yet; report with the defaults.
            tracing_subscriber::fmt().with_target(false).compact().init();
            tracing::error!(
                event_name = "system.config.invalid",
                correlation_id = "bootstrap",
                error = %error,
                "configuration is incomplete; refusing to start"
            );
            return Err(error.into());
        }
    };
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config);

    tracing::info!(
        event_name = "system.server.slack_transport_mode",
        transport_mode = app.config.slack.transport.as_str(),
        correlation_id = "bootstrap",
        "slack transport mode selected"
    );

    match app.config.slack.transport {
        TransportMode::Webhook => serve_webhook(&app).await?,
        TransportMode::Socket => run_socket_mode(&app).await?,
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "police-server stopping"
    );
    Ok(())
}

async fn serve_webhook(app: &Application) -> Result<()> {
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    let router =
        webhook::router(app.webhook_state()?).merge(health::router(TransportMode::Webhook));

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        path = webhook::EVENTS_PATH,
        "listening for events api deliveries"
    );

    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown()).await?;
    Ok(())
}

async fn run_socket_mode(app: &Application) -> Result<()> {
    health::spawn(&app.config.server.bind_address, app.config.server.port, TransportMode::Socket)
        .await?;

    let runner = app.socket_runner()?;
    let mut runner_task = tokio::spawn(async move { runner.start().await });

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        "socket mode runner started"
    );

    tokio::select! {
        joined = &mut runner_task => {
            joined??;
        }
        _ = wait_for_shutdown() => {
            runner_task.abort();
        }
    }

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "failed to listen for ctrl-c"
        );
        std::future::pending::<()>().await;
    }
}
