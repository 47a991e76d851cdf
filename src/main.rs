use gatekeeper::api;
use gatekeeper::logger::*;
use gatekeeper::server::*;
use gatekeeper::settings::*;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use warp::Filter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    info!(?project_settings);
    let logger_config = LogConfig {
        filter: project_settings.log.filter.clone(),
    };
    logger.reload_from_config(&logger_config)?;

    let address: std::net::SocketAddr = project_settings.http.address.parse()?;
    let server = Arc::new(Server::try_new(&project_settings).await?);

    let api = api::v1::routes(server.clone())
        .recover(api::v1::recover_error)
        .with(warp::reply::with::header(
            "Strict-Transport-Security",
            "max-age=31536000; includeSubDomains",
        ))
        .with(warp::reply::with::header(
            "Content-Security-Policy",
            "default-src 'self'",
        ));

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    let (bound, serving) = warp::serve(api).bind_with_graceful_shutdown(address, async move {
        cancel.cancelled().await;
    });
    info!("Listening on {}", bound);
    serving.await;

    let shutdown_timeout = std::time::Duration::from_secs(10);
    match tokio::time::timeout(shutdown_timeout, server.shutdown()).await {
        Ok(_) => tracing::info!("server shutdown successfully"),
        Err(_) => tracing::error!("server shutdown timed out"),
    }

    Ok(())
}
