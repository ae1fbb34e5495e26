use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::info;

use roomdraw::compactor;
use roomdraw::engine::Engine;
use roomdraw::wire;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("ROOMDRAW_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    roomdraw::observability::init(metrics_port);

    let port: u16 = env_or("ROOMDRAW_PORT", 5480);
    let bind = std::env::var("ROOMDRAW_BIND").unwrap_or_else(|_| "0.0.0.0".into());
    let data_dir = std::env::var("ROOMDRAW_DATA_DIR").unwrap_or_else(|_| "./data".into());
    let max_connections: usize = env_or("ROOMDRAW_MAX_CONNECTIONS", 256);
    let compact_threshold: u64 = env_or("ROOMDRAW_COMPACT_THRESHOLD", 1000);
    let seed: Option<u64> = std::env::var("ROOMDRAW_SEED")
        .ok()
        .and_then(|s| s.parse().ok());

    // Ensure data directory exists
    std::fs::create_dir_all(&data_dir)?;

    let wal_path = std::path::Path::new(&data_dir).join("roomdraw.wal");
    let engine = Arc::new(Engine::new(wal_path, seed)?);
    let compactor_engine = engine.clone();
    tokio::spawn(async move {
        compactor::run_compactor(compactor_engine, compact_threshold).await;
    });

    let semaphore = Arc::new(Semaphore::new(max_connections));

    let addr = format!("{bind}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("roomdraw listening on {addr}");
    info!("  data_dir: {data_dir}");
    info!("  max_connections: {max_connections}");
    info!("  seed: {}", seed.map_or("random per run".to_string(), |s| s.to_string()));
    info!("  metrics: {}", metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics")));

    // Graceful shutdown: stop accepting on SIGTERM/ctrl-c, drain in-flight connections
    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            tokio::select! {
                _ = ctrl_c => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
        }
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (socket, peer) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::error!("accept error: {e}");
                        continue;
                    }
                };

                let permit = match semaphore.clone().try_acquire_owned() {
                    Ok(permit) => permit,
                    Err(_) => {
                        tracing::warn!("connection limit reached, rejecting {peer}");
                        metrics::counter!(roomdraw::observability::CONNECTIONS_REJECTED_TOTAL).increment(1);
                        drop(socket);
                        continue;
                    }
                };

                info!("connection from {peer}");
                metrics::counter!(roomdraw::observability::CONNECTIONS_TOTAL).increment(1);
                metrics::gauge!(roomdraw::observability::CONNECTIONS_ACTIVE).increment(1.0);
                let engine = engine.clone();

                tokio::spawn(async move {
                    let _permit = permit; // held until connection closes
                    if let Err(e) = wire::process_connection(socket, engine).await {
                        tracing::error!("connection error from {peer}: {e}");
                    }
                    metrics::gauge!(roomdraw::observability::CONNECTIONS_ACTIVE).decrement(1.0);
                });
            }
            _ = &mut shutdown => {
                info!("shutdown signal received, stopping accept loop");
                break;
            }
        }
    }

    // Wait for in-flight connections to finish (up to 10s)
    info!("draining connections...");
    let drain_deadline = tokio::time::sleep(std::time::Duration::from_secs(10));
    tokio::pin!(drain_deadline);

    loop {
        if semaphore.available_permits() == max_connections {
            info!("all connections drained");
            break;
        }
        tokio::select! {
            _ = &mut drain_deadline => {
                let remaining = max_connections - semaphore.available_permits();
                tracing::warn!("drain timeout, {remaining} connections still open");
                break;
            }
            _ = tokio::time::sleep(std::time::Duration::from_millis(100)) => {}
        }
    }

    info!("roomdraw stopped");
    Ok(())
}
