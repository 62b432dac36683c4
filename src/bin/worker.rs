use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use pitwall::config::Config;
use pitwall::discovery::LiveTimingDiscovery;
use pitwall::feed::signalr::SignalRConnector;
use pitwall::lifecycle::Controller;
use pitwall::schedule;
use pitwall::sink::SnapshotWriter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    log::info!("Starting pitwall worker (db: {})", config.db_path);

    let writer = SnapshotWriter::open(&config.db_path)?;
    let discovery = Arc::new(LiveTimingDiscovery::new(&config.session_info_url)?);
    let connector = Arc::new(SignalRConnector::new(&config.feed_url)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Shutdown requested");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut controller = Controller::new(discovery, connector, writer, config.clone());
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()?;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        match schedule::fetch_schedule(&http, &config.schedule_url).await {
            Ok(sessions) => {
                schedule::log_upcoming(&sessions, 5);

                let Some(wakeup) = schedule::find_next_wakeup(&sessions, chrono::Utc::now())
                else {
                    log::info!("No remaining sessions in the calendar, stopping");
                    break;
                };

                if !wakeup.sleep.is_zero() {
                    log::info!(
                        "Sleeping {}s until {} {}",
                        wakeup.sleep.as_secs(),
                        wakeup.session.race_name,
                        wakeup.session.session_name
                    );
                    if wait_or_shutdown(wakeup.sleep, shutdown_rx.clone()).await {
                        break;
                    }
                }

                controller
                    .run(Some(wakeup.weekend_end), shutdown_rx.clone())
                    .await;
            }
            Err(e) => {
                // No calendar means no sleep windows. Stay awake and let
                // discovery decide when something is live.
                log::warn!("Schedule unavailable ({}), falling back to discovery polling", e);
                controller.run(None, shutdown_rx.clone()).await;
            }
        }
    }

    log::info!("Worker stopped");
    Ok(())
}

/// Returns true when shutdown fired before the sleep elapsed
async fn wait_or_shutdown(duration: Duration, mut shutdown: watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}
