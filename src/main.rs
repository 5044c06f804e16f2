use anyhow::Result;
use picontrol::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let inspector = Arc::new(probe::inspector::SystemInspector::new());
    let registry = Arc::new(probe::registry::ProbeRegistry::standard(
        inspector.clone(),
        tokio::time::Duration::from_secs(app_config.discovery.default_budget_secs),
    ));
    let aggregator = Arc::new(discovery::Aggregator::new(
        registry,
        inspector.clone(),
        app_config.discovery.concurrency,
    ));

    let store = Arc::new(discovery::SnapshotStore::new(
        &app_config.discovery.snapshot_path,
    ));
    let have_snapshot = match store.load_persisted().await {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::warn!(error = %e, "persisted snapshot unreadable, starting empty");
            false
        }
    };

    let camera_lock = camera::CameraLock::new();
    let camera = Arc::new(camera::CameraService::new(
        camera_lock,
        &app_config.camera,
        std::env::temp_dir().join("picontrol-photos"),
    ));
    let timelapse = Arc::new(timelapse::TimelapseScheduler::new(
        camera.clone(),
        &app_config.timelapse.frames_dir,
    ));

    let state = routes::AppState {
        store: store.clone(),
        aggregator: aggregator.clone(),
        run_gate: Arc::new(tokio::sync::Mutex::new(())),
        camera,
        timelapse: timelapse.clone(),
        gpio: Arc::new(control::GpioState::new(&app_config.gpio)),
        audio: Arc::new(control::AudioControl::new(&app_config.audio)),
        inspector,
    };

    if !have_snapshot && app_config.discovery.run_on_startup {
        let aggregator = aggregator.clone();
        let store = store.clone();
        let gate = state.run_gate.clone();
        tokio::spawn(async move {
            let _gate = gate.lock().await;
            let snapshot = aggregator.run_all().await;
            let snapshot = store.replace(snapshot).await;
            if let Err(e) = store.persist(&snapshot).await {
                tracing::warn!(error = %e, "startup snapshot persist failed");
            }
        });
    }

    let app = routes::app(state);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
            timelapse.shutdown().await;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
