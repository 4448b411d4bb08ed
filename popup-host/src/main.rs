//! Console host for the notification popup.
//!
//! Every stdin line becomes a popup message. A line containing only `!`
//! clicks the popup away. EOF shuts down.

mod console;

use std::sync::Arc;
use std::time::Duration;

use popup_notify::{FixedGeometry, PopupConfig, PopupController, Rect, ThreadDispatcher};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use console::ConsoleSurfaceFactory;

const SCREEN: Rect = Rect {
    x: 0,
    y: 0,
    width: 1920,
    height: 1080,
};
const WORK_AREA: Rect = Rect {
    x: 0,
    y: 0,
    width: 1920,
    height: 1040,
};

/// Upper bound on how long shutdown waits for the last fade.
const SHUTDOWN_WAIT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = PopupConfig::from_env();
    config.validate()?;
    tracing::info!(
        max_age_ms = config.max_age_ms,
        tick_interval_ms = config.tick_interval_ms,
        "Starting popup host"
    );

    let ui = Arc::new(ThreadDispatcher::spawn("popup-ui")?);
    let surfaces = Arc::new(ConsoleSurfaceFactory::default());
    let geometry = Arc::new(FixedGeometry {
        bounds: SCREEN,
        work_area: WORK_AREA,
    });

    let controller = PopupController::builder(ui.clone(), surfaces.clone(), geometry)
        .config(config)
        .build()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => continue,
            "!" => surfaces.click_latest(),
            text => controller.add_message(text),
        }
    }

    tracing::info!("Input closed, shutting down");
    controller.shutdown();
    wait_until_closed(&controller).await;
    ui.shutdown();
    Ok(())
}

async fn wait_until_closed(controller: &PopupController) {
    let deadline = tokio::time::Instant::now() + SHUTDOWN_WAIT;
    while controller.is_active() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    if controller.is_active() {
        tracing::warn!("Popup still fading at exit");
    }
}
