//! Background ticker driving the engine

use super::engine::PlayerEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{info, warn};

/// Tick period: progress, end-of-media, timers, auto-advance
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Spawn the engine ticker
pub fn start_ticker(engine: Arc<Mutex<PlayerEngine>>) -> JoinHandle<()> {
    tokio::spawn(tick_task(engine, TICK_INTERVAL))
}

async fn tick_task(engine: Arc<Mutex<PlayerEngine>>, period: Duration) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

    info!("Engine ticker started ({}ms interval)", period.as_millis());

    loop {
        interval.tick().await;

        let mut engine = engine.lock().await;
        if let Err(e) = engine.tick() {
            warn!("Engine tick failed: {}", e);
        }
    }
}
