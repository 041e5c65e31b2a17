//! Background cadence driver.
//!
//! Spawns one tokio task per maintenance loop (hourly throttle reset,
//! auto-sell drain, quest expiry sweep, daily/weekly reset check, stats
//! refresh, periodic persistence) and stops them all through a shared watch
//! channel. State is flushed once more before shutdown completes.

use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::farm::service::FarmService;

/// Tick intervals for the maintenance loops, in seconds.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerIntervals {
    pub autosell_secs: u64,
    pub expiry_sweep_secs: u64,
    pub reset_check_secs: u64,
    pub stats_refresh_secs: u64,
    pub save_secs: u64,
}

impl Default for SchedulerIntervals {
    fn default() -> Self {
        Self {
            autosell_secs: 30,
            expiry_sweep_secs: 60,
            reset_check_secs: 60,
            stats_refresh_secs: 300,
            save_secs: 300,
        }
    }
}

/// Handle to the running maintenance loops.
pub struct SimScheduler {
    service: Arc<FarmService>,
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl SimScheduler {
    /// Spawn the maintenance loops against a shared service.
    pub fn spawn(service: Arc<FarmService>, intervals: SchedulerIntervals) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut handles = Vec::new();

        handles.push(spawn_loop(
            "hourly_reset",
            Duration::from_secs(3600),
            shutdown_rx.clone(),
            {
                let service = Arc::clone(&service);
                move || service.run_hourly_reset()
            },
        ));

        handles.push(spawn_loop(
            "autosell",
            Duration::from_secs(intervals.autosell_secs.max(1)),
            shutdown_rx.clone(),
            {
                let service = Arc::clone(&service);
                move || {
                    let report = service.run_autosell_tick();
                    if report.sold > 0 || report.dropped > 0 {
                        debug!("auto-sell tick: {} sold, {} dropped", report.sold, report.dropped);
                    }
                }
            },
        ));

        handles.push(spawn_loop(
            "expiry_sweep",
            Duration::from_secs(intervals.expiry_sweep_secs.max(1)),
            shutdown_rx.clone(),
            {
                let service = Arc::clone(&service);
                move || {
                    let expired = service.run_expiry_sweep();
                    if expired > 0 {
                        info!("expiry sweep failed {} quests", expired);
                    }
                }
            },
        ));

        handles.push(spawn_loop(
            "reset_check",
            Duration::from_secs(intervals.reset_check_secs.max(1)),
            shutdown_rx.clone(),
            {
                let service = Arc::clone(&service);
                move || {
                    let _ = service.run_reset_check();
                }
            },
        ));

        handles.push(spawn_loop(
            "stats_refresh",
            Duration::from_secs(intervals.stats_refresh_secs.max(1)),
            shutdown_rx.clone(),
            {
                let service = Arc::clone(&service);
                move || service.run_stats_refresh()
            },
        ));

        handles.push(spawn_loop(
            "persist",
            Duration::from_secs(intervals.save_secs.max(1)),
            shutdown_rx,
            {
                let service = Arc::clone(&service);
                move || service.persist_all()
            },
        ));

        Self {
            service,
            shutdown_tx,
            handles,
        }
    }

    /// Signal every loop to stop, wait for them to finish, then flush state
    /// one final time.
    pub async fn shutdown(self) {
        info!("scheduler shutting down");
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
        self.service.persist_all();
    }
}

fn spawn_loop<F>(
    name: &'static str,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick of a tokio interval fires immediately; consume it
        // so every loop waits a full period before its first pass.
        interval.tick().await;
        debug!("scheduler loop '{}' running every {:?}", name, period);
        loop {
            tokio::select! {
                _ = interval.tick() => tick(),
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        debug!("scheduler loop '{}' stopped", name);
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::farm::service::FarmServiceBuilder;
    use crate::farm::types::PlayerId;

    #[tokio::test]
    async fn scheduler_starts_and_shuts_down_cleanly() {
        let service = Arc::new(
            FarmServiceBuilder::new(0, 10_000)
                .with_templates(vec![])
                .build(),
        );
        let scheduler = SimScheduler::spawn(Arc::clone(&service), SchedulerIntervals::default());
        service.player_join(PlayerId(1));
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn fast_autosell_interval_drains_the_queue() {
        let service = Arc::new(
            FarmServiceBuilder::new(0, 10_000)
                .with_templates(vec![])
                .build(),
        );
        let p = PlayerId(2);
        service.player_join(p);
        service.harvest(p, 1, "carrot");

        let scheduler = SimScheduler::spawn(
            Arc::clone(&service),
            SchedulerIntervals {
                autosell_secs: 1,
                ..SchedulerIntervals::default()
            },
        );
        tokio::time::sleep(Duration::from_millis(1500)).await;
        scheduler.shutdown().await;
        assert_eq!(service.autosell_queue_len(p), 0);
        assert_eq!(service.balance(p), 12);
    }
}
