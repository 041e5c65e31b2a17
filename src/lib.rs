//! # Groveland - Farm Economy & Quest Engine
//!
//! Groveland is the server-side progression engine for a cooperative farming
//! sim: it owns player currency, the anti-abuse earning throttle, the
//! auto-sell pipeline, the quest catalog and per-player quest state, periodic
//! daily/weekly resets, and reward distribution. The surrounding game
//! (plots, crops, shops, social features) talks to it through a small set of
//! trait seams and the [`farm::FarmService`] façade.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use groveland::config::Config;
//! use groveland::farm::{FarmServiceBuilder, PlayerId, SchedulerIntervals, SimScheduler};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let service = Arc::new(
//!         FarmServiceBuilder::new(
//!             config.economy.starting_balance,
//!             config.economy.max_coins_per_hour,
//!         )
//!         .build(),
//!     );
//!     let scheduler = SimScheduler::spawn(Arc::clone(&service), SchedulerIntervals::default());
//!
//!     service.player_join(PlayerId(1));
//!     service.earn(PlayerId(1), 25, "harvest_sale")?;
//!
//!     scheduler.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`farm`] - Ledger, throttle, auto-sell, quests, resets, rewards, service
//! - [`storage`] - Sled-backed persistence for wallets and quest state
//! - [`config`] - Configuration management and validation

pub mod config;
pub mod farm;
pub mod storage;
