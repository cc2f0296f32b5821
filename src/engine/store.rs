// Copyright © 2024 Pathway

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread::{self, JoinHandle};

use arc_swap::ArcSwap;
use log::{debug, error, info, warn};
use scopeguard::{guard, ScopeGuard};

use super::config::Config;
use super::location::{IngestStats, MergeStats};
use super::reduce::ReductionStats;
use super::retention::{retention_cutoff, PurgeStats};
use super::tables::EnvironmentTables;
use super::time::DateTimeUtc;
use super::{Error, Result};
use crate::connectors::Loader;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub reloaded: bool,
    pub ingest: IngestStats,
    pub merge: MergeStats,
    pub failed_loaders: Vec<String>,
    pub purge: PurgeStats,
    pub reduction: ReductionStats,
    pub locations: usize,
}

struct RefreshState {
    tables: EnvironmentTables,
    loaders: Vec<Box<dyn Loader>>,
    last_reload: Option<DateTimeUtc>,
}

/// Owns the tables and runs the refresh cycle. Readers only ever see the
/// published snapshot, which a refresh replaces as a whole when it ends.
pub struct EnvironmentStore {
    config: ArcSwap<Config>,
    published: ArcSwap<EnvironmentTables>,
    state: Mutex<RefreshState>,
    reload_requested: AtomicBool,
}

impl EnvironmentStore {
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            config: ArcSwap::from_pointee(config.validate()?),
            published: ArcSwap::from_pointee(EnvironmentTables::new()),
            state: Mutex::new(RefreshState {
                tables: EnvironmentTables::new(),
                loaders: Vec::new(),
                last_reload: None,
            }),
            reload_requested: AtomicBool::new(false),
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a loader. Waits for a running refresh to finish.
    pub fn add_loader(&self, loader: Box<dyn Loader>) {
        self.lock_state().loaders.push(loader);
        self.reload_requested.store(true, Ordering::Release);
    }

    pub fn config(&self) -> Arc<Config> {
        self.config.load_full()
    }

    /// Swaps the configuration. The next refresh reloads every source and
    /// recomputes purge and reduction under the new settings.
    pub fn set_config(&self, config: Config) -> Result<()> {
        self.config.store(Arc::new(config.validate()?));
        self.reload_requested.store(true, Ordering::Release);
        Ok(())
    }

    /// Latest published tables. Never blocks.
    pub fn snapshot(&self) -> Arc<EnvironmentTables> {
        self.published.load_full()
    }

    pub fn refresh_now(&self) -> Option<RefreshReport> {
        self.refresh_at(DateTimeUtc::now())
    }

    /// Runs one refresh cycle as of `now`: reload if due, purge, reduce and
    /// publish. Returns `None` without doing anything when another refresh is
    /// in flight.
    pub fn refresh_at(&self, now: DateTimeUtc) -> Option<RefreshReport> {
        let mut state = match self.state.try_lock() {
            Ok(state) => state,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!("refresh already in progress, skipping");
                return None;
            }
        };
        let config = self.config.load_full();
        let mut report = RefreshReport::default();

        let requested = self.reload_requested.swap(false, Ordering::AcqRel);
        // Re-arm the request if loading does not get to the end.
        let pending = guard(requested, |requested| {
            if requested {
                self.reload_requested.store(true, Ordering::Release);
            }
        });
        let due = state
            .last_reload
            .is_none_or(|last| now - last >= config.reload_interval());
        if *pending || due {
            reload_sources(&mut state, &config, now, &mut report);
            state.last_reload = Some(now);
            report.reloaded = true;
        }
        ScopeGuard::into_inner(pending);

        let cutoff = if config.ignore_date_limit {
            None
        } else {
            retention_cutoff(now, config.retention_window())
        };
        report.purge = state.tables.purge(cutoff);
        report.reduction = state.tables.reduce(config.policy, now + config.lookahead());
        report.locations = state.tables.location_count();

        self.published.store(Arc::new(state.tables.clone()));
        info!(
            "refresh: {} ingested, {} locations dropped, {} entries trimmed, {} reduced, {} without valid data, {} locations",
            report.ingest.appended,
            report.purge.dropped_locations,
            report.purge.trimmed_entries,
            report.reduction.reduced,
            report.reduction.no_valid_data,
            report.locations
        );
        Some(report)
    }
}

fn reload_sources(
    state: &mut RefreshState,
    config: &Config,
    now: DateTimeUtc,
    report: &mut RefreshReport,
) {
    let date_cutoff = if config.ignore_date_limit {
        None
    } else {
        retention_cutoff(now, config.retention_window())
    };
    let RefreshState { tables, loaders, .. } = state;
    for loader in loaders.iter_mut() {
        if !config.style(loader.variable()).visible {
            debug!("skipping loader {}: {} is hidden", loader.name(), loader.variable());
            continue;
        }
        match loader.load(date_cutoff) {
            Ok(batch) => {
                let mut loaded = EnvironmentTables::new();
                report.ingest.accumulate(loaded.ingest(batch));
                report.merge.accumulate(tables.merge(&loaded));
            }
            Err(err) => {
                warn!("loader {} failed: {err}", loader.name());
                report.failed_loaders.push(loader.name().to_string());
            }
        }
    }
}

/// Background thread refreshing a store periodically until dropped.
pub struct Refresher {
    should_finish: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl Refresher {
    pub fn start(store: Arc<EnvironmentStore>) -> io::Result<Self> {
        let should_finish = Arc::new(AtomicBool::new(false));
        let thread_handle = {
            let should_finish = Arc::clone(&should_finish);
            thread::Builder::new()
                .name("envdisp:refresh".to_owned())
                .spawn(move || {
                    while !should_finish.load(Ordering::Acquire) {
                        store.refresh_now();
                        thread::park_timeout(store.config().refresh_period());
                    }
                })?
        };
        Ok(Self {
            should_finish,
            thread_handle: Some(thread_handle),
        })
    }

    /// Wakes the thread so it refreshes without waiting for the period.
    pub fn trigger(&self) {
        if let Some(handle) = &self.thread_handle {
            handle.thread().unpark();
        }
    }
}

impl Drop for Refresher {
    fn drop(&mut self) {
        self.should_finish.store(true, Ordering::Release);
        if let Some(handle) = self.thread_handle.take() {
            handle.thread().unpark();
            if let Err(payload) = handle.join() {
                error!("refresh thread failed: {}", Error::from_panic_payload(payload));
            }
        }
    }
}
