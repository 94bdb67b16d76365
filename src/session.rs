//! The optimization/undo session.
//!
//! ```text
//! Idle -> Elevating? -> Snapshotting -> Applying -> Monitoring -> Reporting -> Done
//! Idle -> Elevating? -> Undoing -> Done
//! ```
//!
//! Nothing is mutated before the snapshot has been persisted. Apply steps are
//! independent: a failing step is logged and reported, and the next one runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::actions::{cache, power, processes, startup};
use crate::backup::{BackupRecord, BackupStore};
use crate::config::{BrowserSelection, Options};
use crate::error::SessionError;
use crate::monitor::{self, MonitorReport, Sampler};
use crate::permissions::policy::{self, ElevationContext};
use crate::permissions::{ElevationGate, PermissionDecision};
use crate::platform::SystemControl;
use crate::report::{Outcome, Report, ReportKind, Step, StepReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Elevating,
    Snapshotting,
    Applying,
    Monitoring,
    Reporting,
    Undoing,
    Done,
}

pub struct Session<'a> {
    options: Options,
    store: BackupStore,
    system: &'a mut dyn SystemControl,
    gate: &'a mut dyn ElevationGate,
    sampler: &'a mut dyn Sampler,
    running: Arc<AtomicBool>,
    state: SessionState,
    run_id: Uuid,
}

impl<'a> Session<'a> {
    pub fn new(
        options: Options,
        store: BackupStore,
        system: &'a mut dyn SystemControl,
        gate: &'a mut dyn ElevationGate,
        sampler: &'a mut dyn Sampler,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            options,
            store,
            system,
            gate,
            sampler,
            running,
            state: SessionState::Idle,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn run(&mut self) -> Result<Report, SessionError> {
        // A missing backup is reported before any UAC prompt
        if self.options.undo && !self.store.exists() {
            let e = SessionError::NotFound(format!(
                "no backup record at {}; run an optimization first",
                self.store.path().display()
            ));
            error!("Nothing to undo: {}", e);
            return Err(e);
        }

        if !self.gate.is_elevated() {
            self.transition(SessionState::Elevating);
            if let Some(exit_code) = self.elevate()? {
                self.transition(SessionState::Done);
                return Ok(Report::relaunched(exit_code));
            }
        }

        if self.options.undo {
            self.undo()
        } else {
            self.optimize()
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session {}: {:?} -> {:?}", self.run_id, self.state, next);
        self.state = next;
    }

    fn interrupted(&self) -> bool {
        !self.running.load(Ordering::SeqCst)
    }

    /// Returns the exit code of the elevated copy when one did the work, or
    /// `None` when this process may go on.
    fn elevate(&mut self) -> Result<Option<i32>, SessionError> {
        let ctx = ElevationContext {
            elevated: false,
            force_admin: self.options.force_admin,
            assume_yes: self.options.assume_yes,
            interactive: self.gate.is_interactive(),
        };

        match policy::evaluate(&ctx) {
            PermissionDecision::Allow => Ok(None),
            PermissionDecision::Relaunch => self.gate.relaunch().map(Some),
            PermissionDecision::RequireConfirmation { reason } => {
                if self.gate.confirm(&reason) {
                    self.gate.relaunch().map(Some)
                } else {
                    Err(SessionError::PermissionDenied(
                        "administrator privileges were declined".into(),
                    ))
                }
            }
            PermissionDecision::Deny { reason } => Err(SessionError::PermissionDenied(reason)),
        }
    }

    fn optimize(&mut self) -> Result<Report, SessionError> {
        info!("Starting GPTboost optimization (run {})...", self.run_id);

        self.transition(SessionState::Snapshotting);
        let record = self.snapshot()?;

        self.transition(SessionState::Applying);
        let steps = self.apply(&record);

        self.transition(SessionState::Monitoring);
        let monitor = self.monitor();

        self.transition(SessionState::Reporting);
        let report = Report {
            kind: ReportKind::Optimized,
            run_id: Some(self.run_id),
            interrupted: self.interrupted(),
            steps,
            monitor: Some(monitor),
            exit_code: None,
        };
        if report.failures() > 0 {
            warn!("Optimization finished with {} failed step(s)", report.failures());
        } else {
            info!("Optimization complete");
        }

        self.transition(SessionState::Done);
        Ok(report)
    }

    fn snapshot(&mut self) -> Result<BackupRecord, SessionError> {
        info!("Saving current power plan and startup items...");

        let power_plan = self.system.active_power_plan().map_err(|e| {
            error!("Could not read the active power plan: {}", e);
            e
        })?;
        let startup_items = self.system.startup_items().map_err(|e| {
            error!("Could not read startup items: {}", e);
            e
        })?;

        info!(
            "Current power plan: {} ({}); {} startup items",
            power::plan_label(&power_plan),
            power_plan,
            startup_items.len()
        );

        let record = BackupRecord::new(self.run_id, power_plan, startup_items);
        self.store.save(&record)?;
        Ok(record)
    }

    fn run_step<F>(&mut self, reports: &mut Vec<StepReport>, step: Step, f: F)
    where
        F: FnOnce(&mut Self) -> Result<Outcome, SessionError>,
    {
        let outcome = if self.interrupted() {
            Outcome::Skipped("cancelled".into())
        } else {
            match f(self) {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("{} failed: {}", step.label(), e);
                    Outcome::Failed(e.to_string())
                }
            }
        };
        reports.push(StepReport { step, outcome });
    }

    fn apply(&mut self, record: &BackupRecord) -> Vec<StepReport> {
        let mut steps = Vec::new();
        self.run_step(&mut steps, Step::CloseProcesses, |s| s.close_processes());
        self.run_step(&mut steps, Step::ClearBrowserCache, |s| s.clear_cache());
        self.run_step(&mut steps, Step::HighPerformancePower, |s| s.high_performance());
        self.run_step(&mut steps, Step::FlushDns, |s| s.flush_dns());
        self.run_step(&mut steps, Step::DisableStartupItems, |s| {
            s.disable_startup_items(record.startup_items())
        });
        steps
    }

    fn close_processes(&mut self) -> Result<Outcome, SessionError> {
        let summary =
            processes::close_background_processes(&mut *self.system, processes::PROCESS_TARGETS);

        if !summary.failed.is_empty() {
            let names: Vec<&str> = summary.failed.iter().map(|(n, _)| n.as_str()).collect();
            return Err(SessionError::OperationFailed(format!(
                "closed {}, could not close {}",
                summary.closed.len(),
                names.join(", ")
            )));
        }

        Ok(if summary.closed.is_empty() {
            Outcome::Done("no target processes running".into())
        } else {
            Outcome::Done(format!("closed {}", summary.closed.join(", ")))
        })
    }

    fn clear_cache(&mut self) -> Result<Outcome, SessionError> {
        let browser = match self.options.browser {
            BrowserSelection::Skip => return Ok(Outcome::Skipped("no browser selected".into())),
            BrowserSelection::Only(browser) => browser,
            BrowserSelection::Detect => {
                let browser = cache::detect_default_browser();
                info!("Detected default browser: {}", browser);
                browser
            }
        };

        let root = self.options.cache_root.as_deref().ok_or_else(|| {
            SessionError::NotFound("local application data directory is unknown".into())
        })?;

        let summary = cache::clear_browser_cache(browser, root);
        if !summary.failed.is_empty() {
            return Err(SessionError::OperationFailed(format!(
                "cleared {} {} cache directories, {} could not be removed",
                summary.cleared.len(),
                browser,
                summary.failed.len()
            )));
        }
        Ok(Outcome::Done(format!(
            "cleared {} {} cache directories",
            summary.cleared.len(),
            browser
        )))
    }

    fn high_performance(&mut self) -> Result<Outcome, SessionError> {
        info!("Setting High Performance power mode...");
        self.system.set_active_power_plan(power::HIGH_PERFORMANCE)?;
        info!("Successfully switched to High Performance mode");
        Ok(Outcome::Done("High Performance active".into()))
    }

    fn flush_dns(&mut self) -> Result<Outcome, SessionError> {
        info!("Flushing DNS cache...");
        self.system.flush_dns()?;
        info!("DNS cache flushed successfully");
        Ok(Outcome::Done("DNS cache flushed".into()))
    }

    fn disable_startup_items(
        &mut self,
        snapshot: &BTreeMap<String, bool>,
    ) -> Result<Outcome, SessionError> {
        info!("Disabling non-essential startup items...");
        let targets = startup::select_items_to_disable(snapshot);
        if targets.is_empty() {
            return Ok(Outcome::Done("nothing to disable".into()));
        }

        let mut disabled = Vec::new();
        let mut failed = Vec::new();
        for item in targets {
            match self.system.set_startup_enabled(&item, false) {
                Ok(()) => {
                    info!("Disabled startup item: {}", item);
                    disabled.push(item);
                }
                Err(e) => {
                    warn!("Could not disable startup item {}: {}", item, e);
                    failed.push(item);
                }
            }
        }

        if failed.is_empty() {
            Ok(Outcome::Done(format!("disabled {}", disabled.join(", "))))
        } else {
            Err(SessionError::OperationFailed(format!(
                "could not disable {}",
                failed.join(", ")
            )))
        }
    }

    fn monitor(&mut self) -> MonitorReport {
        let duration = self.options.monitor_duration;
        if duration.is_zero() || self.interrupted() {
            return MonitorReport::default();
        }

        info!("Monitoring system resources for {} seconds...", duration.as_secs());
        let report = monitor::run(
            &mut *self.sampler,
            duration,
            self.options.sample_interval,
            &self.running,
        );

        if report.samples > 0 {
            info!("Average CPU usage: {:.1}%", report.avg_cpu);
            info!("Average RAM usage: {:.1}%", report.avg_memory);
            if report.high_usage() {
                warn!("High resource usage detected! Consider closing more applications.");
            } else {
                info!("Resource usage looks good. Try ChatGPT now!");
            }
        }
        report
    }

    fn undo(&mut self) -> Result<Report, SessionError> {
        self.transition(SessionState::Undoing);
        info!("Reverting GPTboost optimizations...");

        let record = self.store.load().map_err(|e| {
            error!("Nothing to undo: {}", e);
            e
        })?;
        info!(
            "Restoring state saved by run {} at {}",
            record.run_id(),
            record.created_at()
        );

        let mut steps = Vec::new();
        self.run_step(&mut steps, Step::RestorePowerPlan, |s| {
            s.system.set_active_power_plan(record.power_plan())?;
            info!("Power plan reset to {}", power::plan_label(record.power_plan()));
            Ok(Outcome::Done(format!(
                "{} ({}) active",
                power::plan_label(record.power_plan()),
                record.power_plan()
            )))
        });
        self.run_step(&mut steps, Step::RestoreStartupItems, |s| {
            s.restore_startup_items(record.startup_items())
        });

        let report = Report {
            kind: ReportKind::Restored,
            run_id: Some(record.run_id()),
            steps,
            monitor: None,
            interrupted: self.interrupted(),
            exit_code: None,
        };

        if report.failures() == 0 && !report.interrupted {
            if let Err(e) = self.store.discard() {
                warn!("Could not remove backup {}: {}", self.store.path().display(), e);
            }
        } else {
            warn!(
                "Backup kept at {} so undo can be retried",
                self.store.path().display()
            );
        }

        info!("Undo complete");
        self.transition(SessionState::Done);
        Ok(report)
    }

    fn restore_startup_items(
        &mut self,
        recorded: &BTreeMap<String, bool>,
    ) -> Result<Outcome, SessionError> {
        let current = self.system.startup_items()?;

        let mut restored = 0;
        let mut unchanged = 0;
        let mut missing = 0;
        let mut failed = Vec::new();

        for (item, &enabled) in recorded {
            match current.get(item) {
                None => {
                    warn!("Startup item {} is no longer registered; skipping", item);
                    missing += 1;
                }
                Some(&now) if now == enabled => unchanged += 1,
                Some(_) => match self.system.set_startup_enabled(item, enabled) {
                    Ok(()) => {
                        info!(
                            "{} startup item: {}",
                            if enabled { "Re-enabled" } else { "Disabled" },
                            item
                        );
                        restored += 1;
                    }
                    Err(e) => {
                        warn!("Could not restore startup item {}: {}", item, e);
                        failed.push(item.as_str());
                    }
                },
            }
        }

        if !failed.is_empty() {
            return Err(SessionError::OperationFailed(format!(
                "could not restore {}",
                failed.join(", ")
            )));
        }
        Ok(Outcome::Done(format!(
            "restored {}, {} unchanged, {} no longer registered",
            restored, unchanged, missing
        )))
    }
}
