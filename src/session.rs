//! The hardening session state machine.
//!
//! `GhostSession` owns the session state and the mutation ledger for the
//! lifetime of one run. Mutations are recorded into the ledger before their
//! command outcome is inspected, so restoration covers every command whose
//! effect on the device is unknown. Restoration reverses exactly what was
//! recorded, exactly once, best-effort-complete: one failing inverse command
//! never stops the rest.

use colored::Colorize;

use crate::bridge::CommandRunner;
use crate::error::{GhostError, Result};
use crate::identity::SafetyDecision;
use crate::version::SensorToggleSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Gated,
    Active,
    Restoring,
    Restored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    SensorPrivacy,
    CoarseLocation,
    FineLocation,
    Timezone,
}

impl MutationKind {
    pub fn label(&self) -> &'static str {
        match self {
            MutationKind::SensorPrivacy => "sensor privacy",
            MutationKind::CoarseLocation => "coarse location",
            MutationKind::FineLocation => "fine location",
            MutationKind::Timezone => "timezone",
        }
    }
}

/// One applied mutation and the command that reverses it.
#[derive(Debug, Clone)]
pub struct Mutation {
    pub kind: MutationKind,
    pub apply_cmd: String,
    pub restore_cmd: String,
    pub applied_ok: bool,
}

/// Per-mutation restoration outcomes. Empty when restore had already run
/// (or nothing was ever recorded).
#[derive(Debug, Default)]
pub struct RestoreReport {
    pub outcomes: Vec<(MutationKind, bool)>,
}

impl RestoreReport {
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

pub struct GhostSession {
    state: SessionState,
    ledger: Vec<Mutation>,
    app_id: String,
    baseline_timezone: String,
}

impl GhostSession {
    pub fn new(app_id: &str, baseline_timezone: &str) -> Self {
        Self {
            state: SessionState::Idle,
            ledger: Vec::new(),
            app_id: app_id.to_string(),
            baseline_timezone: baseline_timezone.to_string(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.ledger
    }

    /// Drive Idle → Gated → Active, applying the hardening mutations in fixed
    /// order: sensor privacy, coarse location, fine location, timezone.
    /// `Abort` performs no mutation and leaves the session in Idle. A failed
    /// apply command is recorded and warned about, never fatal: the session
    /// applies as much hardening as it can.
    pub async fn start(
        &mut self,
        spec: SensorToggleSpec,
        decision: SafetyDecision,
        runner: &dyn CommandRunner,
    ) -> Result<()> {
        let timezone = match decision {
            SafetyDecision::Abort => return Err(GhostError::Aborted),
            SafetyDecision::Proceed { timezone } => timezone,
            SafetyDecision::ProceedOverridden => None,
        };
        self.state = SessionState::Gated;

        self.apply(
            runner,
            MutationKind::SensorPrivacy,
            format!(
                "service call sensor_privacy {} i32 {}",
                spec.transaction_code, spec.enable_value
            ),
            format!(
                "service call sensor_privacy {} i32 {}",
                spec.transaction_code, spec.disable_value
            ),
        )
        .await;

        for (kind, scope) in [
            (MutationKind::CoarseLocation, "COARSE_LOCATION"),
            (MutationKind::FineLocation, "FINE_LOCATION"),
        ] {
            self.apply(
                runner,
                kind,
                format!("appops set {} {scope} ignore", self.app_id),
                format!("appops set {} {scope} allow", self.app_id),
            )
            .await;
        }

        match timezone {
            Some(tz) => {
                self.apply(
                    runner,
                    MutationKind::Timezone,
                    format!("setprop persist.sys.timezone {tz}"),
                    format!("setprop persist.sys.timezone {}", self.baseline_timezone),
                )
                .await;
            }
            None => {
                tracing::warn!("no timezone to sync — skipping timezone override");
                println!("  {} timezone sync skipped (no detected timezone)", "·".dimmed());
            }
        }

        self.state = SessionState::Active;
        Ok(())
    }

    /// Issue one mutation. The ledger entry is pushed before the command
    /// outcome is known.
    async fn apply(
        &mut self,
        runner: &dyn CommandRunner,
        kind: MutationKind,
        apply_cmd: String,
        restore_cmd: String,
    ) {
        self.ledger.push(Mutation {
            kind,
            apply_cmd: apply_cmd.clone(),
            restore_cmd,
            applied_ok: false,
        });
        let ok = runner.run(&apply_cmd).await;
        if let Some(entry) = self.ledger.last_mut() {
            entry.applied_ok = ok;
        }
        if ok {
            println!("  {} {} hardened", "✓".green(), kind.label());
        } else {
            tracing::warn!("mutation failed: {} (`{apply_cmd}`)", kind.label());
            println!("  {} {} failed — continuing", "!".yellow(), kind.label());
        }
    }

    /// Reverse every recorded mutation exactly once. Idempotent: a second
    /// call issues no commands and returns an empty report. Never fails;
    /// this runs on every exit path, including uncontrolled termination.
    pub async fn restore(&mut self, runner: &dyn CommandRunner) -> RestoreReport {
        if matches!(self.state, SessionState::Restoring | SessionState::Restored) {
            return RestoreReport::default();
        }
        self.state = SessionState::Restoring;

        let mut report = RestoreReport::default();
        for entry in &self.ledger {
            let ok = runner.run(&entry.restore_cmd).await;
            if !ok {
                tracing::warn!(
                    "restore failed: {} (`{}`)",
                    entry.kind.label(),
                    entry.restore_cmd
                );
            }
            report.outcomes.push((entry.kind, ok));
        }

        self.state = SessionState::Restored;
        report
    }
}
