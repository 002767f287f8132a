//! Reconciliation loop
//!
//! The DdnsEngine is responsible for:
//! - Resolving the current public IPv4 address
//! - Fetching the managed A record from the provider
//! - Updating the record only when it differs
//! - Reporting the outcome through the [`Notifier`]
//!
//! ## Cycle
//!
//! ```text
//!   Idle ──due / manual──▶ Resolving ──ip──▶ Fetching ──record──▶ Comparing
//!    ▲                        │                 │                  │     │
//!    │                        │ none            │ none       equal │     │ differs
//!    │                        ▼                 ▼                  ▼     ▼
//!    └──────────────────── Reporting ◀──────────────────────────────── Updating
//!
//!   Idle ──exit flag──▶ Exiting
//! ```
//!
//! ## Cadence
//!
//! The first cycle runs immediately. Afterwards the loop wakes once per
//! second and starts a cycle when the check interval has elapsed since the
//! last one began, or when a manual trigger is pending. Cycles never
//! overlap. The exit flag is honored at the next idle tick.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Configuration;
use crate::control::ControlFlags;
use crate::error::{Error, Result};
use crate::notify::{Notifier, NotifyPrefs};
use crate::traits::{DnsProvider, PublicIpSource, RecordSnapshot, Severity};

/// Granularity of the idle loop
pub const IDLE_TICK: Duration = Duration::from_secs(1);

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// How a single cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No discovery endpoint produced a valid address
    ResolutionFailed,
    /// The provider has no A record for the configured name
    RecordMissing { ip: Ipv4Addr },
    /// The record already points at the current address
    Unchanged { ip: Ipv4Addr },
    /// The record was updated
    Updated { ip: Ipv4Addr, record_id: String },
    /// The provider refused or failed the update
    UpdateFailed { ip: Ipv4Addr, record_id: String },
}

impl CycleOutcome {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Unchanged { .. } | Self::Updated { .. } => Severity::Info,
            _ => Severity::Error,
        }
    }

    /// User-facing message for this outcome
    pub fn message(&self, record_name: &str) -> String {
        match self {
            Self::ResolutionFailed => Error::ResolutionExhausted.to_string(),
            Self::RecordMissing { ip } => Error::record_not_found(record_name, ip.to_string()).to_string(),
            Self::Unchanged { ip } => format!("IP ({}) for {} has not changed.", ip, record_name),
            Self::Updated { ip, .. } => format!("{} {} DDNS updated.", ip, record_name),
            Self::UpdateFailed { ip, record_id } => {
                format!("{} {} DDNS failed for {} ({}).", ip, record_name, record_id, ip)
            }
        }
    }

    /// Address the record points at after this cycle, if known
    pub fn reconciled_ip(&self) -> Option<Ipv4Addr> {
        match self {
            Self::Unchanged { ip } | Self::Updated { ip, .. } => Some(*ip),
            _ => None,
        }
    }
}

/// Result of a reconciliation cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub message: String,
    /// Cycle was started by a manual trigger
    pub forced: bool,
    /// A desktop notification was dispatched
    pub notified: bool,
    pub finished_at: DateTime<Utc>,
}

/// Events emitted by the DdnsEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started { record_name: String, interval_secs: u64 },

    /// A cycle completed
    CycleCompleted(CycleReport),

    /// Engine stopped
    Stopped { reason: String },
}

/// Position in the cycle state machine
#[derive(Debug)]
enum Phase {
    Resolving,
    Fetching(Ipv4Addr),
    Comparing(Ipv4Addr, RecordSnapshot),
    Updating(Ipv4Addr, RecordSnapshot),
    Reporting(CycleOutcome),
}

/// Core DDNS engine
///
/// Owns the loaded configuration for the lifetime of the process. The only
/// in-memory state carried between cycles is the start time of the last
/// cycle and the last reconciled address.
pub struct DdnsEngine {
    /// Public IPv4 discovery
    ip_source: Box<dyn PublicIpSource>,

    /// Record lookup and update
    provider: Box<dyn DnsProvider>,

    /// Logging and desktop notification policy
    notifier: Arc<Notifier>,

    config: Configuration,

    /// Manual trigger and exit, set by the UI collaborator
    flags: ControlFlags,

    last_cycle_started: Option<Instant>,

    last_known_ip: Option<Ipv4Addr>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl DdnsEngine {
    /// Create a new engine
    ///
    /// # Parameters
    ///
    /// - `ip_source`: public IPv4 discovery
    /// - `provider`: DNS provider for the configured record
    /// - `notifier`: shared notifier
    /// - `config`: complete configuration
    /// - `flags`: control flags shared with the UI collaborator
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        ip_source: Box<dyn PublicIpSource>,
        provider: Box<dyn DnsProvider>,
        notifier: Arc<Notifier>,
        config: Configuration,
        flags: ControlFlags,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        if let Some(field) = config.missing_required().first() {
            return Err(Error::config_incomplete(field.key()));
        }
        if config.check_interval_seconds == 0 {
            return Err(Error::Other("check interval must be positive".to_string()));
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let engine = Self {
            ip_source,
            provider,
            notifier,
            config,
            flags,
            last_cycle_started: None,
            last_known_ip: None,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run until the exit flag is raised
    pub async fn run(&mut self) {
        info!(
            "Watching {} via {} every {}s",
            self.config.record_name,
            self.provider.provider_name(),
            self.config.check_interval_seconds
        );
        self.emit_event(EngineEvent::Started {
            record_name: self.config.record_name.clone(),
            interval_secs: self.config.check_interval_seconds,
        });

        loop {
            if self.flags.exit_requested() {
                info!("Exit requested, stopping");
                self.emit_event(EngineEvent::Stopped {
                    reason: "Exit requested".to_string(),
                });
                break;
            }

            let forced = self.flags.take_manual_trigger();
            if forced || self.is_due() {
                self.reconcile(forced).await;
                continue;
            }

            tokio::time::sleep(IDLE_TICK).await;
        }
    }

    /// Run one full cycle and report it
    ///
    /// `forced` marks a user-initiated cycle. Its outcome is always shown as
    /// a notification.
    pub async fn reconcile(&mut self, forced: bool) -> CycleReport {
        self.last_cycle_started = Some(Instant::now());
        debug!("Starting {} cycle", if forced { "manual" } else { "scheduled" });

        let outcome = self.run_cycle().await;
        if let Some(ip) = outcome.reconciled_ip() {
            self.last_known_ip = Some(ip);
        }

        let message = outcome.message(&self.config.record_name);
        let notified = self.notifier.report(
            outcome.severity(),
            &message,
            forced,
            NotifyPrefs::from(&self.config),
        );

        let report = CycleReport {
            outcome,
            message,
            forced,
            notified,
            finished_at: Utc::now(),
        };
        self.emit_event(EngineEvent::CycleCompleted(report.clone()));
        report
    }

    /// Last address the record was confirmed or updated to
    pub fn last_known_ip(&self) -> Option<Ipv4Addr> {
        self.last_known_ip
    }

    fn is_due(&self) -> bool {
        match self.last_cycle_started {
            None => true,
            Some(started) => started.elapsed() > self.config.check_interval(),
        }
    }

    async fn run_cycle(&self) -> CycleOutcome {
        let mut phase = Phase::Resolving;
        loop {
            debug!("Cycle phase: {:?}", phase);
            phase = match phase {
                Phase::Reporting(outcome) => return outcome,
                other => self.step(other).await,
            };
        }
    }

    async fn step(&self, phase: Phase) -> Phase {
        match phase {
            Phase::Resolving => match self.ip_source.resolve().await {
                Some(ip) => Phase::Fetching(ip),
                None => Phase::Reporting(CycleOutcome::ResolutionFailed),
            },
            Phase::Fetching(ip) => match self.provider.fetch_record().await {
                Some(snapshot) => Phase::Comparing(ip, snapshot),
                None => Phase::Reporting(CycleOutcome::RecordMissing { ip }),
            },
            Phase::Comparing(ip, snapshot) => {
                if snapshot.points_at(ip) {
                    Phase::Reporting(CycleOutcome::Unchanged { ip })
                } else {
                    debug!("Record {} points at {}, want {}", snapshot.record_id, snapshot.current_ip, ip);
                    Phase::Updating(ip, snapshot)
                }
            }
            Phase::Updating(ip, snapshot) => {
                let record_id = snapshot.record_id;
                if self.provider.update_record(&record_id, ip).await {
                    Phase::Reporting(CycleOutcome::Updated { ip, record_id })
                } else {
                    Phase::Reporting(CycleOutcome::UpdateFailed { ip, record_id })
                }
            }
            Phase::Reporting(outcome) => Phase::Reporting(outcome),
        }
    }

    /// Emit an event; a full channel drops it, a closed one is ignored
    fn emit_event(&self, event: EngineEvent) {
        if let Err(TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Event channel full, dropping event");
        }
    }
}
