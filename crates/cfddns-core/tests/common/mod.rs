//! Test doubles shared by the contract tests
//!
//! Every double counts its calls through `Arc` counters so a test can keep a
//! handle after moving the double into the engine.

#![allow(dead_code)]

use cfddns_core::config::{ConfigField, Configuration};
use cfddns_core::error::{Error, Result};
use cfddns_core::traits::{
    DnsProvider, NotificationSink, Prompter, PublicIpSource, RecordSnapshot, Severity, StartupRegistry,
};
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

/// An IP source returning a fixed answer
pub struct MockIpSource {
    answer: Option<Ipv4Addr>,
    resolve_call_count: Arc<AtomicUsize>,
}

impl MockIpSource {
    pub fn new(answer: Option<Ipv4Addr>) -> Self {
        Self {
            answer,
            resolve_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of times resolve() was called
    pub fn resolve_call_count(&self) -> usize {
        self.resolve_call_count.load(Ordering::SeqCst)
    }

    /// Create a new MockIpSource that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            answer: other.answer,
            resolve_call_count: Arc::clone(&other.resolve_call_count),
        }
    }
}

#[async_trait::async_trait]
impl PublicIpSource for MockIpSource {
    async fn resolve(&self) -> Option<Ipv4Addr> {
        self.resolve_call_count.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

/// A DNS provider serving one record and recording updates
pub struct MockDnsProvider {
    record: Option<RecordSnapshot>,
    accept_updates: bool,
    fetch_call_count: Arc<AtomicUsize>,
    updates: Arc<Mutex<Vec<(String, Ipv4Addr)>>>,
}

impl MockDnsProvider {
    pub fn new(record: Option<RecordSnapshot>) -> Self {
        Self {
            record,
            accept_updates: true,
            fetch_call_count: Arc::new(AtomicUsize::new(0)),
            updates: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Serving `record_id` pointing at `ip`
    pub fn with_record(record_id: &str, ip: &str) -> Self {
        Self::new(Some(RecordSnapshot::new(record_id, ip)))
    }

    /// Make every update fail
    pub fn rejecting(mut self) -> Self {
        self.accept_updates = false;
        self
    }

    pub fn fetch_call_count(&self) -> usize {
        self.fetch_call_count.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    /// (record_id, ip) of every update call
    pub fn updates(&self) -> Vec<(String, Ipv4Addr)> {
        self.updates.lock().unwrap().clone()
    }

    /// Create a new MockDnsProvider that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            record: other.record.clone(),
            accept_updates: other.accept_updates,
            fetch_call_count: Arc::clone(&other.fetch_call_count),
            updates: Arc::clone(&other.updates),
        }
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn fetch_record(&self) -> Option<RecordSnapshot> {
        self.fetch_call_count.fetch_add(1, Ordering::SeqCst);
        self.record.clone()
    }

    async fn update_record(&self, record_id: &str, new_ip: Ipv4Addr) -> bool {
        self.updates
            .lock()
            .unwrap()
            .push((record_id.to_string(), new_ip));
        self.accept_updates
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A notification sink remembering what it showed
#[derive(Clone, Default)]
pub struct RecordingSink {
    shown: Arc<Mutex<Vec<(Severity, String)>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<(Severity, String)> {
        self.shown.lock().unwrap().clone()
    }

    /// Wait for delivery on the notifier's detached thread
    pub fn wait_for(&self, count: usize) -> Vec<(Severity, String)> {
        for _ in 0..200 {
            let shown = self.shown();
            if shown.len() >= count {
                return shown;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        self.shown()
    }
}

impl NotificationSink for RecordingSink {
    fn show(&self, severity: Severity, message: &str) -> Result<()> {
        self.shown
            .lock()
            .unwrap()
            .push((severity, message.to_string()));
        Ok(())
    }
}

/// An in-memory startup registry
pub struct FakeRegistry {
    entry: Mutex<Option<PathBuf>>,
    deny: bool,
    elevated: bool,
    elevation_call_count: AtomicUsize,
    elevation_started: AtomicBool,
    calling_threads: Mutex<Vec<ThreadId>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self {
            entry: Mutex::new(None),
            deny: false,
            elevated: true,
            elevation_call_count: AtomicUsize::new(0),
            elevation_started: AtomicBool::new(false),
            calling_threads: Mutex::new(Vec::new()),
        }
    }

    /// Pre-existing entry
    pub fn registered(self, executable: &str) -> Self {
        *self.entry.lock().unwrap() = Some(PathBuf::from(executable));
        self
    }

    /// Refuse every write; `elevated` controls whether a relaunch is offered
    pub fn denying(mut self, elevated: bool) -> Self {
        self.deny = true;
        self.elevated = elevated;
        self.elevation_started = AtomicBool::new(true);
        self
    }

    pub fn entry(&self) -> Option<PathBuf> {
        self.entry.lock().unwrap().clone()
    }

    pub fn elevation_call_count(&self) -> usize {
        self.elevation_call_count.load(Ordering::SeqCst)
    }

    /// Threads every registry call ran on
    pub fn calling_threads(&self) -> Vec<ThreadId> {
        self.calling_threads.lock().unwrap().clone()
    }

    fn record_thread(&self) {
        self.calling_threads.lock().unwrap().push(thread::current().id());
    }
}

impl StartupRegistry for FakeRegistry {
    fn is_registered(&self) -> Result<bool> {
        self.record_thread();
        Ok(self.entry.lock().unwrap().is_some())
    }

    fn register(&self, executable: &Path) -> Result<()> {
        self.record_thread();
        if self.deny {
            return Err(Error::permission_denied("Access is denied"));
        }
        *self.entry.lock().unwrap() = Some(executable.to_path_buf());
        Ok(())
    }

    fn unregister(&self) -> Result<()> {
        self.record_thread();
        if self.deny {
            return Err(Error::permission_denied("Access is denied"));
        }
        *self.entry.lock().unwrap() = None;
        Ok(())
    }

    fn is_elevated(&self) -> bool {
        self.record_thread();
        self.elevated
    }

    fn request_elevation(&self) -> Result<bool> {
        self.record_thread();
        self.elevation_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.elevation_started.load(Ordering::SeqCst))
    }
}

/// A prompter answering from a script; running dry behaves like closed stdin
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<ConfigField>>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<ConfigField> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Prompter for ScriptedPrompter {
    async fn prompt(&self, field: ConfigField) -> Result<Option<String>> {
        self.asked.lock().unwrap().push(field);
        match self.answers.lock().unwrap().pop_front() {
            Some(answer) => Ok(Some(answer)),
            None => Err(Error::config_incomplete(field.key())),
        }
    }
}

/// A complete configuration for `home.example.com`
pub fn complete_config() -> Configuration {
    Configuration {
        auth_email: "me@example.com".to_string(),
        auth_key: "secret-token".to_string(),
        zone_id: "zone123".to_string(),
        record_name: "home.example.com".to_string(),
        ..Configuration::default()
    }
}
