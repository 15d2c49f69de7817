//! Shared test doubles: scripted provider, in-memory store, instant clock.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

use anyhow::Result;

use agentvm::application::ports::{
    CloudProvider, CreateSpec, NetworkProbe, ProgressReporter, RecordStore, Sleeper,
};
use agentvm::domain::{EnvironmentRecord, ImageStatus, InstanceStatus, VmHandle};

/// Instance id handed out by [`FakeProvider::create_instance`].
pub const INSTANCE_ID: u64 = 4321;
/// Address reported once the fake instance is running.
pub const INSTANCE_IP: &str = "203.0.113.7";

/// Record every fake session starts from: base image `img-100`.
pub fn record() -> EnvironmentRecord {
    EnvironmentRecord::new(
        "widget-factory".to_string(),
        "img-100".to_string(),
        "g6-nanode-1".to_string(),
        "us-east".to_string(),
    )
}

// ── Fake provider ────────────────────────────────────────────────────────────

/// One `create_instance` call as the fake saw it.
#[derive(Debug, Clone)]
pub struct CreatedInstance {
    pub label: String,
    pub instance_type: String,
    pub region: String,
    pub image: String,
    pub root_password: String,
}

/// Scripted [`CloudProvider`]: status and image polls pop from queues,
/// every call is counted. Exhausted queues report "still in progress" so
/// deadline tests can poll forever.
pub struct FakeProvider {
    pub statuses: RefCell<VecDeque<(InstanceStatus, Option<String>)>>,
    pub images: RefCell<VecDeque<ImageStatus>>,
    pub created: RefCell<Vec<CreatedInstance>>,
    pub snapshot_labels: RefCell<Vec<String>>,
    pub next_image_id: String,
    pub status_calls: Cell<usize>,
    pub delete_calls: Cell<usize>,
    pub snapshot_calls: Cell<usize>,
    pub image_calls: Cell<usize>,
    pub fail_snapshot: bool,
    pub fail_image_status: bool,
    pub fail_delete: bool,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            statuses: RefCell::new(VecDeque::new()),
            images: RefCell::new(VecDeque::new()),
            created: RefCell::new(Vec::new()),
            snapshot_labels: RefCell::new(Vec::new()),
            next_image_id: "img-200".to_string(),
            status_calls: Cell::new(0),
            delete_calls: Cell::new(0),
            snapshot_calls: Cell::new(0),
            image_calls: Cell::new(0),
            fail_snapshot: false,
            fail_image_status: false,
            fail_delete: false,
        }
    }

    /// Provider whose instance is running (with an address) on the first
    /// poll and whose image capture completes on the first poll.
    pub fn running() -> Self {
        let fake = Self::new();
        fake.script_status(InstanceStatus::Running, Some(INSTANCE_IP));
        fake.script_image(ImageStatus::Available);
        fake
    }

    pub fn script_status(&self, status: InstanceStatus, ip: Option<&str>) {
        self.statuses
            .borrow_mut()
            .push_back((status, ip.map(str::to_string)));
    }

    pub fn script_image(&self, status: ImageStatus) {
        self.images.borrow_mut().push_back(status);
    }

    /// The single recorded create call, for asserting what was sent.
    pub fn only_created(&self) -> CreatedInstance {
        let created = self.created.borrow();
        assert_eq!(created.len(), 1, "expected exactly one create call");
        created[0].clone()
    }
}

impl CloudProvider for FakeProvider {
    async fn create_instance(&self, spec: &CreateSpec<'_>) -> Result<VmHandle> {
        self.created.borrow_mut().push(CreatedInstance {
            label: spec.label.to_string(),
            instance_type: spec.instance_type.to_string(),
            region: spec.region.to_string(),
            image: spec.image.to_string(),
            root_password: spec.root_password.to_string(),
        });
        Ok(VmHandle {
            id: INSTANCE_ID,
            status: InstanceStatus::Provisioning,
            ip: None,
            root_password: spec.root_password.to_string(),
        })
    }

    async fn instance_status(&self, _id: u64) -> Result<(InstanceStatus, Option<String>)> {
        self.status_calls.set(self.status_calls.get() + 1);
        Ok(self
            .statuses
            .borrow_mut()
            .pop_front()
            .unwrap_or((InstanceStatus::Provisioning, None)))
    }

    async fn delete_instance(&self, _id: u64) -> Result<()> {
        self.delete_calls.set(self.delete_calls.get() + 1);
        if self.fail_delete {
            anyhow::bail!("delete refused")
        }
        Ok(())
    }

    async fn snapshot_disk(&self, _id: u64, label: &str) -> Result<String> {
        self.snapshot_calls.set(self.snapshot_calls.get() + 1);
        if self.fail_snapshot {
            anyhow::bail!("snapshot refused")
        }
        self.snapshot_labels.borrow_mut().push(label.to_string());
        Ok(self.next_image_id.clone())
    }

    async fn image_status(&self, _image_id: &str) -> Result<ImageStatus> {
        self.image_calls.set(self.image_calls.get() + 1);
        if self.fail_image_status {
            anyhow::bail!("image lookup refused")
        }
        Ok(self
            .images
            .borrow_mut()
            .pop_front()
            .unwrap_or(ImageStatus::Creating))
    }
}

// ── In-memory record store ───────────────────────────────────────────────────

/// [`RecordStore`] backed by a cell, counting every save.
#[derive(Default)]
pub struct MemoryStore {
    pub saved: RefCell<Option<EnvironmentRecord>>,
    pub save_calls: Cell<usize>,
}

impl RecordStore for MemoryStore {
    fn load(&self) -> Result<Option<EnvironmentRecord>> {
        Ok(self.saved.borrow().clone())
    }

    fn save(&self, record: &EnvironmentRecord) -> Result<()> {
        self.save_calls.set(self.save_calls.get() + 1);
        *self.saved.borrow_mut() = Some(record.clone());
        Ok(())
    }
}

// ── Clock, probe, reporter ───────────────────────────────────────────────────

/// Sleeper that returns immediately; waits are measured, not served.
pub struct InstantSleeper;

impl Sleeper for InstantSleeper {
    async fn sleep(&self, _duration: Duration) {}
}

/// Probe that always finds the port open.
pub struct ProbeUp;

impl NetworkProbe for ProbeUp {
    async fn check_tcp_connectivity(&self, _host: &str, _port: u16) -> Result<bool> {
        Ok(true)
    }
}

/// Reporter that swallows all progress output.
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn step(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
}
