//! Mock implementations for the cluster, broker and storage seams
//!
//! All mocks keep their state behind `Arc<Mutex<..>>`, so a test can keep
//! a clone for assertions after handing the mock to the code under test.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use kube::error::ErrorResponse;
use paymentjob_core::{
    models::{InboundMessage, JobEvent, NewPaymentRecord, PaymentJob, StatusPatch, WorkloadStatus},
    traits::{EventPublisher, MessageSource, RecordStore, StatusWriter, WorkloadApi},
    PaymentJobError, Result,
};

/// Builds a Kubernetes API error the way the client surfaces it
pub fn api_error(code: u16, reason: &str, message: &str) -> PaymentJobError {
    PaymentJobError::Kube(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: message.to_string(),
        reason: reason.to_string(),
        code,
    }))
}

type WorkloadKey = (String, String);

/// In-memory cluster holding Jobs and their observed status
#[derive(Debug, Clone, Default)]
pub struct MockWorkloadApi {
    workloads: Arc<Mutex<HashMap<WorkloadKey, WorkloadStatus>>>,
    created: Arc<Mutex<Vec<Job>>>,
    create_failure: Arc<Mutex<Option<PaymentJobError>>>,
}

impl MockWorkloadApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an existing Job, or moves an existing one to a new status
    pub fn set_status(&self, namespace: &str, name: &str, status: WorkloadStatus) {
        self.workloads
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name.to_string()), status);
    }

    pub fn remove(&self, namespace: &str, name: &str) {
        self.workloads
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
    }

    /// The next `create` call fails with this error
    pub fn fail_next_create(&self, error: PaymentJobError) {
        *self.create_failure.lock().unwrap() = Some(error);
    }

    pub fn created_jobs(&self) -> Vec<Job> {
        self.created.lock().unwrap().clone()
    }

    pub fn create_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

#[async_trait]
impl WorkloadApi for MockWorkloadApi {
    async fn get_status(&self, namespace: &str, name: &str) -> Result<Option<WorkloadStatus>> {
        Ok(self
            .workloads
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn create(&self, namespace: &str, job: &Job) -> Result<()> {
        if let Some(error) = self.create_failure.lock().unwrap().take() {
            return Err(error);
        }

        let name = job.metadata.name.clone().unwrap_or_default();
        let key = (namespace.to_string(), name.clone());
        let mut workloads = self.workloads.lock().unwrap();
        if workloads.contains_key(&key) {
            return Err(api_error(
                409,
                "AlreadyExists",
                &format!("jobs.batch \"{name}\" already exists"),
            ));
        }
        workloads.insert(key, WorkloadStatus::pending());
        self.created.lock().unwrap().push(job.clone());
        Ok(())
    }
}

/// Records every status patch; can simulate optimistic-concurrency conflicts
#[derive(Debug, Clone, Default)]
pub struct MockStatusWriter {
    patches: Arc<Mutex<Vec<(String, String, StatusPatch)>>>,
    conflicts_remaining: Arc<Mutex<usize>>,
}

impl MockStatusWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` patches are rejected with a conflict
    pub fn conflict_next(&self, count: usize) {
        *self.conflicts_remaining.lock().unwrap() = count;
    }

    pub fn patches(&self) -> Vec<StatusPatch> {
        self.patches
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, patch)| patch.clone())
            .collect()
    }

    pub fn last_patch(&self) -> Option<StatusPatch> {
        self.patches().pop()
    }

    pub fn patch_count(&self) -> usize {
        self.patches.lock().unwrap().len()
    }
}

#[async_trait]
impl StatusWriter for MockStatusWriter {
    async fn patch_status(&self, namespace: &str, name: &str, patch: &StatusPatch) -> Result<()> {
        let mut conflicts = self.conflicts_remaining.lock().unwrap();
        if *conflicts > 0 {
            *conflicts -= 1;
            return Err(PaymentJobError::Conflict(format!(
                "the object {namespace}/{name} has been modified"
            )));
        }
        self.patches
            .lock()
            .unwrap()
            .push((namespace.to_string(), name.to_string(), patch.clone()));
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockEventPublisher {
    events: Arc<Mutex<Vec<JobEvent>>>,
}

impl MockEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<JobEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn reasons(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.reason).collect()
    }
}

#[async_trait]
impl EventPublisher for MockEventPublisher {
    async fn publish(&self, _job: &PaymentJob, event: &JobEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<InboundMessage>,
    unacked: HashMap<u64, InboundMessage>,
    acked: Vec<u64>,
    nacked: Vec<(u64, bool)>,
    dead_lettered: Vec<InboundMessage>,
    next_tag: u64,
    closed: bool,
    close_calls: usize,
}

/// In-memory queue with manual acknowledgement
///
/// A requeued message goes to the back of the queue and is redelivered
/// under a fresh delivery tag. When `hold_open` is set an empty queue
/// waits forever instead of ending the consumer.
#[derive(Debug, Clone, Default)]
pub struct MockMessageSource {
    state: Arc<Mutex<QueueState>>,
    hold_open: bool,
}

impl MockMessageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holding_open() -> Self {
        Self {
            hold_open: true,
            ..Self::default()
        }
    }

    pub fn push(&self, message_id: Option<&str>, body: impl Into<Vec<u8>>) {
        let mut state = self.state.lock().unwrap();
        state.next_tag += 1;
        let tag = state.next_tag;
        state
            .ready
            .push_back(InboundMessage::new(tag, message_id.map(str::to_string), body));
    }

    pub fn push_json(&self, message_id: &str, payload: serde_json::Value) {
        self.push(Some(message_id), payload.to_string());
    }

    pub fn acked(&self) -> Vec<u64> {
        self.state.lock().unwrap().acked.clone()
    }

    pub fn nacked(&self) -> Vec<(u64, bool)> {
        self.state.lock().unwrap().nacked.clone()
    }

    pub fn dead_lettered(&self) -> Vec<InboundMessage> {
        self.state.lock().unwrap().dead_lettered.clone()
    }

    /// Messages still waiting for delivery
    pub fn ready_count(&self) -> usize {
        self.state.lock().unwrap().ready.len()
    }

    pub fn unacked_count(&self) -> usize {
        self.state.lock().unwrap().unacked.len()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    pub fn close_calls(&self) -> usize {
        self.state.lock().unwrap().close_calls
    }
}

#[async_trait]
impl MessageSource for MockMessageSource {
    async fn next_message(&mut self) -> Result<Option<InboundMessage>> {
        let next = {
            let mut state = self.state.lock().unwrap();
            if state.closed {
                return Ok(None);
            }
            let next = state.ready.pop_front();
            if let Some(message) = &next {
                state.unacked.insert(message.delivery_tag, message.clone());
            }
            next
        };

        match next {
            Some(message) => Ok(Some(message)),
            None if self.hold_open => std::future::pending().await,
            None => Ok(None),
        }
    }

    async fn ack(&mut self, delivery_tag: u64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.unacked.remove(&delivery_tag).is_none() {
            return Err(PaymentJobError::MessageQueue(format!(
                "unknown delivery tag {delivery_tag}"
            )));
        }
        state.acked.push(delivery_tag);
        Ok(())
    }

    async fn nack(&mut self, delivery_tag: u64, requeue: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let message = state.unacked.remove(&delivery_tag).ok_or_else(|| {
            PaymentJobError::MessageQueue(format!("unknown delivery tag {delivery_tag}"))
        })?;
        state.nacked.push((delivery_tag, requeue));

        if requeue {
            state.next_tag += 1;
            let redelivered = InboundMessage::new(state.next_tag, message.message_id, message.body);
            state.ready.push_back(redelivered);
        } else {
            state.dead_lettered.push(message);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.close_calls += 1;
        // unacked messages return to the queue
        let pending: Vec<_> = state.unacked.drain().map(|(_, m)| m).collect();
        state.ready.extend(pending);
        state.closed = true;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct StoreState {
    records: Vec<NewPaymentRecord>,
    failures_remaining: usize,
    injected_errors: VecDeque<PaymentJobError>,
    reconnect_failures_remaining: usize,
    connected: bool,
    migrations: usize,
    reconnects: usize,
    close_calls: usize,
}

/// In-memory payment table with injectable storage outages
///
/// While an outage is in progress every insert fails until `reconnect`
/// succeeds, mirroring a dropped database connection.
#[derive(Debug, Clone)]
pub struct MockRecordStore {
    state: Arc<Mutex<StoreState>>,
    insert_gate: Option<Arc<Notify>>,
}

impl Default for MockRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState {
                connected: true,
                ..StoreState::default()
            })),
            insert_gate: None,
        }
    }

    /// Every insert waits for a permit on `gate` before it completes
    pub fn with_insert_gate(mut self, gate: Arc<Notify>) -> Self {
        self.insert_gate = Some(gate);
        self
    }

    /// The next `count` inserts fail with a storage error
    pub fn fail_next_inserts(&self, count: usize) {
        self.state.lock().unwrap().failures_remaining = count;
    }

    /// Drops the connection; inserts fail until a reconnect
    /// The next insert fails with `error` without dropping the connection
    pub fn fail_next_insert_with(&self, error: PaymentJobError) {
        self.state.lock().unwrap().injected_errors.push_back(error);
    }

    pub fn disconnect(&self) {
        self.state.lock().unwrap().connected = false;
    }

    pub fn fail_next_reconnects(&self, count: usize) {
        self.state.lock().unwrap().reconnect_failures_remaining = count;
    }

    pub fn records(&self) -> Vec<NewPaymentRecord> {
        self.state.lock().unwrap().records.clone()
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    pub fn migrations(&self) -> usize {
        self.state.lock().unwrap().migrations
    }

    pub fn reconnects(&self) -> usize {
        self.state.lock().unwrap().reconnects
    }

    pub fn close_calls(&self) -> usize {
        self.state.lock().unwrap().close_calls
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn migrate(&mut self) -> Result<()> {
        self.state.lock().unwrap().migrations += 1;
        Ok(())
    }

    async fn insert(&mut self, record: &NewPaymentRecord) -> Result<i64> {
        if let Some(gate) = &self.insert_gate {
            gate.notified().await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.injected_errors.pop_front() {
            return Err(error);
        }
        if !state.connected {
            return Err(PaymentJobError::Database(sqlx::Error::PoolClosed));
        }
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            state.connected = false;
            return Err(PaymentJobError::Database(sqlx::Error::PoolTimedOut));
        }
        state.records.push(record.clone());
        Ok(state.records.len() as i64)
    }

    async fn reconnect(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.reconnects += 1;
        if state.reconnect_failures_remaining > 0 {
            state.reconnect_failures_remaining -= 1;
            return Err(PaymentJobError::Database(sqlx::Error::PoolTimedOut));
        }
        state.connected = true;
        Ok(())
    }

    async fn close(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.close_calls += 1;
        state.connected = false;
    }
}
