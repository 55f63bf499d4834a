//! In-memory radio and transport for testing
//!
//! [`MockRadio`] returns scripted statuses and records every call;
//! [`MockTransport`] replays queued peer events and records every write.

use crate::radio::{ConfigData, RangingRadio, StartRequest};
use crate::transport::{Channel, GattProfile, PeerEvent, Transport, TransportError};
use crate::types::{DeviceType, RadioStatus};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ---------------------------------------------------------------------------
// MockRadio
// ---------------------------------------------------------------------------

/// A call observed by [`MockRadio`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioCall {
    Configure(u32, DeviceType),
    Start(u32),
    Stop(u32),
    Deinit(u32),
    Reset,
}

/// Scripted ranging radio
#[derive(Debug)]
pub struct MockRadio {
    calls: Mutex<Vec<RadioCall>>,
    config: Mutex<Result<ConfigData, RadioStatus>>,
    start_failure: Mutex<Option<RadioStatus>>,
    stop_status: Mutex<RadioStatus>,
    deinit_status: Mutex<RadioStatus>,
    reset_status: Mutex<RadioStatus>,
    delay: Mutex<Option<Duration>>,
    last_start: Mutex<Option<StartRequest>>,
    next_handle: AtomicU32,
}

impl MockRadio {
    /// Radio that accepts everything and produces a 9-byte configuration
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            config: Mutex::new(Ok(ConfigData::new(vec![
                0x01, 0x00, 0x01, 0x00, 0x09, 0x0a, 0x21, 0x43, 0x65,
            ]))),
            start_failure: Mutex::new(None),
            stop_status: Mutex::new(RadioStatus::Success),
            deinit_status: Mutex::new(RadioStatus::Success),
            reset_status: Mutex::new(RadioStatus::Success),
            delay: Mutex::new(None),
            last_start: Mutex::new(None),
            next_handle: AtomicU32::new(0x1000),
        }
    }

    /// Radio whose every transition returns `status`
    pub fn failing(status: RadioStatus) -> Self {
        let radio = Self::new();
        radio.fail_start(status);
        radio.set_stop_status(status);
        radio.set_deinit_status(status);
        radio.fail_configure(status);
        radio
    }

    pub fn set_config(&self, config: ConfigData) {
        *self.config.lock().unwrap() = Ok(config);
    }

    pub fn fail_configure(&self, status: RadioStatus) {
        *self.config.lock().unwrap() = Err(status);
    }

    pub fn fail_start(&self, status: RadioStatus) {
        *self.start_failure.lock().unwrap() = Some(status);
    }

    pub fn set_stop_status(&self, status: RadioStatus) {
        *self.stop_status.lock().unwrap() = status;
    }

    pub fn set_deinit_status(&self, status: RadioStatus) {
        *self.deinit_status.lock().unwrap() = status;
    }

    pub fn set_reset_status(&self, status: RadioStatus) {
        *self.reset_status.lock().unwrap() = status;
    }

    /// Delay every call by `delay`
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Calls observed so far, in order
    pub fn calls(&self) -> Vec<RadioCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of observed calls matching `pred`
    pub fn count(&self, pred: impl Fn(&RadioCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    /// Most recent start request
    pub fn last_start(&self) -> Option<StartRequest> {
        self.last_start.lock().unwrap().clone()
    }

    async fn record(&self, call: RadioCall) {
        self.calls.lock().unwrap().push(call);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for MockRadio {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RangingRadio for MockRadio {
    async fn configure(
        &self,
        session_id: u32,
        device_type: DeviceType,
    ) -> Result<ConfigData, RadioStatus> {
        self.record(RadioCall::Configure(session_id, device_type)).await;
        self.config.lock().unwrap().clone()
    }

    async fn start(&self, request: &StartRequest) -> Result<u32, RadioStatus> {
        self.record(RadioCall::Start(request.session_id)).await;
        *self.last_start.lock().unwrap() = Some(request.clone());
        match *self.start_failure.lock().unwrap() {
            Some(status) => Err(status),
            None => Ok(self.next_handle.fetch_add(1, Ordering::SeqCst)),
        }
    }

    async fn stop(&self, session_id: u32) -> RadioStatus {
        self.record(RadioCall::Stop(session_id)).await;
        *self.stop_status.lock().unwrap()
    }

    async fn deinit(&self, session_id: u32) -> RadioStatus {
        self.record(RadioCall::Deinit(session_id)).await;
        *self.deinit_status.lock().unwrap()
    }

    async fn reset(&self) -> RadioStatus {
        self.record(RadioCall::Reset).await;
        *self.reset_status.lock().unwrap()
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

/// In-memory BLE transport
#[derive(Debug, Default)]
pub struct MockTransport {
    events: Mutex<VecDeque<PeerEvent>>,
    writes: Mutex<Vec<(Channel, Vec<u8>)>>,
    begun: Mutex<Option<(GattProfile, String)>>,
    advertise_count: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event for the next `poll()`
    pub fn push_event(&self, event: PeerEvent) {
        self.events.lock().unwrap().push_back(event);
    }

    /// Make every subsequent write fail
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// All writes, in order
    pub fn writes(&self) -> Vec<(Channel, Vec<u8>)> {
        self.writes.lock().unwrap().clone()
    }

    /// Writes to one channel, in order
    pub fn writes_to(&self, channel: Channel) -> Vec<Vec<u8>> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, data)| data.clone())
            .collect()
    }

    pub fn clear_writes(&self) {
        self.writes.lock().unwrap().clear();
    }

    /// Profile and name passed to `begin`
    pub fn begun(&self) -> Option<(GattProfile, String)> {
        self.begun.lock().unwrap().clone()
    }

    pub fn advertise_count(&self) -> usize {
        self.advertise_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn begin(&self, profile: &GattProfile, device_name: &str) -> Result<(), TransportError> {
        *self.begun.lock().unwrap() = Some((profile.clone(), device_name.to_string()));
        Ok(())
    }

    async fn advertise(&self) -> Result<(), TransportError> {
        self.advertise_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn poll(&self) -> Result<Vec<PeerEvent>, TransportError> {
        Ok(self.events.lock().unwrap().drain(..).collect())
    }

    async fn write_value(&self, channel: Channel, data: &[u8]) -> Result<(), TransportError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportError::WriteFailed("mock write failure".to_string()));
        }
        self.writes.lock().unwrap().push((channel, data.to_vec()));
        Ok(())
    }
}
