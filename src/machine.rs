//! Session state machine
//!
//! ```text
//!   NotCreated ──start──▶ NotStarted ──(start ok)──▶ Started
//!       ▲                     │  ▲                      │
//!       └──stop?+deinit───────┘  └────────stop──────────┘
//! ```
//!
//! Teardown walks a session back to `NotCreated` one transition at a time
//! under the session's transition guard, bounded by an elapsed-time budget
//! and an attempt counter. If either bound trips or the radio refuses a
//! transition, the radio is reset and the record is forced to `NotCreated`.

use crate::error::{Result, SessionError, TeardownAbort};
use crate::hooks::{EventHooks, HookKind};
use crate::radio::{RangingRadio, StartRequest};
use crate::session::Session;
use crate::types::{PeerAddress, RadioStatus, SessionState};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, timeout_at, Instant};

/// Bounds applied to one teardown sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeardownPolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
}

impl Default for TeardownPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(2000),
            max_attempts: 8,
        }
    }
}

/// Drives session transitions against the radio
pub struct SessionMachine {
    radio: Arc<dyn RangingRadio>,
    hooks: Arc<EventHooks>,
    policy: TeardownPolicy,
}

impl SessionMachine {
    pub fn new(radio: Arc<dyn RangingRadio>, hooks: Arc<EventHooks>, policy: TeardownPolicy) -> Self {
        Self {
            radio,
            hooks,
            policy,
        }
    }

    pub fn policy(&self) -> TeardownPolicy {
        self.policy
    }

    pub fn radio(&self) -> &dyn RangingRadio {
        self.radio.as_ref()
    }

    /// Run a radio call with the policy timeout
    pub(crate) async fn within<F, T>(&self, what: &str, call: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        timeout(self.policy.timeout, call)
            .await
            .map_err(|_| SessionError::Timeout(what.to_string()))
    }

    /// Create and start the session on the radio
    ///
    /// The record is marked `NotStarted` before the radio call and only
    /// reaches `Started` once the radio hands back a session handle. A failed
    /// start leaves `NotStarted` so teardown can release whatever the radio
    /// half-created.
    pub async fn start(&self, session: &Session, request: StartRequest) -> Result<u32> {
        let peer = session.peer();
        let _guard = self
            .within("waiting for session transition", session.transition_guard().lock())
            .await?;

        if session.state() == SessionState::Started {
            return Err(SessionError::AlreadyStarted { peer });
        }

        session.set_state(SessionState::NotStarted);
        match self.within("session start", self.radio.start(&request)).await? {
            Ok(handle) => {
                session.mark_started(handle);
                tracing::info!(
                    peer = %peer,
                    session_id = request.session_id,
                    handle = format_args!("{:04X}", handle),
                    device = %request.device_type,
                    "Ranging session started"
                );
                Ok(handle)
            }
            Err(status) => Err(SessionError::Start { peer, status }),
        }
    }

    /// Stop and release a session, recovering with a radio reset on failure
    ///
    /// `peer` is the address the request came from; it is what the
    /// session-stop hook receives, even when `session` is the registry
    /// sentinel. The hook fires exactly once per call, whatever the outcome.
    /// On `Err` the record has still been forced to `NotCreated`.
    pub async fn teardown(&self, session: &Session, peer: PeerAddress) -> Result<()> {
        if session.state() == SessionState::NotCreated {
            tracing::debug!(peer = %peer, "Session already cleared");
            self.hooks.notify(HookKind::SessionStop, &peer);
            return Ok(());
        }

        let outcome = self.run_teardown(session).await;

        if let Err(reason) = outcome {
            tracing::error!(
                peer = %peer,
                session_id = session.id(),
                reason = %reason,
                "Stop/deinit failed; applying reset recovery"
            );
            match timeout(self.policy.timeout, self.radio.reset()).await {
                Ok(status) if status.is_settled() => {}
                Ok(status) => tracing::warn!(status = %status, "Radio reset reported failure"),
                Err(_) => tracing::warn!("Radio reset timed out"),
            }
        }

        self.hooks.notify(HookKind::SessionStop, &peer);
        outcome.map_err(|reason| SessionError::Teardown { peer, reason })
    }

    /// Walk the record down to `NotCreated`
    ///
    /// Any abort forces the record to `NotCreated` before the guard is
    /// released, so a teardown queued behind this one finds nothing to do.
    async fn run_teardown(&self, session: &Session) -> std::result::Result<(), TeardownAbort> {
        let deadline = Instant::now() + self.policy.timeout;
        let _guard = match timeout_at(deadline, session.transition_guard().lock()).await {
            Ok(guard) => guard,
            Err(_) => {
                session.set_state(SessionState::NotCreated);
                return Err(TeardownAbort::Timeout);
            }
        };

        let outcome = self.step_down(session, deadline).await;
        if outcome.is_err() {
            session.set_state(SessionState::NotCreated);
        }
        outcome
    }

    async fn step_down(
        &self,
        session: &Session,
        deadline: Instant,
    ) -> std::result::Result<(), TeardownAbort> {
        let id = session.id();
        let mut attempts = 0u32;

        loop {
            let state = session.state();
            if state != SessionState::NotCreated {
                if Instant::now() > deadline {
                    return Err(TeardownAbort::Timeout);
                }
                attempts += 1;
                if attempts > self.policy.max_attempts {
                    return Err(TeardownAbort::AttemptsExhausted);
                }
            }

            match state {
                SessionState::NotCreated => return Ok(()),
                SessionState::Started => {
                    tracing::debug!(session_id = id, handle = ?session.handle(), "Stopping session");
                    let status = bounded(deadline, self.radio.stop(id)).await?;
                    tracing::debug!(session_id = id, status = %status, "Stop returned");
                    settled(status)?;
                    session.set_state(SessionState::NotStarted);
                }
                SessionState::NotStarted => {
                    // Ranging may still be running if a start half-succeeded.
                    let _ = bounded(deadline, self.radio.stop(id)).await?;

                    tracing::debug!(session_id = id, handle = ?session.handle(), "Deinit session");
                    let status = bounded(deadline, self.radio.deinit(id)).await?;
                    tracing::debug!(session_id = id, status = %status, "Deinit returned");
                    settled(status)?;
                    session.set_state(SessionState::NotCreated);
                }
            }
        }
    }
}

async fn bounded<F>(deadline: Instant, call: F) -> std::result::Result<RadioStatus, TeardownAbort>
where
    F: Future<Output = RadioStatus>,
{
    timeout_at(deadline, call)
        .await
        .map_err(|_| TeardownAbort::Timeout)
}

fn settled(status: RadioStatus) -> std::result::Result<(), TeardownAbort> {
    if status.is_settled() {
        Ok(())
    } else {
        Err(TeardownAbort::Radio(status))
    }
}
