//! Per-invocation lifecycle tracking.
//!
//! ```text
//! Idle -> Building -> Sent -> Completed | Failed
//! Building -> Failed
//! Sent -> Open -> (Completed | Failed) -> Open ... -> Closed   (WebSocket)
//! ```

use restbind_core::{CallId, Transport};
use std::fmt;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallState {
    Idle,
    Building,
    Sent,
    Open,
    Completed,
    Failed,
    Closed,
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallState::Idle => "idle",
            CallState::Building => "building",
            CallState::Sent => "sent",
            CallState::Open => "open",
            CallState::Completed => "completed",
            CallState::Failed => "failed",
            CallState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{call}: illegal transition {from} -> {to} on {transport}")]
pub struct IllegalTransition {
    pub call: CallId,
    pub transport: Transport,
    pub from: CallState,
    pub to: CallState,
}

#[derive(Debug, Clone)]
pub struct PendingCall {
    id: CallId,
    transport: Transport,
    state: CallState,
}

impl PendingCall {
    pub fn new(id: CallId, transport: Transport) -> Self {
        Self {
            id,
            transport,
            state: CallState::Idle,
        }
    }

    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    /// Whether `from -> to` is a legal step for this call's transport.
    pub fn permits(&self, to: CallState) -> bool {
        use CallState::*;
        let streaming = self.transport.is_websocket();
        match (self.state, to) {
            (Idle, Building) | (Building, Sent) | (Building, Failed) => true,
            (Sent, Completed) | (Sent, Failed) => true,
            (Sent, Open) | (Open, Completed) | (Open, Failed) => streaming,
            (Completed, Open) | (Failed, Open) => streaming,
            (Open, Closed) | (Completed, Closed) | (Failed, Closed) => streaming,
            _ => false,
        }
    }

    pub fn advance(&mut self, to: CallState) -> Result<(), IllegalTransition> {
        if !self.permits(to) {
            return Err(IllegalTransition {
                call: self.id,
                transport: self.transport,
                from: self.state,
                to,
            });
        }
        trace!("{} {} -> {}", self.id, self.state, to);
        self.state = to;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        match self.state {
            CallState::Closed => true,
            CallState::Completed | CallState::Failed => !self.transport.is_websocket(),
            _ => false,
        }
    }
}
