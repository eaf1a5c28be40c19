//! Session state machine
//!
//! ```text
//!  AwaitingRequest ──subscribe──► Observing ──┐
//!         │                                   │ EOF / error
//!         └──get/set/list──► Responding ──────┴──► Closed
//! ```
//!
//! Any read error, framing error or end of stream moves straight to `Closed`.

use std::time::Instant;

/// Per-connection protocol phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the first request
    AwaitingRequest,
    /// One-shot request accepted; the reply is the last thing sent
    Responding,
    /// Registered as an observer until disconnect
    Observing,
    /// Torn down
    Closed,
}

/// Session state
#[derive(Debug)]
pub struct SessionState {
    /// Current phase
    pub phase: SessionPhase,

    /// Connection start time
    pub connected_at: Instant,

    /// Frames decoded on this connection
    pub frames_received: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::AwaitingRequest,
            connected_at: Instant::now(),
            frames_received: 0,
        }
    }

    /// Count a decoded frame
    pub fn on_frame(&mut self) {
        self.frames_received += 1;
    }

    /// A one-shot request was accepted
    pub fn on_request(&mut self) {
        if self.phase == SessionPhase::AwaitingRequest {
            self.phase = SessionPhase::Responding;
        }
    }

    /// The connection became an observer
    pub fn on_subscribe(&mut self) {
        if self.phase == SessionPhase::AwaitingRequest {
            self.phase = SessionPhase::Observing;
        }
    }

    pub fn close(&mut self) {
        self.phase = SessionPhase::Closed;
    }

    pub fn is_observer(&self) -> bool {
        self.phase == SessionPhase::Observing
    }

    pub fn is_closed(&self) -> bool {
        self.phase == SessionPhase::Closed
    }

    /// Get session duration
    pub fn duration(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_shot_lifecycle() {
        let mut state = SessionState::new();
        assert_eq!(state.phase, SessionPhase::AwaitingRequest);

        state.on_request();
        assert_eq!(state.phase, SessionPhase::Responding);
        assert!(!state.is_observer());

        state.close();
        assert!(state.is_closed());
    }

    #[test]
    fn test_observer_lifecycle() {
        let mut state = SessionState::new();

        state.on_subscribe();
        assert!(state.is_observer());

        // Observing is terminal until close
        state.on_request();
        assert_eq!(state.phase, SessionPhase::Observing);

        state.close();
        assert!(state.is_closed());
        assert!(!state.is_observer());
    }

    #[test]
    fn test_no_subscribe_after_request() {
        let mut state = SessionState::new();
        state.on_request();
        state.on_subscribe();

        assert_eq!(state.phase, SessionPhase::Responding);
    }
}
