//! Single-flight lanes
//!
//! A lane admits one request at a time. Acquiring it yields a
//! `FlightPermit`; dropping the permit (normally, on error, or on early
//! return) puts the lane back to `Idle`. A request arriving while the lane is
//! busy is rejected, never queued.

use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::models::RequestId;

/// State of a lane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneState {
    Idle,
    InFlight { request: RequestId },
}

/// A named single-flight lane
#[derive(Debug)]
pub struct FlightLane {
    name: &'static str,
    state: Mutex<LaneState>,
}

impl FlightLane {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(LaneState::Idle),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    // The state is a plain value, so a poisoned lock still holds a usable one
    fn lock(&self) -> MutexGuard<'_, LaneState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim the lane for `request`, or `None` if it is already in flight
    pub fn try_acquire(&self, request: RequestId) -> Option<FlightPermit<'_>> {
        let mut state = self.lock();
        match *state {
            LaneState::Idle => {
                *state = LaneState::InFlight { request };
                Some(FlightPermit {
                    lane: self,
                    request,
                })
            }
            LaneState::InFlight { request: holder } => {
                debug!(lane = self.name, %request, %holder, "lane busy, request rejected");
                None
            }
        }
    }

    pub fn state(&self) -> LaneState {
        *self.lock()
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.state(), LaneState::InFlight { .. })
    }
}

/// Proof of holding a lane; releases it on drop
#[derive(Debug)]
pub struct FlightPermit<'a> {
    lane: &'a FlightLane,
    request: RequestId,
}

impl FlightPermit<'_> {
    pub fn request(&self) -> RequestId {
        self.request
    }
}

impl Drop for FlightPermit<'_> {
    fn drop(&mut self) {
        *self.lane.lock() = LaneState::Idle;
    }
}
