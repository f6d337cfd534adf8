//! Auto-advance pacing
//!
//! The scheduler never sleeps itself. It hands out generation tokens; the
//! controller attaches the current token to every timer it asks the runtime
//! to arm, and a fired timer is honoured only if its token is still current.
//! Every `start`, `stop` and `reschedule` bumps the generation, which
//! invalidates whatever timer is still in flight.

use std::time::Duration;

/// Generation captured when a timer is armed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleToken(u64);

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Show the next chunk and keep the chain going
    Advance,
    /// Restart the chain after a speed-change notice
    Resume,
}

/// A timer the runtime should arm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub token: ScheduleToken,
    pub kind: TimerKind,
    pub delay: Duration,
}

impl Timer {
    pub fn fire(&self) -> Fire {
        Fire {
            token: self.token,
            kind: self.kind,
        }
    }
}

/// A timer that went off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fire {
    pub token: ScheduleToken,
    pub kind: TimerKind,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Scheduler {
    generation: u64,
    auto_advancing: bool,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new chain, invalidating any previous one
    pub fn start(&mut self) -> ScheduleToken {
        self.auto_advancing = true;
        self.bump()
    }

    /// End the chain. Repeated calls only bump the generation.
    pub fn stop(&mut self) {
        self.auto_advancing = false;
        self.bump();
    }

    /// Invalidate the in-flight timer but stay auto-advancing, so the chain
    /// can be resumed with new timing
    pub fn reschedule(&mut self) -> ScheduleToken {
        self.bump()
    }

    /// Whether a fired timer with `token` may act
    pub fn accepts(&self, token: ScheduleToken) -> bool {
        self.auto_advancing && token.0 == self.generation
    }

    pub fn is_auto_advancing(&self) -> bool {
        self.auto_advancing
    }

    pub fn token(&self) -> ScheduleToken {
        ScheduleToken(self.generation)
    }

    fn bump(&mut self) -> ScheduleToken {
        self.generation = self.generation.wrapping_add(1);
        ScheduleToken(self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_accepts_current_token() {
        let mut scheduler = Scheduler::new();
        let token = scheduler.start();
        assert!(scheduler.is_auto_advancing());
        assert!(scheduler.accepts(token));
    }

    #[test]
    fn test_stop_invalidates_token() {
        let mut scheduler = Scheduler::new();
        let token = scheduler.start();
        scheduler.stop();
        assert!(!scheduler.accepts(token));
        assert!(!scheduler.is_auto_advancing());
    }

    #[test]
    fn test_restart_invalidates_previous_chain() {
        let mut scheduler = Scheduler::new();
        let first = scheduler.start();
        let second = scheduler.start();
        assert!(!scheduler.accepts(first));
        assert!(scheduler.accepts(second));
    }

    #[test]
    fn test_stop_is_idempotent_apart_from_generation() {
        let mut once = Scheduler::new();
        once.start();
        once.stop();

        let mut twice = once.clone();
        twice.stop();

        assert_eq!(once.is_auto_advancing(), twice.is_auto_advancing());
        assert_ne!(once.token(), twice.token());
    }

    #[test]
    fn test_reschedule_keeps_auto_advancing() {
        let mut scheduler = Scheduler::new();
        let old = scheduler.start();
        let new = scheduler.reschedule();
        assert!(scheduler.is_auto_advancing());
        assert!(!scheduler.accepts(old));
        assert!(scheduler.accepts(new));
    }

    #[test]
    fn test_token_without_auto_is_rejected() {
        let mut scheduler = Scheduler::new();
        scheduler.stop();
        assert!(!scheduler.accepts(scheduler.token()));
    }
}
