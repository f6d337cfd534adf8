//! Reader state - modes, lookup snapshots, and pacing parameters

use std::fmt;
use std::time::Duration;

use crate::command::Scope;
use crate::config::ReaderConfig;
use crate::error::ConfigError;

/// Gap kept between display time and the next chunk's pre-render
pub const OVERLAP_GAP_MS: u64 = 200;

/// Modes the reader can be in outside of lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No document loaded
    Idle,
    /// Showing chunks, manually or auto-advancing
    Presenting,
    /// Reading paused; transcripts are echoed as captions
    CommandMode,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Idle => write!(f, "Idle"),
            Mode::Presenting => write!(f, "Presenting"),
            Mode::CommandMode => write!(f, "Command"),
        }
    }
}

/// Where to return to when lookup ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub mode: Mode,
    pub index: usize,
}

/// Observable reader state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Idle,
    Presenting { auto_advancing: bool },
    CommandMode,
    LookupActive(Snapshot),
}

impl ReaderState {
    pub fn scope(&self) -> Scope {
        match self {
            ReaderState::Idle => Scope::Idle,
            ReaderState::Presenting { .. } => Scope::Presenting,
            ReaderState::CommandMode => Scope::CommandMode,
            ReaderState::LookupActive(_) => Scope::Lookup,
        }
    }
}

/// Allowed range for reading speed and overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedBounds {
    pub min_ms: u64,
    pub max_ms: u64,
    pub overlap_floor_ms: u64,
    pub step_ms: u64,
}

impl SpeedBounds {
    pub fn new(min_ms: u64, max_ms: u64, overlap_floor_ms: u64, step_ms: u64) -> Result<Self, ConfigError> {
        // Overlap floor has to stay below the fastest speed
        if min_ms == 0 || min_ms > max_ms || overlap_floor_ms >= min_ms {
            return Err(ConfigError::SpeedBounds {
                min: min_ms,
                max: max_ms,
                floor: overlap_floor_ms,
            });
        }
        Ok(Self {
            min_ms,
            max_ms,
            overlap_floor_ms,
            step_ms,
        })
    }
}

impl Default for SpeedBounds {
    fn default() -> Self {
        Self {
            min_ms: 500,
            max_ms: 10_000,
            overlap_floor_ms: 400,
            step_ms: 500,
        }
    }
}

/// Display time per chunk and the delay before the next chunk renders.
/// `overlap_ms < speed_ms` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    speed_ms: u64,
    overlap_ms: u64,
    bounds: SpeedBounds,
}

impl Timing {
    pub fn new(speed_ms: u64, overlap_ms: u64, bounds: SpeedBounds) -> Self {
        let speed_ms = speed_ms.clamp(bounds.min_ms, bounds.max_ms);
        let overlap_ms = overlap_ms
            .min(speed_ms.saturating_sub(OVERLAP_GAP_MS))
            .max(bounds.overlap_floor_ms)
            .min(speed_ms - 1);
        Self {
            speed_ms,
            overlap_ms,
            bounds,
        }
    }

    pub fn from_config(config: &ReaderConfig) -> Result<Self, ConfigError> {
        let bounds = SpeedBounds::new(
            config.min_speed_ms,
            config.max_speed_ms,
            config.overlap_floor_ms,
            config.speed_step_ms,
        )?;
        Ok(Self::new(config.speed_ms, config.overlap_ms, bounds))
    }

    pub fn speed_ms(&self) -> u64 {
        self.speed_ms
    }

    pub fn overlap_ms(&self) -> u64 {
        self.overlap_ms
    }

    pub fn overlap(&self) -> Duration {
        Duration::from_millis(self.overlap_ms)
    }

    pub fn bounds(&self) -> SpeedBounds {
        self.bounds
    }

    /// Shorter display time. Returns false when already at the bound.
    pub fn speed_up(&mut self) -> bool {
        self.adjust(-(self.bounds.step_ms as i64))
    }

    /// Longer display time. Returns false when already at the bound.
    pub fn slow_down(&mut self) -> bool {
        self.adjust(self.bounds.step_ms as i64)
    }

    fn adjust(&mut self, delta_ms: i64) -> bool {
        let before = self.speed_ms;
        let speed = (self.speed_ms as i64 + delta_ms)
            .clamp(self.bounds.min_ms as i64, self.bounds.max_ms as i64) as u64;

        self.speed_ms = speed;
        self.overlap_ms = speed
            .saturating_sub(OVERLAP_GAP_MS)
            .clamp(self.bounds.overlap_floor_ms, speed - 1);
        speed != before
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::new(5000, 1800, SpeedBounds::default())
    }
}
