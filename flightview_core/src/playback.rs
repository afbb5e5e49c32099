//! The animation clock
//!
//! One shared, fractional time index drives every visible trajectory. The
//! index counts points of the longest visible trajectory, not seconds:
//! trajectories stay aligned by sample index, and shorter ones hold their
//! last pose once the shared index runs past them.
//!
//! Playback loops. A tick that reaches `max_index` wraps to 0 instead of
//! stopping.

use serde::{Deserialize, Serialize};

/// Transport state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Paused,
    Playing,
}

/// Snapshot bound to the time slider and transport buttons.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationState {
    pub playing: bool,
    pub current_time_index: f64,
    pub playback_speed: f64,
}

impl Default for AnimationState {
    fn default() -> Self {
        Self {
            playing: false,
            current_time_index: 0.0,
            playback_speed: 1.0,
        }
    }
}

/// Owner of the [`AnimationState`].
#[derive(Debug, Clone, Default)]
pub struct AnimationClock {
    state: AnimationState,
    max_index: usize,
}

impl AnimationClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a paused clock at index 0 with the given speed.
    pub fn with_speed(speed: f64) -> Self {
        let mut clock = Self::new();
        clock.set_speed(speed);
        clock
    }

    pub fn play(&mut self) {
        self.state.playing = true;
    }

    pub fn pause(&mut self) {
        self.state.playing = false;
    }

    pub fn toggle(&mut self) {
        self.state.playing = !self.state.playing;
    }

    /// Jumps to `index`, clamped into `[0, max_index]`. Keeps play state.
    pub fn seek(&mut self, index: f64) {
        if index.is_nan() {
            return;
        }
        self.state.current_time_index = index.clamp(0.0, self.max_index as f64);
    }

    /// Sets the speed multiplier (indices per tick). Range is the caller's
    /// business; non-finite values are ignored.
    pub fn set_speed(&mut self, multiplier: f64) {
        if multiplier.is_finite() {
            self.state.playback_speed = multiplier;
        }
    }

    /// Updates the loop bound after the trajectory set changed.
    pub fn set_max_index(&mut self, max_index: usize) {
        self.max_index = max_index;
        let max = max_index as f64;
        if self.state.current_time_index > max {
            self.state.current_time_index = max;
        }
    }

    /// Back to index 0, paused. Speed is kept.
    pub fn reset(&mut self) {
        self.state.playing = false;
        self.state.current_time_index = 0.0;
        self.max_index = 0;
    }

    /// Advances one frame if playing. Returns whether the index moved.
    pub fn tick(&mut self) -> bool {
        if !self.state.playing {
            return false;
        }

        let next = self.state.current_time_index + self.state.playback_speed;
        self.state.current_time_index = if next >= self.max_index as f64 || next < 0.0 {
            0.0
        } else {
            next
        };
        true
    }

    /// Point index for a trajectory of `len` points: the floored shared
    /// index, clamped to that trajectory's last point.
    pub fn frame_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let floored = self.state.current_time_index.floor().max(0.0) as usize;
        Some(floored.min(len - 1))
    }

    pub fn playback_state(&self) -> PlaybackState {
        if self.state.playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state.playing
    }

    pub fn current_time_index(&self) -> f64 {
        self.state.current_time_index
    }

    pub fn playback_speed(&self) -> f64 {
        self.state.playback_speed
    }

    pub fn max_index(&self) -> usize {
        self.max_index
    }

    pub fn snapshot(&self) -> AnimationState {
        self.state
    }
}
