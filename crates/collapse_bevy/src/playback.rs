//! Pacing for round-by-round collapse.
//!
//! Controls play/pause and how many rounds run per app update.

use bevy::prelude::*;

/// Upper bound for `rounds_per_update`.
pub const MAX_ROUNDS_PER_UPDATE: usize = 100_000;

#[derive(Resource, Debug, Clone, PartialEq, Eq)]
pub struct CollapsePlayback {
    /// Whether rounds advance on each update.
    pub playing: bool,
    /// Rounds run per update while playing.
    pub rounds_per_update: usize,
    /// Rounds run since the current attempt started.
    pub rounds_played: usize,
    /// Set once the current attempt completed or failed.
    pub finished: bool,
}

impl Default for CollapsePlayback {
    fn default() -> Self {
        Self {
            playing: true,
            rounds_per_update: 1,
            rounds_played: 0,
            finished: false,
        }
    }
}

impl CollapsePlayback {
    pub fn new(rounds_per_update: usize) -> Self {
        let mut playback = Self::default();
        playback.set_rounds_per_update(rounds_per_update);
        playback
    }

    pub fn toggle_play(&mut self) {
        self.playing = !self.playing;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    /// Back to round zero for a new attempt. Play/pause is kept.
    pub fn reset(&mut self) {
        self.rounds_played = 0;
        self.finished = false;
    }

    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Count one round.
    pub fn advance(&mut self) {
        if !self.finished {
            self.rounds_played += 1;
        }
    }

    /// Whether rounds should run this update.
    pub fn wants_rounds(&self) -> bool {
        self.playing && !self.finished
    }

    /// Clamped to `1..=MAX_ROUNDS_PER_UPDATE`.
    pub fn set_rounds_per_update(&mut self, rounds: usize) {
        self.rounds_per_update = rounds.clamp(1, MAX_ROUNDS_PER_UPDATE);
    }
}
