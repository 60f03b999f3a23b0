//! Host-facing game controller
//!
//! Wraps [`GameState`] with the frame clock so a host only has to forward
//! lifecycle commands, launch requests, and one timestamp per display refresh.

use glam::Vec2;

use crate::consts::SIM_DT;
use crate::sim::{
    EntityId, FrameClock, GameEvent, GamePhase, GameState, Snapshot, TickInput, tick,
};
use crate::tuning::Tuning;

/// Game instance holding all state
#[derive(Debug, Clone)]
pub struct Game {
    state: GameState,
    clock: FrameClock,
    input: TickInput,
}

impl Game {
    pub fn new(seed: u64, tuning: Tuning) -> Self {
        Self {
            state: GameState::new(seed, tuning),
            clock: FrameClock::new(),
            input: TickInput::default(),
        }
    }

    /// Restart at `level` (clamped to at least 1)
    pub fn start_game(&mut self, level: u32) {
        self.state.start_game(level);
        self.clock.reset();
        self.input.launches.clear();
    }

    /// Toggle pause. Resuming starts from a fresh clock baseline so the
    /// paused wall-clock time is never simulated.
    pub fn pause_toggle(&mut self) -> GamePhase {
        let phase = self.state.pause_toggle();
        self.clock.reset();
        phase
    }

    pub fn reset_game(&mut self) {
        self.state.reset_game();
        self.clock.reset();
        self.input = TickInput::default();
    }

    /// Launch toward `target` now. No-op unless running with an eligible installation.
    pub fn request_launch(&mut self, target: Vec2) -> Option<EntityId> {
        self.state.request_launch(target)
    }

    /// Queue a launch for the next simulated step
    pub fn queue_launch(&mut self, target: Vec2) {
        self.input.launches.push(target);
    }

    /// Demo mode: let the simulation pick targets
    pub fn set_autopilot(&mut self, enabled: bool) {
        self.input.autopilot = enabled;
    }

    /// Advance by the wall-clock time since the previous frame.
    /// Returns the number of fixed steps simulated.
    pub fn frame(&mut self, now_ms: f64) -> u32 {
        if self.state.phase != GamePhase::Running {
            self.clock.reset();
            return 0;
        }

        let substeps = self.clock.substeps(now_ms);
        let mut simulated = 0;
        while simulated < substeps && self.state.phase == GamePhase::Running {
            let input = self.input.clone();
            tick(&mut self.state, &input, SIM_DT);
            simulated += 1;

            // Clear one-shot inputs after processing
            self.input.launches.clear();
        }
        if self.state.phase != GamePhase::Running {
            self.clock.reset();
        }
        simulated
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.state.drain_events()
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }
}
