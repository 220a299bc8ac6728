//! Per-room turn countdown for Seasapper.
//!
//! A [`TurnClock`] counts a turn down one second at a time. It can be
//! paused and resumed without losing the remaining seconds, reset when the
//! turn changes, and stopped when the game ends.
//!
//! # Stale ticks
//!
//! Every state change bumps a generation counter, and every [`ClockTick`]
//! carries the generation it was produced under. [`TurnClock::consume`]
//! rejects a tick from an older generation, so a tick that raced with a
//! pause or a turn change can never count down the new turn.
//!
//! # Integration
//!
//! The clock sits inside a room actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = rx.recv() => { /* handle commands */ }
//!         tick = clock.wait_for_tick() => {
//!             if let Some(left) = clock.consume(tick) {
//!                 /* broadcast `left`, auto-skip at 0 */
//!             }
//!         }
//!     }
//! }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Countdown settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockConfig {
    /// Seconds a player gets per turn.
    pub turn_time_secs: u32,
    /// Wall time between two countdown steps. One second in production;
    /// tests may shorten it.
    pub tick_interval: Duration,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            turn_time_secs: 60,
            tick_interval: Duration::from_secs(1),
        }
    }
}

impl ClockConfig {
    /// Shortest accepted tick interval.
    pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(10);

    /// Fix out-of-range values so the config is safe to use.
    ///
    /// Called by [`TurnClock::new`]. A zero turn time becomes one second and
    /// the interval is raised to [`Self::MIN_TICK_INTERVAL`].
    pub fn validated(mut self) -> Self {
        if self.turn_time_secs == 0 {
            warn!("turn_time_secs is 0, using 1");
            self.turn_time_secs = 1;
        }
        if self.tick_interval < Self::MIN_TICK_INTERVAL {
            warn!(
                interval_ms = self.tick_interval.as_millis() as u64,
                "tick interval too short, clamping"
            );
            self.tick_interval = Self::MIN_TICK_INTERVAL;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tick
// ---------------------------------------------------------------------------

/// A countdown step produced by [`TurnClock::wait_for_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTick {
    /// Clock generation at the time the tick fired.
    pub generation: u64,
    /// Monotonic tick number, starting at 1.
    pub tick: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Running,
    Paused,
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Turn countdown for one room. Owned by the room actor.
#[derive(Debug)]
pub struct TurnClock {
    config: ClockConfig,
    state: ClockState,
    remaining: u32,
    generation: u64,
    tick_count: u64,
    next_tick: Option<TokioInstant>,
}

impl TurnClock {
    /// A stopped clock.
    pub fn new(config: ClockConfig) -> Self {
        let config = config.validated();
        Self {
            remaining: config.turn_time_secs,
            config,
            state: ClockState::Stopped,
            generation: 0,
            tick_count: 0,
            next_tick: None,
        }
    }

    /// Starts a fresh turn at full time.
    pub fn start(&mut self) {
        self.restart();
        debug!(
            generation = self.generation,
            turn_time = self.remaining,
            "turn clock started"
        );
    }

    /// Restarts the countdown at full time for a new (or continued) turn.
    pub fn reset(&mut self) {
        self.restart();
        trace!(generation = self.generation, "turn clock reset");
    }

    /// Freezes the countdown, keeping the remaining seconds.
    ///
    /// No-op unless running.
    pub fn pause(&mut self) {
        if self.state != ClockState::Running {
            return;
        }
        self.state = ClockState::Paused;
        self.next_tick = None;
        self.generation += 1;
        debug!(remaining = self.remaining, "turn clock paused");
    }

    /// Continues a paused countdown from where it stopped.
    ///
    /// A clock paused at 0 comes back at full time. No-op unless paused.
    pub fn resume(&mut self) {
        if self.state != ClockState::Paused {
            return;
        }
        if self.remaining == 0 {
            self.remaining = self.config.turn_time_secs;
        }
        self.state = ClockState::Running;
        self.next_tick = Some(TokioInstant::now() + self.config.tick_interval);
        self.generation += 1;
        debug!(remaining = self.remaining, "turn clock resumed");
    }

    pub fn stop(&mut self) {
        if self.state == ClockState::Stopped {
            return;
        }
        self.state = ClockState::Stopped;
        self.next_tick = None;
        self.generation += 1;
        debug!("turn clock stopped");
    }

    /// Waits for the next countdown step.
    ///
    /// Pends forever while the clock is not running, which lets a
    /// `select!` loop keep serving its other branches. Cancel-safe: nothing
    /// changes until the sleep completes.
    pub async fn wait_for_tick(&mut self) -> ClockTick {
        let next = match self.next_tick {
            Some(next) if self.state == ClockState::Running => next,
            _ => std::future::pending().await,
        };

        time::sleep_until(next).await;

        let now = TokioInstant::now();
        let interval = self.config.tick_interval;
        let late_by = now.saturating_duration_since(next);
        if late_by > interval / 10 {
            warn!(
                tick = self.tick_count + 1,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "turn clock tick fired late"
            );
        }

        // Schedule from now so a slow room never bursts ticks.
        self.next_tick = Some(now + interval);
        self.tick_count += 1;
        trace!(tick = self.tick_count, generation = self.generation, "clock tick");

        ClockTick {
            generation: self.generation,
            tick: self.tick_count,
        }
    }

    /// Applies a tick and returns the seconds left, or `None` if the tick
    /// is stale or the clock is not running.
    pub fn consume(&mut self, tick: ClockTick) -> Option<u32> {
        if tick.generation != self.generation || self.state != ClockState::Running {
            debug!(
                tick_generation = tick.generation,
                generation = self.generation,
                state = ?self.state,
                "ignoring stale clock tick"
            );
            return None;
        }
        self.remaining = self.remaining.saturating_sub(1);
        Some(self.remaining)
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn turn_time(&self) -> u32 {
        self.config.turn_time_secs
    }

    fn restart(&mut self) {
        self.remaining = self.config.turn_time_secs;
        self.state = ClockState::Running;
        self.next_tick = Some(TokioInstant::now() + self.config.tick_interval);
        self.generation += 1;
    }
}
