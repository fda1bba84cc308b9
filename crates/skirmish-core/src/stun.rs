//! Stun and knockdown recovery.
//!
//! Stun is a countdown; knockdown is an indefinite stun that ends through a
//! grounded-triggered sequence: wait one tick after launch, wait until the
//! fighter lands, wait the recovery time, fire a wakeup, wait the wakeup time,
//! then clear the stun. Every stage is plain state advanced by `tick`.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Timing of the two-stage knockdown recovery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnockdownTiming {
    /// Seconds on the ground before the wakeup starts
    pub recovery: f32,
    /// Seconds the wakeup takes before control returns
    pub wakeup: f32,
}

impl Default for KnockdownTiming {
    fn default() -> Self {
        Self {
            recovery: 1.0,
            wakeup: 1.0,
        }
    }
}

/// Remaining stun.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StunTimer {
    /// Not stunned.
    Clear,
    /// Stunned for this many more seconds.
    Timed(f32),
    /// Stunned until cleared explicitly.
    Indefinite,
}

/// Stage of an in-progress knockdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum KnockdownPhase {
    /// Launched this tick; the grounded check starts next tick.
    Launched,
    /// Waiting to land.
    Falling,
    /// On the ground, seconds left before the wakeup.
    Recovering(f32),
    /// Getting up, seconds left before control returns.
    WakingUp(f32),
}

/// In-progress knockdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Knockdown {
    /// Current stage
    pub phase: KnockdownPhase,
    /// Timing captured when the knockdown started
    pub timing: KnockdownTiming,
}

/// Transition reported by `StunState::tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StunEvent {
    /// A timed stun ran out.
    Expired,
    /// A knocked-down fighter started getting up.
    WakeupStarted,
    /// A knocked-down fighter regained control.
    Recovered,
    /// A knocked-down fighter landed dead; it stays down.
    StayedDown,
}

/// Stun and knockdown state of one fighter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StunState {
    timer: StunTimer,
    knockdown: Option<Knockdown>,
}

impl Default for StunState {
    fn default() -> Self {
        Self::new()
    }
}

impl StunState {
    /// Creates an unstunned state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timer: StunTimer::Clear,
            knockdown: None,
        }
    }

    /// Seconds of stun left; `f32::INFINITY` for indefinite stun.
    #[must_use]
    pub fn remaining(&self) -> f32 {
        match self.timer {
            StunTimer::Clear => 0.0,
            StunTimer::Timed(secs) => secs,
            StunTimer::Indefinite => f32::INFINITY,
        }
    }

    /// Returns true while any stun is active.
    #[must_use]
    pub fn is_stunned(&self) -> bool {
        !matches!(self.timer, StunTimer::Clear)
    }

    /// Returns true when not stunned.
    #[must_use]
    pub fn can_act(&self) -> bool {
        !self.is_stunned()
    }

    /// Returns the in-progress knockdown.
    #[must_use]
    pub fn knockdown(&self) -> Option<&Knockdown> {
        self.knockdown.as_ref()
    }

    /// Raises the stun to `duration` if that is longer than what remains.
    ///
    /// `f32::INFINITY` requests an indefinite stun. Returns false when the
    /// request was rejected (non-positive, or not longer than the current stun).
    pub fn stun(&mut self, duration: f32) -> bool {
        if duration.is_nan() || duration <= 0.0 {
            return false;
        }
        if self.is_stunned() && duration <= self.remaining() {
            return false;
        }
        self.timer = if duration == f32::INFINITY {
            StunTimer::Indefinite
        } else {
            StunTimer::Timed(duration)
        };
        debug!(duration, "Stun raised");
        true
    }

    /// Clears the stun immediately and abandons any knockdown sequence.
    pub fn unstun(&mut self) {
        self.timer = StunTimer::Clear;
        self.knockdown = None;
    }

    /// Stuns indefinitely and (re)starts the knockdown sequence.
    pub fn knock_down(&mut self, timing: KnockdownTiming) {
        self.timer = StunTimer::Indefinite;
        self.knockdown = Some(Knockdown {
            phase: KnockdownPhase::Launched,
            timing,
        });
        debug!("Knocked down");
    }

    /// Advances the stun by `dt`.
    ///
    /// At most one knockdown stage changes per tick.
    pub fn tick(&mut self, dt: f32, grounded: bool, alive: bool) -> Option<StunEvent> {
        if let Some(knockdown) = &mut self.knockdown {
            return match knockdown.phase {
                KnockdownPhase::Launched => {
                    knockdown.phase = KnockdownPhase::Falling;
                    None
                }
                KnockdownPhase::Falling => {
                    if !grounded {
                        None
                    } else if !alive {
                        self.knockdown = None;
                        Some(StunEvent::StayedDown)
                    } else {
                        knockdown.phase = KnockdownPhase::Recovering(knockdown.timing.recovery);
                        None
                    }
                }
                KnockdownPhase::Recovering(left) => {
                    let left = left - dt;
                    if left <= 0.0 {
                        knockdown.phase = KnockdownPhase::WakingUp(knockdown.timing.wakeup);
                        debug!("Wakeup started");
                        Some(StunEvent::WakeupStarted)
                    } else {
                        knockdown.phase = KnockdownPhase::Recovering(left);
                        None
                    }
                }
                KnockdownPhase::WakingUp(left) => {
                    let left = left - dt;
                    if left <= 0.0 {
                        self.unstun();
                        debug!("Recovered from knockdown");
                        Some(StunEvent::Recovered)
                    } else {
                        knockdown.phase = KnockdownPhase::WakingUp(left);
                        None
                    }
                }
            };
        }

        if let StunTimer::Timed(left) = self.timer {
            let left = left - dt;
            if left <= 0.0 {
                self.timer = StunTimer::Clear;
                return Some(StunEvent::Expired);
            }
            self.timer = StunTimer::Timed(left);
        }
        None
    }
}
