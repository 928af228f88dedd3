//! Adaptive wheel scrolling: step size follows scroll velocity.
//!
//! Velocity is events per second, exponentially smoothed. Slow scrolling
//! moves line by line; fast flicks jump up to twenty lines, with a
//! smoothstep ramp between the two thresholds. A pause or a direction
//! change drops back to single-line steps.

use std::time::{Duration, Instant};

const DECAY: f32 = 0.85;
const SLOW_EVENTS_PER_SEC: f32 = 4.0;
const FAST_EVENTS_PER_SEC: f32 = 18.0;
const STEP_MIN: usize = 1;
const STEP_MAX: usize = 20;
const RESET_TIMEOUT: Duration = Duration::from_millis(400);

#[derive(Debug, Default)]
pub struct ScrollVelocity {
    velocity: f32,
    last_event: Option<Instant>,
    last_dir: i8,
}

fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

impl ScrollVelocity {
    pub fn new() -> ScrollVelocity {
        ScrollVelocity::default()
    }

    /// Lines to scroll for one wheel event in direction `dir` (+1 down,
    /// -1 up) arriving at `now`.
    pub fn step(&mut self, dir: i8, now: Instant) -> usize {
        let elapsed = self.last_event.map(|t| now.saturating_duration_since(t));
        if dir != self.last_dir || elapsed.is_none_or(|e| e > RESET_TIMEOUT) {
            self.velocity = 0.0;
        } else if let Some(e) = elapsed {
            let dt = e.as_secs_f32().max(1e-3);
            let instantaneous = 1.0 / dt;
            self.velocity = self.velocity * DECAY + instantaneous * (1.0 - DECAY);
        }
        self.last_event = Some(now);
        self.last_dir = dir;

        if self.velocity <= SLOW_EVENTS_PER_SEC {
            STEP_MIN
        } else if self.velocity >= FAST_EVENTS_PER_SEC {
            STEP_MAX
        } else {
            let t = (self.velocity - SLOW_EVENTS_PER_SEC)
                / (FAST_EVENTS_PER_SEC - SLOW_EVENTS_PER_SEC);
            let range = (STEP_MAX - STEP_MIN) as f32;
            STEP_MIN + (smoothstep(t) * range).round() as usize
        }
    }
}
