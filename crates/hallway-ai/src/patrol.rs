//! Bounded back-and-forth patrol with a timer that triggers transits.

use serde::{Deserialize, Serialize};

/// Patrol tuning shared by all agents of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatrolTuning {
    /// Walking speed in units per second
    pub speed: f32,
    /// Half-width of the patrol band around the start point
    pub distance: f32,
    /// Seconds between transit attempts
    pub duration: f32,
    /// Seconds to wait after losing a reservation race
    pub retry_delay: f32,
}

impl Default for PatrolTuning {
    fn default() -> Self {
        Self {
            speed: 2.0,
            distance: 15.0,
            duration: 10.0,
            retry_delay: 2.0,
        }
    }
}

/// Patrol state of one agent.
#[derive(Debug, Clone)]
pub struct PatrolController {
    tuning: PatrolTuning,
    left: f32,
    right: f32,
    moving_right: bool,
    /// Seconds until the next transit attempt
    timer: f32,
}

impl PatrolController {
    /// Creates a patrol centered on `start_x` with a random initial direction.
    #[must_use]
    pub fn new(tuning: PatrolTuning, start_x: f32, rng: &mut fastrand::Rng) -> Self {
        let mut patrol = Self {
            tuning,
            left: start_x,
            right: start_x,
            moving_right: true,
            timer: tuning.duration,
        };
        patrol.rebase(start_x, rng);
        patrol
    }

    /// Recenters the patrol band on `start_x` and picks a new direction.
    ///
    /// Called whenever the agent changes zone.
    pub fn rebase(&mut self, start_x: f32, rng: &mut fastrand::Rng) {
        self.left = start_x - self.tuning.distance;
        self.right = start_x + self.tuning.distance;
        self.moving_right = rng.bool();
    }

    /// Returns the patrol band as `(left, right)`.
    #[must_use]
    pub const fn bounds(&self) -> (f32, f32) {
        (self.left, self.right)
    }

    /// Returns the tuning in use.
    #[must_use]
    pub const fn tuning(&self) -> &PatrolTuning {
        &self.tuning
    }

    /// Returns whether the agent is heading right.
    #[must_use]
    pub const fn is_moving_right(&self) -> bool {
        self.moving_right
    }

    /// Returns the seconds left until the next transit attempt.
    #[must_use]
    pub const fn timer(&self) -> f32 {
        self.timer
    }

    /// Advances `x` by one step, turning around at the band edges.
    #[must_use]
    pub fn step(&mut self, x: f32, dt: f32) -> f32 {
        let delta = self.tuning.speed * dt;
        if self.moving_right {
            let next = x + delta;
            if next >= self.right {
                self.moving_right = false;
                return self.right;
            }
            next
        } else {
            let next = x - delta;
            if next <= self.left {
                self.moving_right = true;
                return self.left;
            }
            next
        }
    }

    /// Counts the timer down. Returns `true` once a transit attempt is due.
    pub fn tick_timer(&mut self, dt: f32) -> bool {
        self.timer -= dt;
        self.timer <= 0.0
    }

    /// Restarts the timer at the full patrol duration.
    pub fn reset_timer(&mut self) {
        self.timer = self.tuning.duration;
    }

    /// Restarts the timer at the short retry delay.
    pub fn back_off(&mut self) {
        self.timer = self.tuning.retry_delay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patrol_at(x: f32) -> PatrolController {
        let mut rng = fastrand::Rng::with_seed(3);
        PatrolController::new(PatrolTuning::default(), x, &mut rng)
    }

    #[test]
    fn test_bounds_follow_start() {
        let patrol = patrol_at(10.0);
        assert_eq!(patrol.bounds(), (-5.0, 25.0));
    }

    #[test]
    fn test_step_bounces_at_edges() {
        let mut patrol = patrol_at(0.0);
        let mut x = 0.0;

        // Two full sweeps touch both edges.
        let mut seen_left = false;
        let mut seen_right = false;
        for _ in 0..200 {
            x = patrol.step(x, 0.5);
            assert!((-15.0..=15.0).contains(&x));
            seen_left |= x <= -15.0;
            seen_right |= x >= 15.0;
        }
        assert!(seen_left && seen_right);
    }

    #[test]
    fn test_step_clamps_to_bound() {
        let mut patrol = patrol_at(0.0);
        let start_right = patrol.is_moving_right();

        let x = patrol.step(0.0, 100.0);

        let expected = if start_right { 15.0 } else { -15.0 };
        assert!((x - expected).abs() < f32::EPSILON);
        assert_ne!(patrol.is_moving_right(), start_right);
    }

    #[test]
    fn test_timer_backoff_and_reset() {
        let mut patrol = patrol_at(0.0);
        assert!(!patrol.tick_timer(9.0));
        assert!(patrol.tick_timer(1.0));

        patrol.back_off();
        assert!((patrol.timer() - 2.0).abs() < f32::EPSILON);

        patrol.reset_timer();
        assert!((patrol.timer() - 10.0).abs() < f32::EPSILON);
    }
}
