//! Volume stage between playback sources and the destination.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::sync::Arc;

use parking_lot::Mutex;

/// An exponential approach towards a target value.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TargetRamp {
    start_value: f32,
    target: f32,
    start_time: f64,
    time_constant: f64,
}

/// Snapshot of a gain parameter, cheap to evaluate per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainAutomation {
    value: f32,
    ramp: Option<TargetRamp>,
}

impl GainAutomation {
    const fn constant(value: f32) -> Self {
        Self { value, ramp: None }
    }

    /// Evaluate the gain at a context time in seconds.
    ///
    /// Follows `v(t) = target + (v0 - target) * e^(-(t - t0) / tau)` once the
    /// ramp has started.
    pub fn value_at(&self, time: f64) -> f32 {
        let Some(ramp) = self.ramp else {
            return self.value;
        };

        if time <= ramp.start_time {
            return ramp.start_value;
        }
        if ramp.time_constant <= 0.0 {
            return ramp.target;
        }

        let decay = (-(time - ramp.start_time) / ramp.time_constant).exp() as f32;
        ramp.target + (ramp.start_value - ramp.target) * decay
    }

    /// The value the parameter settles at.
    pub fn target(&self) -> f32 {
        self.ramp.map_or(self.value, |r| r.target)
    }
}

/// Shared gain parameter. Clones refer to the same node.
#[derive(Debug, Clone)]
pub struct GainNode {
    automation: Arc<Mutex<GainAutomation>>,
}

impl GainNode {
    /// Create a gain node at unity gain.
    pub fn new() -> Self {
        Self::with_value(1.0)
    }

    pub fn with_value(value: f32) -> Self {
        Self {
            automation: Arc::new(Mutex::new(GainAutomation::constant(value))),
        }
    }

    /// Jump to `value` immediately, cancelling any ramp.
    pub fn set_value(&self, value: f32) {
        *self.automation.lock() = GainAutomation::constant(value);
    }

    /// Start approaching `target` at `start_time` with the given time constant.
    ///
    /// The ramp starts from whatever value the node has at `start_time`.
    pub fn set_target_at_time(&self, target: f32, start_time: f64, time_constant: f64) {
        let mut automation = self.automation.lock();
        let start_value = automation.value_at(start_time);
        *automation = GainAutomation {
            value: start_value,
            ramp: Some(TargetRamp {
                start_value,
                target,
                start_time,
                time_constant,
            }),
        };
    }

    pub fn value_at(&self, time: f64) -> f32 {
        self.automation.lock().value_at(time)
    }

    /// The value the node settles at.
    pub fn target(&self) -> f32 {
        self.automation.lock().target()
    }

    /// Copy the current automation for evaluation outside the lock.
    pub fn automation(&self) -> GainAutomation {
        *self.automation.lock()
    }

    /// Check whether two handles refer to the same node.
    pub fn same_node(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.automation, &other.automation)
    }
}

impl Default for GainNode {
    fn default() -> Self {
        Self::new()
    }
}
