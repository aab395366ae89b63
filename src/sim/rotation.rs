//! Global rotational state
//!
//! One orientation + angular velocity for the whole field. Corner collisions
//! add torque; the tick damps it and integrates it into the orientation with
//! a single small-angle step. Approximate on purpose: this is a feedback
//! signal, not a rigid body.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::consts::*;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationalState {
    pub orientation: Quat,
    pub angular_velocity: Vec3,
}

impl Default for RotationalState {
    fn default() -> Self {
        Self {
            orientation: Quat::IDENTITY,
            angular_velocity: Vec3::ZERO,
        }
    }
}

impl RotationalState {
    /// Angular velocity is above the rest threshold
    #[inline]
    pub fn is_spinning(&self) -> bool {
        self.angular_velocity.length_squared() > ROTATION_EPSILON
    }

    /// Decay angular velocity, then fold one step of it into the orientation
    pub fn damp_and_integrate(&mut self) {
        self.angular_velocity *= ANGULAR_DAMPING;

        if self.is_spinning() {
            let angle = self.angular_velocity.length();
            let axis = self.angular_velocity / angle;
            let delta = Quat::from_axis_angle(axis, angle);
            self.orientation = (delta * self.orientation).normalize();
        }
    }

    /// Accumulate a torque contribution
    #[inline]
    pub fn apply_torque(&mut self, torque: Vec3) {
        self.angular_velocity += torque;
    }

    /// Pseudo-Coriolis frequency drift for a particle anchored at `position`:
    /// the components of omega x position, summed and scaled
    pub fn coriolis_drift(&self, position: Vec3) -> f32 {
        self.angular_velocity.cross(position).element_sum() * CORIOLIS_SCALE
    }

    pub fn angular_speed(&self) -> f32 {
        self.angular_velocity.length()
    }
}
