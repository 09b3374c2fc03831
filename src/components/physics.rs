use glam::{Vec2, Vec3};

use crate::config::MovementConfig;

/// Height above the ground plane still counted as standing on it.
const GROUND_SKIN: f32 = 0.02;

/// Kinematic state a character's states read and write every tick.
#[derive(Debug, Clone)]
pub struct MotionState {
    pub position: Vec3,
    /// Heading in radians about +Y; zero faces +Z.
    pub yaw: f32,
    pub grounded: bool,
    pub vertical_velocity: f32,
    /// Horizontal speed measured from the last corrected displacement.
    pub horizontal_speed: f32,
    /// Smoothing velocity carried between rotation updates.
    pub rotation_velocity: f32,
    pub jump_cooldown: f32,
    pub fall_timeout: f32,
    pub action_rotation_window: f32,
    pub air_control_window: f32,
}

impl MotionState {
    pub fn new(position: Vec3, yaw: f32, movement: &MovementConfig) -> Self {
        Self {
            position,
            yaw,
            grounded: true,
            vertical_velocity: 0.0,
            horizontal_speed: 0.0,
            rotation_velocity: 0.0,
            jump_cooldown: 0.0,
            fall_timeout: movement.fall_timeout,
            action_rotation_window: 0.0,
            air_control_window: movement.air_control_duration,
        }
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(self.yaw.sin(), 0.0, self.yaw.cos())
    }

    pub fn right(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.0, -self.yaw.sin())
    }

    /// Character-relative direction for a strafe input (x = right, y = forward).
    pub fn strafe(&self, axis: Vec2) -> Vec3 {
        self.right() * axis.x + self.forward() * axis.y
    }

    pub fn horizontal_position(&self) -> Vec2 {
        Vec2::new(self.position.x, self.position.z)
    }
}

// ---------------------------------------------------------------------------
// Movement integrator
// ---------------------------------------------------------------------------

/// Result of sweeping a character through the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sweep {
    pub displacement: Vec3,
    pub grounded: bool,
}

/// Collision response: turns a requested displacement into a corrected one.
pub trait MovementIntegrator: Send + Sync {
    fn sweep(&self, position: Vec3, displacement: Vec3, radius: f32) -> Sweep;
}

/// An infinite horizontal plane.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatGround {
    pub height: f32,
}

impl MovementIntegrator for FlatGround {
    fn sweep(&self, position: Vec3, displacement: Vec3, _radius: f32) -> Sweep {
        let mut target = position + displacement;
        if target.y < self.height {
            target.y = self.height;
        }
        Sweep {
            displacement: target - position,
            grounded: target.y <= self.height + GROUND_SKIN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_and_right_are_orthogonal() {
        let motion = MotionState::new(Vec3::ZERO, 0.7, &MovementConfig::default());
        assert!(motion.forward().dot(motion.right()).abs() < 1e-6);
        assert!((motion.forward().length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_yaw_faces_positive_z() {
        let motion = MotionState::new(Vec3::ZERO, 0.0, &MovementConfig::default());
        assert!((motion.forward() - Vec3::Z).length() < 1e-6);
        assert!((motion.right() - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_flat_ground_blocks_descent() {
        let ground = FlatGround::default();
        let sweep = ground.sweep(Vec3::ZERO, Vec3::new(1.0, -0.5, 0.0), 0.5);
        assert_eq!(sweep.displacement, Vec3::new(1.0, 0.0, 0.0));
        assert!(sweep.grounded);
    }

    #[test]
    fn test_flat_ground_airborne_above_skin() {
        let ground = FlatGround::default();
        let sweep = ground.sweep(Vec3::ZERO, Vec3::new(0.0, 0.1, 0.0), 0.5);
        assert!(!sweep.grounded);
    }
}
