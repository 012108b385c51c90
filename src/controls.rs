use std::ops::RangeInclusive;

use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::shader::Shading;

pub const TESSELLATION_RANGE: RangeInclusive<i32> = 0..=8;
pub const SPEED_RANGE: RangeInclusive<f32> = 0.0..=10.0;
pub const FIRE_HEIGHT_RANGE: RangeInclusive<f32> = 0.1..=2.0;

pub const DEFAULT_COLOR: [u8; 4] = [255, 195, 75, 255];

/// Live-editable parameters, written by the UI and read once per tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Controls {
    pub tessellations: i32,
    pub speed: f32,
    pub fire_height: f32,
    pub color: [u8; 4],
    pub shading: Shading,
    /// Bumped by the "Load Scene" button
    #[serde(skip)]
    pub reload_generation: u64,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            tessellations: 5,
            speed: 1.0,
            fire_height: 1.0,
            color: DEFAULT_COLOR,
            shading: Shading::Fire,
            reload_generation: 0,
        }
    }
}

impl Controls {
    pub fn request_reload(&mut self) {
        self.reload_generation = self.reload_generation.wrapping_add(1);
    }

    /// Base color as a `[0, 1]` RGBA vector
    pub fn color_vec4(&self) -> Vec4 {
        let [r, g, b, a] = self.color.map(|c| c as f32 / 255.0);
        Vec4::new(r, g, b, a)
    }
}

fn clamp_f32(value: f32, range: &RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        *range.start()
    } else {
        value.clamp(*range.start(), *range.end())
    }
}

pub fn clamp_tessellations(level: i32) -> i32 {
    level.clamp(*TESSELLATION_RANGE.start(), *TESSELLATION_RANGE.end())
}

pub fn clamp_speed(speed: f32) -> f32 {
    clamp_f32(speed, &SPEED_RANGE)
}

pub fn clamp_fire_height(height: f32) -> f32 {
    clamp_f32(height, &FIRE_HEIGHT_RANGE)
}

/// A parameter's live value and the value last acted upon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tracked<T> {
    current: T,
    previous: T,
}

impl<T: Copy + PartialEq> Tracked<T> {
    pub fn new(initial: T) -> Self {
        Self {
            current: initial,
            previous: initial,
        }
    }

    pub fn current(&self) -> T {
        self.current
    }

    pub fn previous(&self) -> T {
        self.previous
    }

    pub fn observe(&mut self, value: T) {
        self.current = value;
    }

    /// The new value, if it has not been acted on yet
    pub fn pending(&self) -> Option<T> {
        (self.current != self.previous).then_some(self.current)
    }

    /// Record that the downstream action for `current` has been applied
    pub fn commit(&mut self) {
        self.previous = self.current;
    }
}

/// Snapshot of every parameter the control loop reacts to
#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    pub tessellations: Tracked<i32>,
    pub speed: Tracked<f32>,
    pub fire_height: Tracked<f32>,
    pub reload: Tracked<u64>,
    /// Out-of-range level already warned about
    rejected_level: Option<i32>,
}

impl ControlState {
    pub fn new(controls: &Controls) -> Self {
        let mut state = Self {
            tessellations: Tracked::new(clamp_tessellations(controls.tessellations)),
            speed: Tracked::new(clamp_speed(controls.speed)),
            fire_height: Tracked::new(clamp_fire_height(controls.fire_height)),
            reload: Tracked::new(controls.reload_generation),
            rejected_level: None,
        };
        state.clamp_level(controls.tessellations);
        state
    }

    /// Clamp a requested level, warning once per distinct out-of-range value
    fn clamp_level(&mut self, requested: i32) -> i32 {
        let level = clamp_tessellations(requested);
        if level == requested {
            self.rejected_level = None;
        } else if self.rejected_level != Some(requested) {
            log::warn!(
                "tessellations {} outside {:?}, using {}",
                requested,
                TESSELLATION_RANGE,
                level
            );
            self.rejected_level = Some(requested);
        }
        level
    }

    /// Pull the current values out of `controls`, clamped to their ranges
    pub fn observe(&mut self, controls: &Controls) {
        let level = self.clamp_level(controls.tessellations);
        self.tessellations.observe(level);
        self.speed.observe(clamp_speed(controls.speed));
        self.fire_height.observe(clamp_fire_height(controls.fire_height));
        self.reload.observe(controls.reload_generation);
    }
}
