//! Overlay motion
//!
//! Drag, fling and snap physics for the floating icon, plus the close zone geometry.

pub mod constants;
mod controller;
mod geometry;
mod velocity;

pub use controller::{MotionController, MotionHost, TouchEvent, TouchPhase};
pub use geometry::{Position, ScreenBounds, Size};
