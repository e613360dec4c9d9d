//! Shared test utilities for the fourwings heatmap workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic 4wings payload encoders
//! - Deterministic value generators
//! - Common fixtures (sublayers, time ranges, response headers)
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{encode_cells, CellRecord};
//! ```

pub mod fixtures;
pub mod generators;
pub mod payload;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use payload::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Macro for element-wise approximate equality of float slices.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_slice_approx_eq;
///
/// assert_slice_approx_eq!(&[1.0001, 2.0], &[1.0, 2.0], 0.001);
/// ```
#[macro_export]
macro_rules! assert_slice_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: &[f64] = $left;
        let right: &[f64] = $right;
        if left.len() != right.len() {
            panic!(
                "assertion failed: slice lengths differ\n  left: `{:?}`,\n right: `{:?}`",
                left, right
            );
        }
        for (l, r) in left.iter().zip(right.iter()) {
            $crate::assert_approx_eq!(*l, *r, $epsilon);
        }
    }};
}
