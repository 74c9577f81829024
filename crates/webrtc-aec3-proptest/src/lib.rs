//! Property-based test support for the echo canceller control plane.
//!
//! Provides block and filter-energy generators and float comparison
//! utilities shared by the tests of `webrtc-aec3-control`.
//!
//! # Usage
//!
//! ```ignore
//! use webrtc_aec3_proptest::generators::*;
//! use test_strategy::proptest;
//!
//! #[proptest]
//! fn my_test(#[strategy(render_block(32768.0))] block: Vec<f32>) {
//!     assert_eq!(block.len(), BLOCK_SIZE);
//! }
//! ```

pub mod comparison;
pub mod generators;

pub use proptest;
pub use test_strategy;
