//! Common test utilities for tubedrop integration tests

#[allow(dead_code)]
pub mod assertions;
#[allow(dead_code)]
pub mod fakes;

#[allow(unused_imports)]
pub use assertions::*;
pub use fakes::*;
