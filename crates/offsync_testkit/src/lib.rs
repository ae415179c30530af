//! # offsync Testkit
//!
//! Test utilities for offsync.
//!
//! This crate provides:
//! - Queue and coordinator fixtures with a manual clock
//! - Sample task data that passes the reference validators
//! - [`ScriptedStrategy`], a strategy whose outcomes the test decides
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use offsync_testkit::prelude::*;
//!
//! #[test]
//! fn failed_payload_backs_off() {
//!     let mut q = TestQueue::new();
//!     let id = q.add(samples::menu("north").into(), 4, 2).unwrap();
//!     q.mark_failed(&id, "timeout").unwrap();
//!     assert!(q.get_ready().is_empty());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod scripted;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::scripted::*;
}

pub use fixtures::*;
pub use generators::*;
pub use scripted::*;
