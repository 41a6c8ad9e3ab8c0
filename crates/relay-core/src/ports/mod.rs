//! Ports - seams to the outside world.
//!
//! Each trait hides one external dependency so the queue can be driven by a
//! fake in tests:
//! - `Transport`: the rate-sensitive HTTP service the queue serializes calls to
//! - `Clock`: wall-clock timestamps for status and failure records
//! - `IdGenerator`: item IDs

pub mod clock;
pub mod id_generator;
pub mod transport;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::transport::Transport;
