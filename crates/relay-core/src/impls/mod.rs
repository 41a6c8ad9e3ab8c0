//! Impls - production implementations of the ports.

pub mod http_transport;

pub use self::http_transport::{HttpTransport, interpret_response};
