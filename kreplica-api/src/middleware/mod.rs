//! Request guards applied to every route.
//!
//! - [`deadline_middleware`]: bounds each request, answering 504 on expiry
//! - [`panic_response`]: turns a panicking handler into a JSON 500
//! - [`not_found`] / [`method_not_allowed`]: JSON bodies for routing misses

pub mod deadline;
pub mod fallback;
pub mod panic;

pub use deadline::deadline_middleware;
pub use fallback::{method_not_allowed, not_found};
pub use panic::panic_response;
