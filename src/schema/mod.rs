//! Request schema
//!
//! Typed wire requests for the combined and single-model predictions, and the
//! adapter that validates them into pipeline inputs.

mod adapter;
mod request;

pub use adapter::*;
pub use request::*;
