//! Opaque I/O ports the reconciliation core calls through.

pub mod gcal;
pub mod notion;
