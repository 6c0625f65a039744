//! Alert plugin contract for the vigil monitoring host.
//!
//! Defines the `AlertPlugin` trait that alert backends (Slack, email, ...)
//! implement, the alert event data model handed to them at trigger time, and
//! a registry the host uses to look plugins up by id.

pub mod event;
pub mod plugin;
pub mod registry;

pub use {
    event::{AlertEvent, CheckFailure, ImageAttachment, Recipient, ServiceStatus},
    plugin::AlertPlugin,
    registry::AlertRegistry,
};
