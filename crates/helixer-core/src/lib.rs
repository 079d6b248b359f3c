//! # Helixer Core
//!
//! Change detection and metric encoding for the Helixer bridge.
//!
//! This crate provides:
//! - State records captured from the event source
//! - Typed metrics and messages (Sparkplug-B-like payload model)
//! - Value inference for untyped state values
//! - Attribute diffing and one-level flattening
//! - The stateless [`encode`] function that turns a previous/current pair
//!   into a delta message
//!
//! Nothing in here performs I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod diff;
pub mod encoder;
pub mod event;
pub mod record;
pub mod value;

pub use diff::changed_attributes;
pub use encoder::encode;
pub use event::{StateChange, StateChangedEvent};
pub use record::{AttributeValue, Attributes, Message, Metric, MetricValue, StateRecord};
pub use value::{infer_value, typed_value};
