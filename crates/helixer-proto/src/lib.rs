//! # Helixer Protocol
//!
//! Wire encoding and MQTT topic scheme for Helixer messages.
//!
//! ## Payload
//!
//! Messages are protobuf-encoded with a Sparkplug B compatible subset:
//!
//! ```text
//! Payload { uint64 timestamp = 1; repeated Metric metrics = 2; }
//! Metric  { string name = 1; uint64 timestamp = 3;
//!           oneof value { int64 int_value = 11; double float_value = 13;
//!                         bool bool_value = 14; string string_value = 15; } }
//! ```
//!
//! ## MQTT Topics
//!
//! Topic scheme: `spBv1.0/homeassistant/DDATA/{base_path}/{entity/path}`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod messages;
pub mod topics;

pub use messages::{decode_payload, encode_message, Payload, WireError};
pub use topics::TopicScheme;
