#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Core types for the SCiMMA Hopskotch to Rubin Kafka relay.

pub mod error;
pub mod record;
pub mod schema;
pub mod service;

pub use error::{Error, Result};
pub use record::{decode_confluent, encode_confluent, to_avro_record};
pub use schema::{
    make_avro_schema_heartbeat, make_avro_schema_heartbeat_message, parse_schema,
    HEARTBEAT_TOPIC_NAME,
};
pub use service::{ServiceHandle, ServiceState};
