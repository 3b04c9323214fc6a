#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

//! # hop-client
//!
//! Relay SCiMMA Hopskotch topics into the Rubin Kafka cluster:
//! - [`HopProducer`] reads a Hopskotch topic and produces Avro heartbeat records
//! - [`cli`] parses flags, merges them over the TOML config file and runs the relay
//! - [`config_handlers`] inspects and edits the config file

pub mod cli;
pub mod config;
pub mod config_handlers;
pub mod error;
pub mod logging;
pub mod producer;

pub use config::HopClientConfig;
pub use error::{Error, Result};
pub use producer::{HopProducer, HopProducerConfig, DEFAULT_HOP_TOPIC, DEFAULT_SCIMMA_HOSTNAME};
