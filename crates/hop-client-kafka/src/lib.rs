#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Kafka plumbing for the SCiMMA Hopskotch to Rubin Kafka relay.

pub mod auth;
pub mod config;
pub mod error;
pub mod factory;
pub mod registry;
pub mod stream;

pub use auth::{load_auth, select_matching_auth, Auth, AuthChoice};
pub use config::{KafkaConfiguration, WaitForAck};
pub use error::{Error, Result};
pub use factory::{AvroSink, KafkaProducerFactory, ProducerFactory};
pub use registry::{default_retry_policy, SchemaRegistryClient};
pub use stream::{HopMessage, HopSource, HopStream, HopUrl, SourceOpener, StartPosition};
