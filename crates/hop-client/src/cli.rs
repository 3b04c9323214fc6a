//! Command-line interface for `run_hop_producer`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use hop_client_kafka::{
    AuthChoice, HopStream, KafkaConfiguration, KafkaProducerFactory, StartPosition, WaitForAck,
};

use crate::config::{HopClientConfig, CONFIG_ENV};
use crate::config_handlers::handle_config_command;
use crate::producer::{HopProducer, HopProducerConfig};
use crate::{logging, Error, Result};

/// Send SCiMMA messages to Kafka
#[derive(Parser, Debug)]
#[command(name = "run_hop_producer", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = CONFIG_ENV, global = true)]
    pub config: Option<String>,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// `config` subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the config file path
    Path,
    /// Print a value by dotted key (e.g. `kafka.partitions`)
    Get {
        /// Dotted key
        key: String,
    },
    /// Set a value by dotted key
    Set {
        /// Dotted key
        key: String,
        /// New value
        value: String,
    },
    /// Write a default config file
    Init {
        /// Where to write it (defaults to the resolved config path)
        #[arg(long)]
        file: Option<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Flags for running the relay. Unset flags fall back to the config file.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Kafka broker URL, without the transport. Example 'my.kafka:9000'.
    #[arg(long = "broker", env = "HOP_KAFKA_BROKER")]
    pub broker_url: Option<String>,

    /// Kafka username for SASL authentication. Required if --password is specified.
    #[arg(long, env = "HOP_KAFKA_USERNAME")]
    pub username: Option<String>,

    /// Kafka password for SASL authentication. Required if --username is specified.
    #[arg(long, env = "HOP_KAFKA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Hopskotch hostname to subscribe to. Production instance is
    /// kafka.scimma.org; development instance is dev.hop.scimma.org
    #[arg(long = "scimma-hostname", env = "HOP_SCIMMA_HOSTNAME")]
    pub scimma_hostname: Option<String>,

    /// Schema Registry URL, including the transport. Example: 'https://registry.my.kafka/'.
    #[arg(long = "registry", env = "HOP_SCHEMA_REGISTRY")]
    pub registry_url: Option<String>,

    /// Number of partitions for each Kafka topic [default: 1]
    #[arg(long, env = "HOP_KAFKA_PARTITIONS", allow_negative_numbers = true)]
    pub partitions: Option<i32>,

    /// Number of replicas for each Kafka partition [default: 3]
    #[arg(long = "replication-factor", env = "HOP_KAFKA_REPLICATION_FACTOR")]
    pub replication_factor: Option<i32>,

    /// Logging level; INFO=20 (default), DEBUG=10
    #[arg(long = "loglevel", env = "HOP_LOG_LEVEL")]
    pub log_level: Option<u8>,

    /// 0: do not wait for ack from any Kafka broker (unsafe).
    /// 1: wait for ack from one Kafka broker (default).
    /// all: wait for ack from all Kafka brokers.
    #[arg(long = "wait-ack", env = "HOP_KAFKA_WAIT_ACK", value_parser = parse_wait_for_ack)]
    pub wait_for_ack: Option<WaitForAck>,

    /// Hopskotch topic to relay [default: sys.heartbeat]
    #[arg(long, env = "HOP_TOPIC")]
    pub topic: Option<String>,

    /// Where to start reading: earliest or latest [default: latest]
    #[arg(long = "start-at", env = "HOP_START_AT", value_parser = parse_start_position)]
    pub start_at: Option<StartPosition>,

    /// Connect to Hopskotch without credentials
    #[arg(long = "no-auth")]
    pub no_auth: bool,

    /// hop-client auth.toml to read credentials from
    #[arg(long = "auth-file", env = "HOP_AUTH_FILE")]
    pub auth_file: Option<PathBuf>,
}

fn parse_wait_for_ack(s: &str) -> std::result::Result<WaitForAck, String> {
    s.parse().map_err(|e: hop_client_kafka::Error| e.to_string())
}

fn parse_start_position(s: &str) -> std::result::Result<StartPosition, String> {
    s.parse().map_err(|e: hop_client_kafka::Error| e.to_string())
}

/// Everything needed to run the relay, after merging flags and file.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Rubin Kafka settings
    pub kafka: KafkaConfiguration,
    /// Relay settings
    pub producer: HopProducerConfig,
    /// Hopskotch authentication
    pub auth: AuthChoice,
    /// Python-style log level
    pub log_level: u8,
}

/// Merge command-line flags over the config file and validate the result.
pub fn resolve(args: &RunArgs, file: &HopClientConfig) -> Result<RunSettings> {
    let broker_url = args.broker_url.clone().or_else(|| file.kafka.broker_url.clone());
    let registry_url = args
        .registry_url
        .clone()
        .or_else(|| file.kafka.registry_url.clone());
    let (Some(broker_url), Some(registry_url)) = (broker_url, registry_url) else {
        return Err(Error::usage("You must specify --broker and --registry."));
    };

    let partitions = args.partitions.unwrap_or(file.kafka.partitions);
    if partitions <= 0 {
        return Err(Error::usage(format!(
            "--partitions={partitions} must be positive"
        )));
    }

    let username = args.username.clone().or_else(|| file.kafka.username.clone());
    let password = args.password.clone().or_else(|| file.kafka.password.clone());
    match (&username, &password) {
        (Some(_), None) => {
            return Err(Error::usage(
                "You must specify --password if you specify --username.",
            ));
        }
        (None, Some(_)) => {
            return Err(Error::usage(
                "You must specify --username if you specify --password.",
            ));
        }
        _ => {}
    }

    let kafka = KafkaConfiguration {
        broker_url,
        sasl_plain_username: username,
        sasl_plain_password: password,
        registry_url,
        partitions,
        replication_factor: args
            .replication_factor
            .unwrap_or(file.kafka.replication_factor),
        wait_for_ack: args.wait_for_ack.unwrap_or(file.kafka.wait_for_ack),
    };
    kafka.validate()?;

    let producer = HopProducerConfig {
        scimma_hostname: args
            .scimma_hostname
            .clone()
            .unwrap_or_else(|| file.hop.scimma_hostname.clone()),
        topic: args.topic.clone().unwrap_or_else(|| file.hop.topic.clone()),
        start_position: args.start_at.unwrap_or(file.hop.start_at),
    };

    let auth = if args.no_auth || file.hop.no_auth {
        AuthChoice::NoAuth
    } else if let Some(path) = args.auth_file.clone().or_else(|| file.hop.auth_file.clone()) {
        AuthChoice::File(path)
    } else {
        AuthChoice::Current
    };

    Ok(RunSettings {
        kafka,
        producer,
        auth,
        log_level: args.log_level.unwrap_or(file.logging.level),
    })
}

/// Dispatch a parsed command line.
///
/// Usage problems come back as [`Error::Usage`] so the binary can report
/// them the way clap reports its own parse errors.
pub async fn run_hop_producer(cli: Cli) -> Result<()> {
    if let Some(Command::Config { action }) = cli.command {
        return handle_config_command(cli.config.as_deref(), action);
    }

    let file = HopClientConfig::load(cli.config.as_deref())?;
    let settings = resolve(&cli.run, &file)?;
    logging::init_logging(settings.log_level)?;

    tracing::info!(
        broker = %settings.kafka.broker_url,
        registry = %settings.kafka.registry_url,
        scimma_hostname = %settings.producer.scimma_hostname,
        topic = %settings.producer.topic,
        "Starting hop producer"
    );

    let factory = Arc::new(KafkaProducerFactory::new(settings.kafka)?);
    let opener = Arc::new(HopStream::new(settings.auth));
    let mut producer = HopProducer::new(factory, opener, settings.producer).await?;

    let clean = producer
        .run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "Could not listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!(clean, "Hop producer finished");
    Ok(())
}
