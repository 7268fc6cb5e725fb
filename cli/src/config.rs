//! Service configuration from flags, environment variables and `.env`.
//!
//! ENVIRONMENT VARIABLES:
//!   ETH_RPC_ENDPOINT     JSON-RPC endpoint of the EVM node (required)
//!   CONTRACT_ADDRESSES   JSON array of token contract addresses (required)
//!   FROM_BLOCK           first block of the backfill (required)
//!   FETCH_INTERVAL       poll interval such as `30s`, `10m`, `1h30m` (default 10m)
//!   BACKFILL_CHUNK_SIZE  max blocks per backfill query (default: one query)
//!   DATABASE_URL         SQLite file or URL (default nfttrack.db)
//!   LISTEN_ADDR          read API bind address (default 127.0.0.1:3000)

use std::net::SocketAddr;
use std::time::Duration;

use clap::Args;

use nfttrack_core::error::TrackerError;
use nfttrack_core::tracker::{TrackerConfig, DEFAULT_POLL_INTERVAL};
use nfttrack_core::Address;
use nfttrack_evm::TrackerBuilder;

/// Settings for the event source and the tracker loop.
#[derive(Debug, Clone, Args)]
pub struct TrackerArgs {
    /// JSON-RPC endpoint of the EVM node
    #[arg(long = "rpc", env = "ETH_RPC_ENDPOINT")]
    pub rpc_endpoint: String,

    /// JSON array of contract addresses, e.g. '["0xBC4C..."]'
    #[arg(long, env = "CONTRACT_ADDRESSES")]
    pub contract_addresses: String,

    /// First block of the backfill
    #[arg(long, env = "FROM_BLOCK")]
    pub from_block: u64,

    /// Poll interval (`30s`, `10m`, `1h30m`); unparseable values fall back to 10m
    #[arg(long, env = "FETCH_INTERVAL")]
    pub fetch_interval: Option<String>,

    /// Split the backfill into queries of at most this many blocks
    #[arg(long, env = "BACKFILL_CHUNK_SIZE")]
    pub backfill_chunk_size: Option<u64>,
}

impl TrackerArgs {
    /// Resolve the raw values into a validated `TrackerConfig`.
    pub fn tracker_config(&self) -> Result<TrackerConfig, TrackerError> {
        let mut builder = TrackerBuilder::new()
            .contract_addresses(parse_contract_addresses(&self.contract_addresses)?)
            .start_block(self.from_block)
            .poll_interval(resolve_poll_interval(self.fetch_interval.as_deref()));
        if let Some(size) = self.backfill_chunk_size {
            builder = builder.backfill_chunk_size(size);
        }
        builder.build_config()
    }
}

/// Location of the ownership database.
#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    /// SQLite database file or `sqlite:` URL
    #[arg(long, env = "DATABASE_URL", default_value = "nfttrack.db")]
    pub database_url: String,
}

/// Read API settings.
#[derive(Debug, Clone, Args)]
pub struct ServerArgs {
    /// Address the read API listens on
    #[arg(long, env = "LISTEN_ADDR", default_value = "127.0.0.1:3000")]
    pub listen_addr: SocketAddr,
}

/// Parse a JSON array of addresses.
///
/// Entries that are not valid addresses, or are the zero address, are logged
/// and skipped. An empty result is a configuration error.
pub fn parse_contract_addresses(raw: &str) -> Result<Vec<Address>, TrackerError> {
    let entries: Vec<String> = serde_json::from_str(raw).map_err(|e| {
        TrackerError::Config(format!("CONTRACT_ADDRESSES must be a JSON array of strings: {e}"))
    })?;

    let mut addresses = Vec::with_capacity(entries.len());
    for entry in &entries {
        match entry.trim().parse::<Address>() {
            Ok(address) if address.is_zero() => {
                tracing::warn!(address = %entry, "skipping zero contract address");
            }
            Ok(address) => addresses.push(address),
            Err(e) => {
                tracing::warn!(address = %entry, error = %e, "skipping invalid contract address");
            }
        }
    }

    if addresses.is_empty() {
        return Err(TrackerError::Config("no valid contract addresses configured".into()));
    }
    Ok(addresses)
}

/// The poll interval, or the 10 minute default when unset or unparseable.
pub fn resolve_poll_interval(raw: Option<&str>) -> Duration {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        tracing::info!("FETCH_INTERVAL not set, using default of 10m");
        return DEFAULT_POLL_INTERVAL;
    };
    match parse_duration(raw) {
        Some(d) if !d.is_zero() => d,
        _ => {
            tracing::warn!(value = raw, "invalid FETCH_INTERVAL, using default of 10m");
            DEFAULT_POLL_INTERVAL
        }
    }
}

/// Parse a duration made of `<number><unit>` terms, e.g. `1h30m` or `1.5s`.
///
/// Units: `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`. A bare `0` is zero.
pub fn parse_duration(s: &str) -> Option<Duration> {
    if s == "0" {
        return Some(Duration::ZERO);
    }
    if s.is_empty() {
        return None;
    }

    let mut nanos = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return None;
        }
        let value: f64 = rest[..num_len].parse().ok()?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3_600e9,
            _ => return None,
        };
        nanos += value * scale;
        rest = &rest[unit_len..];
    }

    if !nanos.is_finite() || nanos >= u64::MAX as f64 {
        return None;
    }
    Some(Duration::from_nanos(nanos.round() as u64))
}
