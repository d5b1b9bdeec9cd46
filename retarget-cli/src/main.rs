use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{debug, info, warn};
use rayon::prelude::*;
use retarget_core::{
    compact::compact_to_target,
    config::NetworkConfig,
    header::{HeaderAccessor, HeaderReader},
    params::NetworkParams,
    registry,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the bits required for the block at one height.
    NextBits {
        #[command(flatten)]
        network: NetworkArgs,
        #[command(flatten)]
        store: StoreArgs,
        /// Height of the block being validated.
        #[arg(long)]
        height: i32,
    },
    /// Recompute the bits of every stored block in a range and report
    /// the ones that disagree.
    Verify {
        #[command(flatten)]
        network: NetworkArgs,
        #[command(flatten)]
        store: StoreArgs,
        #[arg(long)]
        from: i32,
        /// Last height checked, inclusive. Defaults to the last stored header.
        #[arg(long)]
        to: Option<i32>,
    },
    /// List the registered networks.
    Networks {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct NetworkArgs {
    /// Built-in network name.
    #[arg(short, long, default_value = "mainnet")]
    network: String,
    /// TOML network description; takes precedence over --network.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct StoreArgs {
    /// File of contiguous 80-byte headers.
    #[arg(long)]
    headers: PathBuf,
    /// Height of the first header in the file.
    #[arg(long, default_value_t = 0)]
    start_height: i32,
}

#[derive(Serialize)]
struct NetworkSummary {
    name: String,
    magic: String,
    port: String,
    algorithm: String,
    epoch_length: i64,
    pow_limit_bits: String,
    genesis_hash: String,
}

impl From<&NetworkParams> for NetworkSummary {
    fn from(params: &NetworkParams) -> Self {
        NetworkSummary {
            name: params.name.clone(),
            magic: format!("{:#010x}", params.net),
            port: params.default_port.clone(),
            algorithm: params.algorithm.to_string(),
            epoch_length: params.epoch_length(),
            pow_limit_bits: format!("{:#010x}", params.pow_limit_bits),
            genesis_hash: params.genesis_hash.to_string(),
        }
    }
}

#[derive(Debug)]
struct Mismatch {
    height: i32,
    stored: u32,
    expected: u32,
}

fn resolve_network(args: &NetworkArgs) -> Result<NetworkParams> {
    if let Some(path) = &args.config {
        let params = NetworkConfig::load_params(path)?;
        info!("Using network {} from {}", params.name, path.display());
        if let Err(e) = registry::register(params.clone()) {
            warn!("Not registering configured network: {}", e);
        }
        return Ok(params);
    }

    registry::lookup_by_name(&args.network)
        .map(|p| (*p).clone())
        .or_else(|| NetworkParams::by_name(&args.network))
        .ok_or_else(|| anyhow!("Unknown network \"{}\"", args.network))
}

fn open_headers(path: &Path) -> Result<HeaderReader<BufReader<File>>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open header file {}", path.display()))?;
    Ok(HeaderReader::new(BufReader::new(file)))
}

fn next_bits(params: &NetworkParams, store: &StoreArgs, height: i32) -> Result<()> {
    let mut headers = open_headers(&store.headers)?;
    let bits = params
        .next_bits(&mut headers, height, store.start_height)
        .with_context(|| format!("Failed to compute bits for height {}", height))?;

    println!("{:#010x}", bits);
    info!(
        "{} height {}: bits {:#010x}, target {:#x}",
        params.name,
        height,
        bits,
        compact_to_target(bits)
    );
    Ok(())
}

fn verify(params: &NetworkParams, store: &StoreArgs, from: i32, to: Option<i32>) -> Result<()> {
    let stored = open_headers(&store.headers)?
        .header_count()
        .with_context(|| format!("Failed to size {}", store.headers.display()))?;
    if stored == 0 {
        return Err(anyhow!("{} holds no headers", store.headers.display()));
    }
    let last = i64::from(store.start_height) + stored as i64 - 1;
    let to = match to {
        Some(to) => i64::from(to),
        None => last,
    };
    let from = i64::from(from).max(i64::from(store.start_height) + 1);
    if to > last || from > to {
        return Err(anyhow!(
            "Range {}..={} is not covered by headers {}..={}",
            from,
            to,
            store.start_height,
            last
        ));
    }
    // Both bounds lie within the i32 height range checked above.
    let (from, to) = (from as i32, to as i32);

    info!(
        "Verifying {} heights {}..={} on {}",
        to - from + 1,
        from,
        to,
        params.name
    );
    let started = Instant::now();

    let results: Vec<Result<Option<Mismatch>>> = (from..=to)
        .into_par_iter()
        .map_init(
            || open_headers(&store.headers),
            |headers, height| -> Result<Option<Mismatch>> {
                let headers = headers
                    .as_mut()
                    .map_err(|e| anyhow!("Failed to open header store: {}", e))?;
                let expected = params
                    .next_bits(headers, height, store.start_height)
                    .with_context(|| format!("Failed to compute bits for height {}", height))?;
                let stored = headers
                    .read_header(i64::from(height - store.start_height))?
                    .bits;
                if stored == expected {
                    return Ok(None);
                }
                debug!(
                    "height {} stores {:#010x}, expected {:#010x}",
                    height, stored, expected
                );
                Ok(Some(Mismatch {
                    height,
                    stored,
                    expected,
                }))
            },
        )
        .collect();

    let mut mismatches = Vec::new();
    for result in results {
        if let Some(mismatch) = result? {
            mismatches.push(mismatch);
        }
    }

    info!(
        "Checked {} heights in {:.2?}",
        to - from + 1,
        started.elapsed()
    );
    for m in &mismatches {
        println!(
            "height {}: stored {:#010x}, expected {:#010x}",
            m.height, m.stored, m.expected
        );
    }

    if mismatches.is_empty() {
        println!("all {} heights match", to - from + 1);
        Ok(())
    } else {
        Err(anyhow!("{} heights carry unexpected bits", mismatches.len()))
    }
}

fn list_networks(json: bool) -> Result<()> {
    let summaries: Vec<NetworkSummary> = registry::networks()
        .iter()
        .map(|p| NetworkSummary::from(p.as_ref()))
        .collect();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summaries).context("Failed to serialize networks")?
        );
        return Ok(());
    }

    for s in &summaries {
        println!(
            "{:<10} {} port {:<6} {:<20} epoch {:<5} limit {} genesis {}",
            s.name, s.magic, s.port, s.algorithm, s.epoch_length, s.pow_limit_bits, s.genesis_hash
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::NextBits {
            network,
            store,
            height,
        } => next_bits(&resolve_network(&network)?, &store, height),
        Command::Verify {
            network,
            store,
            from,
            to,
        } => verify(&resolve_network(&network)?, &store, from, to),
        Command::Networks { json } => list_networks(json),
    }
}
