use std::{env, fs::File, io::BufWriter, process::exit};

use anyhow::{anyhow, Context, Result};
use chrono::Duration;
use rand::Rng;
use retarget_core::{
    header::{write_headers, BlockHeader},
    params::NetworkParams,
    sha256::Hash,
};

/// Writes a synthetic header chain that follows the network's own
/// retarget rules, starting from its genesis header.
fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: header_gen <network> <count> <header_file> [spacing_secs]");
        exit(1);
    }

    let params = NetworkParams::by_name(&args[1])
        .ok_or_else(|| anyhow!("unknown network \"{}\"", args[1]))?;
    let count: usize = args[2].parse().context("count must be a number")?;
    let spacing = match args.get(4) {
        Some(s) => s.parse::<i64>().context("spacing must be a number of seconds")?,
        None => params.target_time_per_block.num_seconds(),
    };
    if spacing < 1 {
        return Err(anyhow!("spacing must be at least one second"));
    }

    let mut rng = rand::thread_rng();
    let mut headers = Vec::with_capacity(count);
    headers.push(params.genesis_header);

    while headers.len() < count {
        let height = headers.len() as i32;
        let parent: &BlockHeader = &headers[headers.len() - 1];
        let jitter = rng.gen_range(-spacing / 2..=spacing / 2);

        let mut header = BlockHeader {
            version: parent.version,
            prev_block: parent.block_hash(),
            merkle_root: Hash::from_bytes(rng.gen()),
            timestamp: parent.timestamp + Duration::seconds(spacing + jitter),
            bits: 0,
            nonce: rng.gen(),
        };
        // The retarget reads the candidate itself for the relaxation check.
        headers.push(header);
        header.bits = params
            .next_bits(&mut headers, height, 0)
            .with_context(|| format!("failed to retarget at height {}", height))?;
        *headers.last_mut().context("chain is never empty")? = header;
    }
    headers.truncate(count);

    let path = &args[3];
    let file = File::create(path).with_context(|| format!("Failed to create {}", path))?;
    write_headers(BufWriter::new(file), &headers)
        .with_context(|| format!("Failed to write headers to {}", path))?;
    println!("wrote {} {} headers to {}", headers.len(), params.name, path);
    Ok(())
}
