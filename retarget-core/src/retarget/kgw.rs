use log::{debug, trace};

use crate::{
    compact::{compact_to_target, target_to_compact},
    error::RetargetError,
    header::HeaderAccessor,
    params::NetworkParams,
    KGW_MAX_BLOCKS, KGW_MIN_BLOCKS, U256, U512,
};

/// Kimoto Gravity Well.
///
/// Walks backwards from the parent of `height`, keeping a cumulative moving
/// average of the scanned targets, and stops once the observed block rate
/// leaves the event horizon band (after at least `KGW_MIN_BLOCKS` blocks),
/// after `KGW_MAX_BLOCKS` blocks, or at height 1. The average is then scaled
/// by actual over expected time and clamped to the network's `pow_limit`.
///
/// The event horizon is computed in `f64` exactly as deployed networks do;
/// changing its precision or evaluation order changes consensus.
pub fn kimoto_gravity_well<A: HeaderAccessor + ?Sized>(
    headers: &mut A,
    height: i32,
    start_height: i32,
    params: &NetworkParams,
) -> Result<u32, RetargetError> {
    if height - 1 < KGW_MIN_BLOCKS {
        return Ok(params.pow_limit_bits);
    }

    let target_spacing = params.target_time_per_block.num_seconds();
    let mut current = headers.read_header(i64::from(height - start_height - 1))?;
    let last_solved = current.timestamp;

    let mut blocks_scanned: i64 = 0;
    let mut actual_rate: i64 = 0;
    let mut target_rate: i64 = 0;
    let mut average = U256::zero();

    let mut current_height = height - 1;
    let mut i: i32 = 1;
    while current_height != 1 {
        if i > KGW_MAX_BLOCKS {
            break;
        }

        blocks_scanned += 1;

        let target = compact_to_target(current.bits);
        average = if i == 1 {
            target
        } else {
            moving_average(average, target, i)
        };

        actual_rate = (last_solved - current.timestamp).num_seconds().max(0);
        target_rate = target_spacing * blocks_scanned;

        let mut rate_adjustment_ratio = 1.0_f64;
        if actual_rate != 0 && target_rate != 0 {
            rate_adjustment_ratio = target_rate as f64 / actual_rate as f64;
        }

        let event_horizon_deviation = event_horizon_deviation(blocks_scanned);
        let event_horizon_deviation_fast = event_horizon_deviation;
        let event_horizon_deviation_slow = 1.0 / event_horizon_deviation;

        trace!(
            "kgw height {} scanned {} actual {}s target {}s ratio {:.6} horizon {:.6}",
            current_height,
            blocks_scanned,
            actual_rate,
            target_rate,
            rate_adjustment_ratio,
            event_horizon_deviation
        );

        if blocks_scanned >= i64::from(KGW_MIN_BLOCKS)
            && (rate_adjustment_ratio <= event_horizon_deviation_slow
                || rate_adjustment_ratio >= event_horizon_deviation_fast)
        {
            break;
        }

        if current_height < 1 {
            break;
        }

        current_height -= 1;
        current = headers.read_header(i64::from(current_height - start_height))?;
        i += 1;
    }

    let mut new_target = U512::from(average);
    if actual_rate != 0 && target_rate != 0 {
        new_target = new_target * U512::from(actual_rate as u64) / U512::from(target_rate as u64);
    }

    let new_target = if new_target > U512::from(params.pow_limit) {
        params.pow_limit
    } else {
        new_target.saturating_low_u256()
    };

    let bits = target_to_compact(new_target);
    debug!(
        "kgw retarget at height {} over {} blocks ({}s actual, {}s expected): {:#010x}",
        height, blocks_scanned, actual_rate, target_rate, bits
    );
    Ok(bits)
}

/// Width of the band the observed rate must leave to stop the scan.
///
/// `powf` goes through the platform libm, which other node implementations
/// may round differently in the last ulp. That only matters when
/// the rate ratio lands exactly on the band edge.
fn event_horizon_deviation(blocks_scanned: i64) -> f64 {
    1.0 + 0.7084 * (blocks_scanned as f64 / f64::from(KGW_MIN_BLOCKS)).powf(-1.228)
}

/// `previous + (target - previous) / i`, rounding the quotient towards
/// negative infinity when the difference is negative.
fn moving_average(previous: U256, target: U256, i: i32) -> U256 {
    let divisor = U256::from(i as u64);
    if target >= previous {
        previous + (target - previous) / divisor
    } else {
        let magnitude = previous - target;
        previous - (magnitude + divisor - U256::one()) / divisor
    }
}
