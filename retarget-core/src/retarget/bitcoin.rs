use log::{debug, warn};

use crate::{
    compact::{compact_to_target, target_to_compact},
    error::RetargetError,
    header::{BlockHeader, HeaderAccessor},
    params::NetworkParams,
    U512,
};

/// Retargets from the first and last headers of a closing epoch.
///
/// The elapsed time is clamped to `[timespan / factor, timespan * factor]`
/// before scaling the first header's target, and the result never exceeds
/// the network's `pow_limit_bits`.
pub fn calc_diff_adjust_bitcoin(
    start: &BlockHeader,
    end: &BlockHeader,
    params: &NetworkParams,
) -> u32 {
    let timespan = params.target_timespan.num_seconds();
    let min_retarget_timespan = timespan / params.retarget_adjustment_factor;
    let max_retarget_timespan = timespan * params.retarget_adjustment_factor;

    let mut duration = (end.timestamp - start.timestamp).num_seconds();
    if duration < min_retarget_timespan {
        duration = min_retarget_timespan;
    } else if duration > max_retarget_timespan {
        duration = max_retarget_timespan;
    }

    let prev_target = compact_to_target(start.bits);
    let new_target = U512::from(prev_target) * U512::from(duration.max(0) as u64)
        / U512::from(timespan as u64);

    let pow_limit = compact_to_target(params.pow_limit_bits);
    let new_target = if new_target > U512::from(pow_limit) {
        pow_limit
    } else {
        new_target.saturating_low_u256()
    };

    target_to_compact(new_target)
}

/// Headers every epoch-based retarget reads before deciding anything.
pub(super) struct EpochHeaders {
    pub prev: BlockHeader,
    pub current: BlockHeader,
}

pub(super) fn read_epoch_headers<A: HeaderAccessor + ?Sized>(
    headers: &mut A,
    offset_height: i64,
) -> Result<EpochHeaders, RetargetError> {
    let prev = headers.read_header(offset_height - 1)?;
    let current = headers.read_header(offset_height)?;
    Ok(EpochHeaders { prev, current })
}

/// Bits for a block inside an epoch: the epoch's bits, or the PoW limit
/// when minimum-difficulty relaxation applies.
pub(super) fn mid_epoch_bits<A: HeaderAccessor + ?Sized>(
    headers: &mut A,
    height: i32,
    offset_height: i64,
    epoch: &EpochHeaders,
    params: &NetworkParams,
) -> Result<u32, RetargetError> {
    let into_epoch = i64::from(height).rem_euclid(params.epoch_length());
    let epoch_start = headers.read_header(offset_height - into_epoch)?;

    if params.reduce_min_difficulty
        && epoch.current.timestamp > epoch.prev.timestamp + params.target_time_per_block * 2
    {
        warn!(
            "block {} arrived {}s after its parent, relaxing to minimum difficulty",
            height,
            (epoch.current.timestamp - epoch.prev.timestamp).num_seconds()
        );
        return Ok(params.pow_limit_bits);
    }

    Ok(epoch_start.bits)
}

pub fn bitcoin_next_bits<A: HeaderAccessor + ?Sized>(
    headers: &mut A,
    height: i32,
    start_height: i32,
    params: &NetworkParams,
) -> Result<u32, RetargetError> {
    let epoch_length = params.epoch_length();
    let offset_height = i64::from(height) - i64::from(start_height);
    let epoch = read_epoch_headers(headers, offset_height)?;

    if i64::from(height) % epoch_length != 0 {
        return mid_epoch_bits(headers, height, offset_height, &epoch, params);
    }

    let epoch_start = headers.read_header(offset_height - epoch_length)?;
    let bits = calc_diff_adjust_bitcoin(&epoch_start, &epoch.prev, params);
    debug!(
        "retarget at height {}: {:#010x} -> {:#010x}",
        height, epoch_start.bits, bits
    );
    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_util::{chain, header_at, set_time},
        U256,
    };

    const BITS: u32 = 0x1d00ffff;
    const T0: i64 = 1_401_292_357;

    fn simnet() -> NetworkParams {
        NetworkParams::simnet()
    }

    #[test]
    fn test_adjust_exact_timespan_keeps_bits() {
        let params = simnet();
        let start = header_at(T0, BITS, 0);
        let end = header_at(T0 + params.target_timespan.num_seconds(), BITS, 1);
        assert_eq!(calc_diff_adjust_bitcoin(&start, &end, &params), BITS);
    }

    #[test]
    fn test_adjust_clamps_fast_epochs_to_a_quarter() {
        let params = simnet();
        let start = header_at(T0, BITS, 0);
        let expected = target_to_compact(compact_to_target(BITS) / U256::from(4u64));
        assert_eq!(expected, 0x1c3fffc0);

        for delta in [0, -1_000_000, 1, 86_400] {
            let end = header_at(T0 + delta, BITS, 1);
            assert_eq!(calc_diff_adjust_bitcoin(&start, &end, &params), expected);
        }
    }

    #[test]
    fn test_adjust_clamps_slow_epochs_to_four_times() {
        let params = simnet();
        let start = header_at(T0, BITS, 0);
        let end = header_at(T0 + 100 * params.target_timespan.num_seconds(), BITS, 1);
        assert_eq!(calc_diff_adjust_bitcoin(&start, &end, &params), 0x1d03fffc);
    }

    #[test]
    fn test_adjust_never_exceeds_pow_limit() {
        let params = simnet();
        let limit = compact_to_target(params.pow_limit_bits);
        for bits in [params.pow_limit_bits, 0x2000ffff, 0x1f7fffff] {
            let start = header_at(T0, bits, 0);
            for delta in [-5, 0, 600, 1_209_600, 4_838_400, i64::from(u32::MAX) - T0] {
                let end = header_at(T0 + delta, bits, 1);
                let result = calc_diff_adjust_bitcoin(&start, &end, &params);
                assert!(compact_to_target(result) <= limit);
            }
        }
    }

    #[test]
    fn test_first_boundary_matches_direct_adjustment() {
        let params = simnet();
        let epoch_length = params.epoch_length() as usize;
        let mut headers = chain(epoch_length + 1, T0, 600, BITS);
        set_time(&mut headers[epoch_length - 1], T0 + 1_000_000);

        let expected = calc_diff_adjust_bitcoin(&headers[0], &headers[epoch_length - 1], &params);
        let bits = bitcoin_next_bits(&mut headers, epoch_length as i32, 0, &params).unwrap();
        assert_eq!(bits, expected);
        assert_ne!(bits, BITS);
    }

    #[test]
    fn test_steady_chain_across_first_boundary() {
        // 2017 headers exactly one block time apart: the closing epoch spans
        // 2015 intervals, one short of the target timespan.
        let params = simnet();
        let mut headers = chain(2017, T0, 600, BITS);
        let bits = bitcoin_next_bits(&mut headers, 2016, 0, &params).unwrap();

        let expected = compact_to_target(BITS) * U256::from(2015u64 * 600)
            / U256::from(2016u64 * 600);
        assert_eq!(bits, target_to_compact(expected));
        assert_eq!(bits, 0x1d00ffde);
    }

    #[test]
    fn test_epoch_spanning_exact_timespan_keeps_bits() {
        let params = simnet();
        let mut headers = chain(2017, T0, 600, BITS);
        // Stretch the first gap so header 0 to header 2015 covers two weeks.
        set_time(&mut headers[0], T0 - 600);
        assert_eq!(bitcoin_next_bits(&mut headers, 2016, 0, &params).unwrap(), BITS);
    }

    #[test]
    fn test_mid_epoch_returns_epoch_start_bits() {
        let params = simnet();
        let mut headers = chain(2100, T0, 600, BITS);
        headers[2016].bits = 0x1c7fff80;
        assert_eq!(bitcoin_next_bits(&mut headers, 2050, 0, &params).unwrap(), 0x1c7fff80);
        assert_eq!(bitcoin_next_bits(&mut headers, 2000, 0, &params).unwrap(), BITS);
    }

    #[test]
    fn test_min_difficulty_relaxation() {
        let params = simnet();
        assert!(params.reduce_min_difficulty);
        let mut headers = chain(30, T0, 600, BITS);

        // Exactly twice the block time is not enough.
        set_time(&mut headers[20], T0 + 19 * 600 + 1200);
        assert_eq!(bitcoin_next_bits(&mut headers, 20, 0, &params).unwrap(), BITS);

        set_time(&mut headers[20], T0 + 19 * 600 + 1201);
        assert_eq!(
            bitcoin_next_bits(&mut headers, 20, 0, &params).unwrap(),
            params.pow_limit_bits
        );
    }

    #[test]
    fn test_no_relaxation_without_flag() {
        let params = NetworkParams {
            reduce_min_difficulty: false,
            ..simnet()
        };
        assert!(!params.reduce_min_difficulty);
        let mut headers = chain(30, T0, 600, BITS);
        set_time(&mut headers[20], T0 + 19 * 600 + 100_000);
        assert_eq!(bitcoin_next_bits(&mut headers, 20, 0, &params).unwrap(), BITS);
    }

    #[test]
    fn test_start_height_shifts_offsets() {
        let params = simnet();
        let mut headers = chain(40, T0, 600, BITS);
        headers[20].bits = 0x1c00ffff;
        // Header at offset 20 is height 2016 when the store starts at 1996.
        assert_eq!(
            bitcoin_next_bits(&mut headers, 2030, 1996, &params).unwrap(),
            0x1c00ffff
        );
    }

    #[test]
    fn test_read_failures_propagate() {
        let params = simnet();
        let mut headers = chain(10, T0, 600, BITS);
        assert!(matches!(
            bitcoin_next_bits(&mut headers, 10, 0, &params),
            Err(RetargetError::Io { offset: 10, .. })
        ));
        assert!(bitcoin_next_bits(&mut headers, 0, 0, &params).is_err());
        // Boundary whose epoch start lies before the store.
        let mut headers = chain(2020, T0, 600, BITS);
        assert!(matches!(
            bitcoin_next_bits(&mut headers, 2016, 10, &params),
            Err(RetargetError::Io { offset: -10, .. })
        ));
    }
}
