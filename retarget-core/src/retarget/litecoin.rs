use log::debug;

use super::bitcoin::{calc_diff_adjust_bitcoin, mid_epoch_bits, read_epoch_headers};
use crate::{error::RetargetError, header::HeaderAccessor, params::NetworkParams};

/// Epoch retarget with Litecoin's window.
///
/// Litecoin measures each epoch from the last block of the previous epoch,
/// one block further back than Bitcoin does. The very first retarget has
/// no previous epoch and uses the first stored header instead.
pub fn litecoin_next_bits<A: HeaderAccessor + ?Sized>(
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

    let window_start = if i64::from(height) == epoch_length {
        0
    } else {
        offset_height - epoch_length - 1
    };
    let epoch_start = headers.read_header(window_start)?;

    let bits = calc_diff_adjust_bitcoin(&epoch_start, &epoch.prev, params);
    debug!(
        "litecoin retarget at height {} from offset {}: {:#010x} -> {:#010x}",
        height, window_start, epoch_start.bits, bits
    );
    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        retarget::bitcoin_next_bits,
        test_util::{chain, set_time},
    };

    const BITS: u32 = 0x1d00ffff;
    const T0: i64 = 1_296_688_602;

    #[test]
    fn test_first_retarget_reads_first_stored_header() {
        let params = NetworkParams::regtest();
        let mut headers = chain(2017, T0, 600, BITS);
        set_time(&mut headers[0], T0 - 600);

        assert_eq!(litecoin_next_bits(&mut headers, 2016, 0, &params).unwrap(), BITS);
        assert_eq!(
            litecoin_next_bits(&mut headers, 2016, 0, &params).unwrap(),
            bitcoin_next_bits(&mut headers, 2016, 0, &params).unwrap()
        );
    }

    #[test]
    fn test_first_retarget_ignores_start_height() {
        // The store begins at height 1000; offset 0 is still used even though
        // Bitcoin's window would start before the store.
        let params = NetworkParams::regtest();
        let mut headers = chain(1017, T0, 600, BITS);
        set_time(&mut headers[1015], T0 + 2_000_000);

        let expected = calc_diff_adjust_bitcoin(&headers[0], &headers[1015], &params);
        assert_eq!(
            litecoin_next_bits(&mut headers, 2016, 1000, &params).unwrap(),
            expected
        );
        assert!(bitcoin_next_bits(&mut headers, 2016, 1000, &params).is_err());
    }

    #[test]
    fn test_later_retargets_reach_one_block_further_back() {
        let params = NetworkParams::regtest();
        let mut headers = chain(4033, T0, 600, BITS);
        // Give header 2015 a distinct timestamp so the two windows differ.
        set_time(&mut headers[2015], T0 + 2015 * 600 - 400_000);

        let litecoin = litecoin_next_bits(&mut headers, 4032, 0, &params).unwrap();
        let bitcoin = bitcoin_next_bits(&mut headers, 4032, 0, &params).unwrap();

        assert_eq!(
            litecoin,
            calc_diff_adjust_bitcoin(&headers[2015], &headers[4031], &params)
        );
        assert_eq!(
            bitcoin,
            calc_diff_adjust_bitcoin(&headers[2016], &headers[4031], &params)
        );
        assert_ne!(litecoin, bitcoin);
    }

    #[test]
    fn test_mid_epoch_behaves_like_bitcoin() {
        let params = NetworkParams::regtest();
        let mut headers = chain(2100, T0, 600, BITS);
        headers[2016].bits = 0x1c0ffff0;
        set_time(&mut headers[2060], T0 + 2059 * 600 + 5_000);

        for height in [2017, 2059, 2060, 2099] {
            assert_eq!(
                litecoin_next_bits(&mut headers, height, 0, &params).unwrap(),
                bitcoin_next_bits(&mut headers, height, 0, &params).unwrap()
            );
        }
        assert_eq!(
            litecoin_next_bits(&mut headers, 2060, 0, &params).unwrap(),
            params.pow_limit_bits
        );
    }
}
