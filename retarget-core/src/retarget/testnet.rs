use log::debug;

use super::{kgw::kimoto_gravity_well, litecoin::litecoin_next_bits};
use crate::{
    error::RetargetError, header::HeaderAccessor, params::NetworkParams,
    TESTNET_KGW_ACTIVATION_HEIGHT, TESTNET_RETARGET_INTERVAL,
};

/// Vertcoin testnet policy.
///
/// Litecoin rules below `TESTNET_KGW_ACTIVATION_HEIGHT`. Above it, only every
/// `TESTNET_RETARGET_INTERVAL`th block runs the gravity well; the blocks in
/// between keep their parent's bits.
pub fn vertcoin_testnet_next_bits<A: HeaderAccessor + ?Sized>(
    headers: &mut A,
    height: i32,
    start_height: i32,
    params: &NetworkParams,
) -> Result<u32, RetargetError> {
    if height < TESTNET_KGW_ACTIVATION_HEIGHT {
        return litecoin_next_bits(headers, height, start_height, params);
    }

    if height % TESTNET_RETARGET_INTERVAL != 0 {
        let offset_height = i64::from(height) - i64::from(start_height);
        let prev = headers.read_header(offset_height - 1)?;
        debug!("height {} keeps parent bits {:#010x}", height, prev.bits);
        return Ok(prev.bits);
    }

    kimoto_gravity_well(headers, height, start_height, params)
}
