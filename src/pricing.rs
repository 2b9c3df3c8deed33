//! Vote pricing and settlement math
//!
//! All arithmetic runs on u128 intermediates with checked operations;
//! anything that cannot be represented fails instead of wrapping.

use solana_program::program_error::ProgramError;

use crate::error::EmojiMarketError;
use crate::state::BPS_DENOMINATOR;

/// Scale of the quadratic pricing coefficients (1e6 = 1.0)
pub const MICROS_SCALE: u128 = 1_000_000;

/// Scale of the malus factor (1000 = 1.0)
pub const MALUS_SCALE_MILLIS: i64 = 1000;

/// Upper bound on votes per bet; keeps the per-unit summation inside the
/// compute budget
pub const MAX_VOTE_QTY_PER_BET: u64 = 10_000;

/// Price of the `index`-th vote on an emoji (zero based), in lamports.
///
/// unit_price(i) = base + floor(quad_a * i^2 / 1e6) + floor(quad_b * i / 1e6),
/// then scaled by the malus multiplier (1000 + k) / 1000. The multiplier is
/// non-negative for every accepted config (k >= -1000), which keeps the unit
/// price non-decreasing in `index`.
pub fn adjusted_unit_price(
    base_price_lamports: u64,
    quad_a_micros: u64,
    quad_b_micros: u64,
    malus_k_millis: i32,
    index: u64,
) -> Result<u64, ProgramError> {
    let multiplier = MALUS_SCALE_MILLIS
        .checked_add(malus_k_millis as i64)
        .filter(|m| *m >= 0)
        .ok_or(EmojiMarketError::InvalidMalusFactor)?;

    let n = index as u128;
    let quad_a_term = (quad_a_micros as u128)
        .checked_mul(n.checked_mul(n).ok_or(EmojiMarketError::ArithmeticOverflow)?)
        .ok_or(EmojiMarketError::ArithmeticOverflow)?
        / MICROS_SCALE;
    let quad_b_term = (quad_b_micros as u128)
        .checked_mul(n)
        .ok_or(EmojiMarketError::ArithmeticOverflow)?
        / MICROS_SCALE;

    let raw = (base_price_lamports as u128)
        .checked_add(quad_a_term)
        .and_then(|p| p.checked_add(quad_b_term))
        .ok_or(EmojiMarketError::ArithmeticOverflow)?;

    let adjusted = raw
        .checked_mul(multiplier as u128)
        .ok_or(EmojiMarketError::ArithmeticOverflow)?
        / MALUS_SCALE_MILLIS as u128;

    u64::try_from(adjusted).map_err(|_| EmojiMarketError::ArithmeticOverflow.into())
}

/// Total cost of `vote_qty` additional votes on an emoji whose current
/// tally is `tally`: the sum of the unit prices from `tally` up to
/// `tally + vote_qty - 1`.
///
/// For a fixed quantity the cost is non-decreasing in `tally` - a later
/// buyer never pays less than an earlier one would have.
pub fn vote_cost(
    base_price_lamports: u64,
    quad_a_micros: u64,
    quad_b_micros: u64,
    malus_k_millis: i32,
    tally: u64,
    vote_qty: u64,
) -> Result<u64, ProgramError> {
    if vote_qty == 0 || vote_qty > MAX_VOTE_QTY_PER_BET {
        return Err(EmojiMarketError::InvalidVoteQuantity.into());
    }
    // the last unit index must be representable
    tally
        .checked_add(vote_qty - 1)
        .ok_or(EmojiMarketError::ArithmeticOverflow)?;

    let mut total: u64 = 0;
    for offset in 0..vote_qty {
        let unit = adjusted_unit_price(
            base_price_lamports,
            quad_a_micros,
            quad_b_micros,
            malus_k_millis,
            tally + offset,
        )?;
        total = total
            .checked_add(unit)
            .ok_or(EmojiMarketError::ArithmeticOverflow)?;
    }
    Ok(total)
}

/// Fee amount for `amount` at `fee_bps` basis points, rounded down
pub fn calculate_fee(amount: u64, fee_bps: u16) -> Result<u64, ProgramError> {
    let fee = (amount as u128)
        .checked_mul(fee_bps as u128)
        .ok_or(EmojiMarketError::ArithmeticOverflow)?
        / BPS_DENOMINATOR as u128;
    u64::try_from(fee).map_err(|_| EmojiMarketError::ArithmeticOverflow.into())
}

/// Pari-mutuel share of `payout_pool` for a user holding
/// `user_winning_votes` of `total_winning_votes`, rounded down.
/// The rounding remainder stays in the vault.
pub fn payout_share(
    payout_pool: u64,
    user_winning_votes: u64,
    total_winning_votes: u64,
) -> Result<u64, ProgramError> {
    if total_winning_votes == 0 {
        return Err(EmojiMarketError::ArithmeticOverflow.into());
    }
    let share = (payout_pool as u128)
        .checked_mul(user_winning_votes as u128)
        .ok_or(EmojiMarketError::ArithmeticOverflow)?
        / total_winning_votes as u128;
    u64::try_from(share).map_err(|_| EmojiMarketError::ArithmeticOverflow.into())
}

// ============================================================================
// Tests
// ============================================================================
