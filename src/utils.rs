//! Utility functions for the Emoji Market Program

use borsh::BorshDeserialize;
use solana_program::{
    account_info::AccountInfo,
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::invoke_signed,
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};

use crate::error::EmojiMarketError;

/// Safely deserialize account data using BorshDeserialize::deserialize.
/// This does NOT require the slice to be fully consumed, which is important
/// because accounts are allocated at maximum capacity and carry padding.
pub fn deserialize_account<T: BorshDeserialize>(data: &[u8]) -> Result<T, ProgramError> {
    T::deserialize(&mut &data[..]).map_err(|_| EmojiMarketError::InvalidAccountData.into())
}

/// Check that an account signed the transaction
pub fn check_signer(account: &AccountInfo) -> ProgramResult {
    if !account.is_signer {
        return Err(EmojiMarketError::InvalidSigner.into());
    }
    Ok(())
}

/// Verify PDA derivation, returning the bump
pub fn verify_pda(
    expected: &Pubkey,
    program_id: &Pubkey,
    seeds: &[&[u8]],
) -> Result<u8, ProgramError> {
    let (pda, bump) = Pubkey::find_program_address(seeds, program_id);
    if pda != *expected {
        msg!("PDA mismatch: expected {}, got {}", expected, pda);
        return Err(EmojiMarketError::InvalidProgramAddress.into());
    }
    Ok(bump)
}

/// Get current timestamp from the Clock sysvar
pub fn get_current_timestamp() -> Result<i64, ProgramError> {
    let clock = Clock::get()?;
    Ok(clock.unix_timestamp)
}

/// Create a program-owned PDA account
pub fn create_pda_account<'a>(
    payer: &AccountInfo<'a>,
    pda: &AccountInfo<'a>,
    space: usize,
    owner: &Pubkey,
    system_program: &AccountInfo<'a>,
    seeds: &[&[u8]],
) -> ProgramResult {
    let rent = Rent::get()?;
    let lamports = rent.minimum_balance(space);

    invoke_signed(
        &system_instruction::create_account(payer.key, pda.key, lamports, space as u64, owner),
        &[payer.clone(), pda.clone(), system_program.clone()],
        &[seeds],
    )?;

    Ok(())
}

/// Move lamports out of a program-owned account, checked
pub fn transfer_lamports<'a>(
    from: &AccountInfo<'a>,
    to: &AccountInfo<'a>,
    amount: u64,
) -> ProgramResult {
    let new_from = from
        .lamports()
        .checked_sub(amount)
        .ok_or(EmojiMarketError::ArithmeticOverflow)?;
    let new_to = to
        .lamports()
        .checked_add(amount)
        .ok_or(EmojiMarketError::ArithmeticOverflow)?;
    **from.try_borrow_mut_lamports()? = new_from;
    **to.try_borrow_mut_lamports()? = new_to;
    Ok(())
}

/// Safe addition for u64
pub fn safe_add_u64(a: u64, b: u64) -> Result<u64, ProgramError> {
    a.checked_add(b)
        .ok_or_else(|| EmojiMarketError::ArithmeticOverflow.into())
}

/// Safe subtraction for u64
pub fn safe_sub_u64(a: u64, b: u64) -> Result<u64, ProgramError> {
    a.checked_sub(b)
        .ok_or_else(|| EmojiMarketError::ArithmeticOverflow.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_arithmetic() {
        assert_eq!(safe_add_u64(100, 50).unwrap(), 150);
        assert!(safe_add_u64(u64::MAX, 1).is_err());

        assert_eq!(safe_sub_u64(100, 50).unwrap(), 50);
        assert!(safe_sub_u64(50, 100).is_err());
    }
}
