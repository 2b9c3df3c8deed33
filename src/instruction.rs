//! Instruction definitions for the Emoji Market Program
//!
//! Wire format: Borsh. One byte selects the operation, fixed-width
//! little-endian fields follow in declared order, then any variable-length
//! field with its own 4-byte little-endian length prefix.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::error::EmojiMarketError;

/// All instructions supported by the Emoji Market Program
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum EmojiMarketInstruction {
    /// Initialize the global config (once)
    ///
    /// Accounts:
    /// 0. `[signer, writable]` Admin (pays rent, must match args.admin_address)
    /// 1. `[writable]` Config PDA
    /// 2. `[]` System Program
    InitializeConfig(InitializeConfigArgs),

    /// Create a new emoji market and its vault
    ///
    /// Accounts:
    /// 0. `[signer, writable]` Creator (pays rent)
    /// 1. `[]` Config PDA
    /// 2. `[writable]` Market PDA
    /// 3. `[writable]` Market Vault PDA
    /// 4. `[]` System Program
    CreateMarket(CreateMarketArgs),

    /// Buy votes on an emoji while the market is open
    ///
    /// Accounts:
    /// 0. `[signer, writable]` User (pays cost and bet rent)
    /// 1. `[writable]` Market PDA
    /// 2. `[writable]` Bet PDA (created on first bet)
    /// 3. `[writable]` Market Vault PDA
    /// 4. `[]` System Program
    PlaceBet(PlaceBetArgs),

    /// Close the market, pick the winner and take the fees
    ///
    /// Accounts:
    /// 0. `[signer]` Caller (config admin or market creator)
    /// 1. `[]` Config PDA
    /// 2. `[writable]` Market PDA
    /// 3. `[writable]` Market Vault PDA
    /// 4. `[writable]` Platform admin wallet (receives platform fee)
    /// 5. `[writable]` Market creator wallet (receives creator fee)
    EndMarket(EndMarketArgs),

    /// Pay out a user's pari-mutuel share from an ended market
    ///
    /// Anyone may submit this; the payout only moves to the wallet recorded
    /// in the bet account.
    ///
    /// Accounts:
    /// 0. `[signer]` Caller (fee payer, any wallet)
    /// 1. `[]` Market PDA
    /// 2. `[writable]` Bet PDA
    /// 3. `[writable]` Market Vault PDA
    /// 4. `[writable]` User wallet (receives payout, must match args.user)
    Claim(ClaimArgs),
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct InitializeConfigArgs {
    /// Platform administrator
    pub admin_address: Pubkey,
    /// Platform fee in basis points
    pub platform_fee_bps: u16,
    /// Creator fee in basis points
    pub creator_fee_bps: u16,
    /// Price of the first vote on a fresh emoji (lamports)
    pub base_price_lamports: u64,
    /// Signed malus factor in per mille
    pub malus_k_millis: i32,
    /// Quadratic pricing coefficient (micros)
    pub quad_a_micros: u64,
    /// Linear pricing coefficient (micros)
    pub quad_b_micros: u64,
    /// Shortest allowed market duration (seconds)
    pub min_duration_secs: u32,
    /// Longest allowed market duration (seconds)
    pub max_duration_secs: u32,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct CreateMarketArgs {
    /// Market id, chosen by the creator, part of the market address
    pub market_id: u64,
    /// Betting window length (seconds from now)
    pub duration_secs: u32,
    /// Market title
    pub title: String,
    /// Optional image reference
    pub image_url: Option<String>,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct PlaceBetArgs {
    /// Market id
    pub market_id: u64,
    /// Emoji codepoint to vote on
    pub emoji_id: u32,
    /// Number of votes to buy
    pub vote_qty: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct EndMarketArgs {
    /// Market id
    pub market_id: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClaimArgs {
    /// Market id
    pub market_id: u64,
    /// Wallet whose bet is being settled
    pub user: Pubkey,
}

impl EmojiMarketInstruction {
    /// Decode an instruction payload.
    ///
    /// Rejects unknown discriminators, truncated buffers, length prefixes
    /// that overrun the buffer, and trailing bytes.
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| EmojiMarketError::InvalidInstruction.into())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn initialize_config_ix() -> EmojiMarketInstruction {
        EmojiMarketInstruction::InitializeConfig(InitializeConfigArgs {
            admin_address: Pubkey::new_unique(),
            platform_fee_bps: 250,
            creator_fee_bps: 250,
            base_price_lamports: 1_000_000,
            malus_k_millis: -150,
            quad_a_micros: 2_500,
            quad_b_micros: 10_000,
            min_duration_secs: 60,
            max_duration_secs: 604_800,
        })
    }

    fn create_market_ix(image_url: Option<String>) -> EmojiMarketInstruction {
        EmojiMarketInstruction::CreateMarket(CreateMarketArgs {
            market_id: 7,
            duration_secs: 3_600,
            title: "Emoji of the week".to_string(),
            image_url,
        })
    }

    #[test]
    fn round_trip_every_operation() {
        let ixs = vec![
            initialize_config_ix(),
            create_market_ix(None),
            create_market_ix(Some("ipfs://QmImage".to_string())),
            EmojiMarketInstruction::PlaceBet(PlaceBetArgs {
                market_id: 7,
                emoji_id: 0x1F525,
                vote_qty: 5,
            }),
            EmojiMarketInstruction::EndMarket(EndMarketArgs { market_id: 7 }),
            EmojiMarketInstruction::Claim(ClaimArgs {
                market_id: 7,
                user: Pubkey::new_unique(),
            }),
        ];
        for ix in ixs {
            let bytes = ix.try_to_vec().unwrap();
            let decoded = EmojiMarketInstruction::unpack(&bytes).unwrap();
            assert_eq!(decoded, ix);
        }
    }

    #[test]
    fn wire_layout_is_discriminator_then_le_fields() {
        let ix = EmojiMarketInstruction::PlaceBet(PlaceBetArgs {
            market_id: 0x0102030405060708,
            emoji_id: 0x1F680,
            vote_qty: 3,
        });
        let bytes = ix.try_to_vec().unwrap();
        assert_eq!(bytes.len(), 1 + 8 + 4 + 8);
        assert_eq!(bytes[0], 2); // PlaceBet discriminator
        assert_eq!(&bytes[1..9], &0x0102030405060708u64.to_le_bytes());
        assert_eq!(&bytes[9..13], &0x1F680u32.to_le_bytes());
        assert_eq!(&bytes[13..21], &3u64.to_le_bytes());
    }

    #[test]
    fn variable_fields_carry_le_length_prefixes() {
        let bytes = create_market_ix(Some("x".to_string())).try_to_vec().unwrap();
        assert_eq!(bytes[0], 1); // CreateMarket discriminator
        // fixed fields first: market_id u64, duration u32
        assert_eq!(&bytes[1..9], &7u64.to_le_bytes());
        assert_eq!(&bytes[9..13], &3_600u32.to_le_bytes());
        // then the title with its own 4-byte LE length
        let title = "Emoji of the week";
        assert_eq!(&bytes[13..17], &(title.len() as u32).to_le_bytes());
        assert_eq!(&bytes[17..17 + title.len()], title.as_bytes());
        // then the optional image url: tag byte + length + bytes
        let tail = &bytes[17 + title.len()..];
        assert_eq!(tail[0], 1);
        assert_eq!(&tail[1..5], &1u32.to_le_bytes());
        assert_eq!(tail[5], b'x');
        assert_eq!(tail.len(), 6);
    }

    #[test]
    fn unknown_discriminator_is_rejected() {
        for tag in [5u8, 17, 255] {
            let mut bytes = vec![tag];
            bytes.extend_from_slice(&[0u8; 32]);
            assert!(EmojiMarketInstruction::unpack(&bytes).is_err());
        }
        assert!(EmojiMarketInstruction::unpack(&[]).is_err());
    }

    #[test]
    fn truncated_payloads_are_rejected() {
        let bytes = EmojiMarketInstruction::EndMarket(EndMarketArgs { market_id: 9 })
            .try_to_vec()
            .unwrap();
        for cut in 0..bytes.len() {
            assert!(
                EmojiMarketInstruction::unpack(&bytes[..cut]).is_err(),
                "truncation at {} accepted",
                cut
            );
        }
    }

    #[test]
    fn overlong_length_prefix_is_rejected() {
        let mut bytes = vec![1u8]; // CreateMarket
        bytes.extend_from_slice(&7u64.to_le_bytes());
        bytes.extend_from_slice(&3_600u32.to_le_bytes());
        bytes.extend_from_slice(&1_000u32.to_le_bytes()); // title claims 1000 bytes
        bytes.extend_from_slice(b"short");
        assert!(EmojiMarketInstruction::unpack(&bytes).is_err());
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = EmojiMarketInstruction::PlaceBet(PlaceBetArgs {
            market_id: 1,
            emoji_id: 0x1F389,
            vote_qty: 1,
        })
        .try_to_vec()
        .unwrap();
        bytes.push(0);
        assert!(EmojiMarketInstruction::unpack(&bytes).is_err());
    }
}
