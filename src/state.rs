//! State definitions for the Emoji Market Program
//!
//! All account structures used by the program, their PDA seeds and
//! fixed space layouts.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::error::EmojiMarketError;
use crate::utils::{safe_add_u64, safe_sub_u64};

// ============================================================================
// Discriminators
// ============================================================================

pub const CONFIG_DISCRIMINATOR: u64 = 0x454D5F434F4E4647; // "EM_CONFG"
pub const MARKET_DISCRIMINATOR: u64 = 0x4D41524B45545F5F; // "MARKET__"
pub const BET_DISCRIMINATOR: u64 = 0x4245545F5F5F5F5F; // "BET_____"
pub const VAULT_DISCRIMINATOR: u64 = 0x5641554C545F5F5F; // "VAULT___"

// ============================================================================
// PDA Seeds
// ============================================================================

pub const CONFIG_SEED: &[u8] = b"config";
pub const MARKET_SEED: &[u8] = b"market";
pub const BET_SEED: &[u8] = b"bet";
pub const MARKET_VAULT_SEED: &[u8] = b"market_vault";

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of distinct emojis per market (fixed account layout)
pub const MAX_EMOJIS: usize = 50;

/// Maximum length of a market title (bytes)
pub const MAX_TITLE_LEN: usize = 100;

/// Maximum length of an image URL (bytes)
pub const MAX_IMAGE_URL_LEN: usize = 200;

/// Fee denominator (10000 bps = 100%)
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Lowest accepted malus factor: -1000 per mille wipes the whole unit price,
/// anything lower would make prices negative
pub const MIN_MALUS_K_MILLIS: i32 = -1000;

// ============================================================================
// Address derivation
// ============================================================================

/// Derive the singleton config address
pub fn find_config_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[CONFIG_SEED], program_id)
}

/// Derive a market address from its numeric id
pub fn find_market_address(program_id: &Pubkey, market_id: u64) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[MARKET_SEED, &market_id.to_le_bytes()], program_id)
}

/// Derive the bet address for a (market, user) pair
pub fn find_bet_address(program_id: &Pubkey, market: &Pubkey, user: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[BET_SEED, market.as_ref(), user.as_ref()], program_id)
}

/// Derive the vault address of a market
pub fn find_market_vault_address(program_id: &Pubkey, market: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[MARKET_VAULT_SEED, market.as_ref()], program_id)
}

// ============================================================================
// Enums
// ============================================================================

/// Market lifecycle status
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketStatus {
    /// Accepting bets
    Open = 0,
    /// Voting closed, fees taken, claims allowed
    Ended = 1,
}

impl Default for MarketStatus {
    fn default() -> Self {
        MarketStatus::Open
    }
}

// ============================================================================
// Account Structures
// ============================================================================

/// Global configuration, created once by `InitializeConfig`
///
/// PDA Seeds: ["config"]
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct Config {
    /// Account discriminator
    pub discriminator: u64,

    /// Platform administrator, receives the platform fee
    pub admin_address: Pubkey,

    /// Platform fee in basis points
    pub platform_fee_bps: u16,

    /// Creator fee in basis points
    pub creator_fee_bps: u16,

    /// Price of the first vote on a fresh emoji (lamports)
    pub base_price_lamports: u64,

    /// Signed malus factor in per mille, applied to every unit price
    pub malus_k_millis: i32,

    /// Quadratic pricing coefficient (micro units per vote squared)
    pub quad_a_micros: u64,

    /// Linear pricing coefficient (micro units per vote)
    pub quad_b_micros: u64,

    /// Shortest allowed market duration (seconds)
    pub min_duration_secs: u32,

    /// Longest allowed market duration (seconds)
    pub max_duration_secs: u32,

    /// PDA bump
    pub bump: u8,
}

impl Config {
    pub const SIZE: usize = 8 // discriminator
        + 32 // admin_address
        + 2  // platform_fee_bps
        + 2  // creator_fee_bps
        + 8  // base_price_lamports
        + 4  // malus_k_millis
        + 8  // quad_a_micros
        + 8  // quad_b_micros
        + 4  // min_duration_secs
        + 4  // max_duration_secs
        + 1; // bump

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        admin_address: Pubkey,
        platform_fee_bps: u16,
        creator_fee_bps: u16,
        base_price_lamports: u64,
        malus_k_millis: i32,
        quad_a_micros: u64,
        quad_b_micros: u64,
        min_duration_secs: u32,
        max_duration_secs: u32,
        bump: u8,
    ) -> Self {
        Self {
            discriminator: CONFIG_DISCRIMINATOR,
            admin_address,
            platform_fee_bps,
            creator_fee_bps,
            base_price_lamports,
            malus_k_millis,
            quad_a_micros,
            quad_b_micros,
            min_duration_secs,
            max_duration_secs,
            bump,
        }
    }
}

/// A single emoji voting market
///
/// Pricing and fee parameters are snapshotted from `Config` at creation,
/// so a market keeps the terms it was opened under.
///
/// PDA Seeds: ["market", market_id.to_le_bytes()]
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct Market {
    /// Account discriminator
    pub discriminator: u64,

    /// Unique market id, chosen by the creator
    pub market_id: u64,

    /// Market creator, receives the creator fee
    pub creator: Pubkey,

    /// Market title
    pub title: String,

    /// Optional image reference
    pub image_url: Option<String>,

    /// Betting window start (Unix timestamp)
    pub start_ts: i64,

    /// Betting window end (Unix timestamp)
    pub end_ts: i64,

    /// Current lifecycle status
    pub status: MarketStatus,

    /// Total lamports collected from bets
    pub total_pot: u64,

    /// Total votes across all emojis
    pub total_votes: u64,

    /// Distinct emoji ids, insertion ordered, unique
    pub emoji_ids: Vec<u32>,

    /// Vote tally per emoji, parallel to `emoji_ids`
    pub emoji_votes: Vec<u64>,

    /// Winning emoji, set once when the market ends
    pub winner: Option<u32>,

    /// Platform fee taken at end (lamports)
    pub platform_fee_taken: u64,

    /// Creator fee taken at end (lamports)
    pub creator_fee_taken: u64,

    // Snapshot of pricing/fee params from Config
    pub base_price_lamports: u64,
    pub malus_k_millis: i32,
    pub quad_a_micros: u64,
    pub quad_b_micros: u64,
    pub platform_fee_bps: u16,
    pub creator_fee_bps: u16,

    /// PDA bump
    pub bump: u8,
}

impl Market {
    pub const SIZE: usize = 8 // discriminator
        + 8  // market_id
        + 32 // creator
        + 4 + MAX_TITLE_LEN // title
        + 1 + 4 + MAX_IMAGE_URL_LEN // image_url
        + 8  // start_ts
        + 8  // end_ts
        + 1  // status
        + 8  // total_pot
        + 8  // total_votes
        + 4 + (4 * MAX_EMOJIS) // emoji_ids
        + 4 + (8 * MAX_EMOJIS) // emoji_votes
        + 1 + 4 // winner
        + 8  // platform_fee_taken
        + 8  // creator_fee_taken
        + 8  // base_price_lamports
        + 4  // malus_k_millis
        + 8  // quad_a_micros
        + 8  // quad_b_micros
        + 2  // platform_fee_bps
        + 2  // creator_fee_bps
        + 1; // bump

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        market_id: u64,
        creator: Pubkey,
        title: String,
        image_url: Option<String>,
        start_ts: i64,
        end_ts: i64,
        config: &Config,
        bump: u8,
    ) -> Self {
        Self {
            discriminator: MARKET_DISCRIMINATOR,
            market_id,
            creator,
            title,
            image_url,
            start_ts,
            end_ts,
            status: MarketStatus::Open,
            total_pot: 0,
            total_votes: 0,
            emoji_ids: Vec::new(),
            emoji_votes: Vec::new(),
            winner: None,
            platform_fee_taken: 0,
            creator_fee_taken: 0,
            base_price_lamports: config.base_price_lamports,
            malus_k_millis: config.malus_k_millis,
            quad_a_micros: config.quad_a_micros,
            quad_b_micros: config.quad_b_micros,
            platform_fee_bps: config.platform_fee_bps,
            creator_fee_bps: config.creator_fee_bps,
            bump,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == MarketStatus::Open
    }

    /// Whether the Open -> Ended transition condition holds
    pub fn can_end(&self, now: i64) -> bool {
        self.is_open() && now >= self.end_ts
    }

    /// Current tally for an emoji, zero if never voted on
    pub fn votes_for(&self, emoji_id: u32) -> u64 {
        self.emoji_ids
            .iter()
            .position(|&id| id == emoji_id)
            .map(|idx| self.emoji_votes[idx])
            .unwrap_or(0)
    }

    /// Cost of `vote_qty` additional votes on an emoji at its current tally
    pub fn vote_cost(&self, emoji_id: u32, vote_qty: u64) -> Result<u64, ProgramError> {
        crate::pricing::vote_cost(
            self.base_price_lamports,
            self.quad_a_micros,
            self.quad_b_micros,
            self.malus_k_millis,
            self.votes_for(emoji_id),
            vote_qty,
        )
    }

    /// Apply a bet to the market tallies.
    ///
    /// All new values are computed before anything is assigned, so a failed
    /// check leaves the market untouched.
    pub fn record_votes(
        &mut self,
        emoji_id: u32,
        vote_qty: u64,
        cost: u64,
    ) -> Result<(), ProgramError> {
        let idx = self.emoji_ids.iter().position(|&id| id == emoji_id);
        if idx.is_none() && self.emoji_ids.len() >= MAX_EMOJIS {
            return Err(EmojiMarketError::TooManyEmojis.into());
        }

        let new_tally = match idx {
            Some(i) => safe_add_u64(self.emoji_votes[i], vote_qty)?,
            None => vote_qty,
        };
        let new_total_votes = safe_add_u64(self.total_votes, vote_qty)?;
        let new_total_pot = safe_add_u64(self.total_pot, cost)?;

        match idx {
            Some(i) => self.emoji_votes[i] = new_tally,
            None => {
                self.emoji_ids.push(emoji_id);
                self.emoji_votes.push(new_tally);
            }
        }
        self.total_votes = new_total_votes;
        self.total_pot = new_total_pot;
        Ok(())
    }

    /// Winning emoji: highest tally, ties broken toward the smallest id.
    /// None for a market nobody voted in.
    pub fn select_winner(&self) -> Option<u32> {
        let mut winner: Option<u32> = None;
        let mut max_votes: u64 = 0;
        for (idx, &votes) in self.emoji_votes.iter().enumerate() {
            let emoji_id = self.emoji_ids[idx];
            let beats = votes > max_votes
                || (votes == max_votes
                    && votes > 0
                    && winner.map_or(false, |w| emoji_id < w));
            if beats {
                max_votes = votes;
                winner = Some(emoji_id);
            }
        }
        winner
    }

    /// Lamports left for winners once both fees are taken
    pub fn payout_pool(&self) -> Result<u64, ProgramError> {
        let after_platform = safe_sub_u64(self.total_pot, self.platform_fee_taken)?;
        safe_sub_u64(after_platform, self.creator_fee_taken)
    }
}

/// Per-(market, user) bet record, created lazily on the first bet
///
/// PDA Seeds: ["bet", market.key(), user.key()]
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct BetAccount {
    /// Account discriminator
    pub discriminator: u64,

    /// Market this bet belongs to
    pub market: Pubkey,

    /// Bettor wallet
    pub user: Pubkey,

    /// Distinct emoji ids this user voted on, unique
    pub emoji_ids: Vec<u32>,

    /// Votes purchased per emoji, parallel to `emoji_ids`
    pub emoji_votes: Vec<u64>,

    /// Total lamports this user paid into the market
    pub total_spent: u64,

    /// Flips to true exactly once, on claim
    pub claimed: bool,

    /// PDA bump
    pub bump: u8,
}

impl BetAccount {
    pub const SIZE: usize = 8 // discriminator
        + 32 // market
        + 32 // user
        + 4 + (4 * MAX_EMOJIS) // emoji_ids
        + 4 + (8 * MAX_EMOJIS) // emoji_votes
        + 8  // total_spent
        + 1  // claimed
        + 1; // bump

    pub fn new(market: Pubkey, user: Pubkey, bump: u8) -> Self {
        Self {
            discriminator: BET_DISCRIMINATOR,
            market,
            user,
            emoji_ids: Vec::new(),
            emoji_votes: Vec::new(),
            total_spent: 0,
            claimed: false,
            bump,
        }
    }

    /// Votes this user holds on an emoji
    pub fn votes_for(&self, emoji_id: u32) -> u64 {
        self.emoji_ids
            .iter()
            .position(|&id| id == emoji_id)
            .map(|idx| self.emoji_votes[idx])
            .unwrap_or(0)
    }

    /// Record a purchase against this bet account
    pub fn record_votes(
        &mut self,
        emoji_id: u32,
        vote_qty: u64,
        cost: u64,
    ) -> Result<(), ProgramError> {
        let idx = self.emoji_ids.iter().position(|&id| id == emoji_id);
        if idx.is_none() && self.emoji_ids.len() >= MAX_EMOJIS {
            return Err(EmojiMarketError::TooManyEmojis.into());
        }

        let new_tally = match idx {
            Some(i) => safe_add_u64(self.emoji_votes[i], vote_qty)?,
            None => vote_qty,
        };
        let new_total_spent = safe_add_u64(self.total_spent, cost)?;

        match idx {
            Some(i) => self.emoji_votes[i] = new_tally,
            None => {
                self.emoji_ids.push(emoji_id);
                self.emoji_votes.push(new_tally);
            }
        }
        self.total_spent = new_total_spent;
        Ok(())
    }
}

/// Per-market lamport vault. Carries no state beyond its discriminator;
/// the balance above the rent floor is the pooled pot.
///
/// PDA Seeds: ["market_vault", market.key()]
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct Vault {
    /// Account discriminator
    pub discriminator: u64,

    /// PDA bump
    pub bump: u8,
}

impl Vault {
    pub const SIZE: usize = 8 // discriminator
        + 1; // bump

    pub fn new(bump: u8) -> Self {
        Self {
            discriminator: VAULT_DISCRIMINATOR,
            bump,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config::new(Pubkey::new_unique(), 250, 250, 1_000_000, 0, 0, 0, 60, 86_400, 255)
    }

    fn open_market(config: &Config) -> Market {
        Market::new(
            1,
            Pubkey::new_unique(),
            "Best launch emoji?".to_string(),
            None,
            1_700_000_000,
            1_700_003_600,
            config,
            254,
        )
    }

    #[test]
    fn config_serialized_size_matches_layout() {
        let config = test_config();
        let bytes = config.try_to_vec().unwrap();
        assert_eq!(bytes.len(), Config::SIZE);
    }

    #[test]
    fn market_size_covers_full_capacity() {
        let config = test_config();
        let mut market = Market::new(
            u64::MAX,
            Pubkey::new_unique(),
            "t".repeat(MAX_TITLE_LEN),
            Some("u".repeat(MAX_IMAGE_URL_LEN)),
            0,
            1,
            &config,
            255,
        );
        for i in 0..MAX_EMOJIS as u32 {
            market.record_votes(0x1F600 + i, 1, 1).unwrap();
        }
        market.winner = Some(0x1F600);
        let bytes = market.try_to_vec().unwrap();
        assert_eq!(bytes.len(), Market::SIZE);

        // A fresh market must never serialize past the allocation either
        let empty = open_market(&config);
        assert!(empty.try_to_vec().unwrap().len() <= Market::SIZE);
    }

    #[test]
    fn bet_size_covers_full_capacity() {
        let mut bet = BetAccount::new(Pubkey::new_unique(), Pubkey::new_unique(), 255);
        for i in 0..MAX_EMOJIS as u32 {
            bet.record_votes(0x1F300 + i, 2, 10).unwrap();
        }
        let bytes = bet.try_to_vec().unwrap();
        assert_eq!(bytes.len(), BetAccount::SIZE);
    }

    #[test]
    fn record_votes_keeps_tally_consistent() {
        let config = test_config();
        let mut market = open_market(&config);
        market.record_votes(0x1F525, 5, 5_000_000).unwrap();
        market.record_votes(0x1F680, 3, 3_000_000).unwrap();
        market.record_votes(0x1F525, 2, 2_500_000).unwrap();

        // unique keys, increments folded into the existing entry
        assert_eq!(market.emoji_ids, vec![0x1F525, 0x1F680]);
        assert_eq!(market.votes_for(0x1F525), 7);
        assert_eq!(market.votes_for(0x1F680), 3);
        let tally_sum: u64 = market.emoji_votes.iter().sum();
        assert_eq!(tally_sum, market.total_votes);
        assert_eq!(market.total_pot, 10_500_000);
    }

    #[test]
    fn record_votes_rejects_emoji_overflow_at_capacity() {
        let config = test_config();
        let mut market = open_market(&config);
        for i in 0..MAX_EMOJIS as u32 {
            market.record_votes(i + 1, 1, 1).unwrap();
        }
        let err = market.record_votes(0xFFFF, 1, 1).unwrap_err();
        assert_eq!(err, EmojiMarketError::TooManyEmojis.into());
        // the failed insert changed nothing
        assert_eq!(market.total_votes, MAX_EMOJIS as u64);
        assert_eq!(market.emoji_ids.len(), MAX_EMOJIS);

        // an existing emoji still accepts votes at capacity
        market.record_votes(1, 1, 1).unwrap();
        assert_eq!(market.votes_for(1), 2);
    }

    #[test]
    fn winner_is_max_tally_with_smallest_id_tiebreak() {
        let config = test_config();
        let mut market = open_market(&config);
        assert_eq!(market.select_winner(), None);

        market.record_votes(0x1F680, 3, 3).unwrap();
        market.record_votes(0x1F525, 3, 3).unwrap();
        // tie at 3 votes: smaller emoji id wins
        assert_eq!(market.select_winner(), Some(0x1F525));

        market.record_votes(0x1F680, 1, 1).unwrap();
        assert_eq!(market.select_winner(), Some(0x1F680));
    }

    #[test]
    fn payout_pool_subtracts_fees() {
        let config = test_config();
        let mut market = open_market(&config);
        market.record_votes(0x1F525, 8, 8_000_000).unwrap();
        market.platform_fee_taken = 200_000;
        market.creator_fee_taken = 200_000;
        assert_eq!(market.payout_pool().unwrap(), 7_600_000);
    }

    #[test]
    fn can_end_only_after_end_ts() {
        let config = test_config();
        let mut market = open_market(&config);
        assert!(!market.can_end(market.end_ts - 1));
        assert!(market.can_end(market.end_ts));
        market.status = MarketStatus::Ended;
        assert!(!market.can_end(market.end_ts + 1));
    }

    #[test]
    fn pari_mutuel_settlement_scenario() {
        use crate::pricing::{calculate_fee, payout_share};

        // 2.5% + 2.5% fees, flat 0.001 SOL per vote
        let config = test_config();
        let mut market = open_market(&config);
        let market_key = Pubkey::new_unique();
        let mut bet_a = BetAccount::new(market_key, Pubkey::new_unique(), 255);
        let mut bet_b = BetAccount::new(market_key, Pubkey::new_unique(), 254);

        let cost_a = market.vote_cost(0x1F525, 5).unwrap();
        assert_eq!(cost_a, 5_000_000);
        market.record_votes(0x1F525, 5, cost_a).unwrap();
        bet_a.record_votes(0x1F525, 5, cost_a).unwrap();

        let cost_b = market.vote_cost(0x1F680, 3).unwrap();
        assert_eq!(cost_b, 3_000_000);
        market.record_votes(0x1F680, 3, cost_b).unwrap();
        bet_b.record_votes(0x1F680, 3, cost_b).unwrap();

        assert_eq!(market.total_pot, 8_000_000);

        // End: 5 > 3 votes, fire wins; 250 bps off the pot for each side
        let winner = market.select_winner().unwrap();
        assert_eq!(winner, 0x1F525);
        market.winner = Some(winner);
        market.platform_fee_taken = calculate_fee(market.total_pot, market.platform_fee_bps).unwrap();
        market.creator_fee_taken = calculate_fee(market.total_pot, market.creator_fee_bps).unwrap();
        market.status = MarketStatus::Ended;
        assert_eq!(market.platform_fee_taken, 200_000);
        assert_eq!(market.creator_fee_taken, 200_000);

        // A takes the whole pool, B takes nothing, nothing is left over
        let pool = market.payout_pool().unwrap();
        assert_eq!(pool, 7_600_000);
        let total_winning = market.votes_for(winner);
        let payout_a = payout_share(pool, bet_a.votes_for(winner), total_winning).unwrap();
        let payout_b = payout_share(pool, bet_b.votes_for(winner), total_winning).unwrap();
        assert_eq!(payout_a, 7_600_000);
        assert_eq!(payout_b, 0);
        assert_eq!(
            market.total_pot
                - market.platform_fee_taken
                - market.creator_fee_taken
                - payout_a
                - payout_b,
            0
        );
    }

    #[test]
    fn address_derivation_is_deterministic_and_namespaced() {
        let program_id = Pubkey::new_unique();
        let user = Pubkey::new_unique();

        let (config_a, bump_a) = find_config_address(&program_id);
        let (config_b, bump_b) = find_config_address(&program_id);
        assert_eq!((config_a, bump_a), (config_b, bump_b));

        let (market, _) = find_market_address(&program_id, 42);
        let (other_market, _) = find_market_address(&program_id, 43);
        assert_ne!(market, other_market);

        let (bet, _) = find_bet_address(&program_id, &market, &user);
        let (vault, _) = find_market_vault_address(&program_id, &market);
        // distinct namespaces never collide
        assert_ne!(bet, vault);
        assert_ne!(bet, market);
        assert_ne!(vault, market);
    }
}
