//! Error types for the Emoji Market Program

use num_derive::FromPrimitive;
use solana_program::{
    decode_error::DecodeError,
    program_error::ProgramError,
};
use thiserror::Error;

/// Errors that may be returned by the Emoji Market Program
#[derive(Clone, Debug, Eq, Error, FromPrimitive, PartialEq)]
pub enum EmojiMarketError {
    // === General Errors (0-99) ===

    #[error("Invalid instruction")]
    InvalidInstruction = 0,

    #[error("Invalid account data")]
    InvalidAccountData = 1,

    #[error("Account not initialized")]
    AccountNotInitialized = 2,

    #[error("Already initialized")]
    AlreadyInitialized = 3,

    #[error("Invalid program address")]
    InvalidProgramAddress = 4,

    #[error("Invalid signer")]
    InvalidSigner = 5,

    #[error("Unauthorized")]
    Unauthorized = 6,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow = 7,

    // === Configuration Errors (100-199) ===

    #[error("Total fees exceed 100%")]
    FeesTooHigh = 100,

    #[error("Invalid duration range")]
    InvalidDurationRange = 101,

    #[error("Base price must be greater than zero")]
    InvalidBasePrice = 102,

    #[error("Malus factor below -1000 per mille")]
    InvalidMalusFactor = 103,

    // === Input Errors (200-299) ===

    #[error("Title too long")]
    TitleTooLong = 200,

    #[error("Image URL too long")]
    ImageUrlTooLong = 201,

    #[error("Market duration is too short")]
    DurationTooShort = 202,

    #[error("Market duration is too long")]
    DurationTooLong = 203,

    #[error("Invalid vote quantity")]
    InvalidVoteQuantity = 204,

    #[error("Invalid emoji id")]
    InvalidEmojiId = 205,

    #[error("Too many distinct emojis in market")]
    TooManyEmojis = 206,

    #[error("User does not match bet account")]
    UserMismatch = 207,

    // === State Errors (300-399) ===

    #[error("Market is not open")]
    MarketNotOpen = 300,

    #[error("Betting window is closed")]
    BettingClosed = 301,

    #[error("Market has not ended yet")]
    MarketNotEnded = 302,

    #[error("Market already ended")]
    MarketAlreadyEnded = 303,

    #[error("Rewards already claimed")]
    AlreadyClaimed = 304,
}

impl From<EmojiMarketError> for ProgramError {
    fn from(e: EmojiMarketError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for EmojiMarketError {
    fn type_of() -> &'static str {
        "EmojiMarketError"
    }
}
