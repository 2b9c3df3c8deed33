//! Emoji Market Program
//!
//! Pari-mutuel emoji voting markets on Solana.
//!
//! ## Architecture
//!
//! - Markets collect lamport-priced votes on emojis during a fixed window
//! - Vote prices follow a configurable quadratic curve with a malus factor
//! - When a market ends, platform and creator fees come off the pot and the
//!   rest is split pari-mutuel among bettors on the winning emoji
//! - Every account is a PDA derived from a fixed seed tag, so clients can
//!   compute addresses without any lookup

pub mod error;
pub mod instruction;
pub mod pricing;
pub mod processor;
pub mod state;
pub mod utils;

#[cfg(not(feature = "no-entrypoint"))]
pub mod entrypoint;

// Re-export commonly used items
pub use error::EmojiMarketError;
pub use instruction::EmojiMarketInstruction;
pub use state::*;

solana_program::declare_id!("EmozvnxieqiaVyzDuYqFvkowHV4eJwcUuZdmALyppxuW");
