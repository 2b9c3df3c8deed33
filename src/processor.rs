//! Instruction processor for the Emoji Market Program

use borsh::BorshSerialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::invoke,
    program_error::ProgramError,
    pubkey::Pubkey,
    system_instruction,
};

use crate::error::EmojiMarketError;
use crate::instruction::{
    ClaimArgs, CreateMarketArgs, EmojiMarketInstruction, EndMarketArgs, InitializeConfigArgs,
    PlaceBetArgs,
};
use crate::pricing::calculate_fee;
use crate::state::{
    BetAccount, Config, Market, MarketStatus, Vault, BET_DISCRIMINATOR, BET_SEED,
    CONFIG_DISCRIMINATOR, CONFIG_SEED, MARKET_DISCRIMINATOR, MARKET_SEED, MARKET_VAULT_SEED,
    MAX_IMAGE_URL_LEN, MAX_TITLE_LEN, MIN_MALUS_K_MILLIS, VAULT_DISCRIMINATOR,
};
use crate::utils::{
    check_signer, create_pda_account, deserialize_account, get_current_timestamp,
    transfer_lamports, verify_pda,
};

/// Process an instruction
pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    let instruction = EmojiMarketInstruction::unpack(instruction_data)?;

    match instruction {
        EmojiMarketInstruction::InitializeConfig(args) => {
            msg!("Instruction: InitializeConfig");
            process_initialize_config(program_id, accounts, args)
        }
        EmojiMarketInstruction::CreateMarket(args) => {
            msg!("Instruction: CreateMarket");
            process_create_market(program_id, accounts, args)
        }
        EmojiMarketInstruction::PlaceBet(args) => {
            msg!("Instruction: PlaceBet");
            process_place_bet(program_id, accounts, args)
        }
        EmojiMarketInstruction::EndMarket(args) => {
            msg!("Instruction: EndMarket");
            process_end_market(program_id, accounts, args)
        }
        EmojiMarketInstruction::Claim(args) => {
            msg!("Instruction: Claim");
            process_claim(program_id, accounts, args)
        }
    }
}

fn check_system_program(info: &AccountInfo) -> ProgramResult {
    if *info.key != solana_program::system_program::ID {
        msg!("Error: Invalid System Program");
        return Err(ProgramError::IncorrectProgramId);
    }
    Ok(())
}

fn process_initialize_config(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    args: InitializeConfigArgs,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    // Account 0: Admin (signer, pays rent)
    let admin_info = next_account_info(account_info_iter)?;
    check_signer(admin_info)?;

    // Account 1: Config PDA (writable)
    let config_info = next_account_info(account_info_iter)?;

    // Account 2: System Program
    let system_program_info = next_account_info(account_info_iter)?;
    check_system_program(system_program_info)?;

    // The signer must be the admin it is installing
    if *admin_info.key != args.admin_address {
        msg!("Error: Signer does not match admin address");
        return Err(EmojiMarketError::Unauthorized.into());
    }

    let config_bump = verify_pda(config_info.key, program_id, &[CONFIG_SEED])?;

    if !config_info.data_is_empty() {
        msg!("Error: Config already initialized");
        return Err(EmojiMarketError::AlreadyInitialized.into());
    }

    // Validate configuration parameters
    if (args.platform_fee_bps as u32) + (args.creator_fee_bps as u32) > 10_000 {
        msg!("Error: Fee basis points sum exceeds 10000");
        return Err(EmojiMarketError::FeesTooHigh.into());
    }
    if args.min_duration_secs > args.max_duration_secs {
        msg!("Error: min duration exceeds max duration");
        return Err(EmojiMarketError::InvalidDurationRange.into());
    }
    if args.base_price_lamports == 0 {
        msg!("Error: Base price must be positive");
        return Err(EmojiMarketError::InvalidBasePrice.into());
    }
    if args.malus_k_millis < MIN_MALUS_K_MILLIS {
        msg!("Error: Malus factor below -1000");
        return Err(EmojiMarketError::InvalidMalusFactor.into());
    }

    create_pda_account(
        admin_info,
        config_info,
        Config::SIZE,
        program_id,
        system_program_info,
        &[CONFIG_SEED, &[config_bump]],
    )?;

    let config = Config::new(
        args.admin_address,
        args.platform_fee_bps,
        args.creator_fee_bps,
        args.base_price_lamports,
        args.malus_k_millis,
        args.quad_a_micros,
        args.quad_b_micros,
        args.min_duration_secs,
        args.max_duration_secs,
        config_bump,
    );
    config.serialize(&mut *config_info.data.borrow_mut())?;

    msg!("Config initialized, admin {}", args.admin_address);
    Ok(())
}

fn process_create_market(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    args: CreateMarketArgs,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    // Account 0: Creator (signer, pays rent)
    let creator_info = next_account_info(account_info_iter)?;
    check_signer(creator_info)?;

    // Account 1: Config PDA
    let config_info = next_account_info(account_info_iter)?;

    // Account 2: Market PDA (writable)
    let market_info = next_account_info(account_info_iter)?;

    // Account 3: Market Vault PDA (writable)
    let vault_info = next_account_info(account_info_iter)?;

    // Account 4: System Program
    let system_program_info = next_account_info(account_info_iter)?;
    check_system_program(system_program_info)?;

    verify_pda(config_info.key, program_id, &[CONFIG_SEED])?;
    if config_info.data_is_empty() {
        msg!("Error: Config not initialized");
        return Err(EmojiMarketError::AccountNotInitialized.into());
    }
    let config = deserialize_account::<Config>(&config_info.data.borrow())?;
    if config.discriminator != CONFIG_DISCRIMINATOR {
        return Err(EmojiMarketError::InvalidAccountData.into());
    }

    // Validate inputs
    if args.title.len() > MAX_TITLE_LEN {
        msg!("Error: Title too long");
        return Err(EmojiMarketError::TitleTooLong.into());
    }
    if let Some(ref url) = args.image_url {
        if url.len() > MAX_IMAGE_URL_LEN {
            msg!("Error: Image URL too long");
            return Err(EmojiMarketError::ImageUrlTooLong.into());
        }
    }
    if args.duration_secs < config.min_duration_secs {
        msg!("Error: Duration below minimum");
        return Err(EmojiMarketError::DurationTooShort.into());
    }
    if args.duration_secs > config.max_duration_secs {
        msg!("Error: Duration above maximum");
        return Err(EmojiMarketError::DurationTooLong.into());
    }

    let start_ts = get_current_timestamp()?;
    let end_ts = start_ts
        .checked_add(args.duration_secs as i64)
        .ok_or(EmojiMarketError::ArithmeticOverflow)?;

    let market_id_bytes = args.market_id.to_le_bytes();
    let market_bump = verify_pda(market_info.key, program_id, &[MARKET_SEED, &market_id_bytes])?;
    if !market_info.data_is_empty() {
        msg!("Error: Market {} already exists", args.market_id);
        return Err(EmojiMarketError::AlreadyInitialized.into());
    }

    let vault_bump = verify_pda(
        vault_info.key,
        program_id,
        &[MARKET_VAULT_SEED, market_info.key.as_ref()],
    )?;

    create_pda_account(
        creator_info,
        market_info,
        Market::SIZE,
        program_id,
        system_program_info,
        &[MARKET_SEED, &market_id_bytes, &[market_bump]],
    )?;

    create_pda_account(
        creator_info,
        vault_info,
        Vault::SIZE,
        program_id,
        system_program_info,
        &[MARKET_VAULT_SEED, market_info.key.as_ref(), &[vault_bump]],
    )?;

    let market = Market::new(
        args.market_id,
        *creator_info.key,
        args.title,
        args.image_url,
        start_ts,
        end_ts,
        &config,
        market_bump,
    );
    market.serialize(&mut *market_info.data.borrow_mut())?;

    let vault = Vault::new(vault_bump);
    vault.serialize(&mut *vault_info.data.borrow_mut())?;

    msg!(
        "Market {} created, betting open until {}",
        args.market_id,
        end_ts
    );
    Ok(())
}

fn process_place_bet(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    args: PlaceBetArgs,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    // Account 0: User (signer, pays cost and bet rent)
    let user_info = next_account_info(account_info_iter)?;
    check_signer(user_info)?;

    // Account 1: Market PDA (writable)
    let market_info = next_account_info(account_info_iter)?;

    // Account 2: Bet PDA (writable, created on first bet)
    let bet_info = next_account_info(account_info_iter)?;

    // Account 3: Market Vault PDA (writable)
    let vault_info = next_account_info(account_info_iter)?;

    // Account 4: System Program
    let system_program_info = next_account_info(account_info_iter)?;
    check_system_program(system_program_info)?;

    let market_id_bytes = args.market_id.to_le_bytes();
    verify_pda(market_info.key, program_id, &[MARKET_SEED, &market_id_bytes])?;
    if market_info.data_is_empty() {
        return Err(EmojiMarketError::AccountNotInitialized.into());
    }
    let mut market = deserialize_account::<Market>(&market_info.data.borrow())?;
    if market.discriminator != MARKET_DISCRIMINATOR {
        return Err(EmojiMarketError::InvalidAccountData.into());
    }

    verify_pda(
        vault_info.key,
        program_id,
        &[MARKET_VAULT_SEED, market_info.key.as_ref()],
    )?;

    // Betting window checks
    let now = get_current_timestamp()?;
    if !market.is_open() {
        msg!("Error: Market has ended");
        return Err(EmojiMarketError::MarketNotOpen.into());
    }
    if now < market.start_ts || now >= market.end_ts {
        msg!("Error: Betting window is closed");
        return Err(EmojiMarketError::BettingClosed.into());
    }

    // The emoji id must be a real Unicode scalar value
    if char::from_u32(args.emoji_id).is_none() {
        msg!("Error: {} is not a valid emoji id", args.emoji_id);
        return Err(EmojiMarketError::InvalidEmojiId.into());
    }

    // Price the purchase against the emoji's current tally before anything
    // is mutated. Quantity bounds are enforced by the pricing engine.
    let cost = market.vote_cost(args.emoji_id, args.vote_qty)?;

    let bet_bump = verify_pda(
        bet_info.key,
        program_id,
        &[BET_SEED, market_info.key.as_ref(), user_info.key.as_ref()],
    )?;

    let mut bet = if bet_info.data_is_empty() {
        create_pda_account(
            user_info,
            bet_info,
            BetAccount::SIZE,
            program_id,
            system_program_info,
            &[
                BET_SEED,
                market_info.key.as_ref(),
                user_info.key.as_ref(),
                &[bet_bump],
            ],
        )?;
        BetAccount::new(*market_info.key, *user_info.key, bet_bump)
    } else {
        let bet = deserialize_account::<BetAccount>(&bet_info.data.borrow())?;
        if bet.discriminator != BET_DISCRIMINATOR
            || bet.market != *market_info.key
            || bet.user != *user_info.key
        {
            return Err(EmojiMarketError::InvalidAccountData.into());
        }
        bet
    };

    // Move the cost into the vault
    invoke(
        &system_instruction::transfer(user_info.key, vault_info.key, cost),
        &[
            user_info.clone(),
            vault_info.clone(),
            system_program_info.clone(),
        ],
    )?;

    market.record_votes(args.emoji_id, args.vote_qty, cost)?;
    bet.record_votes(args.emoji_id, args.vote_qty, cost)?;

    market.serialize(&mut *market_info.data.borrow_mut())?;
    bet.serialize(&mut *bet_info.data.borrow_mut())?;

    msg!(
        "Bet: {} votes on {:#x} for {} lamports",
        args.vote_qty,
        args.emoji_id,
        cost
    );
    Ok(())
}

fn process_end_market(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    args: EndMarketArgs,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    // Account 0: Caller (signer, config admin or market creator)
    let caller_info = next_account_info(account_info_iter)?;
    check_signer(caller_info)?;

    // Account 1: Config PDA
    let config_info = next_account_info(account_info_iter)?;

    // Account 2: Market PDA (writable)
    let market_info = next_account_info(account_info_iter)?;

    // Account 3: Market Vault PDA (writable)
    let vault_info = next_account_info(account_info_iter)?;

    // Account 4: Platform admin wallet (writable)
    let platform_wallet_info = next_account_info(account_info_iter)?;

    // Account 5: Market creator wallet (writable)
    let creator_wallet_info = next_account_info(account_info_iter)?;

    verify_pda(config_info.key, program_id, &[CONFIG_SEED])?;
    let config = deserialize_account::<Config>(&config_info.data.borrow())?;
    if config.discriminator != CONFIG_DISCRIMINATOR {
        return Err(EmojiMarketError::InvalidAccountData.into());
    }

    let market_id_bytes = args.market_id.to_le_bytes();
    verify_pda(market_info.key, program_id, &[MARKET_SEED, &market_id_bytes])?;
    if market_info.data_is_empty() {
        return Err(EmojiMarketError::AccountNotInitialized.into());
    }
    let mut market = deserialize_account::<Market>(&market_info.data.borrow())?;
    if market.discriminator != MARKET_DISCRIMINATOR {
        return Err(EmojiMarketError::InvalidAccountData.into());
    }

    verify_pda(
        vault_info.key,
        program_id,
        &[MARKET_VAULT_SEED, market_info.key.as_ref()],
    )?;
    let vault = deserialize_account::<Vault>(&vault_info.data.borrow())?;
    if vault.discriminator != VAULT_DISCRIMINATOR {
        return Err(EmojiMarketError::InvalidAccountData.into());
    }

    // Only the platform admin or the market creator may end a market
    let is_admin = *caller_info.key == config.admin_address;
    let is_creator = *caller_info.key == market.creator;
    if !is_admin && !is_creator {
        msg!("Error: Caller is neither admin nor creator");
        return Err(EmojiMarketError::Unauthorized.into());
    }

    // Fee recipients must be the recorded wallets
    if *platform_wallet_info.key != config.admin_address
        || *creator_wallet_info.key != market.creator
    {
        msg!("Error: Fee recipient mismatch");
        return Err(EmojiMarketError::InvalidAccountData.into());
    }

    if !market.is_open() {
        msg!("Error: Market already ended");
        return Err(EmojiMarketError::MarketAlreadyEnded.into());
    }
    let now = get_current_timestamp()?;
    if now < market.end_ts {
        msg!("Error: Market runs until {}", market.end_ts);
        return Err(EmojiMarketError::MarketNotEnded.into());
    }

    let winner = market.select_winner();
    let platform_fee = calculate_fee(market.total_pot, market.platform_fee_bps)?;
    let creator_fee = calculate_fee(market.total_pot, market.creator_fee_bps)?;

    if platform_fee > 0 {
        transfer_lamports(vault_info, platform_wallet_info, platform_fee)?;
    }
    if creator_fee > 0 {
        transfer_lamports(vault_info, creator_wallet_info, creator_fee)?;
    }

    market.winner = winner;
    market.platform_fee_taken = platform_fee;
    market.creator_fee_taken = creator_fee;
    market.status = MarketStatus::Ended;
    market.serialize(&mut *market_info.data.borrow_mut())?;

    match winner {
        Some(emoji_id) => msg!("Market {} ended, winner {:#x}", args.market_id, emoji_id),
        None => msg!("Market {} ended with no votes", args.market_id),
    }
    Ok(())
}

fn process_claim(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    args: ClaimArgs,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    // Account 0: Caller (signer, fee payer; any wallet may crank a claim)
    let caller_info = next_account_info(account_info_iter)?;
    check_signer(caller_info)?;

    // Account 1: Market PDA
    let market_info = next_account_info(account_info_iter)?;

    // Account 2: Bet PDA (writable)
    let bet_info = next_account_info(account_info_iter)?;

    // Account 3: Market Vault PDA (writable)
    let vault_info = next_account_info(account_info_iter)?;

    // Account 4: User wallet (writable, receives the payout)
    let user_wallet_info = next_account_info(account_info_iter)?;

    let market_id_bytes = args.market_id.to_le_bytes();
    verify_pda(market_info.key, program_id, &[MARKET_SEED, &market_id_bytes])?;
    if market_info.data_is_empty() {
        return Err(EmojiMarketError::AccountNotInitialized.into());
    }
    let market = deserialize_account::<Market>(&market_info.data.borrow())?;
    if market.discriminator != MARKET_DISCRIMINATOR {
        return Err(EmojiMarketError::InvalidAccountData.into());
    }

    verify_pda(
        vault_info.key,
        program_id,
        &[MARKET_VAULT_SEED, market_info.key.as_ref()],
    )?;

    verify_pda(
        bet_info.key,
        program_id,
        &[BET_SEED, market_info.key.as_ref(), args.user.as_ref()],
    )?;
    if bet_info.data_is_empty() {
        msg!("Error: No bet recorded for this user");
        return Err(EmojiMarketError::AccountNotInitialized.into());
    }
    let mut bet = deserialize_account::<BetAccount>(&bet_info.data.borrow())?;
    if bet.discriminator != BET_DISCRIMINATOR || bet.market != *market_info.key {
        return Err(EmojiMarketError::InvalidAccountData.into());
    }

    // The payout can only reach the wallet the bet was placed from
    if bet.user != args.user || *user_wallet_info.key != args.user {
        msg!("Error: User does not match bet account");
        return Err(EmojiMarketError::UserMismatch.into());
    }

    if market.status != MarketStatus::Ended {
        msg!("Error: Market has not ended");
        return Err(EmojiMarketError::MarketNotEnded.into());
    }
    if bet.claimed {
        msg!("Error: Already claimed");
        return Err(EmojiMarketError::AlreadyClaimed.into());
    }

    // A market that ended without votes, or a user without winning votes,
    // claims zero; the claim still succeeds and is marked settled.
    let payout = match market.winner {
        Some(winner_emoji) => {
            let total_winning_votes = market.votes_for(winner_emoji);
            let user_winning_votes = bet.votes_for(winner_emoji);
            if total_winning_votes == 0 || user_winning_votes == 0 {
                0
            } else {
                crate::pricing::payout_share(
                    market.payout_pool()?,
                    user_winning_votes,
                    total_winning_votes,
                )?
            }
        }
        None => 0,
    };

    if payout > 0 {
        transfer_lamports(vault_info, user_wallet_info, payout)?;
    }

    bet.claimed = true;
    bet.serialize(&mut *bet_info.data.borrow_mut())?;

    msg!("Claim settled: {} lamports to {}", payout, args.user);
    Ok(())
}
