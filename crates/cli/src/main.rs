//! Local driver for the encrypted guessing game.
//!
//! Hosts a runtime in-process, plays one scripted round against the simulated
//! coprocessor, and prints what each participant is allowed to see.
//!
//! ```bash
//! guess play --secret 42 --guess a1=50 --guess b0=42
//! guess keys --seed 0707070707070707070707070707070707070707070707070707070707070707
//! ```

use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use fhe::{Coprocessor, CoprocessorKeys};
use game_core::{Address, Hint, Timestamp};
use runtime::config::parse_address;
use runtime::{Event, ManualClock, RevealEvent, Runtime, RuntimeConfig, Topic};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "guess", version, about = "Encrypted guess-the-number driver")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play one round end to end and print the outcome.
    Play(PlayArgs),
    /// Print the public keys derived from a seed.
    Keys {
        /// 32-byte hex seed; fresh keys when omitted.
        #[arg(long)]
        seed: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
struct PlayArgs {
    /// Round creator.
    #[arg(long, default_value = "01")]
    creator: String,

    /// Secret number encrypted by the creator.
    #[arg(long)]
    secret: u16,

    /// `PLAYER=VALUE`, repeated in submission order. PLAYER is a 20-byte hex
    /// address or a single hex byte.
    #[arg(long = "guess", value_name = "PLAYER=VALUE")]
    guesses: Vec<String>,

    /// Round length in seconds; the configured default when omitted.
    #[arg(long)]
    duration: Option<u64>,

    /// 32-byte hex seed for the coprocessor keys.
    #[arg(long)]
    seed: Option<String>,

    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();
    setup_logging();

    match Cli::parse().command {
        Command::Play(args) => play(args).await,
        Command::Keys { seed } => {
            let keys = load_keys(seed.as_deref())?;
            println!("input signer: {}", hex::encode(keys.input_verifying_key().as_bytes()));
            println!("kms signer:   {}", hex::encode(keys.kms_verifying_key().as_bytes()));
            Ok(())
        }
    }
}

/// Logs go to stderr so stdout stays clean for the summary.
fn setup_logging() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn play(args: PlayArgs) -> Result<()> {
    let creator = parse_player(&args.creator)?;
    let guesses = args
        .guesses
        .iter()
        .map(|raw| parse_guess(raw))
        .collect::<Result<Vec<_>>>()?;

    let config = RuntimeConfig::from_env();
    let fee = config.game.entry_fee;
    let reveal_timeout = config.game.reveal_timeout;
    let coprocessor = Arc::new(Coprocessor::new(load_keys(args.seed.as_deref())?));
    let clock = ManualClock::new(Timestamp(0));

    let runtime = Runtime::builder()
        .config(config)
        .coprocessor(coprocessor.clone())
        .clock(Arc::new(clock.clone()))
        .build()
        .await?;
    let handle = runtime.handle();
    let contract = handle.contract();
    let mut reveals = handle.subscribe(Topic::Reveal);

    let secret = coprocessor
        .encrypt_input(contract, creator)
        .add16(args.secret)
        .encrypt()?
        .input(0)
        .context("encrypted secret missing from bundle")?;
    let round_id = handle
        .create_round(creator, secret, fee, args.duration)
        .await?;
    info!(%round_id, "round opened");

    let mut hints = Vec::with_capacity(guesses.len());
    for (player, value) in guesses {
        let input = coprocessor
            .encrypt_input(contract, player)
            .add16(value)
            .encrypt()?
            .input(0)
            .context("encrypted guess missing from bundle")?;
        let receipt = handle.submit_guess(player, round_id, input, fee).await?;
        let hint = coprocessor
            .user_decrypt(&receipt.encrypted_hint, &player)
            .ok()
            .and_then(Hint::from_code)
            .context("hint did not decrypt for its player")?;
        hints.push((player, value, hint));
    }

    let info = handle.get_round_info(round_id).await?;
    clock.set(info.end_time);
    handle.end_round(round_id).await?;
    let request_id = handle.request_round_reveal(round_id).await?;

    let (revealed, winner) = loop {
        let event = tokio::time::timeout(
            std::time::Duration::from_secs(reveal_timeout.max(1)),
            reveals.recv(),
        )
        .await
        .context("reveal did not complete")??;
        match event {
            Event::Reveal(RevealEvent::RevealFulfilled {
                request_id: id,
                secret,
                winner,
                ..
            }) if id == request_id => break (secret, winner),
            Event::Reveal(RevealEvent::RevealRejected { code, error, .. }) => {
                bail!("reveal rejected ({code}): {error}")
            }
            _ => continue,
        }
    };
    let pot = coprocessor.user_decrypt(&info.pot, &creator)?;

    if args.json {
        let summary = serde_json::json!({
            "round_id": round_id.0,
            "request_id": request_id.0,
            "secret": revealed,
            "winner": winner.map(|address| address.to_string()),
            "pot": pot,
            "guesses": hints
                .iter()
                .map(|(player, value, hint)| serde_json::json!({
                    "player": player.to_string(),
                    "guess": value,
                    "hint": hint.to_string(),
                }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("round {round_id}");
        for (player, value, hint) in &hints {
            println!("  {player} guessed {value}: {hint}");
        }
        println!("secret: {revealed}");
        match winner {
            Some(winner) => println!("winner: {winner}"),
            None => println!("winner: none"),
        }
        println!("pot: {pot}");
    }

    drop(handle);
    runtime.shutdown().await?;
    Ok(())
}

fn load_keys(seed: Option<&str>) -> Result<CoprocessorKeys> {
    match seed {
        Some(raw) => {
            let bytes: [u8; 32] = hex::decode(raw.trim_start_matches("0x"))?
                .try_into()
                .map_err(|_| anyhow!("seed must be 32 bytes"))?;
            Ok(CoprocessorKeys::from_seed(bytes))
        }
        None => Ok(CoprocessorKeys::generate()),
    }
}

fn parse_player(raw: &str) -> Result<Address> {
    if let Some(address) = parse_address(raw) {
        return Ok(address);
    }
    let byte = u8::from_str_radix(raw.trim_start_matches("0x"), 16)
        .with_context(|| format!("invalid player address: {raw}"))?;
    Ok(Address::from_low_u8(byte))
}

fn parse_guess(raw: &str) -> Result<(Address, u16)> {
    let (player, value) = raw
        .split_once('=')
        .with_context(|| format!("expected PLAYER=VALUE, got {raw}"))?;
    let value = value
        .trim()
        .parse()
        .with_context(|| format!("invalid guess value in {raw}"))?;
    Ok((parse_player(player.trim())?, value))
}
