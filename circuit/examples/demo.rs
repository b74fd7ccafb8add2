//! Walk-through of a deposit from plaintext state to a verified proof.
//!
//! Opens two accounts, credits a few balances, then proves and verifies the
//! last deposit with Groth16. Set `LOG_FORMAT=json` for JSON logs and
//! `RUST_LOG=state_circuit=debug` to see per-gadget constraint counts.
//!
//! Run with:
//!   cargo run --example demo --release

use std::time::Instant;

use anyhow::Result;
use ark_bn254::Fr;
use ark_std::rand::{rngs::StdRng, SeedableRng};

use state_circuit::logging::{init_logging, LogFormat};
use state_circuit::zkp::{check_satisfied, DepositCircuit, DepositProver};
use state_circuit::ExchangeState;

// Small trees keep the trusted setup quick; the wiring matches full depth.
const ACCOUNTS: usize = 4;
const TOKENS: usize = 2;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";

fn step(n: usize, title: &str) {
    println!("\n{BOLD}{CYAN}[{n}]{RESET} {BOLD}{title}{RESET}");
}

fn short(x: Fr) -> String {
    let s = x.to_string();
    if s.len() > 16 {
        format!("{}..{}", &s[..8], &s[s.len() - 6..])
    } else {
        s
    }
}

fn main() -> Result<()> {
    let format = std::env::var("LOG_FORMAT").unwrap_or_default();
    init_logging("info", LogFormat::from_str_lossy(&format))?;

    let mut rng = StdRng::seed_from_u64(2026);
    let mut state = ExchangeState::<ACCOUNTS, TOKENS>::new();

    step(1, "Open accounts");
    state.open_account(7, Fr::from(0xA11CEu64), (Fr::from(3u64), Fr::from(4u64)))?;
    state.open_account(200, Fr::from(0xB0Bu64), (Fr::from(5u64), Fr::from(12u64)))?;
    println!("  {DIM}accounts root{RESET} {}", short(state.root()));

    step(2, "Seed balances");
    state.deposit(7, 0, 1_000)?;
    state.deposit(200, 3, 250)?;
    println!("  {DIM}accounts root{RESET} {}", short(state.root()));

    step(3, "Deposit 42 of token 0 into account 7");
    let record = state.deposit(7, 0, 42)?;
    let constraints = check_satisfied(&DepositCircuit::<ACCOUNTS, TOKENS>::new(record.clone()))?;
    println!("  {DIM}balance{RESET}       {} -> {}", record.balance_update.before.balance, record.balance_update.after.balance);
    println!("  {DIM}constraints{RESET}   {constraints}");

    step(4, "Groth16 setup, prove, verify");
    let t = Instant::now();
    let (prover, verifier) = DepositProver::<ACCOUNTS, TOKENS>::setup(&mut rng)?;
    println!("  {DIM}setup{RESET}         {:?}", t.elapsed());

    let t = Instant::now();
    let proof = prover.prove(record.clone(), &mut rng)?;
    println!("  {DIM}prove{RESET}         {:?} ({} bytes)", t.elapsed(), proof.size());

    let ok = verifier.verify_record(&proof, &record)?;
    println!("  {DIM}verify{RESET}        {GREEN}{ok}{RESET}");

    Ok(())
}
