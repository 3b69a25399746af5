// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line with clap and hands off to Layer 2.
//
//   1. `train`         — trains an encoder/decoder, keeps the
//                        best checkpoint
//   2. `zero-velocity` — scores the repeat-last-frame baseline
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, TrainArgs, ZeroVelocityArgs};

#[derive(Parser, Debug)]
#[command(
    name = "motion-seq2seq",
    version = "0.1.0",
    about = "Train GRU encoder/decoder models on motion sequences, or score a zero-velocity baseline."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)        => run_train(args),
            Commands::ZeroVelocity(args) => run_zero_velocity(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on data in: {}", args.data.data_path);
    let history = TrainUseCase::new(args.into()).execute()?;

    let best = history.iter().map(|m| m.val_loss).fold(f64::INFINITY, f64::min);
    println!("Training complete after {} epochs. Best validation loss: {best:.6}", history.len());
    Ok(())
}

fn run_zero_velocity(args: ZeroVelocityArgs) -> Result<()> {
    use crate::application::baseline_use_case::ZeroVelocityUseCase;

    let results = ZeroVelocityUseCase::new(args.into()).execute()?;
    for r in results {
        println!("{:<10} {:.6}", r.split, r.loss);
    }
    Ok(())
}
