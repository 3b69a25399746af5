// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `zero-velocity`,
// and all their flags. Both share the data flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{baseline_use_case::BaselineConfig, train_use_case::TrainConfig};
use crate::domain::motion::Task;
use crate::ml::{attention::AttentionMethod, loss::Criterion};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train an encoder/decoder on a motion dataset
    Train(TrainArgs),

    /// Score the repeat-last-frame baseline on every split
    ZeroVelocity(ZeroVelocityArgs),
}

/// Where the data lives and how it is cut into windows
#[derive(Args, Debug)]
pub struct DataArgs {
    /// prediction or conversion
    #[arg(long)]
    pub task: Task,

    /// Directory with training.json, validation.json and testing.json
    #[arg(long)]
    pub data_path: String,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Frames per input (and target) window
    #[arg(long, default_value_t = 20)]
    pub seq_length: usize,

    /// Keep every n-th frame (prediction only)
    #[arg(long, default_value_t = 3)]
    pub stride: usize,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Checkpoint directory (weights, optimizer states, config, metrics)
    #[arg(long)]
    pub model_file_path: String,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// GRU hidden width of both encoder and decoder
    #[arg(long, default_value_t = 256)]
    pub hidden_size: usize,

    /// Dropout on the encoder outputs
    #[arg(long, default_value_t = 0.0)]
    pub dropout: f64,

    /// Bidirectional encoder (not supported, rejected at start-up)
    #[arg(long)]
    pub bidirectional: bool,

    /// Decode with Luong attention: dot, general or concat
    #[arg(long)]
    pub attention: Option<AttentionMethod>,

    /// Probability that a batch is decoded from ground truth
    #[arg(long, default_value_t = 1.0)]
    pub teacher_forcing_ratio: f64,

    /// Per-epoch decay of the teacher forcing ratio
    #[arg(long, default_value_t = 1.0)]
    pub schedule_rate: f64,

    /// L2-normalise every group of 4 output features
    #[arg(long)]
    pub norm_quaternions: bool,

    /// Treat the trailing 3·⌊in/7⌋ output features as an auxiliary task
    #[arg(long)]
    pub auxiliary_acc: bool,

    /// l1 or mse
    #[arg(long, default_value_t = Criterion::L1)]
    pub loss: Criterion,

    /// Multiply the learning rate by --lr-gamma every n epochs
    #[arg(long)]
    pub lr_step_size: Option<usize>,

    #[arg(long, default_value_t = 0.1)]
    pub lr_gamma: f64,

    /// Seeds shuffling and teacher forcing draws
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Data loader worker threads
    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            task:                  a.data.task,
            data_path:             a.data.data_path,
            model_file_path:       a.model_file_path,
            batch_size:            a.data.batch_size,
            seq_length:            a.data.seq_length,
            stride:                a.data.stride,
            epochs:                a.epochs,
            lr:                    a.lr,
            hidden_size:           a.hidden_size,
            dropout:               a.dropout,
            bidirectional:         a.bidirectional,
            attention:             a.attention,
            teacher_forcing_ratio: a.teacher_forcing_ratio,
            schedule_rate:         a.schedule_rate,
            norm_quaternions:      a.norm_quaternions,
            auxiliary_acc:         a.auxiliary_acc,
            loss:                  a.loss,
            lr_step_size:          a.lr_step_size,
            lr_gamma:              a.lr_gamma,
            seed:                  a.seed,
            num_workers:           a.num_workers,
        }
    }
}

#[derive(Args, Debug)]
pub struct ZeroVelocityArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Also write zero_velocity.json into this directory
    #[arg(long)]
    pub model_file_path: Option<String>,

    /// l1 or mse
    #[arg(long, default_value_t = Criterion::L1)]
    pub loss: Criterion,
}

impl From<ZeroVelocityArgs> for BaselineConfig {
    fn from(a: ZeroVelocityArgs) -> Self {
        BaselineConfig {
            task:            a.data.task,
            data_path:       a.data.data_path,
            model_file_path: a.model_file_path,
            batch_size:      a.data.batch_size,
            seq_length:      a.data.seq_length,
            stride:          a.data.stride,
            loss:            a.loss,
        }
    }
}
