pub mod config;
pub mod embeddings;
pub mod error;
pub mod eval;

pub use config::Config;
pub use error::{EvalError, Result};
pub use eval::{evaluate_model, Evaluator, MetricReport};
