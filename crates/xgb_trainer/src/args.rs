//! Hyperparameter and channel path resolution
//!
//! Flags are parsed with clap. The container launcher may pass flags this
//! entrypoint does not know about; those are stripped (together with their
//! values) before clap sees the argument list and reported back to the
//! caller. Path flags fall back to container environment variables and then
//! to the standard container locations.

use clap::{CommandFactory, Parser};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::ffi::OsString;
use std::path::PathBuf;
use xgbcv_core::Objective;

use crate::trainer::GbdtConfig;

/// Environment variable naming the training-data channel directory
pub const TRAIN_CHANNEL_ENV: &str = "SM_CHANNEL_TRAIN";
/// Environment variable naming the model output directory
pub const MODEL_DIR_ENV: &str = "SM_MODEL_DIR";

pub const DEFAULT_TRAIN_DIR: &str = "/opt/ml/input/data/train";
pub const DEFAULT_MODEL_DIR: &str = "/opt/ml/model";

/// Source of environment variables.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the real process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "train")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cross-validated gradient boosting trainer", long_about = None)]
pub struct Cli {
    /// Maximum tree depth
    #[arg(long = "max_depth", default_value_t = 5)]
    pub max_depth: u32,

    /// Learning rate (shrinkage applied to each tree)
    #[arg(long = "eta", default_value_t = 0.2)]
    pub eta: f64,

    /// Learning objective
    #[arg(long = "objective", default_value = "reg:squarederror")]
    pub objective: Objective,

    /// Number of cross-validation folds
    #[arg(long = "K", visible_alias = "k", default_value_t = 5)]
    pub k: usize,

    /// Number of boosting rounds
    #[arg(long = "num_round", default_value_t = 10)]
    pub num_round: usize,

    /// Minimum hessian sum required in a child
    #[arg(long = "min_child_weight", default_value_t = 1.0)]
    pub min_child_weight: f64,

    /// L2 regularization on leaf weights
    #[arg(long = "lambda", default_value_t = 1.0)]
    pub lambda: f64,

    /// Minimum loss reduction required to split
    #[arg(long = "gamma", default_value_t = 0.0)]
    pub gamma: f64,

    /// Seed for fold assignment
    #[arg(long = "seed", default_value_t = 42)]
    pub seed: u64,

    /// Training channel directory [env: SM_CHANNEL_TRAIN]
    #[arg(long = "train")]
    pub train: Option<PathBuf>,

    /// Model output directory [env: SM_MODEL_DIR]
    #[arg(long = "model_dir")]
    pub model_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Hyperparameters for one training run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hyperparameters {
    pub max_depth: u32,
    pub eta: f64,
    pub objective: Objective,
    #[serde(rename = "K")]
    pub k: usize,
    pub num_round: usize,
    pub min_child_weight: f64,
    pub lambda: f64,
    pub gamma: f64,
    pub seed: u64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            max_depth: 5,
            eta: 0.2,
            objective: Objective::SquaredError,
            k: 5,
            num_round: 10,
            min_child_weight: 1.0,
            lambda: 1.0,
            gamma: 0.0,
            seed: 42,
        }
    }
}

impl Hyperparameters {
    /// Booster configuration for a single fit
    pub fn gbdt_config(&self) -> GbdtConfig {
        GbdtConfig {
            num_round: self.num_round,
            max_depth: self.max_depth as usize,
            eta: self.eta,
            objective: self.objective,
            min_child_weight: self.min_child_weight,
            lambda: self.lambda,
            gamma: self.gamma,
        }
    }
}

/// Fully resolved training invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArgs {
    pub hyperparameters: Hyperparameters,
    pub train_dir: PathBuf,
    pub model_dir: PathBuf,
    pub verbose: bool,
    /// Arguments that were not recognised and were dropped
    pub discarded: Vec<String>,
}

impl Cli {
    /// Apply environment and literal defaults to the parsed flags
    pub fn resolve(self, env: &dyn EnvSource, discarded: Vec<String>) -> ResolvedArgs {
        ResolvedArgs {
            hyperparameters: Hyperparameters {
                max_depth: self.max_depth,
                eta: self.eta,
                objective: self.objective,
                k: self.k,
                num_round: self.num_round,
                min_child_weight: self.min_child_weight,
                lambda: self.lambda,
                gamma: self.gamma,
                seed: self.seed,
            },
            train_dir: path_or_env(self.train, env, TRAIN_CHANNEL_ENV, DEFAULT_TRAIN_DIR),
            model_dir: path_or_env(self.model_dir, env, MODEL_DIR_ENV, DEFAULT_MODEL_DIR),
            verbose: self.verbose,
            discarded,
        }
    }
}

/// Flag value, else a non-empty environment variable, else `default`
pub fn path_or_env(flag: Option<PathBuf>, env: &dyn EnvSource, key: &str, default: &str) -> PathBuf {
    flag.or_else(|| env.var(key).filter(|v| !v.is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Long flag names (and aliases) the command accepts, without the `--`
fn known_long_flags() -> BTreeSet<String> {
    let command = Cli::command();
    let mut known: BTreeSet<String> = ["help", "version"].iter().map(|s| s.to_string()).collect();
    for arg in command.get_arguments() {
        if let Some(long) = arg.get_long() {
            known.insert(long.to_string());
        }
        if let Some(aliases) = arg.get_all_aliases() {
            known.extend(aliases.into_iter().map(str::to_string));
        }
    }
    known
}

/// Short flags that take no value
fn known_short_flags() -> BTreeSet<char> {
    let command = Cli::command();
    let mut known: BTreeSet<char> = ['h', 'V'].into_iter().collect();
    known.extend(command.get_arguments().filter_map(|arg| arg.get_short()));
    known
}

/// Split argv (without the program name) into arguments clap understands
/// and arguments to discard.
///
/// `--name value` and `--name=value` forms are both recognised. An unknown
/// `--name` also swallows the following token unless that token is itself a
/// long flag or a cluster of known short flags. Stray positional tokens are
/// discarded.
pub fn split_known_args<I, S>(args: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let long = known_long_flags();
    let short = known_short_flags();
    let takes_value = |name: &str| !matches!(name, "verbose" | "help" | "version");
    let is_short_cluster = |token: &str| {
        token.len() > 1 && token.starts_with('-') && token[1..].chars().all(|c| short.contains(&c))
    };

    let mut known = Vec::new();
    let mut discarded = Vec::new();
    let mut iter = args.into_iter().map(Into::into).peekable();

    while let Some(token) = iter.next() {
        if let Some(body) = token.strip_prefix("--") {
            let (name, inline_value) = match body.split_once('=') {
                Some((name, _)) => (name, true),
                None => (body, false),
            };

            if long.contains(name) {
                // Joined as `--name=value` so clap never mistakes a
                // negative number for a flag.
                match iter.next_if(|_| takes_value(name) && !inline_value) {
                    Some(value) => known.push(format!("{token}={value}")),
                    None => known.push(token.clone()),
                }
            } else {
                discarded.push(token.clone());
                let value_follows = !inline_value
                    && iter
                        .peek()
                        .map(|next| !next.starts_with("--") && !is_short_cluster(next))
                        .unwrap_or(false);
                if value_follows {
                    if let Some(value) = iter.next() {
                        discarded.push(value);
                    }
                }
            }
        } else if is_short_cluster(&token) {
            known.push(token);
        } else {
            discarded.push(token);
        }
    }

    (known, discarded)
}

/// Parse an argv (program name first) into resolved arguments.
///
/// Unknown flags are dropped; type coercion failures are returned as clap
/// errors so the caller can print usage and exit with status 2.
pub fn parse_known_args<I, S>(argv: I, env: &dyn EnvSource) -> Result<ResolvedArgs, clap::Error>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut argv = argv.into_iter().map(Into::into);
    let program = argv.next().unwrap_or_else(|| OsString::from("train"));
    let rest: Vec<String> = argv.map(|arg| arg.to_string_lossy().into_owned()).collect();

    let (known, discarded) = split_known_args(rest);
    let cli = Cli::try_parse_from(std::iter::once(program).chain(known.into_iter().map(OsString::from)))?;
    Ok(cli.resolve(env, discarded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn parse(args: &[&str], env: &HashMap<String, String>) -> Result<ResolvedArgs, clap::Error> {
        parse_known_args(std::iter::once("train").chain(args.iter().copied()), env)
    }

    #[test]
    fn test_literal_defaults() -> anyhow::Result<()> {
        let resolved = parse(&[], &env(&[]))?;

        assert_eq!(resolved.hyperparameters, Hyperparameters::default());
        assert_eq!(resolved.train_dir, PathBuf::from(DEFAULT_TRAIN_DIR));
        assert_eq!(resolved.model_dir, PathBuf::from(DEFAULT_MODEL_DIR));
        assert!(resolved.discarded.is_empty());
        Ok(())
    }

    #[test]
    fn test_flags_override_defaults() -> anyhow::Result<()> {
        let resolved = parse(
            &[
                "--max_depth", "3", "--eta=0.05", "--objective", "reg:logistic", "--K", "10",
                "--num_round", "50",
            ],
            &env(&[]),
        )?;

        let hp = &resolved.hyperparameters;
        assert_eq!(hp.max_depth, 3);
        assert_eq!(hp.eta, 0.05);
        assert_eq!(hp.objective, Objective::Logistic);
        assert_eq!(hp.k, 10);
        assert_eq!(hp.num_round, 50);
        Ok(())
    }

    #[test]
    fn test_lowercase_k_alias() -> anyhow::Result<()> {
        assert_eq!(parse(&["--k", "3"], &env(&[]))?.hyperparameters.k, 3);
        Ok(())
    }

    #[test]
    fn test_env_fallback_for_paths() -> anyhow::Result<()> {
        let vars = env(&[(TRAIN_CHANNEL_ENV, "/data/train"), (MODEL_DIR_ENV, "/out/model")]);
        let resolved = parse(&[], &vars)?;
        assert_eq!(resolved.train_dir, PathBuf::from("/data/train"));
        assert_eq!(resolved.model_dir, PathBuf::from("/out/model"));

        let resolved = parse(&["--train", "/cli/train"], &vars)?;
        assert_eq!(resolved.train_dir, PathBuf::from("/cli/train"));
        assert_eq!(resolved.model_dir, PathBuf::from("/out/model"));
        Ok(())
    }

    #[test]
    fn test_empty_env_counts_as_unset() -> anyhow::Result<()> {
        let resolved = parse(&[], &env(&[(MODEL_DIR_ENV, "")]))?;
        assert_eq!(resolved.model_dir, PathBuf::from(DEFAULT_MODEL_DIR));
        Ok(())
    }

    #[test]
    fn test_unknown_flags_are_discarded() -> anyhow::Result<()> {
        let resolved = parse(
            &[
                "--sagemaker_program", "train.py", "--max_depth", "4", "--flag_only", "--eta", "0.1",
                "--other=1", "stray",
            ],
            &env(&[]),
        )?;

        assert_eq!(resolved.hyperparameters.max_depth, 4);
        assert_eq!(resolved.hyperparameters.eta, 0.1);
        assert_eq!(
            resolved.discarded,
            vec!["--sagemaker_program", "train.py", "--flag_only", "--other=1", "stray"]
        );
        Ok(())
    }

    #[test]
    fn test_negative_value_for_known_flag() -> anyhow::Result<()> {
        let resolved = parse(&["--gamma", "-1"], &env(&[]))?;
        assert_eq!(resolved.hyperparameters.gamma, -1.0);
        Ok(())
    }

    #[test]
    fn test_bad_integer_is_usage_error() {
        let err = parse(&["--max_depth", "deep"], &env(&[])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_bad_float_is_usage_error() {
        assert!(parse(&["--eta", "fast"], &env(&[])).is_err());
    }

    #[test]
    fn test_unknown_objective_is_usage_error() {
        assert!(parse(&["--objective", "rank:pairwise"], &env(&[])).is_err());
    }

    #[test]
    fn test_verbose_short_flag() -> anyhow::Result<()> {
        assert!(parse(&["-v"], &env(&[]))?.verbose);
        Ok(())
    }

    #[test]
    fn test_unknown_flag_does_not_swallow_short_flag() -> anyhow::Result<()> {
        let resolved = parse(&["--sagemaker_debug", "-v", "--num_round", "3"], &env(&[]))?;
        assert!(resolved.verbose);
        assert_eq!(resolved.hyperparameters.num_round, 3);
        assert_eq!(resolved.discarded, vec!["--sagemaker_debug"]);
        Ok(())
    }

    #[test]
    fn test_unknown_flag_still_swallows_negative_value() -> anyhow::Result<()> {
        let resolved = parse(&["--offset", "-1"], &env(&[]))?;
        assert_eq!(resolved.discarded, vec!["--offset", "-1"]);
        Ok(())
    }

    #[test]
    fn test_path_or_env_precedence() {
        let vars = env(&[(MODEL_DIR_ENV, "/from/env")]);
        assert_eq!(
            path_or_env(Some(PathBuf::from("/from/flag")), &vars, MODEL_DIR_ENV, "/default"),
            PathBuf::from("/from/flag")
        );
        assert_eq!(path_or_env(None, &vars, MODEL_DIR_ENV, "/default"), PathBuf::from("/from/env"));
        assert_eq!(path_or_env(None, &env(&[]), MODEL_DIR_ENV, "/default"), PathBuf::from("/default"));
    }

    #[test]
    fn test_gbdt_config_mapping() {
        let hp = Hyperparameters {
            max_depth: 2,
            eta: 0.7,
            num_round: 3,
            ..Hyperparameters::default()
        };
        let config = hp.gbdt_config();
        assert_eq!(config.max_depth, 2);
        assert_eq!(config.eta, 0.7);
        assert_eq!(config.num_round, 3);
        assert_eq!(config.objective, Objective::SquaredError);
    }
}
