use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;

use crate::dispatcher::DispatchMode;
use crate::error::ConfigError;
use crate::ledger::MalformedRowPolicy;
use crate::types::AssetKind;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub rpc_url: String,
    pub funding_keypair_path: String,

    #[serde(default = "default_wallets_csv")]
    pub wallets_csv: PathBuf,

    /// Maximum transfers in flight at once. Mutually exclusive with
    /// `delay_secs`.
    pub concurrency: Option<usize>,

    /// Seconds to wait between consecutive transfers. Mutually exclusive with
    /// `concurrency`.
    pub delay_secs: Option<f64>,

    /// SPL token mint; presence switches the run into token-distribution
    /// mode. Absent means native SOL.
    pub mint: Option<String>,

    #[serde(default)]
    pub on_malformed: MalformedRowPolicy,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

fn default_wallets_csv() -> PathBuf {
    PathBuf::from("wallets.csv")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_file() -> String {
    "logs.txt".to_string()
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)
            .with_context(|| format!("Failed to open config file: {:?}", path.as_ref()))?;
        let config: Config =
            serde_yaml::from_reader(file).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Dispatch pacing is an exclusive choice: a bounded pool or a fixed
    /// inter-transfer delay.
    pub fn dispatch_mode(&self) -> Result<DispatchMode, ConfigError> {
        match (self.concurrency, self.delay_secs) {
            (Some(_), Some(_)) => Err(ConfigError::ModeConflict),
            (None, None) => Err(ConfigError::ModeMissing),
            (Some(limit), None) => DispatchMode::bounded(limit),
            (None, Some(secs)) => {
                if !secs.is_finite() || secs < 0.0 {
                    return Err(ConfigError::InvalidDelay(secs));
                }
                Ok(DispatchMode::paced(Duration::from_secs_f64(secs)))
            }
        }
    }

    pub fn asset(&self) -> Result<AssetKind, ConfigError> {
        match &self.mint {
            None => Ok(AssetKind::Sol),
            Some(mint) => Pubkey::from_str(mint)
                .map(|mint| AssetKind::Token { mint })
                .map_err(|_| ConfigError::InvalidMint(mint.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            rpc_url: "http://localhost:8899".to_string(),
            funding_keypair_path: "funding.json".to_string(),
            wallets_csv: default_wallets_csv(),
            concurrency: Some(5),
            delay_secs: None,
            mint: None,
            on_malformed: MalformedRowPolicy::default(),
            log_dir: default_log_dir(),
            log_file: default_log_file(),
        }
    }

    #[test]
    fn bounded_mode_within_range_is_accepted() {
        let mode = base_config().dispatch_mode().unwrap();
        assert!(matches!(mode, DispatchMode::Bounded { limit: 5 }));
    }

    #[test]
    fn concurrency_above_ten_is_a_config_error() {
        let config = Config {
            concurrency: Some(11),
            ..base_config()
        };
        assert!(matches!(
            config.dispatch_mode(),
            Err(ConfigError::ConcurrencyOutOfRange(11))
        ));
    }

    #[test]
    fn both_modes_at_once_conflict() {
        let config = Config {
            delay_secs: Some(1.0),
            ..base_config()
        };
        assert!(matches!(config.dispatch_mode(), Err(ConfigError::ModeConflict)));
    }

    #[test]
    fn a_mode_must_be_chosen() {
        let config = Config {
            concurrency: None,
            ..base_config()
        };
        assert!(matches!(config.dispatch_mode(), Err(ConfigError::ModeMissing)));
    }

    #[test]
    fn negative_delay_is_rejected() {
        let config = Config {
            concurrency: None,
            delay_secs: Some(-0.5),
            ..base_config()
        };
        assert!(matches!(
            config.dispatch_mode(),
            Err(ConfigError::InvalidDelay(_))
        ));
    }

    #[test]
    fn missing_mint_means_native_sol() {
        assert_eq!(base_config().asset().unwrap(), AssetKind::Sol);
    }

    #[test]
    fn mint_switches_to_token_mode() {
        let mint = Pubkey::new_unique();
        let config = Config {
            mint: Some(mint.to_string()),
            ..base_config()
        };
        assert_eq!(config.asset().unwrap(), AssetKind::Token { mint });
    }

    #[test]
    fn garbage_mint_is_rejected() {
        let config = Config {
            mint: Some("not-a-mint".to_string()),
            ..base_config()
        };
        assert!(matches!(config.asset(), Err(ConfigError::InvalidMint(_))));
    }

    #[test]
    fn yaml_defaults_apply() {
        let config: Config = serde_yaml::from_str(
            "rpc_url: http://localhost:8899\n\
             funding_keypair_path: funding.json\n\
             concurrency: 3\n",
        )
        .unwrap();
        assert_eq!(config.wallets_csv, PathBuf::from("wallets.csv"));
        assert_eq!(config.log_file, "logs.txt");
        assert_eq!(config.on_malformed, MalformedRowPolicy::Abort);
    }
}
