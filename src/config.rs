use std::ffi::OsStr;
use std::path::PathBuf;
use std::{fs::File, io::BufReader};

use eyre::{Result, WrapErr, bail};
use serde_derive::Deserialize;

use clap_serde_derive::{
    ClapSerde,
    clap::{self, Args, Parser, Subcommand},
};

#[allow(deprecated)]
fn config_file() -> PathBuf {
    let config_home = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(dir) => PathBuf::from(dir),
        None => std::env::home_dir().unwrap_or_default().join(".config"),
    };
    config_home.join("stake-knife").join("config.toml")
}

#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Config file
    #[arg(short, long = "config", default_value = config_file().into_os_string())]
    pub config_path: Option<PathBuf>,

    /// Global arguments
    #[command(flatten)]
    pub config: <CliArgs as ClapSerde>::Opt,

    // Subcommands
    #[command(subcommand)]
    pub command: CliCmd,
}

// Make sure all values are optional or parsing fails if a value
// is missing in the config fill
#[derive(Debug, Clone, ClapSerde, Deserialize)]
pub struct CliArgs {
    /// Logging level
    #[arg(short, long = "log-level", required = false, default_value = "3")]
    pub log_level: Option<u8>,

    /// Network name (gnosis, chiado)
    #[arg(short, long = "network", required = false, default_value = "gnosis")]
    pub network: Option<String>,

    /// Consolidation capacity in gwei, defaults to the network max balance
    #[arg(long = "capacity", required = false)]
    pub capacity: Option<u64>,

    /// JSON array of already deposited public keys
    #[arg(long = "known-deposits", required = false)]
    pub known_deposits: Option<PathBuf>,
}

// Command line cmds
#[derive(Subcommand)]
pub enum CliCmd {
    /// Print version information
    #[clap(visible_alias = "ver")]
    Version {},
    /// Print the selected network parameters
    #[clap(visible_alias = "net")]
    Network {},
    /// Plan consolidations, withdrawals and top-ups for a validator set
    #[clap(visible_alias = "p")]
    Plan {
        #[command(subcommand)]
        command: CmdPlan,
    },
    /// Deposit data roots and deposit file validation
    #[clap(visible_alias = "d")]
    Deposit {
        #[command(subcommand)]
        command: CmdDeposit,
    },
    /// Convert GNO <-> beacon chain gwei
    #[clap(visible_alias = "conv")]
    #[command(subcommand)]
    Convert(CmdConvert),
}

#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Print the contract call data
    #[arg(long, required = false, action = clap::ArgAction::SetTrue)]
    pub calldata: bool,
    /// Write the result as JSON
    #[arg(short, long, value_name = "FILEPATH", required = false)]
    pub out: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum CmdPlan {
    /// Merge validators into compounding targets (EIP-7251)
    #[clap(visible_aliases = &["cons", "cns"])]
    Consolidate {
        /// Beacon API validators JSON
        #[arg(short, long = "validators", required = true)]
        validators: PathBuf,
        /// Consolidation capacity in gwei
        #[arg(long, required = false)]
        capacity: Option<u64>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Split a withdrawal across validators (EIP-7002)
    #[clap(visible_aliases = &["w"])]
    Withdraw {
        /// Beacon API validators JSON
        #[arg(short, long = "validators", required = true)]
        validators: PathBuf,
        /// GNO amount to withdraw
        #[arg(short, long = "amount", required = true)]
        amount: String,
        /// Keep every validator above the network minimum balance
        #[arg(long, required = false, action = clap::ArgAction::SetTrue)]
        preserve_minimum: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Split a top-up across validators
    #[clap(visible_aliases = &["t"])]
    Topup {
        /// Beacon API validators JSON
        #[arg(short, long = "validators", required = true)]
        validators: PathBuf,
        /// GNO amount to deposit
        #[arg(short, long = "amount", required = true)]
        amount: String,
        /// Top up each validator towards this GNO balance
        #[arg(long, required = false)]
        target: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Subcommand)]
pub enum CmdDeposit {
    /// Compute a deposit data root
    #[clap(visible_aliases = &["r"])]
    Root {
        /// Validator public key (48 bytes hex)
        #[arg(short, long = "pubkey", required = true)]
        pubkey: String,
        /// Withdrawal credentials (32 bytes hex)
        #[arg(short, long = "credentials", required = true)]
        credentials: String,
        /// Deposit signature (96 bytes hex)
        #[arg(short, long = "signature", required = true)]
        signature: String,
        /// GNO amount
        #[arg(short, long = "amount", required = true)]
        amount: String,
    },
    /// Validate a deposit-cli file against the network and balance
    #[clap(visible_aliases = &["v"])]
    Validate {
        /// Deposit data JSON file
        #[arg(short, long = "file", required = true)]
        file: PathBuf,
        /// Available GNO balance
        #[arg(short, long = "balance", required = true)]
        balance: String,
        /// Top-up of an existing validator, optionally the expected public key
        #[arg(long, required = false, num_args = 0..=1, value_name = "PUBKEY")]
        topup: Option<Option<String>>,
        /// JSON array of already deposited public keys
        #[arg(long = "known-deposits", required = false)]
        known_deposits: Option<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Subcommand)]
pub enum CmdConvert {
    /// GNO to beacon chain gwei
    #[clap(visible_aliases = &["gg", "g2g"])]
    GnoToGwei {
        #[arg(required = true)]
        amount: String,
    },
    /// Beacon chain gwei to GNO
    #[clap(visible_aliases = &["wg", "w2g"])]
    GweiToGno {
        #[arg(required = true)]
        amount: u64,
    },
}

pub fn merge_args_from_file<T>(
    args: <T as ClapSerde>::Opt,
    maybe_path: Option<PathBuf>,
) -> Result<T>
where
    T: ClapSerde + serde::de::DeserializeOwned,
{
    match maybe_path {
        Some(path) => {
            let config_path = std::path::Path::new(&path);
            match config_path.exists() {
                true => {
                    let config = match config_path.extension().and_then(OsStr::to_str) {
                        Some("toml") => read_toml_config::<T, _>(config_path),
                        Some("json") => read_json_config::<T, _>(config_path),
                        Some("jsonc") => read_jsonc_config::<T, _>(config_path),
                        _ => {
                            bail!("Unsupported config file type: {:?}", path);
                        }
                    }?;
                    // Fields set in the config file replace the command line values
                    Ok(T::from(args).merge(config))
                }
                false => Ok(T::from(args)),
            }
        }
        None => Ok(T::from(args)),
    }
}

fn read_toml_config<T, P>(path: P) -> Result<<T as ClapSerde>::Opt>
where
    P: AsRef<std::path::Path> + std::fmt::Debug + Copy,
    T: ClapSerde + serde::de::DeserializeOwned,
{
    let content = std::fs::read_to_string(path).wrap_err_with(|| format!("{:?}", path))?;
    Ok(toml::from_str(&content)?)
}

fn read_json_config<T: ClapSerde, P>(path: P) -> Result<<T as ClapSerde>::Opt>
where
    P: AsRef<std::path::Path> + std::fmt::Debug + Copy,
{
    let f = File::open(path).wrap_err_with(|| format!("{:?}", path))?;
    Ok(serde_json::from_reader::<_, <T as ClapSerde>::Opt>(BufReader::new(f))?)
}

fn read_jsonc_config<T: ClapSerde, P>(path: P) -> Result<<T as ClapSerde>::Opt>
where
    P: AsRef<std::path::Path> + std::fmt::Debug + Copy,
{
    let f = File::open(path).wrap_err_with(|| format!("{:?}", path))?;
    Ok(serde_jsonc::from_reader::<_, <T as ClapSerde>::Opt>(BufReader::new(f))?)
}
