#[macro_use]
extern crate log;

use clap::{CommandFactory, Parser};
use colored::*;
use eyre::{Result, WrapErr};
use std::collections::HashSet;
use std::path::PathBuf;

use alloy::primitives::{U256, hex, utils::parse_ether};

// lib.rs imports
use stake_knife::{
    config::{self, *},
    consolidation,
    deposit_file::{self, DepositLookup, DepositMode, KnownDeposits},
    deposit_root,
    // globals easy access macros
    global,
    global_set,
    globals::{self, NetworkData},
    helpers::{self, format_gno, json},
    logger::Logger,
    snapshot::{self, PublicKey, ValidatorSnapshot},
    topup,
    validator::{self, RequestInput},
    withdrawal,
};

fn main() -> Result<()> {
    // Parse args with clap
    let args = Cli::parse();

    // Load config file & shellexpand paths so we can use "~/...", etc
    let mut config = config::merge_args_from_file::<CliArgs>(args.config, args.config_path)?;
    if let Some(path) = &config.known_deposits {
        config.known_deposits = Some(helpers::expand_path(path)?);
    }

    // Setup our global logger
    let logger = Logger::new(config.log_level.unwrap_or(3u8));
    logger.set_global()?;

    globals::set_network(config.network.as_deref().unwrap_or("gnosis"))?;

    // Store global ref to our logger and config
    global_set!(logger) = logger;
    global_set!(config) = config;

    cmd_dispatch(&Cli::command(), &args.command)
}

fn network() -> &'static NetworkData {
    *global!(network)
}

// Only active validators take part in planning
fn active_validators(path: &PathBuf) -> Result<Vec<ValidatorSnapshot>> {
    let validators = snapshot::load_validators(helpers::expand_path(path)?)?;
    let total = validators.len();
    let active: Vec<ValidatorSnapshot> = validators.into_iter().filter(|v| v.is_active()).collect();
    debug!(
        "Loaded {} validators, {} active",
        total.to_string().blue(),
        active.len().to_string().green()
    );
    Ok(active)
}

fn print_requests(requests: &[RequestInput]) {
    for req in requests {
        println!(
            "{} {} {} {}",
            "to:".white().bold(),
            req.to.to_string().blue(),
            "input:".white().bold(),
            hex::encode_prefixed(&req.input)
        );
    }
}

fn write_json<T: serde::Serialize>(out: &Option<PathBuf>, value: &T) -> Result<()> {
    if let Some(path) = out {
        let path = helpers::expand_path(path)?;
        json::write(&path, value)?;
        info!("Saved {}", path.display().to_string().green());
    }
    Ok(())
}

fn cmd_dispatch(app: &clap::Command, cmd: &CliCmd) -> Result<()> {
    match cmd {
        CliCmd::Version {} => {
            let mut ver = app.render_version();
            ver.pop(); // remove "\n"
            println!("version: {}", ver);
        }
        CliCmd::Network {} => {
            let net = network();
            println!("{:<18}{}", "Network:".white().bold(), net.name.blue());
            println!("{:<18}{}", "Chain id:".white().bold(), net.chain_id.to_string().blue());
            println!("{:<18}{}", "Fork version:".white().bold(), net.fork_version);
            println!("{:<18}{}", "Deposit contract:".white().bold(), net.deposit_contract);
            println!("{:<18}{}", "Stake token:".white().bold(), net.stake_token);
            println!(
                "{:<18}{} GNO",
                "Min balance:".white().bold(),
                format_gno(net.min_balance).yellow()
            );
            println!(
                "{:<18}{} GNO",
                "Max balance:".white().bold(),
                format_gno(net.max_balance).yellow()
            );
        }
        CliCmd::Plan { command } => cmd_plan(command)?,
        CliCmd::Deposit { command } => cmd_deposit(command)?,
        CliCmd::Convert(subcmd) => match subcmd {
            CmdConvert::GnoToGwei { amount } => {
                println!("{} GNO is {} gwei", amount, helpers::parse_gno(amount)?);
            }
            CmdConvert::GweiToGno { amount } => {
                println!("{} gwei is {} GNO", amount, format_gno(*amount));
            }
        },
    }
    Ok(())
}

fn cmd_plan(cmd: &CmdPlan) -> Result<()> {
    let net = network();
    match cmd {
        CmdPlan::Consolidate {
            validators,
            capacity,
            output,
        } => {
            let validators = active_validators(validators)?;
            let capacity = (*capacity)
                .or(global!(config).capacity)
                .unwrap_or(net.max_balance);
            let plan = consolidation::plan(&validators, capacity);

            for record in &plan.consolidations {
                let kind = match record.is_upgrade() {
                    true => "upgrade".cyan(),
                    false => "consolidate".green(),
                };
                println!(
                    "{:<12} {} ({} GNO) -> {} ({} GNO)",
                    kind,
                    record.source.index.to_string().blue(),
                    format_gno(record.source_balance).yellow(),
                    record.target.index.to_string().blue(),
                    format_gno(record.target_balance).yellow(),
                );
            }
            for skipped in &plan.skipped {
                println!("{:<12} {}", "skipped".red(), skipped.index.to_string().blue());
            }
            println!(
                "{} {} -> {} groups",
                "Validators:".white().bold(),
                validators.len(),
                plan.resulting_group_count.to_string().green()
            );
            if output.calldata {
                print_requests(&validator::consolidation_requests(&plan));
            }
            write_json(&output.out, &plan)?;
        }
        CmdPlan::Withdraw {
            validators,
            amount,
            preserve_minimum,
            output,
        } => {
            let validators = active_validators(validators)?;
            let requested = helpers::parse_gno(amount)?;
            let total = snapshot::total_balance(&validators);
            if requested > total {
                warn!(
                    "Requested {} GNO exceeds the total balance of {} GNO",
                    format_gno(requested).red(),
                    format_gno(total).yellow()
                );
            }
            let plan = withdrawal::compute_withdrawals(
                &validators,
                requested,
                total,
                *preserve_minimum,
                net.min_balance,
            );

            for w in &plan.withdrawals {
                match w.is_exit() {
                    true => println!("{:<10} {}", "exit".red(), w.pubkey),
                    false => println!("{:<10} {} {} GNO", "withdraw".green(), w.pubkey, format_gno(w.amount).yellow()),
                }
            }
            println!(
                "{} {} GNO of {} GNO requested",
                "Allocated:".white().bold(),
                format_gno(plan.total_allocated).green(),
                format_gno(requested).yellow()
            );
            if output.calldata {
                print_requests(&validator::withdrawal_requests(&plan));
            }
            write_json(&output.out, &plan)?;
        }
        CmdPlan::Topup {
            validators,
            amount,
            target,
            output,
        } => {
            let validators = active_validators(validators)?;
            let total = helpers::parse_gno(amount)?;
            let target = match target {
                Some(t) => helpers::parse_gno(t)?,
                None => 0,
            };
            let amounts = topup::allocate(total, &validators, target);

            for (v, a) in validators.iter().zip(&amounts).filter(|(_, a)| **a > 0) {
                println!(
                    "{} {} {} GNO",
                    v.index.to_string().blue(),
                    v.pubkey,
                    format_gno(*a).yellow()
                );
            }
            let payload = topup::topup_payload(&validators, &amounts);
            println!(
                "{} {} deposits, {} GNO",
                "Total:".white().bold(),
                payload.len(),
                format_gno(amounts.iter().sum()).green()
            );
            if output.calldata {
                println!("{} {}", "to:".white().bold(), net.deposit_contract.to_string().blue());
                println!("{} {}", "calldata:".white().bold(), payload.calldata());
            }
            write_json(&output.out, &payload)?;
        }
    }
    Ok(())
}

fn cmd_deposit(cmd: &CmdDeposit) -> Result<()> {
    let net = network();
    match cmd {
        CmdDeposit::Root {
            pubkey,
            credentials,
            signature,
            amount,
        } => {
            let stake: U256 =
                parse_ether(amount).wrap_err_with(|| format!("invalid amount '{}'", amount))?;
            let root = deposit_root::build_deposit_root(
                &hex::decode(pubkey).wrap_err("pubkey")?,
                &hex::decode(credentials).wrap_err("credentials")?,
                &hex::decode(signature).wrap_err("signature")?,
                stake,
            )?;
            println!("{} {}", "deposit_data_root:".white().bold(), root.to_string().green());
        }
        CmdDeposit::Validate {
            file,
            balance,
            topup,
            known_deposits,
            output,
        } => {
            let records = deposit_file::load_file(helpers::expand_path(file)?)?;
            let balance = helpers::parse_gno(balance)?;
            let mode = match topup {
                None => DepositMode::NewValidators,
                Some(None) => DepositMode::TopUp { expected: None },
                Some(Some(pk)) => DepositMode::TopUp {
                    expected: Some(pk.parse::<PublicKey>().wrap_err("topup pubkey")?),
                },
            };

            let known = known_deposits
                .clone()
                .or(global!(config).known_deposits.clone());
            let lookup: Box<dyn DepositLookup> = match known {
                Some(path) => Box::new(KnownDeposits::load(
                    helpers::expand_path(&path)?,
                    net.chain_id,
                )?),
                None => {
                    warn!("No known deposits given, assuming none of the keys were deposited");
                    Box::new(HashSet::<PublicKey>::new())
                }
            };

            let validated = deposit_file::validate(&records, balance, net, lookup.as_ref(), mode)?;
            for record in &validated.records {
                println!(
                    "{} {} GNO",
                    record.pubkey.to_string().blue(),
                    format_gno(record.amount).yellow()
                );
            }
            println!(
                "{} {} deposits ({}), {} GNO",
                "Valid:".green().bold(),
                validated.records.len(),
                validated.credential_type,
                format_gno(validated.total_amount).green()
            );
            if output.calldata {
                println!("{} {}", "to:".white().bold(), net.deposit_contract.to_string().blue());
                println!("{} {}", "calldata:".white().bold(), validated.payload().calldata());
            }
            let deposit_data: Vec<_> = validated.records.iter().map(|r| r.deposit_data()).collect();
            write_json(&output.out, &deposit_data)?;
        }
    }
    Ok(())
}
