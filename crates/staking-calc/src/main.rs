//! Staking projection calculator
//!
//! Prints reward, loyalty-points, restaking and gas-cost projections as tables.

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::debug;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use staking_calc::{
    BASE_STAKING_APR, DEFAULT_TIERS, DEMO_OPERATORS, FALLBACK_ETH_PRICE_USD, GasPrices, HealthInputs,
    OperationEstimates, PROTOCOLS, RewardBreakdown, assess_health, check_amount, compute_points_projection,
    compute_reward_breakdown, distribute_stake, extra_aprs_for, format_eth, format_percent, format_usd, loyalty,
    project_restaking, restaking, summarize_operators, tier_for,
};

#[derive(Parser, Debug)]
#[command(name = "staking-calc")]
#[command(about = "Reward and points projections for liquid staking")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reward breakdown per second/hour/day/week/month/year
    Rewards {
        /// Staked amount in ETH
        #[arg(short, long, value_parser = parse_amount)]
        principal: f64,

        /// Annual rate in percent
        #[arg(short, long, default_value_t = BASE_STAKING_APR, value_parser = parse_amount)]
        apr: f64,

        /// ETH price in USD, adds a fiat column
        #[arg(long, value_parser = parse_amount)]
        price: Option<f64>,
    },

    /// Loyalty points projection
    Points {
        /// Staked amount in ETH
        #[arg(short, long, value_parser = parse_amount)]
        principal: f64,

        /// Staking duration in days
        #[arg(short, long)]
        days: u32,

        /// Points already earned
        #[arg(long, default_value_t = 0.0, value_parser = parse_amount)]
        current_points: f64,
    },

    /// Restaking projection across selected protocols
    Restaking {
        /// Staked amount in ETH
        #[arg(short, long, value_parser = parse_amount)]
        principal: f64,

        /// Base staking APR in percent
        #[arg(long, default_value_t = BASE_STAKING_APR, value_parser = parse_amount)]
        base_apr: f64,

        /// Protocol ids to restake into (comma separated)
        #[arg(long, value_delimiter = ',', default_values_t = restaking::DEFAULT_SELECTION.to_vec())]
        protocols: Vec<u32>,
    },

    /// Show the loyalty tier table
    Tiers,

    /// Gas cost of each staking operation
    Gas {
        /// Gas price in gwei
        #[arg(long, default_value_t = GasPrices::default().standard, value_parser = parse_amount)]
        gwei: f64,

        /// ETH price in USD
        #[arg(long, default_value_t = FALLBACK_ETH_PRICE_USD, value_parser = parse_amount)]
        eth_price: f64,
    },

    /// Split a stake across the demo node operators
    Operators {
        /// Staked amount in ETH
        #[arg(short, long, default_value_t = 10.0, value_parser = parse_amount)]
        stake: f64,
    },

    /// Protocol health score from peg, capacity and validator uptime
    Health {
        /// ETH price in USD
        #[arg(long, default_value_t = FALLBACK_ETH_PRICE_USD, value_parser = parse_amount)]
        eth_price: f64,

        /// eETH price in USD
        #[arg(long, value_parser = parse_amount)]
        eeth_price: Option<f64>,

        /// Total value locked in USD
        #[arg(long, default_value_t = 0.0, value_parser = parse_amount)]
        tvl: f64,

        /// Deposit capacity in USD
        #[arg(long, value_parser = parse_amount)]
        max_capacity: Option<f64>,

        #[arg(long)]
        total_validators: Option<u32>,

        #[arg(long)]
        active_validators: Option<u32>,
    },
}

fn parse_amount(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("not a number: {}", e))?;
    check_amount("value", value).map_err(|e| e.to_string())
}

#[derive(Tabled)]
struct PeriodRow {
    #[tabled(rename = "Period")]
    period: &'static str,
    #[tabled(rename = "Rewards")]
    eth: String,
    #[tabled(rename = "USD")]
    usd: String,
}

#[derive(Tabled)]
struct KeyValueRow {
    #[tabled(rename = "Metric")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct TierRow {
    #[tabled(rename = "Tier")]
    name: &'static str,
    #[tabled(rename = "From day")]
    min_days: u32,
    #[tabled(rename = "Multiplier")]
    multiplier: String,
}

#[derive(Tabled)]
struct GasRow {
    #[tabled(rename = "Operation")]
    operation: &'static str,
    #[tabled(rename = "ETH")]
    eth: String,
    #[tabled(rename = "USD")]
    usd: String,
}

fn kv(key: impl Into<String>, value: impl Into<String>) -> KeyValueRow {
    KeyValueRow {
        key: key.into(),
        value: value.into(),
    }
}

fn period_rows(breakdown: &RewardBreakdown, price: Option<f64>) -> Vec<PeriodRow> {
    let fiat = price.map(|p| breakdown.in_fiat(p));
    let periods = [
        ("Second", breakdown.per_second, fiat.map(|f| f.per_second)),
        ("Hour", breakdown.per_hour, fiat.map(|f| f.per_hour)),
        ("Day", breakdown.per_day, fiat.map(|f| f.per_day)),
        ("Week", breakdown.per_week, fiat.map(|f| f.per_week)),
        ("Month", breakdown.per_month, fiat.map(|f| f.per_month)),
        ("Year", breakdown.per_year, fiat.map(|f| f.per_year)),
    ];

    periods
        .into_iter()
        .map(|(period, eth, usd)| PeriodRow {
            period,
            eth: format_eth(eth),
            usd: usd.map(format_usd).unwrap_or_else(|| "-".to_string()),
        })
        .collect()
}

fn print_table<T: Tabled>(rows: Vec<T>) {
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match args.command {
        Command::Rewards { principal, apr, price } => {
            debug!("rewards: principal={} apr={} price={:?}", principal, apr, price);
            let breakdown = compute_reward_breakdown(principal, apr);
            println!("{} staked at {}", format_eth(principal), format_percent(apr, 2));
            print_table(period_rows(&breakdown, price));
        }

        Command::Points {
            principal,
            days,
            current_points,
        } => {
            debug!("points: principal={} days={} current={}", principal, days, current_points);
            let projection = compute_points_projection(current_points, principal, days, DEFAULT_TIERS);
            let tier = tier_for(days, DEFAULT_TIERS).map_or("None", |t| t.name);

            print_table(vec![
                kv("Tier", tier),
                kv("Multiplier", format!("{}x", projection.multiplier)),
                kv("Base points/day", format!("{:.2}", projection.base_rate_per_day)),
                kv("Bonus points/day", format!("+{:.2}", projection.bonus_rate_per_day)),
                kv("Total points/day", format!("{:.2}", projection.total_rate_per_day)),
                kv(format!("Projected after {} days", days), format!("{:.0}", projection.projected_total)),
                kv(
                    "Hypothetical value",
                    format_usd(
                        projection.hypothetical_value(loyalty::DEMO_POINTS_PER_TOKEN, loyalty::DEMO_TOKEN_PRICE_USD),
                    ),
                ),
            ]);
        }

        Command::Restaking {
            principal,
            base_apr,
            protocols,
        } => {
            let protocols = restaking::unique_selection(&protocols);
            for id in &protocols {
                if restaking::find_protocol(*id).is_none() {
                    log::warn!("unknown protocol id {} (contributes 0% APR)", id);
                }
            }

            let projection = project_restaking(principal, base_apr, &extra_aprs_for(&protocols));
            let names: Vec<&str> = protocols
                .iter()
                .filter_map(|id| restaking::find_protocol(*id))
                .map(|p| p.name)
                .collect();

            print_table(vec![
                kv("Protocols", names.join(", ")),
                kv("Base APR", format_percent(projection.base_apr, 1)),
                kv("Restaking APR", format!("+{}", format_percent(projection.restaking_apr, 1))),
                kv("Total APR", format_percent(projection.total_apr, 1)),
                kv("Base yearly", format_eth(projection.base_yearly)),
                kv("Restaking yearly", format_eth(projection.restaking_yearly)),
                kv("Total yearly", format_eth(projection.total_yearly)),
            ]);
            print_table(period_rows(&projection.breakdown, None));
        }

        Command::Tiers => {
            print_table(
                DEFAULT_TIERS
                    .iter()
                    .map(|t| TierRow {
                        name: t.name,
                        min_days: t.min_days,
                        multiplier: format!("{}x", t.multiplier),
                    })
                    .collect(),
            );
            println!("Restaking protocols:");
            print_table(
                PROTOCOLS
                    .iter()
                    .map(|p| kv(format!("{} ({})", p.name, p.risk), format!("+{}", format_percent(p.apr, 1))))
                    .collect(),
            );
        }

        Command::Gas { gwei, eth_price } => {
            let estimates = OperationEstimates::at(gwei, eth_price);
            println!("At {} gwei, ETH = {}", gwei, format_usd(eth_price));
            print_table(
                [
                    ("Stake", estimates.stake),
                    ("Unstake", estimates.unstake),
                    ("Wrap", estimates.wrap),
                    ("Claim", estimates.claim),
                ]
                .into_iter()
                .map(|(operation, est)| GasRow {
                    operation,
                    eth: format!("{:.6}", est.eth),
                    usd: format!("${:.2}", est.usd),
                })
                .collect(),
            );
        }

        Command::Operators { stake } => {
            let allocations = distribute_stake(stake, DEMO_OPERATORS);
            print_table(
                DEMO_OPERATORS
                    .iter()
                    .map(|op| {
                        let amount = allocations
                            .iter()
                            .find(|a| a.operator_id == op.id)
                            .map_or_else(|| "-".to_string(), |a| format!("{:.4} ETH", a.amount));
                        kv(format!("{} ({}, {} validators)", op.name, op.location, op.validators), amount)
                    })
                    .collect(),
            );

            let summary = summarize_operators(DEMO_OPERATORS);
            print_table(vec![
                kv("Operators", summary.total_operators.to_string()),
                kv("Validators", summary.total_validators.to_string()),
                kv("Active validators", summary.active_validators.to_string()),
                kv("Average uptime", format_percent(summary.average_uptime, 2)),
            ]);
        }

        Command::Health {
            eth_price,
            eeth_price,
            tvl,
            max_capacity,
            total_validators,
            active_validators,
        } => {
            let report = assess_health(&HealthInputs {
                eth_price,
                eeth_price,
                tvl,
                max_capacity,
                total_validators,
                active_validators,
            });
            print_table(vec![
                kv("Peg ratio", format!("{:.4} ({})", report.peg_ratio, report.peg_status)),
                kv(
                    "Capacity",
                    format!("{} ({})", format_percent(report.capacity_percent, 1), report.capacity_status),
                ),
                kv(
                    "Validator uptime",
                    format!("{} ({})", format_percent(report.validator_uptime, 1), report.validator_status),
                ),
                kv("Score", format!("{}/100 {}", report.score, report.label)),
            ]);
        }
    }

    Ok(())
}
