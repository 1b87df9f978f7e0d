//! CLI definition and dispatch.
//!
//! Progress and errors go to stderr; results are written as JSON to stdout
//! or to `--output`.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::black_scholes::{OptionParameters, OptionType};
use crate::domain::config_validation::{
    backtest_settings, parameter_grid, portfolio_inputs, strategy_parameters, strategy_selection,
    validate_config,
};
use crate::domain::engine::QuantEngine;
use crate::domain::error::QuantError;
use crate::domain::parameters::{ParameterGrid, StrategyParameters};
use crate::domain::stat_arb::StatisticalArbitrageStrategy;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::result_port::ResultSink;

#[derive(Parser, Debug)]
#[command(name = "quantlab", about = "Quantitative strategy research toolkit")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest one strategy with the [strategy] parameters
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Price CSV, overrides [backtest] prices
        #[arg(long)]
        prices: Option<PathBuf>,
        /// Strategy id, overrides [strategy] name
        #[arg(short, long)]
        strategy: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Sweep a strategy over the [grid] candidates
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        prices: Option<PathBuf>,
        #[arg(short, long)]
        strategy: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Sweep a pairs strategy over two price series
    StatArb {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        asset_a: Option<PathBuf>,
        #[arg(long)]
        asset_b: Option<PathBuf>,
        #[arg(short, long)]
        strategy: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Mean-variance weights for the [portfolio] section
    Optimize {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Black-Scholes price of a European option
    Price {
        #[arg(long)]
        spot: f64,
        #[arg(long)]
        strike: f64,
        /// Years to expiry
        #[arg(long)]
        maturity: f64,
        #[arg(long, default_value_t = 0.0)]
        rate: f64,
        #[arg(long)]
        volatility: f64,
        #[arg(long, default_value = "call")]
        option_type: String,
        /// Config providing a result store
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            prices,
            strategy,
            output,
        } => run_backtest(&config, prices.as_ref(), strategy.as_deref(), output.as_ref()),
        Command::Sweep {
            config,
            prices,
            strategy,
            output,
        } => run_sweep(&config, prices.as_ref(), strategy.as_deref(), output.as_ref()),
        Command::StatArb {
            config,
            asset_a,
            asset_b,
            strategy,
            output,
        } => run_stat_arb(
            &config,
            asset_a.as_ref(),
            asset_b.as_ref(),
            strategy.as_deref(),
            output.as_ref(),
        ),
        Command::Optimize { config, output } => run_optimize(&config, output.as_ref()),
        Command::Price {
            spot,
            strike,
            maturity,
            rate,
            volatility,
            option_type,
            config,
        } => run_price(
            spot,
            strike,
            maturity,
            rate,
            volatility,
            &option_type,
            config.as_ref(),
        ),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn report(result: Result<(), QuantError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Result store selected by the config: `[postgres]` first, then `[sqlite]`.
pub fn build_sink(config: &dyn ConfigPort) -> Result<Option<Box<dyn ResultSink>>, QuantError> {
    #[cfg(feature = "postgres")]
    {
        use crate::adapters::postgres_adapter::PostgresAdapter;

        if config.get_string("postgres", "connection_string").is_some() {
            eprintln!("Storing results in PostgreSQL");
            return Ok(Some(Box::new(PostgresAdapter::from_config(config)?)));
        }
    }

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;

        if let Some(path) = config.get_string("sqlite", "path") {
            eprintln!("Storing results in {path}");
            let adapter = SqliteAdapter::from_config(config)?;
            adapter.initialize_schema()?;
            return Ok(Some(Box::new(adapter)));
        }
    }

    let _ = config;
    Ok(None)
}

pub fn build_engine(config: &dyn ConfigPort) -> Result<QuantEngine, QuantError> {
    let settings = backtest_settings(config)?;
    let engine = QuantEngine::new().with_risk_free_rate(settings.risk_free_rate);
    Ok(match build_sink(config)? {
        Some(sink) => engine.with_sink(sink),
        None => engine,
    })
}

fn emit<T: Serialize>(value: &T, output: Option<&PathBuf>) -> Result<(), QuantError> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(path, json)?;
            eprintln!("Results written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn price_file(
    config: &dyn ConfigPort,
    key: &str,
    path_override: Option<&PathBuf>,
) -> Result<String, QuantError> {
    match path_override {
        Some(path) => Ok(path.display().to_string()),
        None => config
            .get_string("backtest", key)
            .ok_or_else(|| QuantError::ConfigMissing {
                section: "backtest".into(),
                key: key.into(),
            }),
    }
}

fn select_strategy(
    config: &dyn ConfigPort,
    strategy_override: Option<&str>,
) -> Result<(String, StrategyParameters), QuantError> {
    match strategy_override {
        Some(name) => Ok((name.to_string(), strategy_parameters(config)?)),
        None => strategy_selection(config),
    }
}

/// `[grid]` axes plus fixed `[strategy]` values the grid does not vary.
fn sweep_grid(config: &dyn ConfigPort) -> Result<ParameterGrid, QuantError> {
    let mut grid = parameter_grid(config)?;
    for (name, value) in strategy_parameters(config)?.iter() {
        if !grid.names().any(|axis| axis == name) {
            grid = grid.axis(name, [value]);
        }
    }
    Ok(grid)
}

fn csv_data() -> CsvAdapter {
    CsvAdapter::new(PathBuf::new())
}

fn run_backtest(
    config_path: &PathBuf,
    prices_override: Option<&PathBuf>,
    strategy_override: Option<&str>,
    output: Option<&PathBuf>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    report(backtest_command(&adapter, prices_override, strategy_override, output))
}

fn backtest_command(
    config: &dyn ConfigPort,
    prices_override: Option<&PathBuf>,
    strategy_override: Option<&str>,
    output: Option<&PathBuf>,
) -> Result<(), QuantError> {
    validate_config(config)?;
    let settings = backtest_settings(config)?;
    let (name, parameters) = select_strategy(config, strategy_override)?;
    let file = price_file(config, "prices", prices_override)?;

    eprintln!("Loading prices from {file}");
    let prices = csv_data().load_prices(&file)?;

    eprintln!("Running {name} over {} prices", prices.len());
    let engine = build_engine(config)?;
    let response = engine.run_backtest(&name, &prices, &parameters, settings.initial_capital)?;
    emit(&response, output)
}

fn run_sweep(
    config_path: &PathBuf,
    prices_override: Option<&PathBuf>,
    strategy_override: Option<&str>,
    output: Option<&PathBuf>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    report(sweep_command(&adapter, prices_override, strategy_override, output))
}

fn sweep_command(
    config: &dyn ConfigPort,
    prices_override: Option<&PathBuf>,
    strategy_override: Option<&str>,
    output: Option<&PathBuf>,
) -> Result<(), QuantError> {
    validate_config(config)?;
    let settings = backtest_settings(config)?;
    let (name, _) = select_strategy(config, strategy_override)?;
    let grid = sweep_grid(config)?;
    let file = price_file(config, "prices", prices_override)?;

    eprintln!("Loading prices from {file}");
    let prices = csv_data().load_prices(&file)?;

    eprintln!("Running sweep: {} combinations of {name}", grid.size());
    let engine = build_engine(config)?;
    let response = engine.run_parameter_sweep(&name, &prices, &grid, settings.initial_capital)?;
    emit(&response, output)
}

fn run_stat_arb(
    config_path: &PathBuf,
    asset_a_override: Option<&PathBuf>,
    asset_b_override: Option<&PathBuf>,
    strategy_override: Option<&str>,
    output: Option<&PathBuf>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    report(stat_arb_command(
        &adapter,
        asset_a_override,
        asset_b_override,
        strategy_override,
        output,
    ))
}

fn stat_arb_command(
    config: &dyn ConfigPort,
    asset_a_override: Option<&PathBuf>,
    asset_b_override: Option<&PathBuf>,
    strategy_override: Option<&str>,
    output: Option<&PathBuf>,
) -> Result<(), QuantError> {
    validate_config(config)?;
    let settings = backtest_settings(config)?;
    let name = strategy_override.unwrap_or(StatisticalArbitrageStrategy::NAME);
    let grid = sweep_grid(config)?;
    let file_a = price_file(config, "asset_a", asset_a_override)?;
    let file_b = price_file(config, "asset_b", asset_b_override)?;

    eprintln!("Loading pair {file_a} / {file_b}");
    let pair = csv_data().load_pair(&file_a, &file_b)?;

    eprintln!("Running sweep: {} combinations of {name}", grid.size());
    let engine = build_engine(config)?;
    let response = engine.run_statistical_arbitrage(name, &pair, &grid, settings.initial_capital)?;
    emit(&response, output)
}

fn run_optimize(config_path: &PathBuf, output: Option<&PathBuf>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    report(optimize_command(&adapter, output))
}

fn optimize_command(config: &dyn ConfigPort, output: Option<&PathBuf>) -> Result<(), QuantError> {
    validate_config(config)?;
    let inputs = portfolio_inputs(config)?;
    eprintln!(
        "Optimizing {} assets{}",
        inputs.expected_returns.len(),
        if inputs.allow_short { "" } else { " (long only)" }
    );

    let engine = build_engine(config)?;
    let result = engine.optimize_portfolio(
        &inputs.expected_returns,
        &inputs.covariance,
        inputs.target_return,
        inputs.allow_short,
    )?;
    emit(&result, output)
}

fn run_price(
    spot: f64,
    strike: f64,
    maturity: f64,
    rate: f64,
    volatility: f64,
    option_type: &str,
    config_path: Option<&PathBuf>,
) -> ExitCode {
    let adapter = match config_path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            match load_config(path) {
                Ok(a) => Some(a),
                Err(code) => return code,
            }
        }
        None => None,
    };

    let option_type = match option_type.parse::<OptionType>() {
        Ok(t) => t,
        Err(e) => return report(Err(e)),
    };
    let params = OptionParameters {
        spot,
        strike,
        time_to_maturity: maturity,
        risk_free_rate: rate,
        volatility,
        option_type,
    };
    report(price_command(adapter.as_ref(), &params))
}

fn price_command(
    config: Option<&FileConfigAdapter>,
    params: &OptionParameters,
) -> Result<(), QuantError> {
    let engine = match config {
        Some(config) => build_engine(config)?,
        None => QuantEngine::new(),
    };
    eprintln!(
        "Pricing {} with spot {} strike {}",
        params.option_type, params.spot, params.strike
    );
    let response = engine.price_option(params)?;
    emit(&response, None)
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match validate_config(&adapter) {
        Ok(()) => {
            eprintln!("Config validated successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
