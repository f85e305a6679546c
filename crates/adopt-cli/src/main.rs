//! `adopt` command line: one-off simulations, explorations and catalog listing

use adopt_catalog::ActionCatalog;
use adopt_cli::{report, RunFile};
use adopt_explorer::{BeamSearchExplorer, CatalogProposer, ChannelSink, ExplorationEvent};
use adopt_sim::{
    latent_traits, load_population, ExecutionMode, MonteCarloEngine, ScenarioModifiers,
    ScorecardParams, SimulationAdapter, SimulationDefaults,
};
use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let unit = |id: &'static str, help: &'static str| {
        Arg::new(id)
            .long(id)
            .default_value("0.5")
            .value_parser(value_parser!(f64))
            .help(help)
    };

    Command::new("adopt")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Adoption simulator and scorecard explorer")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run one Monte Carlo evaluation and print the results as JSON")
                .arg(
                    Arg::new("population")
                        .long("population")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON file of synths"),
                )
                .arg(unit("complexity", "Scorecard complexity"))
                .arg(unit("initial-effort", "Scorecard initial effort"))
                .arg(unit("perceived-risk", "Scorecard perceived risk"))
                .arg(unit("time-to-value", "Scorecard time to value"))
                .arg(unit("task-criticality", "How critical the task is to the user"))
                .arg(
                    Arg::new("executions")
                        .long("executions")
                        .default_value("100")
                        .value_parser(value_parser!(u32))
                        .help("Executions per synth"),
                )
                .arg(
                    Arg::new("sigma")
                        .long("sigma")
                        .default_value("0.1")
                        .value_parser(value_parser!(f64))
                        .help("Noise standard deviation"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Master seed"),
                )
                .arg(
                    Arg::new("sequential")
                        .long("sequential")
                        .action(ArgAction::SetTrue)
                        .help("Evaluate synths on one thread"),
                ),
        )
        .subcommand(
            Command::new("explore")
                .about("Search for scorecard improvements with the catalog proposer")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML run file"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write the full outcome as JSON"),
                ),
        )
        .subcommand(
            Command::new("catalog")
                .about("Print the action catalog as given to proposers")
                .arg(
                    Arg::new("file")
                        .long("file")
                        .value_parser(value_parser!(PathBuf))
                        .help("Catalog TOML; the builtin catalog when omitted"),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn arg<T: Clone + Send + Sync + 'static>(args: &ArgMatches, id: &str) -> anyhow::Result<T> {
    args.get_one::<T>(id)
        .cloned()
        .with_context(|| format!("missing --{id}"))
}

fn simulate(args: &ArgMatches) -> anyhow::Result<()> {
    let path: PathBuf = arg(args, "population")?;
    let synths = load_population(&path)
        .with_context(|| format!("cannot load population {}", path.display()))?;
    let scorecard = ScorecardParams::new(
        arg(args, "complexity")?,
        arg(args, "initial-effort")?,
        arg(args, "perceived-risk")?,
        arg(args, "time-to-value")?,
    )
    .context("invalid scorecard")?;
    let modifiers = ScenarioModifiers::new(0.0, 0.0, 0.0, arg(args, "task-criticality")?)
        .context("invalid task criticality")?;
    let defaults = SimulationDefaults {
        n_executions: arg(args, "executions")?,
        sigma: arg(args, "sigma")?,
        seed: arg(args, "seed")?,
    };
    let mode = if args.get_flag("sequential") {
        ExecutionMode::Sequential
    } else {
        ExecutionMode::Parallel
    };

    let adapter = SimulationAdapter::new(latent_traits(&synths), defaults)
        .with_modifiers(modifiers)
        .with_engine(MonteCarloEngine::new().with_mode(mode));
    let run = adapter.evaluate(&scorecard).context("simulation failed")?;

    let output = serde_json::json!({
        "scorecard": scorecard,
        "population": synths.len(),
        "n_executions": defaults.n_executions,
        "sigma": defaults.sigma,
        "seed": defaults.seed,
        "results": run.results,
        "counts": run.counts,
        "execution_time_seconds": run.execution_time_seconds,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn explore(args: &ArgMatches) -> anyhow::Result<()> {
    let path: PathBuf = arg(args, "config")?;
    let file = RunFile::load(&path)?;
    let population = file.load_population()?;
    let catalog = Arc::new(file.load_catalog()?);
    let proposer = Arc::new(CatalogProposer::new(Arc::clone(&catalog)));

    let (sink, mut events) = ChannelSink::new();
    let mut explorer = BeamSearchExplorer::new(proposer, catalog, population)
        .with_settings(file.settings.clone())
        .with_sink(Arc::new(sink));
    if let Some(modifiers) = file.modifiers {
        explorer = explorer.with_modifiers(modifiers);
    }

    let progress = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let ExplorationEvent::IterationCompleted(result) = event {
                println!("{}", report::iteration_line(&result));
            }
        }
    });

    let cancel = explorer.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping exploration");
            cancel.cancel();
        }
    });

    let outcome = explorer.run(file.request()).await.context("exploration failed")?;
    // Closes the event channel so the printer drains and exits
    drop(explorer);
    progress.await.context("progress printer stopped")?;

    print!("{}", report::summary(&outcome));

    if let Some(out) = args.get_one::<PathBuf>("output") {
        let json = serde_json::to_string_pretty(&outcome)?;
        std::fs::write(out, json).with_context(|| format!("cannot write {}", out.display()))?;
        tracing::info!(path = %out.display(), "outcome written");
    }
    Ok(())
}

fn catalog(args: &ArgMatches) -> anyhow::Result<()> {
    let catalog = match args.get_one::<PathBuf>("file") {
        Some(path) => ActionCatalog::from_path(path)
            .with_context(|| format!("cannot load catalog {}", path.display()))?,
        None => ActionCatalog::builtin().context("builtin catalog is invalid")?,
    };
    println!("catalog version {}, {} categories", catalog.version(), catalog.len());
    print!("{}", catalog.prompt_context());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("json"));

    match matches.subcommand() {
        Some(("simulate", args)) => simulate(args),
        Some(("explore", args)) => explore(args).await,
        Some(("catalog", args)) => catalog(args),
        _ => anyhow::bail!("unknown command"),
    }
}
