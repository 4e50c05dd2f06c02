//! fuelpath - plan and simulate fuel-aware movement over terrain.
//!
//! Usage:
//!   fuelpath plan --from 10,10 --to 390,10
//!   fuelpath simulate --agent tank@20,20->380,40 --agent air@20,200->380,200
//!   fuelpath suggest --instruction "take the pass" --dry-run

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fuelpath_cli::{
    load_engine_config, parse_point, scenario, telemetry, terrain, AgentSpec, CliEnv,
    PlannerClient, SyntheticTerrain,
};
use fuelpath_core::{
    apply_plan, AgentRegistry, ElevationSurface, EngineConfig, Fleet, FuelModel, PlanSnapshot,
    Point, TickOutcome,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::PathBuf;

/// Terrain-aware fuel-optimal path planning
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Engine config JSON (overrides FUELPATH_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Heightmap raster JSON; a synthetic map is used when absent
    #[arg(long, global = true)]
    terrain: Option<PathBuf>,

    /// Synthetic map used without --terrain
    #[arg(long, value_enum, default_value_t = SyntheticTerrain::Ridge, global = true)]
    synthetic: SyntheticTerrain,

    /// Synthetic map width
    #[arg(long, default_value_t = 400, global = true)]
    width: usize,

    /// Synthetic map height
    #[arg(long, default_value_t = 300, global = true)]
    height: usize,

    /// Log as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print per-chunk terrain roughness
    Summary {
        /// Chunk size (defaults to the engine config)
        #[arg(long)]
        chunk: Option<usize>,
    },
    /// Plan a path between two points
    Plan {
        #[arg(long, value_parser = parse_point)]
        from: Point,

        #[arg(long, value_parser = parse_point)]
        to: Point,

        #[arg(long, value_enum, default_value_t = Method::Search)]
        method: Method,

        /// RNG seed for the candidate planner
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Plan routes for agents and drive them until they settle
    Simulate {
        /// `kind@x,y->tx,ty`, repeatable; defaults to the crossing scenario
        #[arg(long = "agent")]
        agents: Vec<AgentSpec>,

        /// Seconds per tick
        #[arg(long, default_value_t = 0.1)]
        dt: f64,

        #[arg(long, default_value_t = 100_000)]
        max_ticks: usize,
    },
    /// Ask the external planner for moves and apply them
    Suggest {
        /// `kind@x,y`, repeatable; defaults to the crossing scenario
        #[arg(long = "agent")]
        agents: Vec<AgentSpec>,

        #[arg(long, default_value = "Move every unit toward the far side of the map")]
        instruction: String,

        /// Planner URL (overrides FUELPATH_PLANNER_URL)
        #[arg(long)]
        url: Option<String>,

        /// Print the snapshot instead of sending it
        #[arg(long)]
        dry_run: bool,

        /// Ticks to simulate after applying the plan
        #[arg(long, default_value_t = 0)]
        ticks: usize,

        /// Seconds per tick
        #[arg(long, default_value_t = 0.1)]
        dt: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Method {
    /// Best-first search over the terrain lattice
    Search,
    /// Cheapest of several jittered straight-line candidates
    Candidates,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    ticks: usize,
    settled: bool,
    agents: Vec<fuelpath_core::AgentSnapshot>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.json)?;

    let env = CliEnv::from_env();
    let config_path = cli.config.clone().or_else(|| env.config_path.clone());
    let config = load_engine_config(config_path.as_deref())?;
    let surface = match &cli.terrain {
        Some(path) => terrain::load_raster(path)?,
        None => terrain::synthetic(cli.synthetic, cli.width, cli.height)
            .context("building synthetic terrain")?,
    };

    match cli.command {
        Command::Summary { chunk } => {
            let chunk = chunk.unwrap_or(config.summary_chunk);
            let summary = surface.cost_summary(chunk)?;
            print_json(&summary)?;
        }
        Command::Plan {
            from,
            to,
            method,
            seed,
        } => match method {
            Method::Search => {
                let result = config.search_engine()?.find_path(&surface, from, to);
                print_json(&result)?;
            }
            Method::Candidates => {
                let mut rng = match seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_os_rng(),
                };
                let selection = config.candidate_evaluator()?.best_path(
                    &config.fuel_model()?,
                    &surface,
                    from,
                    to,
                    &mut rng,
                );
                print_json(&selection)?;
            }
        },
        Command::Simulate {
            agents,
            dt,
            max_ticks,
        } => {
            let scenario = scenario::from_specs(&agents, surface.width() as f64, surface.height() as f64);
            tracing::info!(scenario = %scenario.name, agents = scenario.agents.len(), "starting simulation");
            let mut fleet = scenario.spawn(config.motion.clone())?;
            route_fleet(&mut fleet, &scenario.agents, &surface, &config)?;
            let report = drive(&mut fleet, &surface, &config.fuel_model()?, dt, max_ticks);
            print_json(&report)?;
        }
        Command::Suggest {
            agents,
            instruction,
            url,
            dry_run,
            ticks,
            dt,
        } => {
            let scenario = scenario::from_specs(&agents, surface.width() as f64, surface.height() as f64);
            let mut fleet = scenario.spawn(config.motion.clone())?;
            let snapshot = PlanSnapshot::capture(&fleet, &surface, config.summary_chunk, instruction)?;
            if dry_run {
                print_json(&snapshot)?;
                return Ok(());
            }

            let client = PlannerClient::new(url.unwrap_or(env.planner_url), env.planner_timeout)?;
            let plans = client.request_plan(&snapshot).await?;
            let report = apply_plan(&mut fleet, &plans);
            tracing::info!(
                applied = report.applied.len(),
                skipped = report.skipped.len(),
                "plan applied"
            );
            if ticks == 0 {
                print_json(&report)?;
            } else {
                let simulation = drive(&mut fleet, &surface, &config.fuel_model()?, dt, ticks);
                print_json(&simulation)?;
            }
        }
    }

    Ok(())
}

/// Search a route for every agent with a destination and queue it.
fn route_fleet(
    fleet: &mut Fleet,
    specs: &[AgentSpec],
    surface: &ElevationSurface,
    config: &EngineConfig,
) -> Result<()> {
    let engine = config.search_engine()?;
    let ids: Vec<_> = fleet.iter().map(|agent| agent.id).collect();
    for (id, spec) in ids.into_iter().zip(specs) {
        let Some(destination) = spec.destination else {
            continue;
        };
        let result = engine.find_path(surface, spec.position, destination);
        if result.waypoints.is_empty() {
            tracing::warn!(agent_id = id, %destination, "no route, agent stays put");
            continue;
        }
        if let Some(agent) = fleet.find_by_id_mut(id) {
            let queued = agent.motion.enqueue_path(&result.waypoints);
            tracing::info!(
                agent_id = id,
                waypoints = queued,
                fuel = result.total_fuel,
                outcome = ?result.outcome,
                "route queued"
            );
        }
    }
    Ok(())
}

fn drive(
    fleet: &mut Fleet,
    surface: &ElevationSurface,
    model: &FuelModel,
    dt: f64,
    max_ticks: usize,
) -> SimulationReport {
    let mut ticks = 0;
    while ticks < max_ticks && fleet.any_moving() {
        ticks += 1;
        for (agent_id, outcome) in fleet.tick_all(surface, model, dt) {
            match outcome {
                TickOutcome::Arrived { waypoint, next: None } => {
                    tracing::info!(agent_id, %waypoint, tick = ticks, "agent finished route");
                }
                TickOutcome::Blocked { at } => {
                    tracing::warn!(agent_id, %at, tick = ticks, "agent blocked");
                }
                TickOutcome::OutOfFuel { .. } => {
                    tracing::warn!(agent_id, tick = ticks, "agent ran out of fuel");
                }
                _ => {}
            }
        }
    }
    SimulationReport {
        ticks,
        settled: !fleet.any_moving(),
        agents: fleet.list_agents(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
