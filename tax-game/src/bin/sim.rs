//! Tax compliance game CLI.
//!
//! Run the repeated game with or without the audit mechanism and compare
//! the two.

#[cfg(feature = "cli")]
mod cli {
    use std::num::{NonZeroU64, NonZeroUsize};
    use std::path::PathBuf;

    use anyhow::{Context, Result};
    use clap::{Parser, Subcommand};
    use indicatif::{ProgressBar, ProgressStyle};
    use tax_game::{
        compare_mechanism, spawn_simulation, ArmSummary, GameConfig, PolicyKind, RoundEvent,
        SimulationConfig, SimulationMessage, SummaryReport,
    };

    #[derive(Parser)]
    #[command(name = "tax-game-sim")]
    #[command(about = "Simulate a repeated tax compliance game with audits and shared welfare")]
    pub struct Cli {
        #[command(subcommand)]
        pub command: Command,

        /// Enable debug logging
        #[arg(short, long, global = true)]
        pub verbose: bool,
    }

    #[derive(Subcommand)]
    pub enum Command {
        /// Run a single simulation
        Run {
            /// Number of individuals
            #[arg(short, long, default_value = "10")]
            agents: NonZeroUsize,

            /// Number of rounds
            #[arg(short, long, default_value = "100")]
            rounds: NonZeroU64,

            /// Disable penalties for captured evaders
            #[arg(long)]
            no_mechanism: bool,

            /// Decision policy (overrides the config file)
            #[arg(short, long, value_enum)]
            policy: Option<PolicyKind>,

            /// Seed for the random source
            #[arg(short, long)]
            seed: Option<u64>,

            /// Game parameters as TOML
            #[arg(short, long)]
            config: Option<PathBuf>,

            /// Print every individual's outcome
            #[arg(long)]
            narrate: bool,

            /// Write the full report as JSON
            #[arg(short, long)]
            output: Option<PathBuf>,
        },

        /// Compare outcomes with and without the mechanism
        Compare {
            /// Number of individuals
            #[arg(short, long, default_value = "10")]
            agents: NonZeroUsize,

            /// Number of rounds
            #[arg(short, long, default_value = "100")]
            rounds: NonZeroU64,

            /// Number of paired trials
            #[arg(short, long, default_value = "20")]
            trials: usize,

            /// Seed of the first trial
            #[arg(short, long, default_value = "0")]
            seed: u64,

            /// Decision policy (overrides the config file)
            #[arg(short, long, value_enum)]
            policy: Option<PolicyKind>,

            /// Game parameters as TOML
            #[arg(short, long)]
            config: Option<PathBuf>,
        },
    }

    pub fn run(cli: Cli) -> Result<()> {
        let level = if cli.verbose { "debug" } else { "info" };

        // RUST_LOG wins over --verbose when set.
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
            )
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();

        match cli.command {
            Command::Run {
                agents,
                rounds,
                no_mechanism,
                policy,
                seed,
                config,
                narrate,
                output,
            } => {
                let game = load_game(config.as_ref(), policy)?;
                let mut sim = SimulationConfig::new(agents, rounds, !no_mechanism).with_game(game);
                sim.seed = seed;
                run_single(sim, narrate, output)
            }
            Command::Compare {
                agents,
                rounds,
                trials,
                seed,
                policy,
                config,
            } => {
                let game = load_game(config.as_ref(), policy)?;
                let sim = SimulationConfig::new(agents, rounds, true).with_game(game);
                run_compare(&sim, trials, seed)
            }
        }
    }

    fn load_game(path: Option<&PathBuf>, policy: Option<PolicyKind>) -> Result<GameConfig> {
        let mut game = match path {
            Some(path) => GameConfig::from_toml_file(path)
                .with_context(|| format!("loading game config from {}", path.display()))?,
            None => GameConfig::default(),
        };
        if let Some(policy) = policy {
            game.policy = policy;
        }
        Ok(game)
    }

    fn run_single(sim: SimulationConfig, narrate: bool, output: Option<PathBuf>) -> Result<()> {
        let mechanism = if sim.mechanism_enabled { "on" } else { "off" };
        println!("Tax Compliance Game");
        println!("===================");
        println!(
            "Agents: {}  Rounds: {}  Mechanism: {}  Policy: {:?}\n",
            sim.population, sim.rounds, mechanism, sim.game.policy
        );

        let pb = ProgressBar::new(sim.rounds.get());
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} rounds ({eta})")?
                .progress_chars("=> "),
        );

        let handle = spawn_simulation(sim, narrate);
        for message in handle.messages().iter() {
            match message {
                SimulationMessage::Event(event) => pb.suspend(|| narrate_event(&event)),
                SimulationMessage::Progress { round, .. } => pb.set_position(round),
            }
        }
        pb.finish_and_clear();

        let report = handle
            .join()
            .map_err(|_| anyhow::anyhow!("simulation thread panicked"))?;

        print_report(&report);

        if let Some(path) = output {
            let json = serde_json::to_string_pretty(&report)?;
            std::fs::write(&path, json)
                .with_context(|| format!("writing report to {}", path.display()))?;
            println!("\nReport written to {}", path.display());
        }

        Ok(())
    }

    fn narrate_event(event: &RoundEvent) {
        let outcome = if event.caught { "caught" } else { "clear" };
        match event.strategy_probabilities {
            Some([p0, p50, p100]) => println!(
                "round {:>4} agent {:>4}: evaded {:>5.1}% {:<6} payoff {:>9.2}  welfare {:>5.1}%  p=[{:.2} {:.2} {:.2}]",
                event.round,
                event.agent_id,
                event.evasion_level,
                outcome,
                event.payoff,
                event.welfare_percent,
                p0,
                p50,
                p100
            ),
            None => println!(
                "round {:>4} agent {:>4}: evaded {:>5.1}% {:<6} payoff {:>9.2}  welfare {:>5.1}%",
                event.round,
                event.agent_id,
                event.evasion_level,
                outcome,
                event.payoff,
                event.welfare_percent
            ),
        }
    }

    fn print_report(report: &SummaryReport) {
        if report.cancelled {
            println!("Run cancelled after {} rounds\n", report.rounds_completed);
        }

        println!("{:>6} {:>15} {:>8}", "Agent", "Total Utility", "Caught");
        println!("{:-<6} {:-<15} {:-<8}", "", "", "");
        for agent in &report.per_agent {
            println!(
                "{:>6} {:>15.2} {:>8}",
                agent.id, agent.total_utility, agent.times_caught
            );
        }

        println!();
        println!("Average utility:  {:>12.2}", report.average_utility);
        println!("Max utility:      {:>12.2}", report.max_utility);
        println!("Min utility:      {:>12.2}", report.min_utility);
        println!("Final welfare:    {:>11.1}%", report.final_welfare_percent);
        println!("Mean compliance:  {:>11.1}%", report.mean_compliance() * 100.0);
        println!("Total captures:   {:>12}", report.total_captures());
        println!("Seed:             {:>12}", report.seed);
    }

    fn run_compare(sim: &SimulationConfig, trials: usize, seed: u64) -> Result<()> {
        println!("Mechanism Comparison");
        println!("====================");
        println!(
            "Agents: {}  Rounds: {}  Trials: {}  Policy: {:?}\n",
            sim.population, sim.rounds, trials, sim.game.policy
        );

        let comparison = compare_mechanism(sim, trials, seed);

        println!("{:<22} {:>14} {:>14}", "Metric", "Mechanism", "No Mechanism");
        println!("{:-<22} {:-<14} {:-<14}", "", "", "");

        let on = &comparison.with_mechanism;
        let off = &comparison.without_mechanism;
        let rows: [(&str, fn(&ArmSummary) -> f64); 6] = [
            ("Mean utility", |a| a.mean_utility),
            ("Mean min utility", |a| a.mean_min_utility),
            ("Mean max utility", |a| a.mean_max_utility),
            ("Final welfare %", |a| a.mean_final_welfare_percent),
            ("Compliance %", |a| a.mean_compliance * 100.0),
            ("Captures", |a| a.mean_captures),
        ];
        for (label, metric) in rows {
            println!("{:<22} {:>14.2} {:>14.2}", label, metric(on), metric(off));
        }

        Ok(())
    }
}

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    use clap::Parser;
    let cli = cli::Cli::parse();
    cli::run(cli)
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This binary requires the 'cli' feature. Build with:");
    eprintln!("  cargo build -p tax-game --features cli --bin tax-game-sim");
}
