use ball_chaser::config::Config;
use ball_chaser::evolution::{EvolutionEngine, GenerationStats, Individual};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::Path;
use std::process;

/// How many of the final population get printed.
const TOP_INDIVIDUALS: usize = 5;

fn main() {
    env_logger::init();
    log::info!("Booting ball-chaser...");

    // 1. Load and Validate Configuration
    let config = match Config::load(Path::new("config.toml")) {
        Ok(c) => c,
        Err(e) => {
            log::error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        log::error!("Invalid configuration: {}", e);
        process::exit(1);
    }
    log::info!("Configuration loaded and validated.");

    // 2. Run the Evolution, replaying the elite once per generation
    log::info!("--- Starting Evolution ---");
    let mut engine = EvolutionEngine::new(&config);
    let evaluator = engine.evaluator();
    let mut replay_rng = StdRng::seed_from_u64(config.ga.seed);
    let mut observer = |stats: &GenerationStats, best: &Individual| {
        let (trajectory, outcome) = evaluator.trace(&best.tree, &mut replay_rng);
        log::debug!(
            "Gen {} replay of the elite: {} hits, {} frames, {} cells visited",
            stats.generation + 1,
            outcome.hits,
            trajectory.len(),
            trajectory.cells_visited()
        );
    };
    let report = engine.evolve_with_observer(&mut observer);

    // 3. Report
    println!(
        "\n{:>5} {:>14} {:>14} {:>14} {:>14} {:>10} {:>8}",
        "GEN", "BEST", "AVERAGE", "STD", "WORST", "AVG NODES", "ABORTED"
    );
    for stats in &report.stats {
        println!(
            "{:>5} {:>14.3} {:>14.3} {:>14.3} {:>14.3} {:>10.1} {:>8}",
            stats.generation + 1,
            stats.best_fitness,
            stats.average_fitness,
            stats.std_fitness,
            stats.worst_fitness,
            stats.average_nodes,
            stats.aborted_runs
        );
    }

    println!("\nTop {} individuals:", TOP_INDIVIDUALS);
    for (i, individual) in report
        .final_population
        .iter()
        .take(TOP_INDIVIDUALS)
        .enumerate()
    {
        println!(
            "[Rank {}] {} LENGTH {} FITNESS {:.4}",
            i + 1,
            individual.encode(),
            individual.node_count(),
            individual.fitness
        );
    }

    match report.best {
        Some(best) => println!(
            "\nBest individual: {} LENGTH {} FITNESS {:.4}",
            best.encode(),
            best.node_count(),
            best.fitness
        ),
        None => log::warn!("Evolution finished without an evaluated individual."),
    }
}
