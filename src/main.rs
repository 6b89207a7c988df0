//! CGP filter CLI - Train, repair, damage, inspect and apply evolved filters.

use std::io;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use log::{info, warn};

use cgp_filter::{
    compute::{
        CircuitEvaluator,
        evolution::{ChromosomeRng, EvolutionEngine, FitnessEvaluator, TrainingSet, TrainingSetError},
    },
    schema::{CgpConfig, Chromosome, ConfigError, EvolutionProgress, EvolutionResult},
    storage::{ImageFileError, load_chromosome, load_image, load_images, save_chromosome, save_image},
};

#[derive(Parser)]
#[command(name = "cgp-filter", version, about = "Evolve 3x3 image filters with Cartesian Genetic Programming")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evolve a new filter from training images
    Train {
        #[command(flatten)]
        training: TrainingArgs,
        /// Evolution configuration (KEY=VALUE or .json)
        #[arg(long)]
        config: PathBuf,
        /// Where to write the best chromosome
        #[arg(long)]
        out: PathBuf,
    },
    /// Evolve a replacement for a damaged filter, keeping its damaged blocks
    Repair {
        #[command(flatten)]
        training: TrainingArgs,
        /// Damaged chromosome
        #[arg(long)]
        chromosome: PathBuf,
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Mark one random working block as damaged
    Damage {
        #[arg(long)]
        chromosome: PathBuf,
        #[arg(long)]
        out: PathBuf,
        /// Seed for choosing the block
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print chromosome size, live and damaged blocks
    Status {
        #[arg(long)]
        chromosome: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the fitness of a chromosome on a training set
    Test {
        #[command(flatten)]
        training: TrainingArgs,
        #[arg(long)]
        chromosome: PathBuf,
    },
    /// Apply a filter to an image
    Use {
        #[arg(long)]
        chromosome: PathBuf,
        /// Input image
        #[arg(long)]
        on: PathBuf,
        /// Output image; the format follows the extension
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Args)]
struct TrainingArgs {
    /// Training input images
    #[arg(long, num_args = 1.., required = true)]
    set: Vec<PathBuf>,
    /// Expected filter outputs, paired with --set in order
    #[arg(long, num_args = 1.., required = true)]
    set_out: Vec<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    ImageFile(#[from] ImageFileError),
    #[error("Invalid training set: {0}")]
    TrainingSet(#[from] TrainingSetError),
    #[error("Chromosome file {path}: {source}")]
    Chromosome {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Every block of {0} is already damaged")]
    FullyDamaged(PathBuf),
    #[error("Failed to encode status: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 3,
            _ => 1,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Train {
            training,
            config,
            out,
        } => train(&training, &config, &out),
        Command::Repair {
            training,
            chromosome,
            config,
            out,
        } => repair(&training, &chromosome, &config, &out),
        Command::Damage {
            chromosome,
            out,
            seed,
        } => damage(&chromosome, &out, seed),
        Command::Status { chromosome, json } => status(&chromosome, json),
        Command::Test {
            training,
            chromosome,
        } => test(&training, &chromosome),
        Command::Use {
            chromosome,
            on,
            out,
        } => apply(&chromosome, &on, &out),
    }
}

fn train(training: &TrainingArgs, config_path: &Path, out: &Path) -> Result<(), CliError> {
    let config = CgpConfig::load(config_path)?;
    let training = load_training(training)?;

    let engine = EvolutionEngine::new(config, training)?;
    evolve(engine, out)
}

fn repair(
    training: &TrainingArgs,
    chromosome_path: &Path,
    config_path: &Path,
    out: &Path,
) -> Result<(), CliError> {
    let damaged = read_chromosome(chromosome_path)?;
    let mut config = CgpConfig::load(config_path)?;

    let geometry = damaged.geometry();
    if config.geometry() != geometry {
        warn!(
            "Configuration grid {}x{} differs from chromosome grid {}x{}; using the chromosome's",
            config.cols, config.rows, geometry.cols, geometry.rows
        );
        config.cols = geometry.cols;
        config.rows = geometry.rows;
    }

    let damaged_blocks = damaged.damaged_blocks();
    println!("Repairing around damaged blocks: {:?}", damaged_blocks);

    let training = load_training(training)?;
    let engine = EvolutionEngine::new(config, training)?.with_damaged(damaged_blocks);
    evolve(engine, out)
}

fn damage(chromosome_path: &Path, out: &Path, seed: Option<u64>) -> Result<(), CliError> {
    let mut chromosome = read_chromosome(chromosome_path)?;
    let mut rng = seed.map_or_else(ChromosomeRng::random, ChromosomeRng::new);

    let index = rng
        .damage_random_block(&mut chromosome)
        .ok_or_else(|| CliError::FullyDamaged(chromosome_path.to_path_buf()))?;
    write_chromosome(&chromosome, out)?;

    println!("Damaged block {}", index);
    Ok(())
}

fn status(chromosome_path: &Path, json: bool) -> Result<(), CliError> {
    let report = read_chromosome(chromosome_path)?.status();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Chromosome: {}", chromosome_path.display());
    println!("  Grid: {}x{}", report.cols, report.rows);
    println!("  Size: {} genes", report.genes);
    println!("  Blocks: {}", report.blocks);
    println!("  Output: {}", report.output);
    println!("  Used blocks ({}): {:?}", report.live.len(), report.live);
    println!(
        "  Damaged blocks ({}): {:?}",
        report.damaged.len(),
        report.damaged
    );
    println!(
        "  Damaged used blocks ({}): {:?}",
        report.damaged_live.len(),
        report.damaged_live
    );
    Ok(())
}

fn test(training: &TrainingArgs, chromosome_path: &Path) -> Result<(), CliError> {
    let chromosome = read_chromosome(chromosome_path)?;
    let training = load_training(training)?;

    let fitness = FitnessEvaluator::new(training).fitness(&chromosome);
    println!("Fitness: {}", fitness);
    Ok(())
}

fn apply(chromosome_path: &Path, on: &Path, out: &Path) -> Result<(), CliError> {
    let chromosome = read_chromosome(chromosome_path)?;
    let image = load_image(on)?;

    let filtered = CircuitEvaluator::new().use_filter(&chromosome, &image);
    save_image(&filtered, out)?;

    info!("Filtered {} into {}", on.display(), out.display());
    Ok(())
}

/// Run the engine with progress output and save the best chromosome.
fn evolve(mut engine: EvolutionEngine, out: &Path) -> Result<(), CliError> {
    let config = engine.config().clone();
    println!("CGP Filter Evolution");
    println!("====================");
    println!(
        "Grid: {}x{} (l_back {})",
        config.cols, config.rows, config.l_back
    );
    println!(
        "Population: {}, max mutations: {}",
        config.population_size, config.max_mutations
    );
    println!("Runs: {} x {} generations", config.runs, config.generations);
    println!("Seed: {}", engine.seed());
    println!();

    let result = engine.run_with_callback(print_progress);
    write_chromosome(&result.best, out)?;
    print_result(&result, out);
    Ok(())
}

fn print_progress(progress: &EvolutionProgress) {
    let interval = (progress.total_generations / 10).max(1);
    if progress.generation % interval == 0 || progress.generation == progress.total_generations {
        println!(
            "  Run {}/{} generation {}/{}: fitness={}",
            progress.run + 1,
            progress.total_runs,
            progress.generation,
            progress.total_generations,
            progress.elite_fitness
        );
    }
}

fn print_result(result: &EvolutionResult, out: &Path) {
    println!();
    for run in &result.runs {
        println!(
            "Run {}: fitness {} -> {} ({} improvements)",
            run.run + 1,
            run.initial_fitness,
            run.final_fitness,
            run.improvements
        );
    }
    println!();
    println!(
        "Best fitness: {} (run {})",
        result.best_fitness,
        result.best_run + 1
    );
    println!(
        "Time: {:.2}s ({:.1} evaluations/s)",
        result.stats.elapsed_seconds, result.stats.evaluations_per_second
    );
    println!("Saved chromosome to {}", out.display());
}

fn load_training(args: &TrainingArgs) -> Result<TrainingSet, CliError> {
    let inputs = load_images(&args.set)?;
    let targets = load_images(&args.set_out)?;
    Ok(TrainingSet::new(inputs, targets)?)
}

fn read_chromosome(path: &Path) -> Result<Chromosome, CliError> {
    load_chromosome(path).map_err(|source| CliError::Chromosome {
        path: path.to_path_buf(),
        source,
    })
}

fn write_chromosome(chromosome: &Chromosome, path: &Path) -> Result<(), CliError> {
    save_chromosome(chromosome, path).map_err(|source| CliError::Chromosome {
        path: path.to_path_buf(),
        source,
    })
}
