//! MOCMA CLI - Run the optimizer on a benchmark from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use mocma::{
    compute::{Indicator, Mocma, indicator::hypervolume, indicator::reference_point},
    objective::build_problem,
    schema::RunConfig,
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let mut args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "--example" {
        print_example_config();
        return;
    }

    let resume = match args.iter().position(|a| a == "--resume") {
        Some(i) if i + 1 < args.len() => {
            let path = PathBuf::from(args.remove(i + 1));
            args.remove(i);
            Some(path)
        }
        Some(_) => {
            eprintln!("--resume needs a checkpoint path");
            std::process::exit(1);
        }
        None => None,
    };

    if args.len() < 2 {
        eprintln!("Usage: {} <run.json> [generations] [--resume <checkpoint.json>]", args[0]);
        eprintln!();
        eprintln!("Run MOCMA on a benchmark problem from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  run.json     Path to run configuration file");
        eprintln!("  generations  Number of generations (default: from run.json)");
        eprintln!("  --resume     Continue from an engine checkpoint");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    let config_path = PathBuf::from(&args[1]);

    // Load configuration
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let run: RunConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    let generations: usize = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(run.generations);

    let problem = build_problem(&run.problem).unwrap_or_else(|e| {
        eprintln!("Error building problem: {}", e);
        std::process::exit(1);
    });

    let mut engine = match &resume {
        Some(path) => Mocma::load(path).unwrap_or_else(|e| {
            eprintln!("Error loading checkpoint: {}", e);
            std::process::exit(1);
        }),
        None => {
            let mut engine = Mocma::default();
            let initialized = engine
                .configure(run.optimizer.clone())
                .and_then(|_| engine.init_with(problem.as_ref()));
            if let Err(e) = initialized {
                eprintln!("Error initializing optimizer: {}", e);
                std::process::exit(1);
            }
            engine
        }
    };

    println!("MOCMA");
    println!("=====");
    println!(
        "Problem: {} ({} variables, {} objectives)",
        problem.name(),
        problem.number_of_variables(),
        problem.number_of_objectives()
    );
    println!(
        "Population: {} ({} offspring per parent)",
        engine.config().population_size,
        engine.config().offspring_per_parent
    );
    match engine.indicator() {
        Indicator::Hypervolume(hv) if hv.approximated => {
            println!("Indicator: hypervolume (approximated, {} samples)", hv.samples)
        }
        Indicator::Hypervolume(_) => println!("Indicator: hypervolume (exact)"),
        Indicator::AdditiveEpsilon => println!("Indicator: additive epsilon"),
    }
    if let Some(path) = &resume {
        println!(
            "Resumed from {} at generation {}",
            path.display(),
            engine.generation()
        );
    }
    println!("Generations: {}", generations);
    println!();

    println!("Running optimizer...");
    let start = Instant::now();

    for i in 0..generations {
        let solutions = engine.step(problem.as_ref()).unwrap_or_else(|e| {
            eprintln!("Error in generation {}: {}", engine.generation() + 1, e);
            std::process::exit(1);
        });

        // Print progress every 10%
        if (i + 1) % (generations / 10).max(1) == 0 {
            let values: Vec<&[f64]> = solutions.iter().map(|s| s.value.as_slice()).collect();
            let volume = hypervolume(&values, &reference_point(&values));
            let elapsed = start.elapsed().as_secs_f32();
            println!(
                "  Generation {}/{}: hypervolume={:.6}, evaluations={}, {:.1} gen/s",
                i + 1,
                generations,
                volume,
                problem.evaluation_counter(),
                (i + 1) as f32 / elapsed
            );
        }
    }

    let elapsed = start.elapsed();

    println!();
    println!("Final population (first front first):");
    for solution in engine.solution_set().iter().take(10) {
        let value: Vec<String> = solution.value.iter().map(|v| format!("{:.6}", v)).collect();
        println!("  [{}]", value.join(", "));
    }
    if engine.population().len() > 10 {
        println!("  ... {} more", engine.population().len() - 10);
    }
    println!();
    println!(
        "Time: {:.2}s ({:.1} gen/s)",
        elapsed.as_secs_f32(),
        generations as f32 / elapsed.as_secs_f32()
    );

    if let Some(path) = &run.checkpoint {
        match engine.save(path) {
            Ok(()) => println!("Checkpoint written to {}", path.display()),
            Err(e) => {
                eprintln!("Error writing checkpoint: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn print_example_config() {
    let run = RunConfig {
        checkpoint: Some(PathBuf::from("mocma.checkpoint.json")),
        ..Default::default()
    };

    println!("Example configuration (run.json):");
    match serde_json::to_string_pretty(&run) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing example: {}", e),
    }
}
