/// Grammar Linter — validates recap grammar coverage and quality.
///
/// Usage: grammar_linter [PATH]... [--no-builtin] [--strict]

use clap::Parser;
use recap_engine::core::generator::{ENTRY_RULES, FACT_SLOTS};
use recap_engine::core::grammar::GrammarSet;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "grammar_linter")]
#[command(about = "Validate recap grammar files", long_about = None)]
struct Cli {
    /// Grammar files or directories of .ron files, layered in order
    paths: Vec<PathBuf>,

    /// Lint only the given files, without the bundled grammar underneath
    #[arg(long)]
    no_builtin: bool,

    /// Treat warnings as errors
    #[arg(long)]
    strict: bool,
}

fn main() {
    let cli = Cli::parse();

    let mut grammars = if cli.no_builtin {
        GrammarSet::default()
    } else {
        match GrammarSet::builtin() {
            Ok(gs) => gs,
            Err(e) => {
                eprintln!("ERROR: Failed to load bundled grammar: {}", e);
                process::exit(1);
            }
        }
    };

    for path in &cli.paths {
        if path.is_file() {
            load_file(path, &mut grammars);
        } else if path.is_dir() {
            load_grammars_recursive(path, &mut grammars);
        } else {
            eprintln!("ERROR: Path '{}' does not exist", path.display());
            process::exit(1);
        }
    }

    println!("Loaded {} grammar rules", grammars.rules.len());

    let report = grammars.lint(ENTRY_RULES, FACT_SLOTS);

    println!("\n=== Grammar Lint Report ===\n");

    if report.errors.is_empty() && report.warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &report.warnings {
        println!("WARNING: {}", warning);
    }

    for error in &report.errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        report.errors.len(),
        report.warnings.len()
    );

    if !report.is_clean() || (cli.strict && !report.warnings.is_empty()) {
        process::exit(1);
    }
}

fn load_file(path: &Path, grammars: &mut GrammarSet) {
    match GrammarSet::load_from_ron(path) {
        Ok(gs) => {
            println!("  Loaded: {}", path.display());
            grammars.merge(gs);
        }
        Err(e) => {
            eprintln!("ERROR: Failed to load {}: {}", path.display(), e);
            process::exit(1);
        }
    }
}

fn load_grammars_recursive(dir: &Path, grammars: &mut GrammarSet) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    paths.sort();
    for path in paths {
        if path.is_dir() {
            load_grammars_recursive(&path, grammars);
        } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
            load_file(&path, grammars);
        }
    }
}
