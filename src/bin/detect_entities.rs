//! Detect Sensitive Entities in Plain Text
//!
//! Runs the pattern pass over a text file and prints the matches as JSON.
//! Pages are separated by form feeds (`\x0c`); offsets are char offsets into
//! each page.
//!
//! Usage:
//!   cargo run --release --bin detect_entities -- input.txt
//!   cargo run --release --bin detect_entities -- input.txt --config detection.json
//!   cargo run --release --bin detect_entities -- input.txt --patterns custom.json --all

use docveil::patterns::{PatternCatalog, ScriptClassifier, TextMatch, UserPattern};
use docveil::{DetectionConfig, Error, Result};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

struct CliConfig {
    input: Option<PathBuf>,
    config: Option<PathBuf>,
    patterns: Option<PathBuf>,
    unfiltered: bool,
}

impl CliConfig {
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut cli = CliConfig {
            input: None,
            config: None,
            patterns: None,
            unfiltered: false,
        };

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--config" => {
                    i += 1;
                    cli.config = args.get(i).map(PathBuf::from);
                },
                "--patterns" => {
                    i += 1;
                    cli.patterns = args.get(i).map(PathBuf::from);
                },
                "--all" => {
                    cli.unfiltered = true;
                },
                other => {
                    cli.input = Some(PathBuf::from(other));
                },
            }
            i += 1;
        }
        cli
    }
}

#[derive(Serialize)]
struct PageMatches {
    page: usize,
    matches: Vec<TextMatch>,
    rejected: usize,
}

#[derive(Serialize)]
struct Output {
    scripts: Vec<String>,
    pages: Vec<PageMatches>,
}

fn run(cli: &CliConfig) -> Result<Output> {
    let input = cli
        .input
        .as_ref()
        .ok_or_else(|| Error::InvalidConfig("missing input file".to_string()))?;
    let text = fs::read_to_string(input)?;

    let config = match &cli.config {
        Some(path) => DetectionConfig::from_json(&fs::read_to_string(path)?)?,
        None => DetectionConfig::default(),
    };

    let mut catalog = PatternCatalog::new();
    if let Some(path) = &cli.patterns {
        let user: Vec<UserPattern> = serde_json::from_str(&fs::read_to_string(path)?)?;
        for pattern in &user {
            catalog.add_user_pattern(pattern)?;
        }
        log::info!("Loaded {} user patterns", user.len());
    }

    let profile = ScriptClassifier::classify(&text);
    let scripts = profile
        .scripts
        .iter_names()
        .map(|(name, _)| name.to_string())
        .collect();

    let mut pages = Vec::new();
    for (page, page_text) in text.split('\x0c').enumerate() {
        let outcome = catalog.scan(page_text, profile.scripts);
        let matches = outcome
            .matches
            .into_iter()
            .filter(|m| {
                cli.unfiltered
                    || (config.is_type_enabled(m.entity_type) && m.confidence >= config.min_confidence())
            })
            .collect();
        pages.push(PageMatches {
            page,
            matches,
            rejected: outcome.rejected,
        });
    }
    Ok(Output { scripts, pages })
}

fn main() {
    env_logger::init();

    let cli = CliConfig::from_args();
    if cli.input.is_none() {
        eprintln!("Usage: detect_entities <text-file> [--config <json>] [--patterns <json>] [--all]");
        std::process::exit(2);
    }

    match run(&cli).and_then(|output| Ok(serde_json::to_string_pretty(&output)?)) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        },
    }
}
