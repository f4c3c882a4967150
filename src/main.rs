use anyhow::Context;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use audio_arbiter::{
    AppResult, ArbitrationOutcome, Category,
    cli::{Cli, Commands, PolicyAction},
    config::Config,
    init_file_logging, init_logging, lookup,
};

#[derive(Serialize)]
struct PolicyCell {
    existing: Category,
    incoming: Category,
    outcome: ArbitrationOutcome,
}

fn main() -> AppResult<()> {
    let cli = Cli::parse_args();

    // Load configuration, reporting failures once logging is up
    let loaded = Config::load_from_file(&cli.config_file);
    let config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => Config::defaults_from_env(),
    };

    // Initialize logging
    let level = if cli.verbose || cli.log_level != "info" {
        cli.effective_log_level()
    } else {
        config.log_level.clone()
    };
    let _guard = if config.log.file_path.is_empty() {
        init_logging(&level)?;
        None
    } else {
        Some(init_file_logging(&level, &config.log.file_path)?)
    };

    if let Err(err) = &loaded {
        tracing::warn!(
            "Failed to load config {}: {:#}, using defaults",
            cli.config_file,
            err
        );
    }
    tracing::debug!("CLI arguments: {:?}", cli);

    match cli.command() {
        Commands::Policy { action } => match action {
            PolicyAction::Table { json } => print_table(json)?,
            PolicyAction::Lookup { existing, incoming } => {
                let outcome = lookup(existing, incoming);
                println!(
                    "{} playing, {} starting: {}",
                    existing.to_string().bold(),
                    incoming.to_string().bold(),
                    paint(outcome)
                );
            }
        },
        Commands::Config { action } => {
            Config::handle_command(&action, &cli.config_file)?;
        }
    }

    Ok(())
}

fn print_table(json: bool) -> anyhow::Result<()> {
    if json {
        let cells: Vec<PolicyCell> = Category::ALL
            .iter()
            .flat_map(|&existing| {
                Category::ALL.iter().map(move |&incoming| PolicyCell {
                    existing,
                    incoming,
                    outcome: lookup(existing, incoming),
                })
            })
            .collect();
        let output = serde_json::to_string_pretty(&cells).context("Failed to serialize policy table")?;
        println!("{}", output);
        return Ok(());
    }

    const WIDTH: usize = 16;
    print!("{:<WIDTH$}", "existing \\ new".dimmed());
    for incoming in Category::ALL {
        print!("{:<WIDTH$}", incoming.as_str().bold());
    }
    println!();

    for existing in Category::ALL {
        print!("{:<WIDTH$}", existing.as_str().bold());
        for incoming in Category::ALL {
            print!("{:<WIDTH$}", paint(lookup(existing, incoming)));
        }
        println!();
    }

    Ok(())
}

fn paint(outcome: ArbitrationOutcome) -> ColoredString {
    let label = outcome.label();
    match outcome {
        ArbitrationOutcome::None => label.dimmed(),
        ArbitrationOutcome::EvictExistingStop => label.red(),
        ArbitrationOutcome::EvictExistingPauseResume => label.yellow(),
        ArbitrationOutcome::EvictExistingDuckUnduck | ArbitrationOutcome::EvictIncomingDuckUnduck => {
            label.cyan()
        }
        ArbitrationOutcome::RejectIncoming => label.magenta().bold(),
        ArbitrationOutcome::EvictIncomingSelf => label.red().bold(),
    }
}
