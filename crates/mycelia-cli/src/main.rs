//! Mycelia CLI - compiles and drives networks from the command line.
//!
//! `mycelia check` runs the compile pipeline and renders diagnostics;
//! `mycelia run` steps a validated network for a number of cycles and
//! prints the final snapshot. The interpreter never sleeps on its own;
//! the configured cycle period is honored here, by the driver.

use clap::{Parser, Subcommand};
use mycelia_dsl::{compile, DiagnosticFormatter};
use mycelia_runtime::Interpreter;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mycelia")]
#[command(about = "Compile and run Mycelia networks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse and analyze a network, printing diagnostics
    Check {
        /// Path to a .myc source file
        file: PathBuf,
    },
    /// Compile a network and execute cycles
    Run {
        /// Path to a .myc source file
        file: PathBuf,

        /// Number of cycles to execute
        #[arg(long, default_value = "10")]
        cycles: u64,

        /// Honor the network's cycle_period_ms between steps
        #[arg(long)]
        paced: bool,

        /// Print the final snapshot as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mycelia=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Command::Check { file } => check(&file),
        Command::Run {
            file,
            cycles,
            paced,
            json,
        } => run(&file, cycles, paced, json),
    };
    std::process::exit(code);
}

fn check(file: &PathBuf) -> i32 {
    let source = match std::fs::read_to_string(file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read {}: {}", file.display(), err);
            return 2;
        }
    };
    let compilation = compile(&source, file.to_str());
    let formatter = DiagnosticFormatter::new(&compilation.sources);
    for diagnostic in &compilation.diagnostics {
        eprintln!("{}", formatter.format(diagnostic));
    }
    if compilation.has_errors() {
        eprintln!("{}: {} diagnostic(s)", file.display(), compilation.diagnostics.len());
        1
    } else {
        info!(file = %file.display(), "network is valid");
        0
    }
}

fn run(file: &PathBuf, cycles: u64, paced: bool, json: bool) -> i32 {
    let source = match std::fs::read_to_string(file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read {}: {}", file.display(), err);
            return 2;
        }
    };
    let compilation = compile(&source, file.to_str());
    let formatter = DiagnosticFormatter::new(&compilation.sources);
    for diagnostic in &compilation.diagnostics {
        eprintln!("{}", formatter.format(diagnostic));
    }
    let Some(validated) = compilation.network else {
        eprintln!("error: network did not validate, not running");
        return 1;
    };

    let period = validated.network().config.cycle_period_ms;
    let mut interpreter = Interpreter::new(validated);
    info!(cycles, "running");

    for _ in 0..cycles {
        let report = interpreter.step();
        debug!(
            cycle = report.cycle,
            delivered = report.delivered,
            emitted = report.emitted,
            dropped = report.dropped,
            "cycle"
        );
        if paced && period > 0 {
            std::thread::sleep(std::time::Duration::from_millis(period));
        }
    }

    let snapshot = interpreter.state();
    if json {
        match serde_json::to_string_pretty(&snapshot) {
            Ok(rendered) => println!("{}", rendered),
            Err(err) => {
                eprintln!("error: cannot serialize snapshot: {}", err);
                return 2;
            }
        }
    } else {
        println!("cycle {} ({} agents)", snapshot.cycle, snapshot.agents.len());
        for agent in &snapshot.agents {
            println!(
                "  {} [{}] vitality={:?} age={} inbox={} outbox={} failures={}",
                agent.id,
                agent.template,
                agent.vitality,
                agent.age,
                agent.inbox_depth,
                agent.outbox_depth,
                agent.failures
            );
        }
        for socket in &snapshot.sockets {
            println!(
                "  socket {} -> {} : {} ({} buffered)",
                socket.from, socket.to, socket.frequency, socket.buffered
            );
        }
        for body in &snapshot.bodies {
            println!(
                "  body {} (received {}, pending {})",
                body.name,
                body.inbox.len(),
                body.outbox.len()
            );
        }
    }

    for diagnostic in interpreter.drain_diagnostics() {
        eprintln!(
            "warning: cycle {}: {}{}",
            diagnostic.cycle,
            diagnostic
                .agent
                .as_deref()
                .map(|a| format!("{}: ", a))
                .unwrap_or_default(),
            diagnostic.message
        );
    }
    0
}
