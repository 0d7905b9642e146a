use anyhow::{Context, Result};
use clap::Parser;
use ntm::{
    Driver, OutputFormat, Program, ProgramLoader, ProgramManager, SimulationOptions, Summary,
    TuringMachine,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(after_help = "EXAMPLES:
  ntm-cli < session.txt
  ntm-cli machines/anbn.ntm --input aabb --input aab
  printf 'ab\\nba\\n' | ntm-cli --builtin ends-with-ab")]
struct Cli {
    /// Machine definition file. Without it (and without --builtin) the definition
    /// and the input strings are both read from stdin.
    program: Option<PathBuf>,

    /// Use one of the bundled machines
    #[clap(short, long, conflicts_with = "program")]
    builtin: Option<String>,

    /// List the bundled machines and exit
    #[clap(long)]
    list: bool,

    /// Input string to decide; may be repeated. Defaults to one per stdin line.
    #[clap(short, long)]
    input: Vec<String>,

    /// Override the step budget of the definition
    #[clap(short = 'm', long)]
    max_steps: Option<usize>,

    /// Copy the tape on every move instead of sharing it across deterministic moves
    #[clap(long)]
    no_share: bool,

    /// Print one JSON report per input instead of verdict characters
    #[clap(long)]
    json: bool,

    /// Print the transition table to stderr before running
    #[clap(long)]
    show_table: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[clap(short = 'd', long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if cli.list {
        for info in ProgramManager::list_program_info() {
            println!(
                "{:<14} states: {:<3} outcomes: {:<3} budget: {}",
                info.name, info.state_count, info.outcome_count, info.step_budget
            );
        }
        return Ok(());
    }

    let stdin = io::stdin();
    let mut stdin = stdin.lock();
    let program = load_program(&cli, &mut stdin)?;

    let mut machine = TuringMachine::new(program).with_options(SimulationOptions {
        share_tapes: !cli.no_share,
    });
    if let Some(max_steps) = cli.max_steps {
        machine.set_step_budget(max_steps);
    }

    if cli.show_table {
        eprint!("{}", machine.program().table);
    }

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Verdict
    };
    let driver = Driver::new(&machine).with_format(format);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = if cli.input.is_empty() {
        driver.run(&mut stdin, &mut out)
    } else {
        driver.run_inputs(&cli.input, &mut out)
    };
    let summary = result.context("simulation failed")?;
    out.flush()?;

    report(&summary);
    Ok(())
}

/// Picks the definition source: a bundled machine, a file, or the front of stdin.
fn load_program<R: BufRead>(cli: &Cli, stdin: &mut R) -> Result<Program> {
    if let Some(name) = &cli.builtin {
        return Ok(ProgramManager::get_program_by_name(name)?);
    }

    match &cli.program {
        Some(path) => ProgramLoader::load_program(path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => ProgramLoader::load_from_reader(stdin)
            .context("failed to read definition from stdin"),
    }
}

fn report(summary: &Summary) {
    info!(
        total = summary.total(),
        accepted = summary.accepted,
        rejected = summary.rejected,
        undetermined = summary.undetermined,
        "run complete"
    );
}

/// Logs go to stderr so stdout carries only verdicts.
fn init_logging(debug: bool) {
    let default = if debug { "ntm=debug,ntm_cli=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
