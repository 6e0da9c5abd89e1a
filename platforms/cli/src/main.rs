use clap::{Args, Parser, Subcommand, ValueEnum};
use mtur::{
    analyze, encode_json, encode_text, parse_cases, run_batch, CaseReport, DescriptionLoader,
    MachineCatalog, MachineDescription, MachineError, Outcome, RunConfig, RunResult, Step,
    TuringMachine,
};
use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

const EXIT_ACCEPTED: u8 = 0;
const EXIT_REJECTED: u8 = 1;
const EXIT_STEP_LIMIT: u8 = 2;
const EXIT_ERROR: u8 = 3;

#[derive(Parser, Debug)]
#[command(name = "mtur", author, version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    /// Log level used when RUST_LOG is not set (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

/// Where the machine description comes from.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct MachineSource {
    /// A machine description file (.json or .tm)
    #[arg(short, long)]
    machine: Option<PathBuf>,

    /// The name of a built-in machine (see `mtur list`)
    #[arg(short, long)]
    builtin: Option<String>,
}

#[derive(Args, Debug)]
struct RunOptions {
    /// A JSON run configuration ({"maxSteps": ..., "trace": ...})
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum number of transitions before giving up
    #[arg(long)]
    max_steps: Option<usize>,

    /// Log sampled steps at info level
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a machine on one set of tapes
    Run {
        #[command(flatten)]
        source: MachineSource,

        /// Initial tape contents, one per tape, in tape order
        #[arg(short, long = "tape")]
        tapes: Vec<String>,

        #[command(flatten)]
        options: RunOptions,

        /// Print each step of the execution
        #[arg(short, long)]
        debug: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a machine on every case of a case file
    Batch {
        #[command(flatten)]
        source: MachineSource,

        /// The case file; read from stdin when omitted
        #[arg(short, long)]
        cases: Option<PathBuf>,

        /// The tape compared with each case's expected output
        #[arg(long, default_value_t = 0)]
        output_tape: usize,

        #[command(flatten)]
        options: RunOptions,

        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load a machine and report suspicious transitions
    Check {
        #[command(flatten)]
        source: MachineSource,
    },
    /// Print a machine in another format
    Convert {
        #[command(flatten)]
        source: MachineSource,

        /// The format to write
        #[arg(long, value_enum)]
        to: OutputFormat,
    },
    /// List the built-in machines
    List,
}

impl Command {
    /// Whether the command asked for the sampled step log.
    fn trace_requested(&self) -> bool {
        match self {
            Command::Run { options, .. } | Command::Batch { options, .. } => options.trace,
            _ => false,
        }
    }
}

/// Builds the filter directives used when RUST_LOG is not set.
///
/// `--trace` logs at info level, so the crate is raised to info unless the level already shows it.
fn filter_directives(log_level: &str, trace: bool) -> String {
    let shows_info = log_level
        .parse::<LevelFilter>()
        .map(|level| level >= LevelFilter::INFO)
        .unwrap_or(false);

    if trace && !shows_info {
        format!("{},mtur=info", log_level)
    } else {
        log_level.to_string()
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(filter_directives(
            &cli.log_level,
            cli.command.trace_requested(),
        ))
    });
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    match execute(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn execute(command: Command) -> Result<ExitCode, Box<dyn Error>> {
    match command {
        Command::Run {
            source,
            tapes,
            options,
            debug,
            json,
        } => {
            let description = load_description(&source)?;
            let config = run_config(&options)?;
            run_machine(&description, &tapes, &config, debug, json)
        }
        Command::Batch {
            source,
            cases,
            output_tape,
            options,
            json,
        } => {
            let description = load_description(&source)?;
            let config = run_config(&options)?;
            let text = read_cases(cases.as_ref())?;
            run_cases(&description, &text, output_tape, &config, json)
        }
        Command::Check { source } => {
            let description = load_description(&source)?;
            let findings = analyze(&description);

            println!(
                "{}: {} states, {} transitions, {} tapes",
                display_name(&description),
                description.states().len(),
                description.transition_count(),
                description.tape_count()
            );
            for finding in &findings {
                println!("warning: {}", finding);
            }
            if findings.is_empty() {
                println!("no findings");
            }
            Ok(ExitCode::from(EXIT_ACCEPTED))
        }
        Command::Convert { source, to } => {
            let description = load_description(&source)?;
            match to {
                OutputFormat::Json => println!("{}", encode_json(&description)?),
                OutputFormat::Text => print!("{}", encode_text(&description)),
            }
            Ok(ExitCode::from(EXIT_ACCEPTED))
        }
        Command::List => {
            for index in 0..MachineCatalog::count() {
                if let Some(info) = MachineCatalog::info(index) {
                    println!(
                        "{}: {} ({} tapes, {} states, {} transitions), sample input: {}",
                        info.index,
                        info.name,
                        info.tape_count,
                        info.state_count,
                        info.transition_count,
                        info.sample_input.join(" | ")
                    );
                }
            }
            Ok(ExitCode::from(EXIT_ACCEPTED))
        }
    }
}

fn load_description(source: &MachineSource) -> Result<MachineDescription, Box<dyn Error>> {
    match (&source.machine, &source.builtin) {
        (Some(path), _) => Ok(DescriptionLoader::load(path)?),
        (None, Some(name)) => MachineCatalog::by_name(name)
            .cloned()
            .ok_or_else(|| format!("Built-in machine '{}' not found", name).into()),
        (None, None) => Err("Either --machine or --builtin is required".into()),
    }
}

/// Builds the run configuration: defaults, then the config file, then command-line flags.
fn run_config(options: &RunOptions) -> Result<RunConfig, Box<dyn Error>> {
    let mut config = match &options.config {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|e| {
                MachineError::FileError(format!("Failed to read file {}: {}", path.display(), e))
            })?;
            RunConfig::from_json(&content)?
        }
        None => RunConfig::default(),
    };

    if let Some(max_steps) = options.max_steps {
        config.max_steps = max_steps;
    }
    if options.trace {
        config.trace = true;
    }

    Ok(config)
}

fn read_cases(path: Option<&PathBuf>) -> Result<String, Box<dyn Error>> {
    match path {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| format!("Failed to read file '{}': {}", path.display(), e).into()),
        None if atty::isnt(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| format!("Failed to read from stdin: {}", e))?;
            Ok(buffer)
        }
        None => Err("No cases given: pass --cases or pipe a case file to stdin".into()),
    }
}

fn run_machine(
    description: &MachineDescription,
    tapes: &[String],
    config: &RunConfig,
    debug: bool,
    json: bool,
) -> Result<ExitCode, Box<dyn Error>> {
    let mut machine = TuringMachine::new(description, tapes)?;

    if debug {
        print_state(&machine);
        while machine.step_count() < config.max_steps {
            match machine.step() {
                Step::Continue => print_state(&machine),
                Step::Halt(_) => break,
            }
        }
    }

    // After a debug walk this only settles the outcome; no further transitions are applied.
    let result = machine.run(config);
    let tapes = machine.tape_contents();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "result": result,
                "tapes": tapes,
            }))?
        );
    } else {
        if debug {
            println!("\nFinal tapes:");
        }
        println!("{}", tapes.join("\n"));
        eprintln!("{}", summary(&result));
    }

    Ok(ExitCode::from(exit_code(result.outcome)))
}

fn run_cases(
    description: &MachineDescription,
    text: &str,
    output_tape: usize,
    config: &RunConfig,
    json: bool,
) -> Result<ExitCode, Box<dyn Error>> {
    let cases = parse_cases(text);
    let reports = run_batch(description, &cases, config);

    let mut code = EXIT_ACCEPTED;
    let mut rows = Vec::with_capacity(reports.len());

    for (index, (case, report)) in cases.iter().zip(&reports).enumerate() {
        match report {
            Ok(report) => {
                let check = report.check(case, output_tape);
                code = code.max(exit_code(report.result.outcome));
                if check == Some(false) {
                    code = code.max(EXIT_REJECTED);
                }

                if json {
                    rows.push(serde_json::json!({
                        "case": index + 1,
                        "result": report.result,
                        "tapes": report.tapes,
                        "passed": check,
                    }));
                } else {
                    println!("{}", case_line(index, report, check, output_tape));
                }
            }
            Err(e) => {
                code = EXIT_ERROR;
                if json {
                    rows.push(serde_json::json!({
                        "case": index + 1,
                        "error": e.to_string(),
                    }));
                } else {
                    println!("case {}: error: {}", index + 1, e);
                }
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    }

    Ok(ExitCode::from(code))
}

fn case_line(index: usize, report: &CaseReport, check: Option<bool>, output_tape: usize) -> String {
    let verdict = match check {
        Some(true) => " [pass]",
        Some(false) => " [FAIL]",
        None => "",
    };

    format!(
        "case {}: {} after {} steps, output: {}{}",
        index + 1,
        report.result.outcome,
        report.result.steps,
        report.output(output_tape).unwrap_or(""),
        verdict
    )
}

fn print_state(machine: &TuringMachine) {
    println!(
        "Step: {}, State: {}, Tapes: [{}], Heads: {:?}",
        machine.step_count(),
        machine.state(),
        machine.tape_contents().join(", "),
        machine.heads()
    );
}

fn summary(result: &RunResult) -> String {
    format!(
        "{} in state '{}' after {} steps",
        result.outcome, result.state, result.steps
    )
}

fn display_name(description: &MachineDescription) -> &str {
    if description.name().is_empty() {
        "(unnamed machine)"
    } else {
        description.name()
    }
}

fn exit_code(outcome: Outcome) -> u8 {
    match outcome {
        Outcome::Accepted => EXIT_ACCEPTED,
        Outcome::Rejected => EXIT_REJECTED,
        Outcome::StepLimitExceeded => EXIT_STEP_LIMIT,
    }
}
