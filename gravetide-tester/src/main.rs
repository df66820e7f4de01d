mod logic;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use logic::reports::{write_console_report, write_json_report};
use logic::{SoakTester, TestScenario, get_scenario, list_scenarios};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Console,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "gravetide-tester", version)]
#[command(about = "Headless soak and invariant testing for the Gravetide simulation engine")]
struct Args {
    /// Scenarios to run (comma-separated, or `all`)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Iterations per scenario and seed
    #[arg(long, default_value_t = 3)]
    iterations: usize,

    /// Override the number of turns each scenario plays
    #[arg(long)]
    turns: Option<u32>,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.list_scenarios {
        let mut target = OutputTarget::new(args.output.clone())?;
        writeln!(target.writer(), "Available scenarios:")?;
        for (key, description) in list_scenarios() {
            writeln!(target.writer(), "  {key:15} - {description}")?;
        }
        target.flush_inner()?;
        return Ok(());
    }

    if args.report == ReportFormat::Console {
        println!("{}", "🧟 Gravetide Soak Tester".bright_cyan().bold());
        println!("{}", "========================".cyan());
    }

    let start = Instant::now();
    let scenarios = resolve_scenarios(&args)?;
    let seeds = parse_seeds(&args.seeds)?;
    let tester = SoakTester::new(args.verbose);
    let results: Vec<_> = scenarios
        .iter()
        .flat_map(|scenario| tester.run_scenario(scenario, &seeds, args.iterations))
        .collect();

    let mut target = OutputTarget::new(args.output.clone())?;
    match args.report {
        ReportFormat::Console => write_console_report(target.writer(), &results, start.elapsed())?,
        ReportFormat::Json => write_json_report(target.writer(), &results)?,
    }
    target.flush_inner().context("flushing the report")?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }
    Ok(())
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn resolve_scenarios(args: &Args) -> Result<Vec<TestScenario>> {
    let mut keys = split_csv(&args.scenarios);
    if keys.iter().any(|k| k == "all") {
        keys = list_scenarios().into_iter().map(|(k, _)| k.to_string()).collect();
    }
    keys.iter()
        .map(|key| {
            let mut scenario =
                get_scenario(key).with_context(|| format!("unknown scenario '{key}'"))?;
            if let Some(turns) = args.turns {
                scenario.plan.turns = turns;
            }
            Ok(scenario)
        })
        .collect()
}

fn parse_seeds(arg: &str) -> Result<Vec<u64>> {
    let seeds = split_csv(arg)
        .iter()
        .map(|token| {
            token
                .parse::<u64>()
                .with_context(|| format!("invalid seed '{token}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    if seeds.is_empty() {
        bail!("no seeds given");
    }
    Ok(seeds)
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}
