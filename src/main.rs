use gatesim::*;
use gatesim::circuits::*;

mod repl;
use repl::*;

use clap::{Parser, ValueEnum};
use log::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Which built-in circuit to simulate.
    #[arg(value_enum)]
    scenario: Scenario,

    /// Drive a carrier before settling, e.g. `--set a=1`. May be repeated.
    #[arg(long = "set", value_name = "NAME=0|1")]
    stimuli: Vec<Stimulus>,

    /// Delay of every gate, in timepoints.
    #[arg(long, default_value_t = 1)]
    delay: Timepoint,

    /// Give up settling after this many actions.
    #[arg(long, default_value_t = 1_000_000)]
    max_steps: usize,

    /// Print the settled state as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Start an interactive session after settling.
    #[arg(long, default_value_t = false)]
    repl: bool,

    #[arg(short, long, default_value_t = false)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    HalfAdder,
    FullAdder,
    Parity,
    Adder4,
    Ring,
}

impl Scenario {
    fn build(self, config: SimConfig) -> Result<Sim, SimError> {
        match self {
            Scenario::HalfAdder => half_adder_netlist()?.elaborate(config),
            Scenario::Parity => xor_cascade(3)?.elaborate(config),
            Scenario::Ring => ring_oscillator(3)?.elaborate(config),
            Scenario::FullAdder => {
                let mut sim = Sim::new(config);
                let a = sim.add_carrier("a")?;
                let b = sim.add_carrier("b")?;
                let c_in = sim.add_carrier("c_in")?;
                let sum = sim.add_carrier("sum")?;
                let c_out = sim.add_carrier("c_out")?;
                full_adder(&mut sim, a, b, c_in, sum, c_out, "fa")?;
                Ok(sim)
            },
            Scenario::Adder4 => {
                let mut sim = Sim::new(config);
                let a = bus(&mut sim, "a", 4)?;
                let b = bus(&mut sim, "b", 4)?;
                let sum = bus(&mut sim, "sum", 4)?;
                let c_out = sim.add_carrier("c_out")?;
                ripple_carry_adder(&mut sim, &a, &b, &sum, c_out, "add")?;
                Ok(sim)
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Stimulus {
    name: String,
    value: Bit,
}

impl std::str::FromStr for Stimulus {
    type Err = String;

    fn from_str(s: &str) -> Result<Stimulus, String> {
        let (name, value) = s.split_once('=').ok_or_else(|| format!("expected NAME=0|1, got {s:?}"))?;
        let value = parse_bit(value).ok_or_else(|| format!("expected 0 or 1 for {name}, got {value:?}"))?;
        Ok(Stimulus { name: name.to_string(), value })
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.debug)?;

    let config = SimConfig::default()
        .with_default_delay(args.delay)
        .with_max_steps(Some(args.max_steps));
    let mut sim = args.scenario.build(config)?;
    info!("built {:?}: {} carriers, {} gates", args.scenario, sim.carriers().len(), sim.gates().len());

    let (report, skipped) = run_with_stimuli(&mut sim, &args.stimuli)?;

    if args.json {
        let output = serde_json::json!({
            "scenario": format!("{:?}", args.scenario),
            "time": sim.now(),
            "settled": report.is_some(),
            "steps": report.map(|report| report.steps),
            "pending": sim.pending(),
            "skipped_stimuli": skipped,
            "values": sim.values(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        if report.is_none() {
            println!("Did not settle by T={} ({} actions pending)", sim.now(), sim.pending());
        }
        if skipped > 0 {
            println!("Skipped {skipped} --set stimuli");
        }
        print!("{sim:?}");
    }

    if args.repl {
        let mut repl = Repl::new(sim)?;
        repl.run()?;
    }
    Ok(())
}

/// Settle, apply `stimuli`, then settle again. Returns the final report, if
/// the circuit settled, and the number of stimuli skipped because the
/// initial settle did not finish.
fn run_with_stimuli(sim: &mut Sim, stimuli: &[Stimulus]) -> anyhow::Result<(Option<SettleReport>, usize)> {
    if run(sim)?.is_none() {
        if !stimuli.is_empty() {
            warn!("skipping {} --set stimuli: the circuit did not settle before they could be applied", stimuli.len());
        }
        return Ok((None, stimuli.len()));
    }
    for Stimulus { name, value } in stimuli {
        sim.poke(name, *value)?;
    }
    Ok((run(sim)?, 0))
}

/// Settle the circuit. A circuit that runs out of budget is reported, not fatal.
fn run(sim: &mut Sim) -> anyhow::Result<Option<SettleReport>> {
    match sim.settle() {
        Ok(report) => Ok(Some(report)),
        Err(e @ SimError::DidNotSettle { .. }) => {
            warn!("{e}");
            Ok(None)
        },
        Err(e) => Err(e.into()),
    }
}

fn init_logging(debug: bool) -> anyhow::Result<()> {
    use chrono::{DateTime, Utc};

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            let now: DateTime<Utc> = Utc::now();
            out.finish(format_args!(
                "[{} {} {}] {}",
                now.format("%Y-%m-%dT%H:%M:%S%.fZ"),
                record.level(),
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr());

    let level = std::env::var("LEVEL").unwrap_or_default();

    if level == "TRACE" {
        dispatch = dispatch.level(log::LevelFilter::Trace);
    } else if debug || level == "DEBUG" {
        dispatch = dispatch.level(log::LevelFilter::Debug);
    } else {
        dispatch = dispatch.level(log::LevelFilter::Info);
    }

    dispatch.apply()?;
    Ok(())
}
