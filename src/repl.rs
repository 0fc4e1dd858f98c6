use super::*;

use rustyline::error::ReadlineError;

const HELP: &str = "\
set NAME 0|1 [after N]   drive a carrier now, or N timepoints from now
peek NAME                print a carrier's value
step                     run a single pending action
run                      run until the circuit settles
show                     print every carrier
reset                    start over from the initial state
help                     print this message
quit                     leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set(String, Bit, Option<Timepoint>),
    Peek(String),
    Step,
    Run,
    Show,
    Reset,
    Help,
    Quit,
}

pub fn parse_bit(s: &str) -> Option<Bit> {
    match s {
        "0" | "false" => Some(false),
        "1" | "true" => Some(true),
        _ => None,
    }
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let command = match words.as_slice() {
        ["set", name, value] => Command::Set(name.to_string(), bit(value)?, None),
        ["set", name, value, "after", delay] => {
            let delay = delay.parse().map_err(|_| format!("Not a delay: {delay}"))?;
            Command::Set(name.to_string(), bit(value)?, Some(delay))
        },
        ["peek", name] => Command::Peek(name.to_string()),
        ["step"] => Command::Step,
        ["run"] => Command::Run,
        ["show"] => Command::Show,
        ["reset"] => Command::Reset,
        ["help"] => Command::Help,
        ["quit"] | ["exit"] => Command::Quit,
        [] => return Err("Empty command".to_string()),
        [word, ..] => return Err(format!("Unknown command or wrong arguments: {word} (try help)")),
    };
    Ok(command)
}

fn bit(value: &str) -> Result<Bit, String> {
    parse_bit(value).ok_or_else(|| format!("Not a bit: {value}"))
}

pub struct Repl {
    sim: Sim,
    readline: rustyline::DefaultEditor,
}

impl Repl {
    pub fn new(sim: Sim) -> anyhow::Result<Repl> {
        let readline = rustyline::DefaultEditor::new()?;
        Ok(Repl { sim, readline })
    }

    /// The next non-empty line, or `None` at end of input.
    fn readline(&mut self) -> anyhow::Result<Option<String>> {
        loop {
            let result = self.readline.readline(&format!("T={}> ", self.sim.now()));
            match result {
                Ok(line) if line.trim().is_empty() => (),
                Ok(line) => {
                    self.readline.add_history_entry(line.as_str())?;
                    return Ok(Some(line));
                },
                Err(ReadlineError::Eof) => return Ok(None),
                Err(ReadlineError::Interrupted) => (),
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        while let Some(line) = self.readline()? {
            match parse_command(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => {
                    if let Err(e) = self.exec(command) {
                        eprintln!("{e}");
                    }
                },
                Err(err) => eprintln!("{err}"),
            }
        }
        Ok(())
    }

    fn exec(&mut self, command: Command) -> Result<(), SimError> {
        match command {
            Command::Set(name, value, None) => self.sim.poke(&name, value)?,
            Command::Set(name, value, Some(delay)) => {
                let carrier_id = self.sim.carrier(&name)?;
                let time = self.sim.schedule_signal(carrier_id, value, delay)?;
                println!("{name} <= {} at T={time}", value as u8);
            },
            Command::Peek(name) => println!("{name} = {}", self.sim.peek(&name)? as u8),
            Command::Step => match self.sim.step()? {
                Some(time) => println!("T={time} ({} pending)", self.sim.pending()),
                None => println!("Nothing pending"),
            },
            Command::Run => {
                let report = self.sim.settle()?;
                println!(
                    "Settled at T={} after {} actions ({} stale)",
                    report.settled_at,
                    report.steps,
                    report.stale,
                );
            },
            Command::Show => print!("{:?}", self.sim),
            Command::Reset => self.sim.reset()?,
            Command::Help => println!("{HELP}"),
            Command::Quit => (),
        }
        Ok(())
    }
}
