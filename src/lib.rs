use std::{
    error,
    fmt::Display,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};

pub mod joltage;
pub mod lights;
pub mod machine;

pub use joltage::{SolveOptions, Solution, Strategy};
pub use lights::LightSolution;
pub use machine::{Button, Machine};

pub const DEFAULT_NODE_LIMIT: usize = 1_000_000;

/// Structural failures while decoding a machine line. Every variant carries the
/// offending line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    NoDiagramStart(String),
    NoDiagramEnd(String),
    TooManyCounters(usize, String),
    InvalidButtonText(String, String),
    ButtonIndexOutOfRange(usize, usize, String),
    InvalidTargetText(String, String),
    UnexpectedToken(String, String),
    NoTargets(String),
    TokenAfterTargets(String, String),
    TargetCountMismatch(usize, usize, String),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::NoDiagramStart(line) => {
                write!(f, "Expect a line starting with '[', given \"{}\".", line)
            }
            ParseError::NoDiagramEnd(line) => {
                write!(f, "Can't find the closing ']' of diagram in \"{}\".", line)
            }
            ParseError::TooManyCounters(n, line) => write!(
                f,
                "Too many counters({}) in \"{}\", at most {} are supported.",
                n,
                line,
                Button::MAX_COUNTERS
            ),
            ParseError::InvalidButtonText(s, line) => {
                write!(f, "Invalid text({}) for button in \"{}\".", s, line)
            }
            ParseError::ButtonIndexOutOfRange(ind, counter_n, line) => write!(
                f,
                "Button index({}) is out of range, expect less than {}, in \"{}\".",
                ind, counter_n, line
            ),
            ParseError::InvalidTargetText(s, line) => {
                write!(f, "Invalid text({}) for targets in \"{}\".", s, line)
            }
            ParseError::UnexpectedToken(s, line) => write!(
                f,
                "Unexpected token({}) in \"{}\", expect a button or targets.",
                s, line
            ),
            ParseError::NoTargets(line) => write!(f, "No targets found in \"{}\".", line),
            ParseError::TokenAfterTargets(s, line) => write!(
                f,
                "Expect targets to be the last token, found {} after them in \"{}\".",
                s, line
            ),
            ParseError::TargetCountMismatch(expect_n, given_n, line) => write!(
                f,
                "Expect {} target(s), given {} in \"{}\".",
                expect_n, given_n, line
            ),
        }
    }
}

impl error::Error for ParseError {}

/// Outcomes of a well-formed machine that has no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveError {
    Infeasible,
    ResourceExhausted(usize),
}

impl Display for SolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveError::Infeasible => write!(f, "No button presses can reach the targets."),
            SolveError::ResourceExhausted(limit) => {
                write!(f, "Search gave up after reaching the node limit({}).", limit)
            }
        }
    }
}

impl error::Error for SolveError {}

#[derive(Debug, Parser)]
pub struct CLIArgs {
    pub input_path: PathBuf,
    /// How to search for the fewest joltage presses
    #[arg(long, value_enum, default_value_t = Strategy::Halving)]
    pub strategy: Strategy,
    /// Upper bound of states (or subsets) a single machine may explore
    #[arg(long, default_value_t = DEFAULT_NODE_LIMIT)]
    pub node_limit: usize,
    /// Skip machines without an answer instead of failing
    #[arg(long)]
    pub skip_failed: bool,
    /// Number of worker threads
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

impl CLIArgs {
    pub fn solve_options(&self) -> SolveOptions {
        SolveOptions::new(self.strategy, self.node_limit)
    }
}

pub fn init_thread_pool(jobs: Option<usize>) -> Result<()> {
    if let Some(jobs) = jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .with_context(|| format!("Failed to build thread pool with {} thread(s).", jobs))?;
    }

    Ok(())
}

pub fn read_machines<P: AsRef<Path>>(path: P) -> Result<Vec<Machine>> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open given file({}).", path.as_ref().display()))?;
    let reader = BufReader::new(file);
    let mut machines = Vec::new();
    for (ind, line) in reader.lines().enumerate() {
        let line = line.with_context(|| {
            format!(
                "Failed to read line {} of given file({}).",
                ind + 1,
                path.as_ref().display()
            )
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let machine = line.parse::<Machine>().with_context(|| {
            format!(
                "Failed to parse machine at line {} of given file({}).",
                ind + 1,
                path.as_ref().display()
            )
        })?;
        machines.push(machine);
    }

    Ok(machines)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub sum: usize,
    pub solved: usize,
    pub skipped: usize,
}

/// Solves every machine in parallel and adds up their press counts.
///
/// Without `skip_failed`, the first failing machine (in input order) aborts the
/// whole batch.
pub fn sum_min_presses<F>(machines: &[Machine], solve: F, skip_failed: bool) -> Result<BatchReport>
where
    F: Fn(&Machine) -> Result<usize, SolveError> + Sync,
{
    let results = machines
        .par_iter()
        .enumerate()
        .map(|(ind, machine)| {
            let res = solve(machine);
            debug!("Machine #{} ({}) solved with {:?}.", ind + 1, machine, res);
            res
        })
        .collect::<Vec<_>>();

    let mut report = BatchReport {
        sum: 0,
        solved: 0,
        skipped: 0,
    };
    for (ind, res) in results.into_iter().enumerate() {
        match res {
            Ok(presses) => {
                report.sum += presses;
                report.solved += 1;
            }
            Err(e) if skip_failed => {
                warn!("Skip machine #{} ({}): {}", ind + 1, machines[ind], e);
                report.skipped += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to configure machine #{} ({}).", ind + 1, machines[ind])
                })
            }
        }
    }
    info!(
        "Solved {} machine(s), skipped {}, total presses {}.",
        report.solved, report.skipped, report.sum
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machines(lines: &[&str]) -> Vec<Machine> {
        lines.iter().map(|l| l.parse().unwrap()).collect()
    }

    #[test]
    fn sum_adds_up_every_machine() {
        let machines = machines(&["[.] (0) {5}", "[..] (0) (0,1) {3,2}", "[...] {0,0,0}"]);
        let options = SolveOptions::default();
        let report = sum_min_presses(
            &machines,
            |m| joltage::min_presses(m, &options).map(|s| s.total()),
            false,
        )
        .unwrap();

        assert_eq!(
            report,
            BatchReport {
                sum: 8,
                solved: 3,
                skipped: 0
            }
        );
    }

    #[test]
    fn failed_machine_aborts_batch() {
        let machines = machines(&["[.] (0) {5}", "[.] {4}"]);
        let options = SolveOptions::default();
        let err = sum_min_presses(
            &machines,
            |m| joltage::min_presses(m, &options).map(|s| s.total()),
            false,
        )
        .unwrap_err();

        assert!(err.to_string().contains("machine #2"));
        assert_eq!(
            err.downcast_ref::<SolveError>(),
            Some(&SolveError::Infeasible)
        );
    }

    #[test]
    fn failed_machine_is_skipped_on_request() {
        let machines = machines(&["[.] (0) {5}", "[.] {4}", "[..] (0) (0,1) {3,2}"]);
        let options = SolveOptions::default();
        let report = sum_min_presses(
            &machines,
            |m| joltage::min_presses(m, &options).map(|s| s.total()),
            true,
        )
        .unwrap();

        assert_eq!(
            report,
            BatchReport {
                sum: 8,
                solved: 2,
                skipped: 1
            }
        );
    }
}
