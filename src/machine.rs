use std::{fmt::Display, str::FromStr};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ParseError;

/// Set of counters a button is wired to, one bit per counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Button {
    mask: u64,
}

impl Button {
    pub const MAX_COUNTERS: usize = u64::BITS as usize;

    // Indices at or beyond MAX_COUNTERS are dropped.
    pub fn from_counters<I: IntoIterator<Item = usize>>(counters: I) -> Self {
        let mask = counters
            .into_iter()
            .filter(|ind| *ind < Self::MAX_COUNTERS)
            .fold(0, |mask, ind| mask | (1u64 << ind));
        Self { mask }
    }

    pub fn mask(&self) -> u64 {
        self.mask
    }

    pub fn contains(&self, counter_ind: usize) -> bool {
        counter_ind < Self::MAX_COUNTERS && self.mask & (1u64 << counter_ind) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    pub fn counters(&self) -> impl Iterator<Item = usize> + '_ {
        (0..Self::MAX_COUNTERS).filter(|ind| self.contains(*ind))
    }
}

impl Display for Button {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counters = self
            .counters()
            .map(|ind| ind.to_string())
            .collect::<Vec<_>>();
        write!(f, "({})", counters.join(","))
    }
}

/// One machine: its indicator diagram, buttons and joltage targets.
///
/// The counter count is fixed by the diagram; buttons are addressed by their
/// position in the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    lights: Vec<bool>,
    buttons: Vec<Button>,
    targets: Vec<usize>,
}

impl Machine {
    pub fn joltage_count(&self) -> usize {
        self.targets.len()
    }

    pub fn buttons(&self) -> &[Button] {
        &self.buttons
    }

    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    pub fn lights(&self) -> &[bool] {
        &self.lights
    }

    pub fn light_mask(&self) -> u64 {
        self.lights
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .fold(0, |mask, (ind, _)| mask | (1u64 << ind))
    }

    /// Counter values after pressing each button the given number of times.
    pub fn joltages_after(&self, press_counts: &[usize]) -> Vec<usize> {
        let mut joltages = vec![0; self.joltage_count()];
        for (button, count) in self.buttons.iter().zip(press_counts) {
            for ind in button.counters() {
                joltages[ind] += count;
            }
        }

        joltages
    }
}

impl Display for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let diagram = self
            .lights
            .iter()
            .map(|on| if *on { '#' } else { '.' })
            .collect::<String>();
        write!(f, "[{}]", diagram)?;
        for button in &self.buttons {
            write!(f, " {}", button)?;
        }
        let targets = self
            .targets
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>();
        write!(f, " {{{}}}", targets.join(","))
    }
}

impl FromStr for Machine {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        static BUTTON_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\((.*)\)$").unwrap());
        static TARGETS_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\{(.*)\}$").unwrap());

        let line = s.trim();
        let Some(diagram_text) = line.strip_prefix('[') else {
            return Err(ParseError::NoDiagramStart(line.to_string()));
        };
        let Some((diagram_text, rest)) = diagram_text.split_once(']') else {
            return Err(ParseError::NoDiagramEnd(line.to_string()));
        };

        let lights = read_diagram(diagram_text);
        let counter_n = lights.len();
        if counter_n > Button::MAX_COUNTERS {
            return Err(ParseError::TooManyCounters(counter_n, line.to_string()));
        }

        let mut buttons = Vec::new();
        let mut targets = None;
        for token in rest.split_whitespace() {
            if targets.is_some() {
                return Err(ParseError::TokenAfterTargets(
                    token.to_string(),
                    line.to_string(),
                ));
            }

            if let Some(caps) = BUTTON_PATTERN.captures(token) {
                let counters = read_ints(&caps[1]).ok_or_else(|| {
                    ParseError::InvalidButtonText(token.to_string(), line.to_string())
                })?;
                if let Some(ind) = counters.iter().find(|ind| **ind >= counter_n) {
                    return Err(ParseError::ButtonIndexOutOfRange(
                        *ind,
                        counter_n,
                        line.to_string(),
                    ));
                }
                buttons.push(Button::from_counters(counters));
            } else if let Some(caps) = TARGETS_PATTERN.captures(token) {
                targets = Some(read_ints(&caps[1]).ok_or_else(|| {
                    ParseError::InvalidTargetText(token.to_string(), line.to_string())
                })?);
            } else {
                return Err(ParseError::UnexpectedToken(
                    token.to_string(),
                    line.to_string(),
                ));
            }
        }

        let Some(targets) = targets else {
            return Err(ParseError::NoTargets(line.to_string()));
        };
        if targets.len() != counter_n {
            return Err(ParseError::TargetCountMismatch(
                counter_n,
                targets.len(),
                line.to_string(),
            ));
        }

        Ok(Machine {
            lights,
            buttons,
            targets,
        })
    }
}

// A diagram is either a string of '.'/'#', or a comma-separated list of labels
// whose lights are all required off.
fn read_diagram(text: &str) -> Vec<bool> {
    if !text.is_empty() && text.chars().all(|c| c == '.' || c == '#') {
        return text.chars().map(|c| c == '#').collect();
    }

    if text.trim().is_empty() {
        Vec::new()
    } else {
        vec![false; text.split(',').count()]
    }
}

fn read_ints(text: &str) -> Option<Vec<usize>> {
    if text.trim().is_empty() {
        return Some(Vec::new());
    }

    text.split(',')
        .map(|s| s.trim().parse::<usize>().ok())
        .collect()
}
