//! Fewest button presses that bring every joltage counter to its target.
//!
//! Each press adds one to every counter the button is wired to, and a counter
//! must end exactly on its target. This is an integer program with one
//! equality per counter; two exact searches are offered for it.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
};

use clap::ValueEnum;
use log::debug;

use crate::{Machine, SolveError, DEFAULT_NODE_LIMIT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Strategy {
    /// Split presses into odd parts and a halved remainder
    #[default]
    Halving,
    /// Uniform-cost search over counter vectors
    StateSpace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveOptions {
    pub strategy: Strategy,
    pub node_limit: usize,
}

impl SolveOptions {
    pub fn new(strategy: Strategy, node_limit: usize) -> Self {
        Self {
            strategy,
            node_limit,
        }
    }
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self::new(Strategy::default(), DEFAULT_NODE_LIMIT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    press_counts: Vec<usize>,
}

impl Solution {
    pub(crate) fn new(press_counts: Vec<usize>) -> Self {
        Self { press_counts }
    }

    /// Presses of each button, indexed like `Machine::buttons`.
    pub fn press_counts(&self) -> &[usize] {
        &self.press_counts
    }

    pub fn total(&self) -> usize {
        self.press_counts.iter().sum()
    }
}

pub fn min_presses(machine: &Machine, options: &SolveOptions) -> Result<Solution, SolveError> {
    let targets = machine.targets();
    if targets.iter().all(|t| *t == 0) {
        return Ok(Solution::new(vec![0; machine.buttons().len()]));
    }

    let covered = machine
        .buttons()
        .iter()
        .fold(0u64, |mask, button| mask | button.mask());
    let uncovered = (0..targets.len()).find(|ind| targets[*ind] > 0 && covered & (1u64 << *ind) == 0);
    if let Some(ind) = uncovered {
        debug!("Counter {} of machine ({}) has no button.", ind, machine);
        return Err(SolveError::Infeasible);
    }

    match options.strategy {
        Strategy::Halving => Halving::new(machine, options.node_limit)?.solve(targets),
        Strategy::StateSpace => StateSpace::new(machine, options.node_limit).solve(targets),
    }
}

// Wired counters of the buttons that do something, with their index in the machine.
fn active_buttons(machine: &Machine) -> Vec<(usize, Vec<usize>)> {
    machine
        .buttons()
        .iter()
        .enumerate()
        .filter(|(_, button)| !button.is_empty())
        .map(|(ind, button)| (ind, button.counters().collect()))
        .collect()
}

fn parity_of(joltages: &[usize]) -> u64 {
    joltages
        .iter()
        .enumerate()
        .fold(0, |mask, (ind, j)| mask | (((*j & 1) as u64) << ind))
}

/// A set of buttons each pressed once.
#[derive(Debug, Clone)]
struct Combo {
    pressed: u64,
    size: usize,
    increments: Vec<usize>,
}

impl Combo {
    // What is left for the doubled presses, if this combo doesn't overshoot.
    fn halved_remainder(&self, targets: &[usize]) -> Option<Vec<usize>> {
        targets
            .iter()
            .zip(&self.increments)
            .map(|(t, inc)| t.checked_sub(*inc).map(|rest| rest / 2))
            .collect()
    }
}

#[derive(Debug, Clone)]
struct Presses {
    total: usize,
    counts: Vec<usize>,
}

impl Presses {
    fn zero(button_n: usize) -> Self {
        Self {
            total: 0,
            counts: vec![0; button_n],
        }
    }

    // combo + 2 * doubled
    fn combine(combo: &Combo, doubled: &Presses) -> Self {
        let counts = doubled
            .counts
            .iter()
            .enumerate()
            .map(|(ind, count)| ((combo.pressed >> ind) & 1) as usize + 2 * count)
            .collect();
        Self {
            total: combo.size + 2 * doubled.total,
            counts,
        }
    }
}

/// Any press vector `x` is `s + 2x'` where `s = x mod 2` presses a subset of
/// buttons once. The subset fixes the parity of every counter, and `x'` solves
/// the same problem for `(targets - s) / 2`. Trying every subset with the
/// right parity therefore finds the optimum.
struct Halving {
    button_inds: Vec<usize>,
    button_n: usize,
    combos_of_parity: HashMap<u64, Vec<Combo>>,
    node_limit: usize,
}

type Memo = HashMap<Vec<usize>, Option<Presses>>;

impl Halving {
    fn new(machine: &Machine, node_limit: usize) -> Result<Self, SolveError> {
        let buttons = active_buttons(machine);
        let combo_n = u32::try_from(buttons.len())
            .ok()
            .and_then(|n| 1usize.checked_shl(n))
            .filter(|n| *n <= node_limit)
            .ok_or(SolveError::ResourceExhausted(node_limit))?;

        let mut combos: Vec<Combo> = Vec::with_capacity(combo_n);
        combos.push(Combo {
            pressed: 0,
            size: 0,
            increments: vec![0; machine.joltage_count()],
        });
        for pressed in 1..combo_n as u64 {
            // Extend the combo without the lowest pressed button.
            let lowest = pressed.trailing_zeros() as usize;
            let mut combo = combos[(pressed & (pressed - 1)) as usize].clone();
            combo.pressed = pressed;
            combo.size += 1;
            for ind in &buttons[lowest].1 {
                combo.increments[*ind] += 1;
            }
            combos.push(combo);
        }

        let mut combos_of_parity: HashMap<u64, Vec<Combo>> = HashMap::new();
        for combo in combos {
            combos_of_parity
                .entry(parity_of(&combo.increments))
                .or_default()
                .push(combo);
        }
        combos_of_parity
            .values_mut()
            .for_each(|combos| combos.sort_by_key(|c| c.size));

        Ok(Self {
            button_inds: buttons.into_iter().map(|(ind, _)| ind).collect(),
            button_n: machine.buttons().len(),
            combos_of_parity,
            node_limit,
        })
    }

    fn solve(&self, targets: &[usize]) -> Result<Solution, SolveError> {
        let mut memo = Memo::new();
        let Some(presses) = self.min_presses(targets, &mut memo)? else {
            return Err(SolveError::Infeasible);
        };

        debug!(
            "Halving search finished with {} presses after {} target(s).",
            presses.total,
            memo.len()
        );
        let mut press_counts = vec![0; self.button_n];
        for (ind, count) in self.button_inds.iter().zip(presses.counts) {
            press_counts[*ind] = count;
        }

        Ok(Solution::new(press_counts))
    }

    fn min_presses(
        &self,
        targets: &[usize],
        memo: &mut Memo,
    ) -> Result<Option<Presses>, SolveError> {
        if targets.iter().all(|t| *t == 0) {
            return Ok(Some(Presses::zero(self.button_inds.len())));
        }
        if let Some(known) = memo.get(targets) {
            return Ok(known.clone());
        }
        if memo.len() >= self.node_limit {
            return Err(SolveError::ResourceExhausted(self.node_limit));
        }

        let mut best: Option<Presses> = None;
        let combos = self
            .combos_of_parity
            .get(&parity_of(targets))
            .map(|combos| combos.as_slice())
            .unwrap_or_default();
        for combo in combos {
            // Sorted by size, so nothing further can beat the best.
            if best.as_ref().is_some_and(|b| combo.size >= b.total) {
                break;
            }
            let Some(remainder) = combo.halved_remainder(targets) else {
                continue;
            };
            if let Some(doubled) = self.min_presses(&remainder, memo)? {
                let presses = Presses::combine(combo, &doubled);
                if best.as_ref().map_or(true, |b| presses.total < b.total) {
                    best = Some(presses);
                }
            }
        }

        memo.insert(targets.to_vec(), best.clone());
        Ok(best)
    }
}

#[derive(Debug, Clone)]
struct State {
    joltages: Vec<usize>,
    presses: usize,
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.presses.cmp(&other.presses)
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.presses == other.presses
    }
}

impl Eq for State {}

/// Uniform-cost search from all-zero counters to the targets. A press costs 1
/// and no counter may ever pass its target.
struct StateSpace {
    buttons: Vec<(usize, Vec<usize>)>,
    button_n: usize,
    node_limit: usize,
}

impl StateSpace {
    fn new(machine: &Machine, node_limit: usize) -> Self {
        Self {
            buttons: active_buttons(machine),
            button_n: machine.buttons().len(),
            node_limit,
        }
    }

    fn solve(&self, targets: &[usize]) -> Result<Solution, SolveError> {
        let start = vec![0; targets.len()];
        // Joltages -> the joltages and button it was first reached from.
        let mut src_of_joltages: HashMap<Vec<usize>, Option<(Vec<usize>, usize)>> =
            HashMap::from([(start.clone(), None)]);
        let mut possible_states = BinaryHeap::from([Reverse(State {
            joltages: start,
            presses: 0,
        })]);
        while let Some(Reverse(cur_state)) = possible_states.pop() {
            if cur_state.joltages == targets {
                debug!(
                    "State space search finished with {} presses after {} state(s).",
                    cur_state.presses,
                    src_of_joltages.len()
                );
                return Ok(self.press_counts_to(cur_state.joltages, &src_of_joltages));
            }

            for (button_ind, counters) in &self.buttons {
                let mut next_joltages = cur_state.joltages.clone();
                let mut overshoot = false;
                for ind in counters {
                    next_joltages[*ind] += 1;
                    overshoot |= next_joltages[*ind] > targets[*ind];
                }
                // Every press costs the same, so the first visit is the cheapest one.
                if overshoot || src_of_joltages.contains_key(&next_joltages) {
                    continue;
                }
                if src_of_joltages.len() >= self.node_limit {
                    return Err(SolveError::ResourceExhausted(self.node_limit));
                }

                src_of_joltages.insert(
                    next_joltages.clone(),
                    Some((cur_state.joltages.clone(), *button_ind)),
                );
                possible_states.push(Reverse(State {
                    joltages: next_joltages,
                    presses: cur_state.presses + 1,
                }));
            }
        }

        Err(SolveError::Infeasible)
    }

    fn press_counts_to(
        &self,
        joltages: Vec<usize>,
        src_of_joltages: &HashMap<Vec<usize>, Option<(Vec<usize>, usize)>>,
    ) -> Solution {
        let mut press_counts = vec![0; self.button_n];
        let mut cur = joltages;
        while let Some(Some((src, button_ind))) = src_of_joltages.get(&cur) {
            press_counts[*button_ind] += 1;
            cur = src.clone();
        }

        Solution::new(press_counts)
    }
}
