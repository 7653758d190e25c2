use std::collections::{HashMap, VecDeque};

use log::debug;

use crate::{Machine, SolveError};

/// Buttons pressed (once each) to light up a machine's diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightSolution {
    pressed: Vec<usize>,
}

impl LightSolution {
    pub fn pressed(&self) -> &[usize] {
        &self.pressed
    }

    pub fn total(&self) -> usize {
        self.pressed.len()
    }

    /// Lights left on after pressing on `machine`. Presses of buttons it doesn't
    /// have are ignored.
    pub fn light_mask(&self, machine: &Machine) -> u64 {
        self.pressed
            .iter()
            .filter_map(|ind| machine.buttons().get(*ind))
            .fold(0, |mask, button| mask ^ button.mask())
    }
}

/// Breadth first search over light patterns, starting with every light off.
///
/// Pressing a button twice undoes it, so the first time the diagram shows up
/// each button in its path is pressed at most once.
pub fn min_presses(machine: &Machine, node_limit: usize) -> Result<LightSolution, SolveError> {
    let goal = machine.light_mask();
    // Pattern -> the pattern and button it was first reached from.
    let mut src_of_pattern: HashMap<u64, Option<(u64, usize)>> = HashMap::from([(0, None)]);
    let mut search_patterns = VecDeque::from([0u64]);
    while let Some(cur_pattern) = search_patterns.pop_front() {
        if cur_pattern == goal {
            let mut pressed = Vec::new();
            let mut cur = cur_pattern;
            while let Some(Some((src, button_ind))) = src_of_pattern.get(&cur) {
                pressed.push(*button_ind);
                cur = *src;
            }
            pressed.sort_unstable();
            debug!(
                "Lit machine ({}) with {} presses after {} pattern(s).",
                machine,
                pressed.len(),
                src_of_pattern.len()
            );

            return Ok(LightSolution { pressed });
        }

        for (ind, button) in machine.buttons().iter().enumerate() {
            let next_pattern = cur_pattern ^ button.mask();
            if src_of_pattern.contains_key(&next_pattern) {
                continue;
            }
            if src_of_pattern.len() >= node_limit {
                return Err(SolveError::ResourceExhausted(node_limit));
            }

            src_of_pattern.insert(next_pattern, Some((cur_pattern, ind)));
            search_patterns.push_back(next_pattern);
        }
    }

    Err(SolveError::Infeasible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_NODE_LIMIT;

    fn solve(line: &str) -> (Machine, Result<LightSolution, SolveError>) {
        let machine = line.parse::<Machine>().unwrap();
        let res = min_presses(&machine, DEFAULT_NODE_LIMIT);
        (machine, res)
    }

    #[test]
    fn puzzle_example_machines() {
        let cases = [
            ("[.##.] (3) (1,3) (2) (2,3) (0,2) (0,1) {3,5,4,7}", 2),
            ("[...#.] (0,2,3,4) (2,3) (0,4) (0,1,2) (1,2,3,4) {7,5,12,7,2}", 3),
            (
                "[.###.#] (0,1,2,3,4) (0,3,4) (0,1,2,4,5) (1,2) {10,11,11,5,10,5}",
                2,
            ),
        ];
        for (line, expect) in cases {
            let (machine, res) = solve(line);
            let solution = res.unwrap();
            assert_eq!(solution.total(), expect, "{}", line);
            assert_eq!(solution.light_mask(&machine), machine.light_mask());
        }
    }

    #[test]
    fn dark_diagram_needs_no_presses() {
        let (_, res) = solve("[...] (0,1) (2) {1,1,1}");

        assert_eq!(res.unwrap().total(), 0);
    }

    #[test]
    fn no_button_twice() {
        let (_, res) = solve("[##.] (0) (0,1) (1) {0,0,0}");
        let solution = res.unwrap();

        assert_eq!(solution.total(), 1);
        assert_eq!(solution.pressed(), &[1]);
    }

    #[test]
    fn unreachable_pattern_is_infeasible() {
        let (_, res) = solve("[#.#] (0,2) (1) {0,0,0}");
        assert!(res.is_ok());

        let (_, res) = solve("[#..] (0,2) (1) {0,0,0}");
        assert_eq!(res, Err(SolveError::Infeasible));
    }

    #[test]
    fn light_mask_on_smaller_machine() {
        let (_, res) = solve("[...#] (0) (1) (2) (3) {0,0,0,0}");
        let solution = res.unwrap();
        let smaller = "[##] (0) (1) {0,0}".parse::<Machine>().unwrap();

        assert_eq!(solution.pressed(), &[3]);
        assert_eq!(solution.light_mask(&smaller), 0);
    }

    #[test]
    fn node_limit_is_not_infeasibility() {
        let machine = "[####] (0) (1) (2) (3) {0,0,0,0}"
            .parse::<Machine>()
            .unwrap();

        assert_eq!(
            min_presses(&machine, 3),
            Err(SolveError::ResourceExhausted(3))
        );
    }
}
