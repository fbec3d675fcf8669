//! Update rules mapping (neighbour count, cell value) to the next value.

use std::collections::HashMap;

use crate::error::ConfigError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A cellular automaton update rule.
///
/// Either a birth/survival predicate over neighbour counts (binary automata)
/// or an explicit transition table (multi-state automata). Both forms are
/// total: a (count, value) pair outside the declared sets or table falls to
/// the dead/default branch instead of failing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Rule {
    /// Birth/survival count sets for two-state automata.
    Totalistic(TotalisticRule),
    /// Explicit transition table for multi-state automata.
    Table(TableRule),
}

impl Rule {
    /// The classic Game of Life rule, B3/S23.
    pub fn life() -> Self {
        Rule::Totalistic(TotalisticRule {
            birth: vec![3],
            survival: vec![2, 3],
        })
    }

    /// Builds a birth/survival rule from explicit count sets.
    ///
    /// A dead cell becomes alive when its neighbour count is in `birth`; a
    /// live cell stays alive when its count is in `survival`; everything else
    /// is dead next generation. Duplicate counts within a set are rejected.
    pub fn totalistic(birth: &[u16], survival: &[u16]) -> Result<Self, ConfigError> {
        Ok(Rule::Totalistic(TotalisticRule::new(birth, survival)?))
    }

    /// Builds a transition-table rule over `states` cell states.
    ///
    /// `transitions` maps (neighbour count, current value) to the next value.
    /// `default` is the next value for unmapped pairs; passing `None` turns
    /// an unmapped reachable pair into a construction error when the rule is
    /// bound to a kernel.
    pub fn table(
        states: u8,
        transitions: HashMap<(u16, u8), u8>,
        default: Option<u8>,
    ) -> Result<Self, ConfigError> {
        Ok(Rule::Table(TableRule::new(states, transitions, default)?))
    }

    /// Next value for a cell with the given neighbour count.
    pub fn apply(&self, count: u16, value: u8) -> u8 {
        match self {
            Rule::Totalistic(rule) => rule.apply(count, value),
            Rule::Table(rule) => rule.apply(count, value),
        }
    }

    /// Number of distinct cell states the rule operates over.
    pub fn num_states(&self) -> u8 {
        match self {
            Rule::Totalistic(_) => 2,
            Rule::Table(rule) => rule.states,
        }
    }
}

/// Birth/survival rule for binary automata.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TotalisticRule {
    /// Counts that bring a dead cell to life, sorted.
    birth: Vec<u16>,
    /// Counts that keep a live cell alive, sorted.
    survival: Vec<u16>,
}

impl TotalisticRule {
    fn new(birth: &[u16], survival: &[u16]) -> Result<Self, ConfigError> {
        Ok(Self {
            birth: sorted_set(birth, "birth")?,
            survival: sorted_set(survival, "survival")?,
        })
    }

    /// Counts that bring a dead cell to life.
    pub fn birth(&self) -> &[u16] {
        &self.birth
    }

    /// Counts that keep a live cell alive.
    pub fn survival(&self) -> &[u16] {
        &self.survival
    }

    /// Next value: 1 if the cell is born or survives, 0 otherwise.
    pub fn apply(&self, count: u16, value: u8) -> u8 {
        let set = if value != 0 { &self.survival } else { &self.birth };
        u8::from(set.binary_search(&count).is_ok())
    }
}

/// Explicit transition table for multi-state automata.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TableRule {
    states: u8,
    transitions: HashMap<(u16, u8), u8>,
    default: Option<u8>,
}

impl TableRule {
    fn new(
        states: u8,
        transitions: HashMap<(u16, u8), u8>,
        default: Option<u8>,
    ) -> Result<Self, ConfigError> {
        if states < 2 {
            return Err(ConfigError::TooFewStates { states });
        }
        for (&(_, value), &next) in &transitions {
            if value >= states {
                return Err(ConfigError::ValueOutOfRange { value, states });
            }
            if next >= states {
                return Err(ConfigError::ValueOutOfRange { value: next, states });
            }
        }
        if let Some(value) = default {
            if value >= states {
                return Err(ConfigError::ValueOutOfRange { value, states });
            }
        }
        Ok(Self {
            states,
            transitions,
            default,
        })
    }

    /// Number of cell states.
    pub fn states(&self) -> u8 {
        self.states
    }

    /// The next value for unmapped pairs, if defaults are enabled.
    pub fn default_value(&self) -> Option<u8> {
        self.default
    }

    /// Next value from the table, falling back to the default (or dead).
    pub fn apply(&self, count: u16, value: u8) -> u8 {
        match self.transitions.get(&(count, value)) {
            Some(&next) => next,
            None => self.default.unwrap_or(0),
        }
    }

    /// Checks that every reachable (count, value) pair has a transition.
    ///
    /// Only meaningful with defaults disabled; called when the rule is bound
    /// to a kernel, so failures surface at construction, never mid-run.
    pub(crate) fn check_total(&self, max_count: u16) -> Result<(), ConfigError> {
        if self.default.is_some() {
            return Ok(());
        }
        for count in 0..=max_count {
            for value in 0..self.states {
                if !self.transitions.contains_key(&(count, value)) {
                    return Err(ConfigError::MissingTransition { count, value });
                }
            }
        }
        Ok(())
    }
}

fn sorted_set(counts: &[u16], set: &'static str) -> Result<Vec<u16>, ConfigError> {
    let mut sorted = counts.to_vec();
    sorted.sort_unstable();
    for pair in sorted.windows(2) {
        if pair[0] == pair[1] {
            return Err(ConfigError::DuplicateCount {
                set,
                count: pair[0],
            });
        }
    }
    Ok(sorted)
}

/// Common birth/survival presets, as (birth, survival) count sets.
pub mod presets {
    /// Game of Life (B3/S23).
    pub const LIFE: (&[u16], &[u16]) = (&[3], &[2, 3]);

    /// HighLife (B36/S23), Life plus a replicator.
    pub const HIGHLIFE: (&[u16], &[u16]) = (&[3, 6], &[2, 3]);

    /// Seeds (B2/S), explosive growth.
    pub const SEEDS: (&[u16], &[u16]) = (&[2], &[]);

    /// Day & Night (B3678/S34678), self-complementary.
    pub const DAY_NIGHT: (&[u16], &[u16]) = (&[3, 6, 7, 8], &[3, 4, 6, 7, 8]);

    /// Maze (B3/S12345), maze-like corridors.
    pub const MAZE: (&[u16], &[u16]) = (&[3], &[1, 2, 3, 4, 5]);

    /// Diamoeba (B35678/S5678), amoeba-like blobs.
    pub const DIAMOEBA: (&[u16], &[u16]) = (&[3, 5, 6, 7, 8], &[5, 6, 7, 8]);

    /// Replicator (B1357/S1357).
    pub const REPLICATOR: (&[u16], &[u16]) = (&[1, 3, 5, 7], &[1, 3, 5, 7]);
}
