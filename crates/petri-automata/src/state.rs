//! Simulation state and stepping.

use std::mem;

use crate::error::ConfigError;
use crate::grid::Grid;
use crate::kernel::{count_neighbors_into, Boundary, Kernel};
use crate::rule::Rule;

/// A running automaton: one grid, one kernel, one rule, one boundary mode.
///
/// `step()` computes the next generation in place from the previous one; old
/// generations are discarded, so memory use is constant over arbitrarily long
/// runs. Stepping is deterministic: the only randomness in this crate is the
/// explicit seed given to the [`State::random`] factory.
///
/// All configuration errors surface from the factories. Dimensionality,
/// count ranges, and table totality are checked when grid, kernel, and rule
/// are bound together, so `step()` itself cannot fail.
#[derive(Debug, Clone)]
pub struct State {
    grid: Grid,
    kernel: Kernel,
    rule: Rule,
    boundary: Boundary,
    generation: u64,
    /// Scratch neighbour counts, reused across steps.
    counts: Vec<u16>,
    /// Scratch next-generation grid, swapped in by `step`.
    next: Grid,
}

impl State {
    /// Creates a state from an explicit starting grid.
    pub fn from_grid(
        grid: Grid,
        kernel: Kernel,
        rule: Rule,
        boundary: Boundary,
    ) -> Result<Self, ConfigError> {
        if grid.ndim() != kernel.ndim() {
            return Err(ConfigError::DimensionMismatch {
                grid: grid.ndim(),
                kernel: kernel.ndim(),
            });
        }

        let states = rule.num_states();
        let max_value = grid.max_value();
        if max_value >= states {
            return Err(ConfigError::ValueOutOfRange {
                value: max_value,
                states,
            });
        }

        // The counter is u16; reject configurations that could exceed it.
        let max_count = u64::from(kernel.weight_sum()) * u64::from(states - 1);
        if max_count > u64::from(u16::MAX) {
            return Err(ConfigError::CountOverflow {
                max: max_count,
                limit: u32::from(u16::MAX),
            });
        }

        match &rule {
            Rule::Totalistic(totalistic) => {
                let max = kernel.weight_sum();
                for (set, counts) in [
                    ("birth", totalistic.birth()),
                    ("survival", totalistic.survival()),
                ] {
                    for &count in counts {
                        if u32::from(count) > max {
                            return Err(ConfigError::CountOutOfRange { set, count, max });
                        }
                    }
                }
            }
            Rule::Table(table) => table.check_total(max_count as u16)?,
        }

        let next = Grid::new(grid.shape())?;
        Ok(Self {
            grid,
            kernel,
            rule,
            boundary,
            generation: 0,
            counts: Vec::new(),
            next,
        })
    }

    /// Creates a zero-filled (all dead) state.
    pub fn dead(
        shape: &[usize],
        kernel: Kernel,
        rule: Rule,
        boundary: Boundary,
    ) -> Result<Self, ConfigError> {
        Self::from_grid(Grid::new(shape)?, kernel, rule, boundary)
    }

    /// Creates a state with a seeded random binary fill.
    ///
    /// Each cell starts alive with probability `density`. The same seed and
    /// shape always produce the same starting grid.
    pub fn random(
        shape: &[usize],
        kernel: Kernel,
        rule: Rule,
        boundary: Boundary,
        density: f32,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        Self::from_grid(Grid::random(shape, density, seed)?, kernel, rule, boundary)
    }

    /// The current grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The update rule.
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// The neighbourhood kernel.
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// The boundary mode.
    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    /// Number of generations stepped so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Counts the cells that are alive (nonzero).
    pub fn population(&self) -> usize {
        self.grid.population()
    }

    /// Gets a cell value. Out-of-range indices read as dead.
    pub fn get(&self, index: &[usize]) -> u8 {
        self.grid.get(index)
    }

    /// Sets a cell value. Out-of-range indices are ignored.
    pub fn set(&mut self, index: &[usize], value: u8) {
        self.grid.set(index, value);
    }

    /// Advances the automaton by one generation.
    ///
    /// One correlation pass produces every cell's neighbour count, then the
    /// rule is applied elementwise over (count, value) and the new grid is
    /// swapped in. Pure in (grid, kernel, rule, boundary): two identical
    /// states step to identical grids.
    pub fn step(&mut self) {
        count_neighbors_into(&self.grid, &self.kernel, self.boundary, &mut self.counts);

        let cur = self.grid.cells();
        let next = self.next.cells_mut();
        // The rule variant is resolved once, outside the cell loop.
        match &self.rule {
            Rule::Totalistic(rule) => {
                for ((out, &count), &value) in next.iter_mut().zip(&self.counts).zip(cur) {
                    *out = rule.apply(count, value);
                }
            }
            Rule::Table(rule) => {
                for ((out, &count), &value) in next.iter_mut().zip(&self.counts).zip(cur) {
                    *out = rule.apply(count, value);
                }
            }
        }

        mem::swap(&mut self.grid, &mut self.next);
        self.generation += 1;
    }

    /// Advances by `n` generations.
    pub fn steps(&mut self, n: usize) {
        for _ in 0..n {
            self.step();
        }
    }
}
