//! N-dimensional cellular automaton simulation.
//!
//! A [`State`] owns one [`Grid`] of `u8` cells, one neighbourhood [`Kernel`],
//! and one update [`Rule`]. Each [`State::step`] correlates the kernel over
//! the whole grid to get per-cell neighbour counts, then applies the rule
//! elementwise to every (count, value) pair. There is no per-cell branching
//! on topology: boundary handling is a property of the correlation pass.
//!
//! # Example
//!
//! ```
//! use petri_automata::{Boundary, Kernel, Rule, State};
//!
//! // A 64x64 Game of Life soup, toroidal edges.
//! let mut state = State::random(
//!     &[64, 64],
//!     Kernel::moore(2).unwrap(),
//!     Rule::life(),
//!     Boundary::Wrap,
//!     0.3,
//!     12345,
//! )
//! .unwrap();
//!
//! state.steps(10);
//! println!("{} cells alive", state.population());
//! ```

mod error;
mod grid;
mod kernel;
mod rule;
mod state;

pub use error::ConfigError;
pub use grid::Grid;
pub use kernel::{count_neighbors, Boundary, Kernel};
pub use rule::{presets, Rule, TableRule, TotalisticRule};
pub use state::State;
