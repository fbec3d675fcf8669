//! Error types for petri-automata.

use thiserror::Error;

/// Errors raised while constructing grids, kernels, rules, or states.
///
/// Construction is the only fallible phase. Once a [`crate::State`] exists,
/// stepping is total over the state space and cannot fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A shape with no axes was given.
    #[error("shape must have at least one axis")]
    EmptyShape,

    /// An axis length of zero was given.
    #[error("axis {axis} has length 0")]
    ZeroAxis {
        /// Index of the offending axis.
        axis: usize,
    },

    /// Kernel axis lengths must be odd so the kernel has a center cell.
    #[error("kernel axis {axis} has even length {len}")]
    EvenKernelAxis {
        /// Index of the offending axis.
        axis: usize,
        /// The even length that was given.
        len: usize,
    },

    /// The number of kernel weights does not match the kernel shape.
    #[error("kernel has {got} weights, shape needs {expected}")]
    WeightCountMismatch {
        /// Product of the kernel axis lengths.
        expected: usize,
        /// Number of weights actually given.
        got: usize,
    },

    /// Pattern rows are not all the same length.
    #[error("row {row} has length {got}, expected {expected}")]
    RaggedRows {
        /// Index of the offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        got: usize,
    },

    /// A neighbour-count set contains the same count twice.
    #[error("duplicate count {count} in {set} set")]
    DuplicateCount {
        /// Which set ("birth" or "survival").
        set: &'static str,
        /// The repeated count.
        count: u16,
    },

    /// A rule references a neighbour count the kernel can never produce.
    #[error("count {count} in {set} set exceeds kernel maximum {max}")]
    CountOutOfRange {
        /// Which set ("birth" or "survival").
        set: &'static str,
        /// The out-of-range count.
        count: u16,
        /// Largest count the kernel can produce.
        max: u32,
    },

    /// Grid and kernel dimensionality differ.
    #[error("grid is {grid}-dimensional but kernel is {kernel}-dimensional")]
    DimensionMismatch {
        /// Grid dimensionality.
        grid: usize,
        /// Kernel dimensionality.
        kernel: usize,
    },

    /// A cell or transition value is outside the rule's declared state range.
    #[error("value {value} is outside the {states}-state range")]
    ValueOutOfRange {
        /// The offending value.
        value: u8,
        /// Number of states the rule declares.
        states: u8,
    },

    /// A table rule must declare at least two states.
    #[error("table rule declares {states} states, needs at least 2")]
    TooFewStates {
        /// Number of states declared.
        states: u8,
    },

    /// A table rule with no default does not cover a reachable pair.
    #[error("no transition for count {count}, value {value}")]
    MissingTransition {
        /// The uncovered neighbour count.
        count: u16,
        /// The uncovered cell value.
        value: u8,
    },

    /// Kernel weights and state count together can overflow the counter type.
    #[error("maximum weighted count {max} exceeds {limit}")]
    CountOverflow {
        /// Largest weighted count this configuration can produce.
        max: u64,
        /// Largest count the counter type can hold.
        limit: u32,
    },
}
