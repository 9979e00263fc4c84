//! Error types for stratus-energy.

/// Errors from the power formulas and site power models.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnergyError {
    /// Returned when an efficiency factor is outside the range documented for its plant type.
    #[error("{plant} efficiency {efficiency} is outside [{min}, {max}]")]
    EfficiencyOutOfRange {
        /// Plant type (`waterfall` or `geothermal`).
        plant: &'static str,
        /// The rejected efficiency.
        efficiency: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },

    /// Returned when a physical input is negative, NaN or infinite.
    #[error("invalid {quantity}: {value}")]
    InvalidInput {
        /// Name of the quantity (e.g. `height_m`).
        quantity: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Returned when a climate step carries a different number of values than variables.
    #[error("climate step has {got} values for {expected} variables")]
    VariableCountMismatch {
        /// Number of variable names.
        expected: usize,
        /// Number of values supplied.
        got: usize,
    },
}
