//! Error types for the state circuits.
//!
//! Every fallible gadget constructor returns a [`CircuitError`]. All variants
//! are fatal to the current proof attempt; nothing is retried internally.

use ark_bn254::Fr;
use ark_relations::r1cs::SynthesisError;
use thiserror::Error;

/// Errors raised while building or witnessing a state circuit.
#[derive(Debug, Error)]
pub enum CircuitError {
    /// A value is not representable as a field element, or an array length
    /// does not match the compile-time path length.
    #[error("domain error: {0}")]
    Domain(String),

    /// The gadget-computed root after the update disagrees with the root
    /// claimed by the witness record.
    #[error("witness mismatch in {prefix}: computed root {computed}, expected {expected}")]
    WitnessMismatch {
        /// Annotation prefix of the failing gadget.
        prefix: String,
        /// Root computed from the witnessed leaf and path.
        computed: Fr,
        /// Root claimed by the update record.
        expected: Fr,
    },

    /// The assembled constraint system is not satisfied by the witness.
    #[error("constraint system unsatisfied at {0}")]
    ConstraintViolation(String),

    /// Failure reported by the underlying constraint system.
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}

impl CircuitError {
    /// Shorthand for a [`CircuitError::Domain`] with a formatted message.
    pub fn domain(msg: impl Into<String>) -> Self {
        CircuitError::Domain(msg.into())
    }
}

impl From<CircuitError> for SynthesisError {
    fn from(err: CircuitError) -> Self {
        match err {
            CircuitError::Synthesis(inner) => inner,
            CircuitError::Domain(_)
            | CircuitError::WitnessMismatch { .. }
            | CircuitError::ConstraintViolation(_) => SynthesisError::Unsatisfiable,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CircuitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_message_names_prefix_and_roots() {
        let err = CircuitError::WitnessMismatch {
            prefix: "deposit.updateAccount".into(),
            computed: Fr::from(7u64),
            expected: Fr::from(8u64),
        };
        let msg = err.to_string();
        assert!(msg.contains("deposit.updateAccount"));
        assert!(msg.contains('7'));
        assert!(msg.contains('8'));
    }

    #[test]
    fn synthesis_error_round_trips() {
        let err: CircuitError = SynthesisError::AssignmentMissing.into();
        let back: SynthesisError = err.into();
        assert!(matches!(back, SynthesisError::AssignmentMissing));
    }

    #[test]
    fn domain_maps_to_unsatisfiable() {
        let back: SynthesisError = CircuitError::domain("too big").into();
        assert!(matches!(back, SynthesisError::Unsatisfiable));
    }
}
