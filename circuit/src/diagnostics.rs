//! # Witness Diagnostics
//!
//! When an update gadget's computed root disagrees with the root the block
//! builder claimed, the interesting question is *which leaf* was wrong. The
//! gadget captures both leaves' field values into a [`MismatchReport`] and
//! hands it to a [`DiagnosticSink`] chosen by the caller.
//!
//! Reports are advisory: a sink never changes the error outcome.

use std::fmt;
use std::sync::Mutex;

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::R1CSVar;

/// Named field values of one leaf, captured from the witness.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafDump {
    /// `"account"` or `"balance"`.
    pub kind: &'static str,
    /// `(field name, value)` pairs in leaf order. A value is `None` when the
    /// variable had no assignment (setup mode).
    pub fields: Vec<(&'static str, Option<Fr>)>,
}

impl LeafDump {
    /// Read the current assignment of each variable.
    pub fn capture(kind: &'static str, names: &[&'static str], vars: &[FpVar<Fr>]) -> Self {
        let fields = names
            .iter()
            .zip(vars)
            .map(|(name, var)| (*name, var.value().ok()))
            .collect();
        Self { kind, fields }
    }

    /// Value of the named field, if present and assigned.
    pub fn get(&self, name: &str) -> Option<Fr> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, v)| *v)
    }
}

impl fmt::Display for LeafDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.fields {
            match value {
                Some(v) => writeln!(f, "- {name}: {v}")?,
                None => writeln!(f, "- {name}: <unassigned>")?,
            }
        }
        Ok(())
    }
}

/// Both leaves of a failing update plus the roots involved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MismatchReport {
    /// Annotation prefix of the gadget that produced the report.
    pub prefix: String,
    /// Root computed by the gadget.
    pub computed: Fr,
    /// Root claimed by the update record.
    pub expected: Fr,
    pub leaf_before: LeafDump,
    pub leaf_after: LeafDump,
}

impl fmt::Display for MismatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: computed {} != expected {}", self.prefix, self.computed, self.expected)?;
        writeln!(f, "leafBefore:")?;
        write!(f, "{}", self.leaf_before)?;
        writeln!(f, "leafAfter:")?;
        write!(f, "{}", self.leaf_after)
    }
}

/// Events an update gadget can report while witnessing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// The computed root after the update differs from the claimed one.
    /// Always accompanied by a `WitnessMismatch` error.
    RootAfterMismatch(MismatchReport),
    /// The root recomputed from the before-leaf differs from the claimed
    /// root before. Advisory only; the constraint system rejects it later.
    RootBeforeMismatch(MismatchReport),
}

impl Diagnostic {
    /// The report carried by this event.
    pub fn report(&self) -> &MismatchReport {
        match self {
            Diagnostic::RootAfterMismatch(r) | Diagnostic::RootBeforeMismatch(r) => r,
        }
    }
}

/// Destination for witness diagnostics, injected at gadget construction.
pub trait DiagnosticSink {
    fn emit(&self, diagnostic: Diagnostic);
}

/// Logs diagnostics through `tracing`. The default sink.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::RootAfterMismatch(r) => tracing::error!(
                prefix = %r.prefix,
                computed = %r.computed,
                expected = %r.expected,
                "root after update mismatch\nleafBefore:\n{}leafAfter:\n{}",
                r.leaf_before,
                r.leaf_after,
            ),
            Diagnostic::RootBeforeMismatch(r) => tracing::warn!(
                prefix = %r.prefix,
                computed = %r.computed,
                expected = %r.expected,
                "root before update does not match the authentication path",
            ),
        }
    }
}

/// Discards every diagnostic.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _diagnostic: Diagnostic) {}
}

/// Collects diagnostics in memory for later inspection.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the collected events.
    pub fn take(&self) -> Vec<Diagnostic> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match self.events.lock() {
            Ok(mut events) => events.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_r1cs_std::alloc::AllocVar;
    use ark_relations::r1cs::ConstraintSystem;

    fn dump(values: [u64; 2]) -> LeafDump {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let vars: Vec<FpVar<Fr>> = values
            .iter()
            .map(|v| FpVar::new_witness(cs.clone(), || Ok(Fr::from(*v))).unwrap())
            .collect();
        LeafDump::capture("balance", &["balance", "storage"], &vars)
    }

    #[test]
    fn dump_renders_one_line_per_field() {
        let text = dump([100, 5]).to_string();
        assert_eq!(text, "- balance: 100\n- storage: 5\n");
    }

    #[test]
    fn dump_lookup_by_name() {
        let d = dump([150, 5]);
        assert_eq!(d.get("balance"), Some(Fr::from(150u64)));
        assert_eq!(d.get("nonce"), None);
    }

    #[test]
    fn recording_sink_collects_and_drains() {
        let sink = RecordingSink::new();
        let report = MismatchReport {
            prefix: "test".into(),
            computed: Fr::from(1u64),
            expected: Fr::from(2u64),
            leaf_before: dump([1, 2]),
            leaf_after: dump([3, 4]),
        };
        sink.emit(Diagnostic::RootAfterMismatch(report.clone()));
        let events = sink.take();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].report(), &report);
        assert!(sink.take().is_empty());
    }

    #[test]
    fn report_mentions_both_leaves() {
        let report = MismatchReport {
            prefix: "update".into(),
            computed: Fr::from(1u64),
            expected: Fr::from(2u64),
            leaf_before: dump([100, 5]),
            leaf_after: dump([150, 5]),
        };
        let text = report.to_string();
        assert!(text.contains("leafBefore:\n- balance: 100"));
        assert!(text.contains("leafAfter:\n- balance: 150"));
    }
}
