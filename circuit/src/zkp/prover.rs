//! # Groth16 Proof Generation
//!
//! Wraps `ark-groth16` for the deposit circuit:
//!
//! 1. **Setup**: `DepositProver::setup(rng)` once per tree shape. Produces
//!    the proving key and the matching [`DepositVerifier`]. In production,
//!    replace this with an MPC ceremony.
//!
//! 2. **Prove**: `DepositProver::prove(record, rng)` checks the witness
//!    against a scratch constraint system first, so an unsatisfiable record
//!    comes back as an error naming the failing constraint instead of a
//!    prover panic.
//!
//! 3. The resulting [`DepositProof`] is a compressed (~128 byte) blob.

use anyhow::{Context, Result};
use ark_bn254::Bn254;
use ark_groth16::{Groth16, ProvingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use ark_std::rand::{CryptoRng, Rng};
use tracing::info;

use super::circuit::{check_satisfied, DepositCircuit};
use super::verifier::DepositVerifier;
use crate::witness::DepositRecord;

// ---------------------------------------------------------------------------
// DepositProver
// ---------------------------------------------------------------------------

/// Holds the Groth16 proving key for deposits into an `A`/`B` state.
pub struct DepositProver<const A: usize, const B: usize> {
    pk: ProvingKey<Bn254>,
}

impl<const A: usize, const B: usize> DepositProver<A, B> {
    /// Run the Groth16 setup for the deposit circuit.
    ///
    /// Returns both halves. The verifier is distributed to whoever checks
    /// blocks; the prover stays with the operator.
    pub fn setup<R: Rng + CryptoRng>(rng: &mut R) -> Result<(Self, DepositVerifier)> {
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(DepositCircuit::<A, B>::blank(), rng)
            .context("Groth16 setup failed for the deposit circuit")?;
        info!(
            account_depth = A,
            balance_depth = B,
            public_inputs = vk.gamma_abc_g1.len().saturating_sub(1),
            "deposit circuit keys generated"
        );
        Ok((Self { pk }, DepositVerifier::from_vk(vk)))
    }

    /// Generate a proof for `record`.
    ///
    /// # Errors
    ///
    /// Fails with the underlying [`crate::CircuitError`] when the record is
    /// malformed, inconsistent or does not satisfy the circuit.
    pub fn prove<R: Rng + CryptoRng>(&self, record: DepositRecord, rng: &mut R) -> Result<DepositProof> {
        let circuit = DepositCircuit::<A, B>::new(record);
        let constraints = check_satisfied(&circuit).context("deposit witness rejected")?;

        let proof = Groth16::<Bn254>::prove(&self.pk, circuit, rng)
            .context("Groth16 proof generation failed")?;

        let mut proof_bytes = Vec::new();
        proof
            .serialize_compressed(&mut proof_bytes)
            .context("proof serialization failed")?;

        info!(constraints, size = proof_bytes.len(), "deposit proof generated");
        Ok(DepositProof { bytes: proof_bytes })
    }
}

// ---------------------------------------------------------------------------
// DepositProof
// ---------------------------------------------------------------------------

/// A serialized Groth16 proof of one deposit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositProof {
    bytes: Vec<u8>,
}

impl DepositProof {
    /// Raw compressed proof bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// Reconstruct a proof from compressed bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let _proof = ark_groth16::Proof::<Bn254>::deserialize_compressed(data)
            .context("invalid Groth16 proof bytes")?;

        Ok(Self {
            bytes: data.to_vec(),
        })
    }

    pub(crate) fn to_ark_proof(&self) -> Result<ark_groth16::Proof<Bn254>> {
        ark_groth16::Proof::<Bn254>::deserialize_compressed(&self.bytes[..])
            .map_err(|e| anyhow::anyhow!("proof deserialization failed: {}", e))
    }

    /// Size of the proof in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ExchangeState;
    use crate::CircuitError;
    use ark_bn254::Fr;
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use num_bigint::BigUint;

    type Prover = DepositProver<1, 1>;

    #[test]
    fn prove_valid_deposit() {
        let mut rng = StdRng::seed_from_u64(42);
        let (prover, _verifier) = Prover::setup(&mut rng).unwrap();

        let mut state = ExchangeState::<1, 1>::new();
        let record = state.deposit(2, 3, 1_000).unwrap();

        let proof = prover.prove(record, &mut rng).unwrap();
        assert!(proof.size() > 100, "proof should be non-trivial in size");
        assert!(proof.size() < 400, "proof should be compact");
    }

    #[test]
    fn unsatisfiable_witness_is_an_error() {
        let mut rng = StdRng::seed_from_u64(42);
        let (prover, _verifier) = Prover::setup(&mut rng).unwrap();

        let mut state = ExchangeState::<1, 1>::new();
        let mut record = state.deposit(0, 0, 10).unwrap();
        record.amount = BigUint::from(11u32);

        let err = prover.prove(record, &mut rng).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CircuitError>(),
            Some(CircuitError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn proof_bytes_round_trip() {
        let mut rng = StdRng::seed_from_u64(42);
        let (prover, _verifier) = Prover::setup(&mut rng).unwrap();

        let mut state = ExchangeState::<1, 1>::new();
        state.open_account(1, Fr::from(9u64), (Fr::from(1u64), Fr::from(2u64))).unwrap();
        let record = state.deposit(1, 1, 500).unwrap();

        let proof = prover.prove(record, &mut rng).unwrap();
        let restored = DepositProof::from_bytes(&proof.to_bytes()).unwrap();
        assert_eq!(proof, restored);
        assert!(DepositProof::from_bytes(&[0u8; 3]).is_err());
    }
}
