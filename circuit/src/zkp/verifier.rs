//! # Groth16 Proof Verification
//!
//! The verifier side of the deposit proof. Verification is three pairings
//! plus a multi-scalar multiplication over the three public inputs, so its
//! cost does not depend on tree depth.

use anyhow::{Context, Result};
use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;

use super::circuit;
use super::prover::DepositProof;
use crate::witness::DepositRecord;

/// Holds the Groth16 verification key for the deposit circuit.
pub struct DepositVerifier {
    vk: VerifyingKey<Bn254>,
}

impl DepositVerifier {
    pub(crate) fn from_vk(vk: VerifyingKey<Bn254>) -> Self {
        Self { vk }
    }

    /// Verify `proof` against explicit public inputs.
    ///
    /// `Ok(false)` means the proof is well-formed but does not verify.
    pub fn verify(&self, proof: &DepositProof, root_before: Fr, root_after: Fr, amount: Fr) -> Result<bool> {
        let ark_proof = proof
            .to_ark_proof()
            .context("failed to deserialize proof")?;

        let valid = Groth16::<Bn254>::verify(&self.vk, &[root_before, root_after, amount], &ark_proof)
            .context("Groth16 verification algorithm failed")?;

        Ok(valid)
    }

    /// Verify `proof` against the public part of a deposit record.
    pub fn verify_record(&self, proof: &DepositProof, record: &DepositRecord) -> Result<bool> {
        let [root_before, root_after, amount] =
            circuit::public_inputs(record).context("deposit record has invalid public inputs")?;
        self.verify(proof, root_before, root_after, amount)
    }

    /// Serialize the verification key to bytes.
    pub fn vk_to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.vk
            .serialize_compressed(&mut buf)
            .context("verification key serialization failed")?;
        Ok(buf)
    }

    /// Deserialize a verification key from bytes.
    pub fn vk_from_bytes(data: &[u8]) -> Result<Self> {
        let vk = VerifyingKey::<Bn254>::deserialize_compressed(data)
            .context("failed to deserialize verification key")?;
        Ok(Self { vk })
    }
}
