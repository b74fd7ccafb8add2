//! # Poseidon Hashers
//!
//! Three fixed-arity Poseidon instances compress tuples of field elements:
//!
//! | hasher        | arity | width | partial rounds |
//! |---------------|-------|-------|----------------|
//! | account leaf  | 5     | 6     | 60             |
//! | balance leaf  | 2     | 3     | 57             |
//! | Merkle node   | 4     | 5     | 60             |
//!
//! Each instance is a sponge with capacity 1 and rate equal to its arity;
//! the digest is the first element squeezed after absorbing the tuple. Round
//! constants and MDS matrices come from the Grain LFSR, so the parameters are
//! fully determined by the table above.
//!
//! The native hash and the in-circuit gadget read the same [`HashParams`]
//! object. Before/after leaf hashers are independent gadget instances but
//! always share parameters; diverging here would silently break soundness of
//! every update.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::constraints::CryptographicSpongeVar;
use ark_crypto_primitives::sponge::poseidon::constraints::PoseidonSpongeVar;
use ark_crypto_primitives::sponge::poseidon::{
    find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge,
};
use ark_crypto_primitives::sponge::{CryptographicSponge, FieldBasedCryptographicSponge};
use ark_ff::PrimeField;
use ark_r1cs_std::fields::fp::FpVar;
use ark_relations::r1cs::ConstraintSystemRef;
use lazy_static::lazy_static;

use crate::config::{
    ACCOUNT_LEAF_ARITY, BALANCE_LEAF_ARITY, MERKLE_ARITY, POSEIDON_ALPHA, POSEIDON_CAPACITY,
    POSEIDON_FULL_ROUNDS, POSEIDON_PARTIAL_ROUNDS_T3, POSEIDON_PARTIAL_ROUNDS_T5,
    POSEIDON_PARTIAL_ROUNDS_T6,
};
use crate::error::{CircuitError, Result};

/// Parameters of one fixed-arity Poseidon instance.
#[derive(Clone, Debug)]
pub struct HashParams {
    name: &'static str,
    arity: usize,
    config: PoseidonConfig<Fr>,
}

impl HashParams {
    fn generate(name: &'static str, arity: usize, partial_rounds: usize) -> Self {
        let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
            Fr::MODULUS_BIT_SIZE as u64,
            arity,
            POSEIDON_FULL_ROUNDS as u64,
            partial_rounds as u64,
            0,
        );
        let config = PoseidonConfig::new(
            POSEIDON_FULL_ROUNDS,
            partial_rounds,
            POSEIDON_ALPHA,
            mds,
            ark,
            arity,
            POSEIDON_CAPACITY,
        );
        Self {
            name,
            arity,
            config,
        }
    }

    /// Human-readable name, used in error messages.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of inputs this instance compresses.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// The underlying sponge configuration.
    pub fn config(&self) -> &PoseidonConfig<Fr> {
        &self.config
    }

    fn check_arity(&self, len: usize) -> Result<()> {
        if len != self.arity {
            return Err(CircuitError::domain(format!(
                "{} hasher takes {} inputs, got {len}",
                self.name, self.arity
            )));
        }
        Ok(())
    }

    /// Hash `inputs` outside the circuit.
    pub fn hash(&self, inputs: &[Fr]) -> Result<Fr> {
        self.check_arity(inputs.len())?;
        Ok(self.permute(inputs))
    }

    /// Hash a tuple whose length the caller fixes by construction.
    pub(crate) fn permute(&self, inputs: &[Fr]) -> Fr {
        let mut sponge = PoseidonSponge::new(&self.config);
        sponge.absorb(&inputs.to_vec());
        sponge.squeeze_native_field_elements(1)[0]
    }
}

lazy_static! {
    /// Hasher for `(owner, publicKeyX, publicKeyY, nonce, balancesRoot)`.
    pub static ref ACCOUNT_LEAF_HASH: HashParams =
        HashParams::generate("account leaf", ACCOUNT_LEAF_ARITY, POSEIDON_PARTIAL_ROUNDS_T6);

    /// Hasher for `(balance, storage)`.
    pub static ref BALANCE_LEAF_HASH: HashParams =
        HashParams::generate("balance leaf", BALANCE_LEAF_ARITY, POSEIDON_PARTIAL_ROUNDS_T3);

    /// Hasher for the four children of a Merkle node.
    pub static ref MERKLE_NODE_HASH: HashParams =
        HashParams::generate("merkle node", MERKLE_ARITY, POSEIDON_PARTIAL_ROUNDS_T5);
}

/// Hash four children into their parent node.
pub fn hash_node(children: &[Fr; MERKLE_ARITY]) -> Fr {
    MERKLE_NODE_HASH.permute(children)
}

// ---------------------------------------------------------------------------
// Gadget
// ---------------------------------------------------------------------------

/// In-circuit Poseidon over a fixed-arity tuple.
///
/// The digest is exposed through [`PoseidonGadget::result`]. Constraint cost
/// is linear in the width and fixed by the parameters.
#[derive(Clone)]
pub struct PoseidonGadget {
    result: FpVar<Fr>,
}

impl PoseidonGadget {
    /// Emit the permutation constraints for `inputs` under `params`.
    pub fn new(
        cs: ConstraintSystemRef<Fr>,
        params: &HashParams,
        inputs: &[FpVar<Fr>],
    ) -> Result<Self> {
        params.check_arity(inputs.len())?;
        let mut sponge = PoseidonSpongeVar::new(cs, &params.config);
        sponge.absorb(&inputs.to_vec())?;
        let result = sponge
            .squeeze_field_elements(1)?
            .pop()
            .ok_or_else(|| CircuitError::domain("poseidon sponge squeezed nothing"))?;
        Ok(Self { result })
    }

    /// The digest variable.
    pub fn result(&self) -> &FpVar<Fr> {
        &self.result
    }
}
