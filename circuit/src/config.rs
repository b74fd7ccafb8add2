//! # Circuit Configuration & Constants
//!
//! Every compile-time parameter of the state circuits lives here. The
//! out-of-circuit reference (`state`, `merkle::tree`) and the gadgets read
//! the same constants, so a proof can only be produced when both sides agree
//! on tree shape and hash parameters.
//!
//! Changing any of these values changes every root ever computed. Treat them
//! as part of the protocol, not as tuning knobs.

// ---------------------------------------------------------------------------
// Tree Shape
// ---------------------------------------------------------------------------

/// Number of children per Merkle node. Each level is hashed as a 4-tuple.
pub const MERKLE_ARITY: usize = 4;

/// Address bits consumed per tree level (`log2(MERKLE_ARITY)`).
pub const BITS_PER_LEVEL: usize = 2;

/// Authentication path slots contributed by a single level: the three
/// siblings of the node being proven.
pub const PROOF_SLOTS_PER_LEVEL: usize = MERKLE_ARITY - 1;

/// Depth (in quaternary levels) of the accounts tree.
pub const ACCOUNT_TREE_DEPTH: usize = 16;

/// Depth (in quaternary levels) of every per-account balance tree.
pub const BALANCE_TREE_DEPTH: usize = 8;

/// Width of an account id in bits.
pub const NUM_BITS_ACCOUNT: usize = ACCOUNT_TREE_DEPTH * BITS_PER_LEVEL;

/// Width of a token id in bits.
pub const NUM_BITS_TOKEN: usize = BALANCE_TREE_DEPTH * BITS_PER_LEVEL;

/// Balances and amounts are bounded by this many bits. The bound is enforced
/// by the transaction circuits, not by the update gadgets.
pub const NUM_BITS_AMOUNT: usize = 96;

/// Length of the authentication path for a tree of `depth` levels.
pub const fn proof_len(depth: usize) -> usize {
    depth * PROOF_SLOTS_PER_LEVEL
}

/// Length of the address bit vector for a tree of `depth` levels.
pub const fn address_bits_len(depth: usize) -> usize {
    depth * BITS_PER_LEVEL
}

// ---------------------------------------------------------------------------
// Leaf Layout
// ---------------------------------------------------------------------------

/// Field elements in an account leaf: owner, publicKeyX, publicKeyY, nonce,
/// balancesRoot.
pub const ACCOUNT_LEAF_ARITY: usize = 5;

/// Field elements in a balance leaf: balance, storage.
pub const BALANCE_LEAF_ARITY: usize = 2;

// ---------------------------------------------------------------------------
// Poseidon Parameters
// ---------------------------------------------------------------------------

/// S-box exponent. `x^5` is a permutation of the BN254 scalar field.
pub const POSEIDON_ALPHA: u64 = 5;

/// Full rounds for every Poseidon instance.
pub const POSEIDON_FULL_ROUNDS: usize = 8;

/// Partial rounds for the balance leaf hasher (width 3).
pub const POSEIDON_PARTIAL_ROUNDS_T3: usize = 57;

/// Partial rounds for the Merkle node hasher (width 5).
pub const POSEIDON_PARTIAL_ROUNDS_T5: usize = 60;

/// Partial rounds for the account leaf hasher (width 6).
pub const POSEIDON_PARTIAL_ROUNDS_T6: usize = 60;

/// Capacity of every Poseidon sponge. The rate equals the hashed arity.
pub const POSEIDON_CAPACITY: usize = 1;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum constraint count we accept for a single transition circuit.
/// Beyond this, proving times get ugly on consumer hardware.
pub const MAX_CIRCUIT_CONSTRAINTS: usize = 1 << 20;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_lengths_follow_depth() {
        assert_eq!(proof_len(ACCOUNT_TREE_DEPTH), 48);
        assert_eq!(proof_len(BALANCE_TREE_DEPTH), 24);
        assert_eq!(address_bits_len(ACCOUNT_TREE_DEPTH), NUM_BITS_ACCOUNT);
        assert_eq!(address_bits_len(BALANCE_TREE_DEPTH), NUM_BITS_TOKEN);
    }

    #[test]
    fn arity_matches_bits_per_level() {
        assert_eq!(1 << BITS_PER_LEVEL, MERKLE_ARITY);
    }
}
