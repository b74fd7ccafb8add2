//! State gadgets: leaves, leaf updates and running balances.

pub mod dynamic;
pub mod leaf;
pub mod update;

pub use dynamic::{DynamicBalanceGadget, DynamicVariableGadget};
pub use leaf::{
    AccountGadget, AccountLeaf, AccountState, BalanceGadget, BalanceLeaf, BalanceState, LeafState,
    PublicKeyVar,
};
pub use update::{MerkleUpdateGadget, UpdateAccountGadget, UpdateBalanceGadget};
