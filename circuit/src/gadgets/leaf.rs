//! Account and balance leaves: native values, variable groups and the
//! gadgets that allocate them.
//!
//! A *state* ([`AccountState`], [`BalanceState`]) only names variables that
//! were allocated elsewhere. A *gadget* ([`AccountGadget`], [`BalanceGadget`])
//! allocates one witness per field and fills it from a plaintext record.

use std::borrow::Borrow;

use ark_bn254::Fr;
use ark_r1cs_std::{
    alloc::{AllocVar, AllocationMode},
    fields::fp::FpVar,
};
use ark_relations::r1cs::{ConstraintSystemRef, Namespace, SynthesisError};

use crate::diagnostics::LeafDump;
use crate::error::{CircuitError, Result};
use crate::field::{to_biguint, to_field};
use crate::poseidon::{HashParams, ACCOUNT_LEAF_HASH, BALANCE_LEAF_HASH};
use crate::witness::{AccountRecord, BalanceRecord, PublicKeyRecord};

// ---------------------------------------------------------------------------
// Leaf state abstraction
// ---------------------------------------------------------------------------

/// A named group of variables forming one leaf.
///
/// Implementors fix the hash instance and the field order that the Merkle
/// update gadgets compress. Two states describe the same leaf iff the
/// witness assigns equal values to their variables in order.
pub trait LeafState: Clone {
    /// Plaintext record consumed by update gadgets over this leaf.
    type Record;

    /// `"account"` or `"balance"`, used in diagnostics.
    const KIND: &'static str;

    /// Field names in hash-input order.
    const FIELD_NAMES: &'static [&'static str];

    /// Poseidon instance that hashes this leaf.
    fn hash_params() -> &'static HashParams;

    /// The variables in hash-input order.
    fn inputs(&self) -> Vec<FpVar<Fr>>;

    /// Current witness values of the leaf, for mismatch reports.
    fn dump(&self) -> LeafDump {
        LeafDump::capture(Self::KIND, Self::FIELD_NAMES, &self.inputs())
    }
}

// ---------------------------------------------------------------------------
// Account leaf
// ---------------------------------------------------------------------------

/// An account leaf as reduced field elements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccountLeaf {
    pub owner: Fr,
    pub public_key_x: Fr,
    pub public_key_y: Fr,
    pub nonce: Fr,
    pub balances_root: Fr,
}

impl AccountLeaf {
    /// A leaf nobody owns yet, pointing at an empty balance tree.
    pub fn empty(balances_root: Fr) -> Self {
        Self {
            balances_root,
            ..Self::default()
        }
    }

    pub fn to_inputs(&self) -> [Fr; 5] {
        [
            self.owner,
            self.public_key_x,
            self.public_key_y,
            self.nonce,
            self.balances_root,
        ]
    }

    pub fn hash(&self) -> Fr {
        ACCOUNT_LEAF_HASH.permute(&self.to_inputs())
    }
}

impl TryFrom<&AccountRecord> for AccountLeaf {
    type Error = CircuitError;

    fn try_from(record: &AccountRecord) -> Result<Self> {
        Ok(Self {
            owner: to_field(&record.owner, "owner")?,
            public_key_x: to_field(&record.public_key.x, "publicKey.x")?,
            public_key_y: to_field(&record.public_key.y, "publicKey.y")?,
            nonce: to_field(&record.nonce, "nonce")?,
            balances_root: to_field(&record.balances_root, "balancesRoot")?,
        })
    }
}

impl From<&AccountLeaf> for AccountRecord {
    fn from(leaf: &AccountLeaf) -> Self {
        Self {
            owner: to_biguint(leaf.owner),
            public_key: PublicKeyRecord {
                x: to_biguint(leaf.public_key_x),
                y: to_biguint(leaf.public_key_y),
            },
            nonce: to_biguint(leaf.nonce),
            balances_root: to_biguint(leaf.balances_root),
        }
    }
}

/// Variables of an account leaf.
#[derive(Clone)]
pub struct AccountState {
    pub owner: FpVar<Fr>,
    pub public_key_x: FpVar<Fr>,
    pub public_key_y: FpVar<Fr>,
    pub nonce: FpVar<Fr>,
    pub balances_root: FpVar<Fr>,
}

impl LeafState for AccountState {
    type Record = AccountRecord;

    const KIND: &'static str = "account";
    const FIELD_NAMES: &'static [&'static str] =
        &["owner", "publicKeyX", "publicKeyY", "nonce", "balancesRoot"];

    fn hash_params() -> &'static HashParams {
        &ACCOUNT_LEAF_HASH
    }

    fn inputs(&self) -> Vec<FpVar<Fr>> {
        vec![
            self.owner.clone(),
            self.public_key_x.clone(),
            self.public_key_y.clone(),
            self.nonce.clone(),
            self.balances_root.clone(),
        ]
    }
}

/// Public key coordinates of an account.
#[derive(Clone)]
pub struct PublicKeyVar {
    pub x: FpVar<Fr>,
    pub y: FpVar<Fr>,
}

/// Allocates the five variables of an account leaf.
#[derive(Clone)]
pub struct AccountGadget {
    pub owner: FpVar<Fr>,
    pub public_key: PublicKeyVar,
    pub nonce: FpVar<Fr>,
    pub balances_root: FpVar<Fr>,
    prefix: String,
}

impl AllocVar<AccountLeaf, Fr> for AccountGadget {
    fn new_variable<T: Borrow<AccountLeaf>>(
        cs: impl Into<Namespace<Fr>>,
        f: impl FnOnce() -> std::result::Result<T, SynthesisError>,
        mode: AllocationMode,
    ) -> std::result::Result<Self, SynthesisError> {
        let ns = cs.into();
        let cs = ns.cs();
        let leaf = f().map(|l| *l.borrow());

        let owner = FpVar::new_variable(ark_relations::ns!(cs, "owner"), || leaf.map(|l| l.owner), mode)?;
        let x = FpVar::new_variable(
            ark_relations::ns!(cs, "public_key_x"),
            || leaf.map(|l| l.public_key_x),
            mode,
        )?;
        let y = FpVar::new_variable(
            ark_relations::ns!(cs, "public_key_y"),
            || leaf.map(|l| l.public_key_y),
            mode,
        )?;
        let nonce = FpVar::new_variable(ark_relations::ns!(cs, "nonce"), || leaf.map(|l| l.nonce), mode)?;
        let balances_root = FpVar::new_variable(
            ark_relations::ns!(cs, "balances_root"),
            || leaf.map(|l| l.balances_root),
            mode,
        )?;

        Ok(Self {
            owner,
            public_key: PublicKeyVar { x, y },
            nonce,
            balances_root,
            prefix: String::new(),
        })
    }
}

impl AccountGadget {
    /// Allocate the leaf as private witnesses and assign them from `record`.
    ///
    /// `record` is `None` during setup. Fails with [`CircuitError::Domain`]
    /// if a field does not fit the scalar field.
    pub fn new(
        cs: ConstraintSystemRef<Fr>,
        record: Option<&AccountRecord>,
        prefix: &str,
    ) -> Result<Self> {
        let leaf = record.map(AccountLeaf::try_from).transpose()?;
        let mut gadget = Self::new_witness(ark_relations::ns!(cs, "account"), || {
            leaf.ok_or(SynthesisError::AssignmentMissing)
        })?;
        gadget.prefix = prefix.to_owned();
        Ok(gadget)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn state(&self) -> AccountState {
        AccountState {
            owner: self.owner.clone(),
            public_key_x: self.public_key.x.clone(),
            public_key_y: self.public_key.y.clone(),
            nonce: self.nonce.clone(),
            balances_root: self.balances_root.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Balance leaf
// ---------------------------------------------------------------------------

/// A balance leaf as reduced field elements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BalanceLeaf {
    pub balance: Fr,
    pub storage: Fr,
}

impl BalanceLeaf {
    pub fn to_inputs(&self) -> [Fr; 2] {
        [self.balance, self.storage]
    }

    pub fn hash(&self) -> Fr {
        BALANCE_LEAF_HASH.permute(&self.to_inputs())
    }
}

impl TryFrom<&BalanceRecord> for BalanceLeaf {
    type Error = CircuitError;

    fn try_from(record: &BalanceRecord) -> Result<Self> {
        Ok(Self {
            balance: to_field(&record.balance, "balance")?,
            storage: to_field(&record.storage_root, "storageRoot")?,
        })
    }
}

impl From<&BalanceLeaf> for BalanceRecord {
    fn from(leaf: &BalanceLeaf) -> Self {
        Self {
            balance: to_biguint(leaf.balance),
            storage_root: to_biguint(leaf.storage),
        }
    }
}

/// Variables of a balance leaf.
#[derive(Clone)]
pub struct BalanceState {
    pub balance: FpVar<Fr>,
    pub storage: FpVar<Fr>,
}

impl LeafState for BalanceState {
    type Record = BalanceRecord;

    const KIND: &'static str = "balance";
    const FIELD_NAMES: &'static [&'static str] = &["balance", "storage"];

    fn hash_params() -> &'static HashParams {
        &BALANCE_LEAF_HASH
    }

    fn inputs(&self) -> Vec<FpVar<Fr>> {
        vec![self.balance.clone(), self.storage.clone()]
    }
}

/// Allocates the two variables of a balance leaf.
#[derive(Clone)]
pub struct BalanceGadget {
    pub balance: FpVar<Fr>,
    pub storage: FpVar<Fr>,
    prefix: String,
}

impl AllocVar<BalanceLeaf, Fr> for BalanceGadget {
    fn new_variable<T: Borrow<BalanceLeaf>>(
        cs: impl Into<Namespace<Fr>>,
        f: impl FnOnce() -> std::result::Result<T, SynthesisError>,
        mode: AllocationMode,
    ) -> std::result::Result<Self, SynthesisError> {
        let ns = cs.into();
        let cs = ns.cs();
        let leaf = f().map(|l| *l.borrow());

        let balance =
            FpVar::new_variable(ark_relations::ns!(cs, "balance"), || leaf.map(|l| l.balance), mode)?;
        let storage =
            FpVar::new_variable(ark_relations::ns!(cs, "storage"), || leaf.map(|l| l.storage), mode)?;

        Ok(Self {
            balance,
            storage,
            prefix: String::new(),
        })
    }
}

impl BalanceGadget {
    /// Allocate the leaf as private witnesses and assign them from `record`.
    pub fn new(
        cs: ConstraintSystemRef<Fr>,
        record: Option<&BalanceRecord>,
        prefix: &str,
    ) -> Result<Self> {
        let leaf = record.map(BalanceLeaf::try_from).transpose()?;
        let mut gadget = Self::new_witness(ark_relations::ns!(cs, "balance_leaf"), || {
            leaf.ok_or(SynthesisError::AssignmentMissing)
        })?;
        gadget.prefix = prefix.to_owned();
        Ok(gadget)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn state(&self) -> BalanceState {
        BalanceState {
            balance: self.balance.clone(),
            storage: self.storage.clone(),
        }
    }
}
