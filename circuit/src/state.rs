//! # Exchange State -- Out-of-Circuit Reference
//!
//! The two-level state the circuits prove transitions of:
//!
//! ```text
//! accounts tree (depth A)
//!   leaf = H5(owner, publicKeyX, publicKeyY, nonce, balancesRoot)
//!                                                   |
//!                          balance tree (depth B) --+
//!                            leaf = H2(balance, storage)
//! ```
//!
//! Every mutation returns the update record the corresponding gadget
//! witnesses: the leaf before and after, the shared authentication path and
//! both roots. A circuit built from these records is satisfied exactly when
//! the gadgets agree with this reference bit for bit.
//!
//! A balance update changes only the balance tree. The owning account leaf
//! still carries the old `balancesRoot` until the caller follows up with an
//! account update, which is how a circuit chains the two.

use std::collections::HashMap;

use ark_bn254::Fr;
use itertools::Itertools;
use num_bigint::BigUint;
use tracing::debug;

use crate::error::Result;
use crate::field::to_biguint;
use crate::gadgets::{AccountLeaf, BalanceLeaf};
use crate::merkle::{check_index, PathUpdate, SparseMerkleTree};
use crate::witness::{
    AccountRecord, AccountUpdateRecord, BalanceRecord, BalanceUpdateRecord, DepositRecord,
    ProofRecord, UpdateRecord,
};

// ---------------------------------------------------------------------------
// Balance trees
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct BalanceTree<const B: usize> {
    tree: SparseMerkleTree<B>,
    leaves: HashMap<u64, BalanceLeaf>,
}

impl<const B: usize> BalanceTree<B> {
    fn new() -> Self {
        Self {
            tree: SparseMerkleTree::new(BalanceLeaf::default().hash()),
            leaves: HashMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// ExchangeState
// ---------------------------------------------------------------------------

/// Accounts tree of depth `A` whose leaves embed balance trees of depth `B`.
#[derive(Clone, Debug)]
pub struct ExchangeState<const A: usize, const B: usize> {
    accounts: SparseMerkleTree<A>,
    account_leaves: HashMap<u64, AccountLeaf>,
    balances: HashMap<u64, BalanceTree<B>>,
    empty_balances_root: Fr,
}

impl<const A: usize, const B: usize> Default for ExchangeState<A, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const A: usize, const B: usize> ExchangeState<A, B> {
    /// A state where every account is empty.
    pub fn new() -> Self {
        let empty_balances_root = BalanceTree::<B>::new().tree.root();
        let empty_account = AccountLeaf::empty(empty_balances_root);
        Self {
            accounts: SparseMerkleTree::new(empty_account.hash()),
            account_leaves: HashMap::new(),
            balances: HashMap::new(),
            empty_balances_root,
        }
    }

    /// Root of the accounts tree.
    pub fn root(&self) -> Fr {
        self.accounts.root()
    }

    /// Root of an untouched balance tree.
    pub fn empty_balances_root(&self) -> Fr {
        self.empty_balances_root
    }

    pub fn account(&self, account_id: u64) -> Result<AccountLeaf> {
        check_index(account_id, A)?;
        Ok(self
            .account_leaves
            .get(&account_id)
            .copied()
            .unwrap_or_else(|| AccountLeaf::empty(self.empty_balances_root)))
    }

    pub fn balance(&self, account_id: u64, token_id: u64) -> Result<BalanceLeaf> {
        check_index(account_id, A)?;
        check_index(token_id, B)?;
        Ok(self
            .balances
            .get(&account_id)
            .and_then(|t| t.leaves.get(&token_id))
            .copied()
            .unwrap_or_default())
    }

    /// Current root of an account's balance tree. Differs from the account
    /// leaf's `balances_root` between a balance update and its account update.
    pub fn balances_root(&self, account_id: u64) -> Fr {
        self.balances
            .get(&account_id)
            .map(|t| t.tree.root())
            .unwrap_or(self.empty_balances_root)
    }

    /// Replace one balance leaf.
    pub fn update_balance(
        &mut self,
        account_id: u64,
        token_id: u64,
        leaf: BalanceLeaf,
    ) -> Result<BalanceUpdateRecord> {
        let before = self.balance(account_id, token_id)?;
        let balances = self
            .balances
            .entry(account_id)
            .or_insert_with(BalanceTree::new);
        let path = balances.tree.update(token_id, leaf.hash())?;
        balances.leaves.insert(token_id, leaf);
        Ok(update_record(
            path,
            BalanceRecord::from(&before),
            BalanceRecord::from(&leaf),
        ))
    }

    /// Replace one account leaf.
    pub fn update_account(&mut self, account_id: u64, leaf: AccountLeaf) -> Result<AccountUpdateRecord> {
        let before = self.account(account_id)?;
        let path = self.accounts.update(account_id, leaf.hash())?;
        self.account_leaves.insert(account_id, leaf);
        Ok(update_record(
            path,
            AccountRecord::from(&before),
            AccountRecord::from(&leaf),
        ))
    }

    /// Assign an owner and public key to an account, keeping its nonce and
    /// balances.
    pub fn open_account(
        &mut self,
        account_id: u64,
        owner: Fr,
        public_key: (Fr, Fr),
    ) -> Result<AccountUpdateRecord> {
        let leaf = AccountLeaf {
            owner,
            public_key_x: public_key.0,
            public_key_y: public_key.1,
            ..self.account(account_id)?
        };
        self.update_account(account_id, leaf)
    }

    /// Credit `amount` of `token_id` to an account: a balance update chained
    /// into an account update that only changes `balancesRoot`.
    pub fn deposit(&mut self, account_id: u64, token_id: u64, amount: u128) -> Result<DepositRecord> {
        let balance_before = self.balance(account_id, token_id)?;
        let balance_after = BalanceLeaf {
            balance: balance_before.balance + Fr::from(amount),
            ..balance_before
        };
        let balance_update = self.update_balance(account_id, token_id, balance_after)?;

        let account_after = AccountLeaf {
            balances_root: self.balances_root(account_id),
            ..self.account(account_id)?
        };
        let account_update = self.update_account(account_id, account_after)?;

        debug!(account_id, token_id, amount, root = %self.root(), "deposit applied");
        Ok(DepositRecord {
            account_id,
            token_id,
            amount: BigUint::from(amount),
            balance_update,
            account_update,
        })
    }
}

fn update_record<L>(path: PathUpdate, before: L, after: L) -> UpdateRecord<L> {
    UpdateRecord {
        root_before: to_biguint(path.root_before),
        root_after: to_biguint(path.root_after),
        proof: ProofRecord {
            data: path.proof.into_iter().map(to_biguint).collect_vec(),
        },
        before,
        after,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::to_field;
    use crate::merkle::compute_root;

    type State = ExchangeState<2, 2>;

    fn root_of<L>(record: &UpdateRecord<L>, leaf_hash: Fr, index: u64) -> Fr {
        let proof: Vec<Fr> = record
            .proof
            .data
            .iter()
            .map(|v| to_field(v, "proof").unwrap())
            .collect();
        compute_root(leaf_hash, index, &proof).unwrap()
    }

    #[test]
    fn empty_state_is_consistent() {
        let state = State::new();
        let account = state.account(3).unwrap();
        assert_eq!(account.balances_root, state.empty_balances_root());
        assert_eq!(state.balance(3, 1).unwrap(), BalanceLeaf::default());
        assert_eq!(state.balances_root(3), state.empty_balances_root());
    }

    #[test]
    fn deposit_chains_balance_into_account() {
        let mut state = State::new();
        state
            .open_account(5, Fr::from(42u64), (Fr::from(7u64), Fr::from(11u64)))
            .unwrap();
        let root_before = state.root();

        let deposit = state.deposit(5, 3, 50).unwrap();
        assert_eq!(to_field(&deposit.account_update.root_before, "r").unwrap(), root_before);
        assert_eq!(to_field(&deposit.account_update.root_after, "r").unwrap(), state.root());
        assert_eq!(
            deposit.account_update.after.balances_root,
            deposit.balance_update.root_after
        );
        assert_eq!(deposit.account_update.after.owner, BigUint::from(42u32));
        assert_eq!(state.balance(5, 3).unwrap().balance, Fr::from(50u64));

        let after = AccountLeaf::try_from(&deposit.account_update.after).unwrap();
        assert_eq!(root_of(&deposit.account_update, after.hash(), 5), state.root());
        let before = AccountLeaf::try_from(&deposit.account_update.before).unwrap();
        assert_eq!(root_of(&deposit.account_update, before.hash(), 5), root_before);
    }

    #[test]
    fn repeated_deposits_accumulate() {
        let mut state = State::new();
        state.deposit(1, 0, 100).unwrap();
        let second = state.deposit(1, 0, 50).unwrap();
        assert_eq!(second.balance_update.before.balance, BigUint::from(100u32));
        assert_eq!(second.balance_update.after.balance, BigUint::from(150u32));
    }

    #[test]
    fn out_of_range_ids_are_rejected() {
        let mut state = State::new();
        assert!(state.deposit(16, 0, 1).is_err());
        assert!(state.deposit(0, 16, 1).is_err());
    }
}
