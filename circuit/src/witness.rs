//! # Plaintext Witness Records
//!
//! The structures a prover materialises before witnessing begins. They mirror
//! the JSON the block builder emits: camelCase keys and decimal-string field
//! values.
//!
//! ```text
//! Account       { owner, publicKey: {x, y}, nonce, balancesRoot }
//! BalanceLeaf   { balance, storageRoot }
//! Update<L>     { rootBefore, rootAfter, proof: { data: [..] }, before: L, after: L }
//! Deposit       { accountId, tokenId, amount, balanceUpdate, accountUpdate }
//! ```
//!
//! Values are unreduced integers. Conversion into field elements, and the
//! accompanying range and length checks, happens during witness assignment.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::field;

/// Public key of an account, as the two curve coordinates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyRecord {
    #[serde(with = "field::decimal")]
    pub x: BigUint,
    #[serde(with = "field::decimal")]
    pub y: BigUint,
}

/// Plaintext account leaf.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    #[serde(with = "field::decimal")]
    pub owner: BigUint,
    pub public_key: PublicKeyRecord,
    #[serde(with = "field::decimal")]
    pub nonce: BigUint,
    #[serde(with = "field::decimal")]
    pub balances_root: BigUint,
}

/// Plaintext balance leaf.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceRecord {
    #[serde(with = "field::decimal")]
    pub balance: BigUint,
    #[serde(with = "field::decimal")]
    pub storage_root: BigUint,
}

/// Authentication path: three siblings per tree level, leaf level first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRecord {
    #[serde(with = "field::decimal_vec")]
    pub data: Vec<BigUint>,
}

/// A single leaf update: the leaf before and after, the shared path, and the
/// roots the block builder computed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecord<L> {
    #[serde(with = "field::decimal")]
    pub root_before: BigUint,
    #[serde(with = "field::decimal")]
    pub root_after: BigUint,
    pub proof: ProofRecord,
    pub before: L,
    pub after: L,
}

/// Update of one leaf of the accounts tree.
pub type AccountUpdateRecord = UpdateRecord<AccountRecord>;

/// Update of one leaf of a balance tree.
pub type BalanceUpdateRecord = UpdateRecord<BalanceRecord>;

/// Witness of a deposit: one balance update chained into one account update.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRecord {
    pub account_id: u64,
    pub token_id: u64,
    #[serde(with = "field::decimal")]
    pub amount: BigUint,
    pub balance_update: BalanceUpdateRecord,
    pub account_update: AccountUpdateRecord,
}

impl AccountRecord {
    /// Build a record from small integers. Mostly useful for fixtures.
    pub fn new(owner: u64, public_key: (u64, u64), nonce: u64, balances_root: BigUint) -> Self {
        Self {
            owner: owner.into(),
            public_key: PublicKeyRecord {
                x: public_key.0.into(),
                y: public_key.1.into(),
            },
            nonce: nonce.into(),
            balances_root,
        }
    }
}

impl BalanceRecord {
    /// Build a record from a balance and a storage root.
    pub fn new(balance: impl Into<BigUint>, storage_root: impl Into<BigUint>) -> Self {
        Self {
            balance: balance.into(),
            storage_root: storage_root.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_update_parses_block_json() {
        let json = r#"{
            "rootBefore": "11",
            "rootAfter": "12",
            "proof": { "data": ["0", "1", "2"] },
            "before": {
                "owner": "42",
                "publicKey": { "x": "7", "y": "11" },
                "nonce": 0,
                "balancesRoot": "99"
            },
            "after": {
                "owner": "42",
                "publicKey": { "x": "7", "y": "11" },
                "nonce": "1",
                "balancesRoot": "99"
            }
        }"#;

        let update: AccountUpdateRecord = serde_json::from_str(json).unwrap();
        assert_eq!(update.root_before, BigUint::from(11u32));
        assert_eq!(update.proof.data.len(), 3);
        assert_eq!(update.before.public_key.y, BigUint::from(11u32));
        assert_eq!(update.after.nonce, BigUint::from(1u32));
        assert_eq!(update.after.balances_root, BigUint::from(99u32));
    }

    #[test]
    fn balance_record_serializes_as_decimal_strings() {
        let record = BalanceRecord::new(150u64, 5u64);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["balance"], "150");
        assert_eq!(json["storageRoot"], "5");
    }

    #[test]
    fn negative_and_garbage_values_are_rejected() {
        let negative = r#"{ "balance": -1, "storageRoot": "0" }"#;
        assert!(serde_json::from_str::<BalanceRecord>(negative).is_err());

        let garbage = r#"{ "balance": "0x10", "storageRoot": "0" }"#;
        assert!(serde_json::from_str::<BalanceRecord>(garbage).is_err());
    }

    #[test]
    fn oversized_values_survive_parsing() {
        // Range checking is deferred to witness assignment.
        let huge = "1".repeat(100);
        let json = format!(r#"{{ "balance": "{huge}", "storageRoot": "0" }}"#);
        let record: BalanceRecord = serde_json::from_str(&json).unwrap();
        assert!(record.balance.bits() > 254);
    }
}
