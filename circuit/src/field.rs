//! # Field Element Conversions
//!
//! Witness records carry unreduced non-negative integers so that a value
//! outside the field can be represented, and rejected, instead of being
//! silently reduced modulo `r`. This module owns that boundary:
//!
//! - [`to_field`] converts a [`BigUint`] into an [`Fr`] or fails with
//!   [`CircuitError::Domain`];
//! - [`to_field_vec`] does the same for a path, checking its length;
//! - [`decimal`] and [`decimal_vec`] are `serde` adapters that read and
//!   write decimal strings (JSON numbers are accepted on input).

use ark_bn254::Fr;
use ark_ff::PrimeField;
use lazy_static::lazy_static;
use num_bigint::BigUint;

use crate::error::{CircuitError, Result};

lazy_static! {
    /// The BN254 scalar field modulus as a big integer.
    pub static ref MODULUS: BigUint = BigUint::from(Fr::MODULUS);
}

/// Convert an unreduced integer into a field element.
///
/// Fails with [`CircuitError::Domain`] when `value >= r`; `what` names the
/// offending field in the error message.
pub fn to_field(value: &BigUint, what: &str) -> Result<Fr> {
    if *value >= *MODULUS {
        return Err(CircuitError::domain(format!(
            "{what} = {value} exceeds the field modulus"
        )));
    }
    Ok(Fr::from(value.clone()))
}

/// Convert a sequence of unreduced integers, requiring exactly `expected`
/// entries.
pub fn to_field_vec(values: &[BigUint], expected: usize, what: &str) -> Result<Vec<Fr>> {
    if values.len() != expected {
        return Err(CircuitError::domain(format!(
            "{what} has {} elements, expected {expected}",
            values.len()
        )));
    }
    values
        .iter()
        .enumerate()
        .map(|(i, v)| to_field(v, &format!("{what}[{i}]")))
        .collect()
}

/// Lift a field element back into its canonical integer representative.
pub fn to_biguint(value: Fr) -> BigUint {
    value.into()
}

/// `serde` adapter for a single [`BigUint`] as a decimal string.
pub mod decimal {
    use num_bigint::BigUint;
    use num_traits::Num;
    use serde::{de, Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        deserializer.deserialize_any(DecimalVisitor)
    }

    pub(super) struct DecimalVisitor;

    impl<'de> de::Visitor<'de> for DecimalVisitor {
        type Value = BigUint;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a non-negative decimal integer as a string or number")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<BigUint, E> {
            Ok(BigUint::from(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<BigUint, E> {
            u64::try_from(v)
                .map(BigUint::from)
                .map_err(|_| E::custom(format!("negative value {v}")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<BigUint, E> {
            BigUint::from_str_radix(v.trim(), 10)
                .map_err(|_| E::custom(format!("invalid decimal integer {v:?}")))
        }
    }
}

/// `serde` adapter for a `Vec<BigUint>` as a list of decimal strings.
pub mod decimal_vec {
    use num_bigint::BigUint;
    use serde::{de, ser::SerializeSeq, Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(values: &[BigUint], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for v in values {
            seq.serialize_element(&v.to_str_radix(10))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<BigUint>, D::Error> {
        deserializer.deserialize_seq(SeqVisitor)
    }

    struct Element(BigUint);

    impl<'de> de::Deserialize<'de> for Element {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer
                .deserialize_any(super::decimal::DecimalVisitor)
                .map(Element)
        }
    }

    struct SeqVisitor;

    impl<'de> de::Visitor<'de> for SeqVisitor {
        type Value = Vec<BigUint>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a list of non-negative decimal integers")
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<BigUint>, A::Error> {
            let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(Element(v)) = seq.next_element()? {
                out.push(v);
            }
            Ok(out)
        }
    }
}
