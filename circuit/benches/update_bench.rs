// State update benchmarks.
//
// Covers native Poseidon hashing, the native sparse Merkle update, gadget
// synthesis of a single account update at the configured depth, and Groth16
// proving and verification of a deposit on small trees.

use criterion::{criterion_group, criterion_main, Criterion};

use ark_bn254::Fr;
use ark_ff::UniformRand;
use ark_r1cs_std::{alloc::AllocVar, fields::fp::FpVar};
use ark_relations::r1cs::ConstraintSystem;
use ark_std::rand::{rngs::StdRng, SeedableRng};

use state_circuit::config::{ACCOUNT_TREE_DEPTH, BALANCE_TREE_DEPTH};
use state_circuit::field::to_field;
use state_circuit::merkle::{address_bits_var, SparseMerkleTree};
use state_circuit::poseidon::{hash_node, ACCOUNT_LEAF_HASH};
use state_circuit::zkp::{check_satisfied, DepositCircuit, DepositProver};
use state_circuit::{AccountGadget, ExchangeState, NullSink, UpdateAccountGadget};

fn bench_poseidon(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let leaf: Vec<Fr> = (0..5).map(|_| Fr::rand(&mut rng)).collect();
    let node = [Fr::rand(&mut rng); 4];

    c.bench_function("poseidon/account_leaf", |b| {
        b.iter(|| ACCOUNT_LEAF_HASH.hash(&leaf).unwrap());
    });
    c.bench_function("poseidon/merkle_node", |b| {
        b.iter(|| hash_node(&node));
    });
}

fn bench_native_tree_update(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let mut tree = SparseMerkleTree::<ACCOUNT_TREE_DEPTH>::new(Fr::from(0u64));
    let mut index = 0u64;

    c.bench_function("merkle/native_update_depth16", |b| {
        b.iter(|| {
            index = index.wrapping_mul(6364136223846793005).wrapping_add(1) & 0xFFFF_FFFF;
            tree.update(index, Fr::rand(&mut rng)).unwrap()
        });
    });
}

fn bench_account_update_synthesis(c: &mut Criterion) {
    let mut state = ExchangeState::<ACCOUNT_TREE_DEPTH, BALANCE_TREE_DEPTH>::new();
    let record = state.deposit(77, 1, 100).unwrap().account_update;

    c.bench_function("gadget/update_account_depth16", |b| {
        b.iter(|| {
            let cs = ConstraintSystem::<Fr>::new_ref();
            let root = FpVar::new_input(cs.clone(), || Ok(to_field(&record.root_before, "root").unwrap()))
                .unwrap();
            let bits = address_bits_var(cs.clone(), Some(77), ACCOUNT_TREE_DEPTH).unwrap();
            let before = AccountGadget::new(cs.clone(), Some(&record.before), "before").unwrap();
            let after = AccountGadget::new(cs.clone(), Some(&record.after), "after").unwrap();
            UpdateAccountGadget::new(
                cs.clone(),
                &root,
                &bits,
                before.state(),
                after.state(),
                Some(&record),
                &NullSink,
                "bench",
            )
            .unwrap();
            cs.num_constraints()
        });
    });
}

fn bench_deposit_check(c: &mut Criterion) {
    let mut state = ExchangeState::<ACCOUNT_TREE_DEPTH, BALANCE_TREE_DEPTH>::new();
    let record = state.deposit(3, 4, 500).unwrap();
    let circuit = DepositCircuit::<ACCOUNT_TREE_DEPTH, BALANCE_TREE_DEPTH>::new(record);

    c.bench_function("deposit/check_satisfied_full_depth", |b| {
        b.iter(|| check_satisfied(&circuit).unwrap());
    });
}

fn bench_groth16_deposit(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let (prover, verifier) = DepositProver::<4, 2>::setup(&mut rng).unwrap();
    let mut state = ExchangeState::<4, 2>::new();
    let record = state.deposit(9, 2, 1_000).unwrap();
    let proof = prover.prove(record.clone(), &mut rng).unwrap();

    c.bench_function("deposit/groth16_prove_depth4", |b| {
        b.iter(|| prover.prove(record.clone(), &mut rng).unwrap());
    });
    c.bench_function("deposit/groth16_verify", |b| {
        b.iter(|| verifier.verify_record(&proof, &record).unwrap());
    });
}

criterion_group!(
    benches,
    bench_poseidon,
    bench_native_tree_update,
    bench_account_update_synthesis,
    bench_deposit_check,
    bench_groth16_deposit,
);
criterion_main!(benches);
