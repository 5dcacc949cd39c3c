use super::*;

use crate::tracker::{is_duplicate, slot_id};
use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::HashMap;

fn validate_prepared<E: Encoder>(mapper: &StringIdMapper<E>) {
    let (keys, ids) = mapper.raw_entries();
    assert_eq!(keys.len(), ids.len(), "key and id arrays must stay aligned");

    for i in 1..keys.len() {
        let prev = (keys[i - 1] as u64, slot_id(ids[i - 1]));
        let cur = (keys[i] as u64, slot_id(ids[i]));
        assert!(prev < cur, "entries must be sorted by (key, id) at {i}");

        if keys[i - 1] != keys[i] {
            assert!(
                !is_duplicate(ids[i]),
                "the first entry of a run is never a duplicate"
            );
        }
    }
    if let Some(&first) = ids.first() {
        assert!(!is_duplicate(first));
    }
}

/// Tiny alphabet so duplicates are common.
fn clustered_input() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(b'a'..=b'c', 0..=3)
}

fn wide_input() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=24)
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    Put(#[proptest(strategy = "clustered_input()")] Vec<u8>),
    PutWide(#[proptest(strategy = "wide_input()")] Vec<u8>),
    Get(#[proptest(strategy = "clustered_input()")] Vec<u8>),
}

/// Apply `ops` to `mapper` and to a first-id-wins model, then compare.
fn check_against_model<E: Encoder>(
    mut mapper: StringIdMapper<E>,
    ops: Vec<Op>,
) -> std::result::Result<(), TestCaseError> {
    let mut inputs: Vec<Vec<u8>> = Vec::new();
    let mut model: HashMap<Vec<u8>, u64> = HashMap::new();
    let mut queries: Vec<Vec<u8>> = Vec::new();

    for op in ops {
        match op {
            Op::Put(input) | Op::PutWide(input) => {
                let id = inputs.len() as u64;
                mapper.put(&input, id).unwrap();
                model.entry(input.clone()).or_insert(id);
                inputs.push(input);
            }
            Op::Get(input) => queries.push(input),
        }
    }
    prop_assert_eq!(mapper.len(), inputs.len());

    let mut duplicates: Vec<Duplicate> = Vec::new();
    let summary = mapper.prepare(&inputs, &mut duplicates).unwrap();
    validate_prepared(&mapper);

    prop_assert_eq!(summary.entries, inputs.len() as u64);
    prop_assert_eq!(summary.duplicates as usize, inputs.len() - model.len());
    prop_assert_eq!(duplicates.len(), inputs.len() - model.len());
    for d in &duplicates {
        prop_assert_eq!(&inputs[d.duplicate as usize], &inputs[d.authoritative as usize]);
        prop_assert!(d.authoritative < d.duplicate);
        prop_assert_eq!(model[&inputs[d.duplicate as usize]], d.authoritative);
    }

    for input in &inputs {
        prop_assert_eq!(mapper.get(input, &inputs), model[input] as i64);
    }
    for query in &queries {
        let expected = model.get(query).map_or(ID_NOT_FOUND, |&id| id as i64);
        let got = mapper.get(query, &inputs);
        // A key held by one entry is trusted without comparing inputs, so an
        // unknown query may only "hit" when it shares a key with an entry.
        if expected == ID_NOT_FOUND && got != ID_NOT_FOUND {
            let encoded = mapper.encoder().encode(query);
            prop_assert_eq!(encoded, mapper.encoder().encode(&inputs[got as usize]));
        } else {
            prop_assert_eq!(got, expected);
        }
    }
    Ok(())
}

fn parallel_config() -> MapperConfig {
    MapperConfig {
        array_factory: LongArrayFactory::Heap,
        initial_capacity: 0,
        processors: Some(2),
        parallel_threshold: 1,
        radix_split_threshold: 4,
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_matches_model(ops in prop::collection::vec(any::<Op>(), 0..=400)) {
        let mapper = StringIdMapper::new().unwrap();
        check_against_model(mapper, ops)?;
    }

    #[test]
    fn prop_matches_model_parallel(ops in prop::collection::vec(any::<Op>(), 0..=400)) {
        let mapper = StringIdMapper::with_config(parallel_config()).unwrap();
        check_against_model(mapper, ops)?;
    }

    #[test]
    fn prop_matches_model_weak_encoder(ops in prop::collection::vec(any::<Op>(), 0..=400)) {
        // Two key bits: nearly every entry collides with others.
        let weak = |input: &[u8]| StringEncoder::encode_bytes(input) >> 62;
        let mapper = StringIdMapper::with_encoder(weak, parallel_config()).unwrap();
        check_against_model(mapper, ops)?;
    }
}

#[test]
fn exhaustive_insert_order_small_set() {
    // Every insertion order of a set with repeats resolves to first-inserted ids.
    let base: Vec<&str> = vec!["a", "b", "a", "c", "b", "a"];
    let mut order: Vec<usize> = (0..base.len()).collect();

    loop {
        let inputs: Vec<&str> = order.iter().map(|&i| base[i]).collect();
        let mut mapper = StringIdMapper::new().unwrap();
        for (id, input) in inputs.iter().enumerate() {
            mapper.put(input, id as u64).unwrap();
        }
        mapper.prepare(&inputs, &mut ()).unwrap();
        validate_prepared(&mapper);

        for (id, input) in inputs.iter().enumerate() {
            let first = inputs.iter().position(|x| x == input).unwrap();
            let got = mapper.get(input, &inputs);
            assert_eq!(got, first as i64, "input {input} at id {id}, order {order:?}");
        }

        if !next_permutation(&mut order) {
            break;
        }
    }
}

fn next_permutation(v: &mut [usize]) -> bool {
    let Some(i) = (1..v.len()).rev().find(|&i| v[i - 1] < v[i]) else {
        return false;
    };
    let j = (i..v.len()).rev().find(|&j| v[j] > v[i - 1]).unwrap();
    v.swap(i - 1, j);
    v[i..].reverse();
    true
}
