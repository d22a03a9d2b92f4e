#![no_main]

use libfuzzer_sys::fuzz_target;

use arbitrary::Arbitrary;
use loquat::IntMap;
use std::collections::HashMap as StdHashMap;

// Values are references into a fixed arena so results can be compared by
// contents against the std oracle.
static VALUES: [u16; 256] = {
    let mut values = [0u16; 256];
    let mut i = 0;
    while i < values.len() {
        values[i] = i as u16;
        i += 1;
    }
    values
};

#[derive(Debug, Arbitrary)]
enum Operation {
    Insert(u64, u8),
    Get(u64),
    Len,
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    operations: Vec<Operation>,
}

// The integer table never removes entries, so the std map is an exact
// oracle, length included.
fn fuzz_intmap(input: FuzzInput) {
    let mut std_map = StdHashMap::new();
    let mut int_map = IntMap::with_capacity(4);

    for op in input.operations {
        match op {
            Operation::Insert(k, v) => {
                let std_result = std_map.insert(k, v as u16);
                let int_result = int_map.insert(k, &VALUES[v as usize]);
                assert_eq!(std_result, int_result.copied());
            }
            Operation::Get(k) => {
                assert_eq!(std_map.get(&k).copied(), int_map.get(k).copied());
            }
            Operation::Len => {
                assert_eq!(std_map.len(), int_map.len());
            }
        }
    }

    // Final consistency check.
    for (k, v) in std_map.iter() {
        assert_eq!(int_map.get(*k), Some(&VALUES[*v as usize]));
    }
}

fuzz_target!(|data: FuzzInput| {
    fuzz_intmap(data);
});
