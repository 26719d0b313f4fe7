//! Fuzz target: `store::decode_record` (merge-on-read)
//!
//! Feeds arbitrary bytes as the stored record.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - History never exceeds `HISTORY_CAPACITY`
//! - The decoded record re-encodes and decodes back to itself
//!
//! cargo fuzz run fuzz_record_decode

#![no_main]

use gatelink::gate::HISTORY_CAPACITY;
use gatelink::store::{decode_record, encode_record};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let record = decode_record(data);
    assert!(record.command_history.len() <= HISTORY_CAPACITY);

    let bytes = encode_record(&record).expect("decoded record must encode");
    let again = decode_record(&bytes);
    assert_eq!(again.target_state, record.target_state);
    assert_eq!(again.command_history.len(), record.command_history.len());
});
