//! Fuzz target: `ActuationCommand::from_token`
//!
//! Only the exact literals `open` and `closed` may parse; everything else
//! must be a protocol error, never a panic.
//!
//! cargo fuzz run fuzz_command_token

#![no_main]

use gatelink::gate::ActuationCommand;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };
    match ActuationCommand::from_token(token) {
        Ok(cmd) => assert_eq!(cmd.as_str(), token),
        Err(e) => assert_eq!(e.category(), "protocol"),
    }
});
