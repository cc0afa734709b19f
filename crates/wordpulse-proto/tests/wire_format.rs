//! Wire format tests
//!
//! Pins the exact JSON emitted to participants and checks that the command
//! decoder never panics on hostile input.

use proptest::prelude::*;
use wordpulse_proto::{ClientCommand, ProtocolError, ServerMessage};

#[test]
fn room_created_wire_shape() {
    let msg = ServerMessage::room_created("abcd1", "Animals");
    insta::assert_snapshot!(
        msg.encode().unwrap(),
        @r#"{"type":"room-created","room":"abcd1","name":"Animals","participants":1}"#
    );
}

#[test]
fn room_joined_wire_shape() {
    let msg = ServerMessage::room_joined("abcd1", "Animals", 2, Vec::new());
    insta::assert_snapshot!(
        msg.encode().unwrap(),
        @r#"{"type":"room-joined","room":"abcd1","name":"Animals","participants":2,"words":[]}"#
    );
}

#[test]
fn disconnect_count_wire_shape() {
    let msg = ServerMessage::participants_changed("abcd1", "Animals", 1);
    insta::assert_snapshot!(
        msg.encode().unwrap(),
        @r#"{"type":"room-joined","room":"abcd1","name":"Animals","participants":1}"#
    );
}

#[test]
fn words_added_wire_shape() {
    let words = ["cat", "dog", "cat"].map(String::from).to_vec();
    let msg = ServerMessage::words_added("abcd1", words);
    insta::assert_snapshot!(
        msg.encode().unwrap(),
        @r#"{"type":"words-added","room":"abcd1","words":["cat","dog","cat"]}"#
    );
}

#[test]
fn client_commands_use_kebab_case_types() {
    let cmd = ClientCommand::AddWord { room: "abcd1".to_string(), words: "cat dog".to_string() };
    insta::assert_snapshot!(
        cmd.encode().unwrap(),
        @r#"{"type":"add-word","room":"abcd1","words":"cat dog"}"#
    );
}

proptest! {
    /// Property: arbitrary text never panics the decoder
    #[test]
    fn prop_decode_never_panics(text in ".{0,256}") {
        let _ = ClientCommand::decode(&text);
    }

    /// Property: any string-valued fields are accepted verbatim
    #[test]
    fn prop_add_word_fields_preserved(room in ".{0,32}", words in ".{0,128}") {
        let text = serde_json::json!({ "type": "add-word", "room": room, "words": words })
            .to_string();

        let cmd = ClientCommand::decode(&text)?;
        prop_assert_eq!(cmd, ClientCommand::AddWord { room, words });
    }

    /// Property: unrecognised type strings are reported as unknown, not malformed
    #[test]
    fn prop_unknown_type_is_reported(kind in "[a-z]{1,12}") {
        prop_assume!(!matches!(kind.as_str(), "create-room" | "join-room" | "add-word"));
        let text = serde_json::json!({ "type": kind, "room": "r" }).to_string();

        let err = ClientCommand::decode(&text).unwrap_err();
        prop_assert_eq!(err, ProtocolError::UnknownType(kind));
    }
}
