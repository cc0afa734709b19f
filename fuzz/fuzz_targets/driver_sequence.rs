//! Fuzz target for the server driver
//!
//! Interprets the input as a sequence of participant operations and applies
//! each one to both the simulated server and the reference model.
//!
//! # Invariants
//!
//! - Every connection receives exactly the events the model predicts
//! - Room names, membership counts and word lists match the model
//! - No delivery to a live in-memory handle ever fails

#![no_main]

use std::collections::HashMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use wordpulse_harness::{ClientId, ModelServer, Operation, SimServer, room_key};
use wordpulse_proto::{ClientCommand, ServerMessage};

const NUM_CLIENTS: u8 = 4;

#[derive(Debug, Arbitrary)]
struct Scenario {
    seed: u64,
    ops: Vec<Operation>,
}

struct Harness {
    model: ModelServer,
    server: SimServer,
    current: HashMap<ClientId, u64>,
    sessions: HashMap<ClientId, Vec<u64>>,
}

impl Harness {
    fn new(seed: u64) -> Self {
        let mut harness = Self {
            model: ModelServer::new(),
            server: SimServer::with_seed(seed),
            current: HashMap::new(),
            sessions: HashMap::new(),
        };
        for client_id in 0..NUM_CLIENTS {
            harness.apply(&Operation::Connect { client_id });
        }
        harness
    }

    fn send(&mut self, client_id: ClientId, command: ClientCommand) {
        if let Some(&session_id) = self.current.get(&client_id) {
            let report = self.server.send(session_id, command).expect("connected session");
            assert!(report.is_clean(), "delivery failed: {report:?}");
        }
    }

    fn apply(&mut self, op: &Operation) {
        let client_id = op.client_id() % NUM_CLIENTS;
        match op {
            Operation::Connect { .. } => {
                let _ = self.model.connect(client_id);
                if !self.current.contains_key(&client_id) {
                    let session_id = self.server.connect().expect("under connection limit");
                    self.current.insert(client_id, session_id);
                    self.sessions.entry(client_id).or_default().push(session_id);
                }
            },
            Operation::CreateRoom { room_id, name, .. } => {
                let room = room_key(*room_id);
                let name = format!("Room {name}");
                let _ = self.model.create_room(client_id, &room, &name);
                self.send(client_id, ClientCommand::CreateRoom { room, name });
            },
            Operation::JoinRoom { room_id, .. } => {
                let room = room_key(*room_id);
                let _ = self.model.join_room(client_id, &room);
                self.send(client_id, ClientCommand::JoinRoom { room });
            },
            Operation::AddWords { room_id, words, .. } => {
                let room = room_key(*room_id);
                let words = words.to_text();
                let _ = self.model.add_words(client_id, &room, &words);
                self.send(client_id, ClientCommand::AddWord { room, words });
            },
            Operation::Disconnect { .. } => {
                let _ = self.model.disconnect(client_id);
                if let Some(session_id) = self.current.remove(&client_id) {
                    let report = self.server.disconnect(session_id).expect("connected session");
                    assert!(report.is_clean(), "delivery failed: {report:?}");
                }
            },
        }
    }

    fn inbox(&self, client_id: ClientId) -> Vec<ServerMessage> {
        self.sessions
            .get(&client_id)
            .map(|ids| ids.iter().flat_map(|&id| self.server.inbox(id)).collect())
            .unwrap_or_default()
    }

    fn check(&self) {
        for client_id in 0..NUM_CLIENTS {
            assert_eq!(self.model.inbox(client_id), self.inbox(client_id).as_slice());
        }

        let driver = self.server.driver();
        assert_eq!(self.model.rooms().count(), driver.room_count());
        for (id, room) in self.model.rooms() {
            let snapshot = driver.room_snapshot(id).expect("model room exists in driver");
            assert_eq!(snapshot.name, room.name);
            assert_eq!(snapshot.participants, room.members.len());
            assert_eq!(snapshot.words, room.words);
        }
    }
}

fuzz_target!(|scenario: Scenario| {
    let mut harness = Harness::new(scenario.seed);

    for op in scenario.ops.iter().take(256) {
        harness.apply(op);
        harness.check();
    }
});
