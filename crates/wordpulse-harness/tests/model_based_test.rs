//! Model-based property tests.
//!
//! These tests generate random operation sequences and verify that the real
//! implementation behaves identically to the reference model.
//!
//! # Architecture
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!      ModelServer    SimServer       Compare
//!      (reference)    (driver)        inboxes + rooms
//! ```

use std::collections::HashMap;

use proptest::prelude::*;
use wordpulse_core::SessionId;
use wordpulse_harness::{
    ClientId, ModelServer, Operation, ROOM_SPACE, SimServer, SmallWords, room_key,
};
use wordpulse_proto::{ClientCommand, ServerMessage};

const NUM_CLIENTS: u8 = 4;

/// Real system wrapper that mirrors ModelServer's interface.
struct RealWorld {
    server: SimServer,
    /// Every session a client has opened, oldest first
    sessions: HashMap<ClientId, Vec<SessionId>>,
    /// Open session per client
    current: HashMap<ClientId, SessionId>,
}

impl RealWorld {
    fn new(seed: u64) -> Self {
        Self { server: SimServer::with_seed(seed), sessions: HashMap::new(), current: HashMap::new() }
    }

    fn connect(&mut self, client_id: ClientId) {
        if self.current.contains_key(&client_id) {
            return;
        }
        let session_id = self.server.connect().unwrap();
        self.current.insert(client_id, session_id);
        self.sessions.entry(client_id).or_default().push(session_id);
    }

    fn send(&mut self, client_id: ClientId, command: ClientCommand) {
        if let Some(&session_id) = self.current.get(&client_id) {
            let report = self.server.send(session_id, command).unwrap();
            assert!(report.is_clean(), "delivery failed: {report:?}");
        }
    }

    fn disconnect(&mut self, client_id: ClientId) {
        if let Some(session_id) = self.current.remove(&client_id) {
            let report = self.server.disconnect(session_id).unwrap();
            assert!(report.is_clean(), "delivery failed: {report:?}");
        }
    }

    fn inbox(&self, client_id: ClientId) -> Vec<ServerMessage> {
        self.sessions
            .get(&client_id)
            .map(|ids| ids.iter().flat_map(|&id| self.server.inbox(id)).collect())
            .unwrap_or_default()
    }
}

fn apply(model: &mut ModelServer, real: &mut RealWorld, op: &Operation) {
    match op {
        Operation::Connect { client_id } => {
            let _ = model.connect(*client_id);
            real.connect(*client_id);
        },
        Operation::CreateRoom { client_id, room_id, name } => {
            let room = room_key(*room_id);
            let name = format!("Room {name}");
            let _ = model.create_room(*client_id, &room, &name);
            real.send(*client_id, ClientCommand::CreateRoom { room, name });
        },
        Operation::JoinRoom { client_id, room_id } => {
            let room = room_key(*room_id);
            let _ = model.join_room(*client_id, &room);
            real.send(*client_id, ClientCommand::JoinRoom { room });
        },
        Operation::AddWords { client_id, room_id, words } => {
            let room = room_key(*room_id);
            let words = words.to_text();
            let _ = model.add_words(*client_id, &room, &words);
            real.send(*client_id, ClientCommand::AddWord { room, words });
        },
        Operation::Disconnect { client_id } => {
            let _ = model.disconnect(*client_id);
            real.disconnect(*client_id);
        },
    }
}

fn compare(model: &ModelServer, real: &RealWorld) -> Result<(), TestCaseError> {
    for client_id in 0..NUM_CLIENTS {
        let real_inbox = real.inbox(client_id);
        prop_assert_eq!(
            model.inbox(client_id),
            real_inbox.as_slice(),
            "inbox mismatch for client {}",
            client_id
        );
        prop_assert_eq!(model.is_connected(client_id), real.current.contains_key(&client_id));
    }

    let driver = real.server.driver();
    prop_assert_eq!(model.rooms().count(), driver.room_count());

    for (id, room) in model.rooms() {
        let Some(snapshot) = driver.room_snapshot(id) else {
            return Err(TestCaseError::fail(format!("room {id} missing from driver")));
        };
        prop_assert_eq!(&snapshot.name, &room.name);
        prop_assert_eq!(snapshot.participants, room.members.len());
        prop_assert_eq!(&snapshot.words, &room.words);
    }

    Ok(())
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    let client = 0..NUM_CLIENTS;
    let room = 0..ROOM_SPACE;
    let words = (any::<u8>(), any::<u8>(), any::<u8>())
        .prop_map(|(seed, count, separator)| SmallWords { seed, count, separator });

    prop_oneof![
        1 => client.clone().prop_map(|client_id| Operation::Connect { client_id }),
        2 => (client.clone(), room.clone(), 0u8..3)
            .prop_map(|(client_id, room_id, name)| Operation::CreateRoom { client_id, room_id, name }),
        3 => (client.clone(), room.clone())
            .prop_map(|(client_id, room_id)| Operation::JoinRoom { client_id, room_id }),
        4 => (client.clone(), room, words)
            .prop_map(|(client_id, room_id, words)| Operation::AddWords { client_id, room_id, words }),
        1 => client.prop_map(|client_id| Operation::Disconnect { client_id }),
    ]
}

fn run(seed: u64, ops: &[Operation]) -> Result<(), TestCaseError> {
    let mut model = ModelServer::new();
    let mut real = RealWorld::new(seed);

    for client_id in 0..NUM_CLIENTS {
        apply(&mut model, &mut real, &Operation::Connect { client_id });
    }

    for op in ops {
        apply(&mut model, &mut real, op);
        compare(&model, &real)?;
    }

    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: the driver matches the reference model after every operation
    #[test]
    fn prop_driver_matches_model(
        seed in any::<u64>(),
        ops in prop::collection::vec(operation_strategy(), 1..60)
    ) {
        run(seed, &ops)?;
    }
}

#[test]
fn duplicate_join_and_disconnect_match_model() {
    let ops = [
        Operation::CreateRoom { client_id: 0, room_id: 0, name: 0 },
        Operation::JoinRoom { client_id: 1, room_id: 0 },
        Operation::JoinRoom { client_id: 1, room_id: 0 },
        Operation::AddWords {
            client_id: 2,
            room_id: 0,
            words: SmallWords { seed: 1, count: 2, separator: 2 },
        },
        Operation::Disconnect { client_id: 1 },
        Operation::Connect { client_id: 1 },
        Operation::JoinRoom { client_id: 1, room_id: 0 },
    ];

    run(7, &ops).unwrap();
}
