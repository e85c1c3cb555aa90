//! End-to-end behaviour of sessions driven through the controller.

use std::sync::Arc;

use chess_rules::{Position, RuleEngine, Side, StandardRules};
use chess_session::store::{FileStore, MemoryStore, SqliteStore};
use chess_session::{
    AutomatedSource, CheckpointStore, HumanSource, LedgerError, MoveRequest, MoveSource,
    MoverKind, NewSession, Outcome, Proposal, Seats, SessionController, SessionError,
    SideAssignment, Step, Strategy, StrategyError, StrategyFactory, Termination, TurnLedger,
    TurnLoop,
};
use proptest::prelude::*;
use tempfile::TempDir;

/// Plays the legal move whose index is the ply count modulo the move count.
struct Rotating;

impl Strategy for Rotating {
    fn name(&self) -> &str {
        "rotating"
    }

    fn propose(&mut self, request: &MoveRequest<'_>) -> Result<Proposal, StrategyError> {
        let moves = request.legal_moves;
        if moves.is_empty() {
            return Err(StrategyError::BadReply("no legal moves".into()));
        }
        let index = request.position.fullmove_number() as usize % moves.len();
        Ok(Proposal::new(moves[index].to_string(), format!("option {index}")))
    }
}

struct Profiles;

impl StrategyFactory for Profiles {
    fn contains(&self, name: &str) -> bool {
        name == "random"
    }

    fn build(&self, name: &str) -> Result<Box<dyn Strategy>, StrategyError> {
        if self.contains(name) {
            Ok(Box::new(Rotating))
        } else {
            Err(StrategyError::Unknown(name.to_string()))
        }
    }
}

fn controller_with(store: Arc<dyn CheckpointStore>) -> SessionController {
    SessionController::new(Arc::new(StandardRules), store, Arc::new(Profiles))
}

fn controller() -> SessionController {
    controller_with(Arc::new(MemoryStore::new()))
}

fn sides(white: MoverKind, black: MoverKind) -> Option<SideAssignment> {
    Some(SideAssignment::new(white, black))
}

#[test]
fn side_to_move_alternates() {
    let controller = controller();
    let id = controller
        .create_session(NewSession {
            sides: sides(MoverKind::Human, MoverKind::Human),
            ..Default::default()
        })
        .unwrap()
        .id;

    controller.advance(&id, Some("e2e4")).unwrap();
    assert_eq!(controller.snapshot(&id).unwrap().side_to_move, Side::Black);
    controller.advance(&id, Some("e7e5")).unwrap();
    assert_eq!(controller.snapshot(&id).unwrap().side_to_move, Side::White);
}

#[test]
fn malformed_input_leaves_ledger_alone() {
    let controller = controller();
    let id = controller.create_session(NewSession::default()).unwrap().id;
    controller.advance(&id, Some("e2e4")).unwrap();
    controller.advance(&id, None).unwrap();

    let before = controller.ledger(&id).unwrap();
    let err = controller.advance(&id, Some("zz9")).unwrap_err();
    assert!(matches!(err, SessionError::MalformedInput { ref input, .. } if input == "zz9"));
    assert_eq!(controller.ledger(&id).unwrap(), before);
}

#[test]
fn illegal_input_is_replaced_by_automated_move() {
    let controller = controller();
    let id = controller.create_session(NewSession::default()).unwrap().id;

    let reply = controller.advance(&id, Some("e2e5")).unwrap();
    let ply = reply.ply.unwrap();
    assert_eq!(ply.mover.side, Side::White);
    assert_eq!(ply.mover.kind, MoverKind::Automated);
    assert_eq!(ply.rejected_input.as_deref(), Some("e2e5"));
    assert_eq!(controller.ledger(&id).unwrap().len(), 1);
}

#[test]
fn ply_limit_ends_in_a_draw() {
    let controller = controller();
    let id = controller
        .create_session(NewSession {
            sides: sides(MoverKind::Automated, MoverKind::Automated),
            max_plies: Some(6),
            ..Default::default()
        })
        .unwrap()
        .id;

    for _ in 0..6 {
        let reply = controller.advance(&id, None).unwrap();
        assert!(matches!(reply.step, Step::Suspended { .. }));
    }
    assert_eq!(controller.snapshot(&id).unwrap().ply_count, 6);

    let step = controller.advance(&id, None).unwrap().step;
    assert_eq!(controller.snapshot(&id).unwrap().ply_count, 7);
    assert!(matches!(
        step,
        Step::Finished {
            outcome: Outcome::Draw,
            termination: Termination::PlyLimit,
            ..
        }
    ));
    assert!(matches!(
        controller.advance(&id, None),
        Err(SessionError::AlreadyFinished {
            outcome: Outcome::Draw,
            ..
        })
    ));
}

#[test]
fn black_checkmate_closes_the_session() {
    let controller = controller();
    let id = controller
        .create_session(NewSession {
            sides: sides(MoverKind::Human, MoverKind::Human),
            ..Default::default()
        })
        .unwrap()
        .id;

    for mv in ["f2f3", "e7e5", "g2g4"] {
        controller.advance(&id, Some(mv)).unwrap();
    }
    let reply = controller.advance(&id, Some("d8h4")).unwrap();
    assert!(matches!(
        reply.step,
        Step::Finished {
            outcome: Outcome::BlackWins,
            ..
        }
    ));

    let snapshot = controller.snapshot(&id).unwrap();
    assert_eq!(snapshot.outcome, Outcome::BlackWins);
    assert_eq!(snapshot.summary.as_deref(), Some("Black wins by checkmate."));
    assert!(matches!(
        controller.advance(&id, Some("e2e4")),
        Err(SessionError::AlreadyFinished { .. })
    ));
    assert_eq!(controller.ledger(&id).unwrap().len(), 4);
}

#[test]
fn restored_session_continues_like_the_original() {
    let dir = TempDir::new().unwrap();
    let new_session = NewSession {
        sides: sides(MoverKind::Automated, MoverKind::Automated),
        ..Default::default()
    };

    let (id, ledger) = {
        let controller = controller_with(Arc::new(FileStore::open(dir.path()).unwrap()));
        let id = controller.create_session(new_session).unwrap().id;
        for _ in 0..5 {
            controller.advance(&id, None).unwrap();
        }
        (id.clone(), controller.ledger(&id).unwrap())
    };

    // Continue in memory from the same ledger.
    let rules = StandardRules;
    let seats = Seats::new(
        MoveSource::Automated(AutomatedSource::new(Box::new(Rotating), 5)),
        MoveSource::Automated(AutomatedSource::new(Box::new(Rotating), 5)),
    );
    let mut in_memory = TurnLoop::new(&rules, ledger, seats, 500);
    let expected = in_memory.advance(None).unwrap();

    // Continue from the checkpoint in a fresh controller.
    let controller = controller_with(Arc::new(FileStore::open(dir.path()).unwrap()));
    let restored = controller.advance(&id, None).unwrap();

    assert_eq!(restored, expected);
    assert_eq!(controller.ledger(&id).unwrap(), *in_memory.ledger());
}

#[test]
fn sqlite_store_backs_a_full_game() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sessions.db");
    let id = {
        let controller = controller_with(Arc::new(SqliteStore::open(&path).unwrap()));
        let id = controller.create_session(NewSession::default()).unwrap().id;
        controller.advance(&id, Some("d2d4")).unwrap();
        id
    };

    let controller = controller_with(Arc::new(SqliteStore::open(&path).unwrap()));
    let reply = controller.advance(&id, None).unwrap();
    assert_eq!(reply.ply.unwrap().mover.side, Side::Black);
    assert_eq!(controller.snapshot(&id).unwrap().ply_count, 2);
}

#[test]
fn produced_ledgers_verify_and_tampering_is_caught() {
    let controller = controller();
    let id = controller
        .create_session(NewSession {
            sides: sides(MoverKind::Automated, MoverKind::Automated),
            max_plies: Some(20),
            ..Default::default()
        })
        .unwrap()
        .id;
    while controller.advance(&id, None).is_ok() {}

    let ledger = controller.ledger(&id).unwrap();
    assert!(ledger.is_finished());
    ledger.verify(&StandardRules).unwrap();

    let mut json: serde_json::Value = serde_json::to_value(&ledger).unwrap();
    json["plies"][3]["position"] = serde_json::Value::String(Position::STARTING_FEN.to_string());
    let tampered: TurnLedger = serde_json::from_value(json).unwrap();
    assert!(matches!(
        tampered.verify(&StandardRules),
        Err(LedgerError::PositionMismatch { index: 3, .. })
    ));
}

#[test]
fn rewind_forks_from_any_ply() {
    let controller = controller();
    let id = controller
        .create_session(NewSession {
            sides: sides(MoverKind::Automated, MoverKind::Automated),
            max_plies: Some(12),
            ..Default::default()
        })
        .unwrap()
        .id;
    while controller.advance(&id, None).is_ok() {}
    let ledger = controller.ledger(&id).unwrap();

    for n in 0..=ledger.len() {
        let fork = ledger.rewind(n).unwrap();
        assert_eq!(fork.len(), n);
        assert_eq!(fork.outcome(), Outcome::InProgress);
        let expected = match n {
            0 => ledger.initial(),
            n => &ledger.plies()[n - 1].position,
        };
        assert_eq!(fork.current_position(), expected);
        fork.verify(&StandardRules).unwrap();
    }
}

#[test]
fn human_seat_with_interactive_channel() {
    struct Script(Vec<&'static str>);

    impl chess_session::HumanInput for Script {
        fn read_move(&mut self, _request: &MoveRequest<'_>) -> std::io::Result<String> {
            Ok(self.0.remove(0).to_string())
        }
    }

    let rules = StandardRules;
    let seats = Seats::new(
        MoveSource::Human(HumanSource::interactive(Script(vec!["e2e4", "g1f3"]))),
        MoveSource::Automated(AutomatedSource::new(Box::new(Rotating), 5)),
    );
    let mut turn_loop = TurnLoop::new(&rules, TurnLedger::new(rules.starting_position()), seats, 500);
    for _ in 0..4 {
        turn_loop.advance(None).unwrap();
    }
    let sans: Vec<&str> = turn_loop
        .ledger()
        .plies()
        .iter()
        .map(|ply| ply.san.as_str())
        .collect();
    assert_eq!(sans[0], "e4");
    assert_eq!(sans[2], "Nf3");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn positions_stay_one_ahead_of_moves(choices in proptest::collection::vec(0usize..256, 1..40)) {
        let rules = StandardRules;
        let controller = controller();
        let id = controller
            .create_session(NewSession {
                sides: sides(MoverKind::Human, MoverKind::Human),
                ..Default::default()
            })
            .unwrap()
            .id;

        for choice in choices {
            let ledger = controller.ledger(&id).unwrap();
            prop_assert_eq!(ledger.positions().count(), ledger.len() + 1);
            if ledger.is_finished() {
                break;
            }
            let legal = rules.legal_moves(ledger.current_position()).unwrap();
            if legal.is_empty() {
                break;
            }
            let mv = legal[choice % legal.len()].to_string();
            controller.advance(&id, Some(&mv)).unwrap();
        }

        let ledger = controller.ledger(&id).unwrap();
        prop_assert_eq!(ledger.positions().count(), ledger.len() + 1);
        prop_assert!(ledger.verify(&rules).is_ok());
    }
}
