use crate::games::{quiet_config, scripted_players, Endless, FailingSink, MemorySink};

use std::time::{Duration, Instant};

use ai_arena::{games::tictactoe::TicTacToe, prelude::*, scripted::ScriptedHandle};


fn assert_contiguous_moves<A>(moves: &[Move<A>]) {
    let numbers = moves.iter().map(Move::number).collect::<Vec<_>>();
    let expected = (1..=moves.len() as u32).collect::<Vec<_>>();
    assert_eq!(numbers, expected, "move numbers must be 1..=n without gaps");
}

#[test]
fn rules_win_on_fifth_move() {
    let (players, transcripts) = scripted_players(
        &["alice", "bob"],
        vec![
            vec!["place_mark 0 0", "place_mark 1 0", "place_mark 2 0"],
            vec!["place_mark 0 1", "place_mark 1 1"],
        ],
    );
    let sink = MemorySink::default();
    let mut session = GameSession::with_rules(players, TicTacToe::new(), quiet_config())
        .unwrap()
        .with_sink(Box::new(sink.clone()));

    let outcome = session.run().unwrap();

    assert_eq!(outcome.winner, Some(1));
    assert_eq!(outcome.winner_name.as_deref(), Some("alice"));
    assert_eq!(outcome.rounds_played, 3);
    assert_eq!(session.logic().moves().len(), 5);
    assert_contiguous_moves(session.logic().moves());
    // bob never gets a third turn
    assert_eq!(transcripts[1].borrow().requests, 2);
    assert_eq!(sink.saved.borrow().as_slice(), &[outcome]);
}

#[test]
fn three_malformed_answers_exclude_the_player() {
    let (players, _) = scripted_players(
        &["alice", "bob"],
        vec![
            vec!["place_mark 0 0", "place_mark 2 2", "place_mark 1 0"],
            vec!["hello", "place_mark", "place_mark x y"],
        ],
    );
    let config = quiet_config().with_max_errors(Some(3));
    let mut session = GameSession::with_rules(players, TicTacToe::new(), config)
        .unwrap()
        .with_sink(Box::new(MemorySink::default()));

    let outcome = session.run().unwrap();

    assert_eq!(outcome.winner, Some(1));
    assert_eq!(outcome.rounds_played, 3);
    assert_eq!(outcome.errors, vec![(1, 0), (2, 3)]);
    assert_eq!(session.logic().excluded(), &[2]);
    assert_eq!(session.logic().rules().board().winner_id(), None);
    assert_eq!(session.players()[1].errors(), 3);
}

#[test]
fn round_bound_ends_game_without_winner() {
    let ticks = vec!["tick 1"; 10];
    let (players, transcripts) = scripted_players(&["a", "b"], vec![ticks.clone(), ticks]);
    let config = quiet_config().with_max_rounds(Some(10));
    let mut session = GameSession::with_rules(players, Endless::default(), config)
        .unwrap()
        .with_sink(Box::new(MemorySink::default()));

    let outcome = session.run().unwrap();

    assert_eq!(outcome.winner, None);
    assert_eq!(outcome.winner_label(), "none");
    assert_eq!(outcome.rounds_played, 10);
    assert_eq!(session.logic().moves().len(), 20);
    assert_contiguous_moves(session.logic().moves());
    assert_eq!(transcripts[0].borrow().requests, 10);
    assert!(!session.logic().is_game_over());
}

#[test]
fn rules_winner_beats_error_count() {
    let (players, _) = scripted_players(
        &["alice", "bob"],
        vec![
            vec!["oops", "place_mark 0 0", "place_mark 1 0", "place_mark 2 0"],
            vec!["place_mark 0 1", "place_mark 1 1", "place_mark 2 2"],
        ],
    );
    let mut session = GameSession::with_rules(players, TicTacToe::new(), quiet_config())
        .unwrap()
        .with_sink(Box::new(MemorySink::default()));

    let outcome = session.run().unwrap();

    assert_eq!(outcome.winner, Some(1));
    assert_eq!(outcome.errors, vec![(1, 1), (2, 0)]);
    assert_eq!(outcome.rounds_played, 4);
}

#[test]
fn illegal_moves_leave_no_gap_in_move_numbers() {
    let (players, transcripts) = scripted_players(
        &["alice", "bob"],
        vec![
            vec!["place_mark 1 1", "place_mark 0 0"],
            vec!["place_mark 1 1", "place_mark 2 2"],
        ],
    );
    let config = quiet_config().with_max_rounds(Some(2));
    let mut session = GameSession::with_rules(players, TicTacToe::new(), config)
        .unwrap()
        .with_sink(Box::new(MemorySink::default()));

    let outcome = session.run().unwrap();

    assert_eq!(outcome.errors, vec![(1, 0), (2, 1)]);
    assert_eq!(session.logic().moves().len(), 3);
    assert_contiguous_moves(session.logic().moves());

    // bob's rejected attempt did not consume move 2
    let move_numbers = transcripts[1]
        .borrow()
        .received
        .iter()
        .filter_map(|m| match m {
            EngineMessage::RoundUpdate(update) => Some(update.move_number),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(move_numbers, vec![2, 3]);
}

#[test]
fn full_board_is_a_draw() {
    let (players, _) = scripted_players(
        &["alice", "bob"],
        vec![
            vec![
                "place_mark 0 0",
                "place_mark 2 0",
                "place_mark 0 1",
                "place_mark 1 2",
                "place_mark 2 2",
            ],
            vec![
                "place_mark 1 0",
                "place_mark 1 1",
                "place_mark 2 1",
                "place_mark 0 2",
            ],
        ],
    );
    let mut session = GameSession::with_rules(players, TicTacToe::new(), quiet_config())
        .unwrap()
        .with_sink(Box::new(MemorySink::default()));

    let outcome = session.run().unwrap();

    assert_eq!(outcome.winner, None);
    assert_eq!(outcome.rounds_played, 5);
    assert_eq!(session.logic().moves().len(), 9);
}

#[test]
fn failing_sink_does_not_change_the_outcome() {
    let (players, transcripts) = scripted_players(
        &["alice", "bob"],
        vec![
            vec!["place_mark 0 0", "place_mark 0 1", "place_mark 0 2"],
            vec!["place_mark 1 0", "place_mark 1 1"],
        ],
    );
    let mut session = GameSession::with_rules(players, TicTacToe::new(), quiet_config())
        .unwrap()
        .with_sink(Box::new(FailingSink));

    let outcome = session.run().unwrap();

    assert_eq!(outcome.winner, Some(1));
    assert!(transcripts.iter().all(|t| t.borrow().finished));
}

#[test]
fn bots_receive_settings_then_round_updates() {
    let (players, transcripts) = scripted_players(
        &["alice", "bob"],
        vec![vec!["place_mark 0 0"], vec!["place_mark 1 1"]],
    );
    let config = quiet_config().with_max_rounds(Some(1));
    let mut session = GameSession::with_rules(players, TicTacToe::new(), config)
        .unwrap()
        .with_sink(Box::new(MemorySink::default()));
    session.run().unwrap();

    let bob = transcripts[1].borrow();
    let text = bob.received.iter().map(ToString::to_string).collect::<Vec<_>>();
    assert_eq!(
        text,
        vec![
            "settings timebank 2000",
            "settings player_names alice,bob",
            "settings your_botid 2",
            "settings max_rounds 1",
            "update game round 1\nupdate game move 2\nupdate game field 1,.,.,.,.,.,.,.,.",
            "action move 2000",
        ]
    );
    assert!(session.players()[1].handle().dump().contains("Round 1"));
}

#[test]
fn timeouts_count_as_errors() {
    let (mut players, _) = scripted_players(&["alice"], vec![vec!["place_mark 0 0"]]);
    let bob = ScriptedHandle::with_results([
        Err(TurnError::NoResponse),
        Err(TurnError::Process("crashed".to_string())),
    ]);
    players.push(Player::new(2, "bob", Box::new(bob)));

    let config = quiet_config().with_max_errors(Some(1));
    let mut session = GameSession::with_rules(players, TicTacToe::new(), config)
        .unwrap()
        .with_sink(Box::new(MemorySink::default()));
    let outcome = session.run().unwrap();

    assert_eq!(outcome.winner, Some(1));
    assert_eq!(outcome.rounds_played, 1);
}

#[test]
fn session_rejects_duplicate_ids() {
    let (mut players, _) = scripted_players(&["alice"], vec![vec![]]);
    let (other, _) = scripted_players(&["alice again"], vec![vec![]]);
    players.extend(other);

    let session = GameSession::with_rules(players, TicTacToe::new(), quiet_config());
    assert!(session.is_err());
    assert!(GameSession::with_rules(vec![], TicTacToe::new(), quiet_config()).is_err());
}

#[test]
fn finished_session_cannot_run_again() {
    let ticks = vec!["tick 1"; 4];
    let (players, transcripts) = scripted_players(&["a", "b"], vec![ticks.clone(), ticks]);
    let sink = MemorySink::default();
    let config = quiet_config().with_max_rounds(Some(2));
    let mut session = GameSession::with_rules(players, Endless::default(), config)
        .unwrap()
        .with_sink(Box::new(sink.clone()));

    let first = session.run().unwrap();
    assert_eq!(first.rounds_played, 2);
    assert_eq!(session.state(), EngineState::Finished);
    let received = transcripts[0].borrow().received.len();

    assert!(session.run().is_err());
    assert_eq!(session.state(), EngineState::Finished);
    assert_eq!(sink.saved.borrow().len(), 1);
    assert_eq!(transcripts[0].borrow().requests, 2);
    assert_eq!(transcripts[0].borrow().received.len(), received);
    assert_eq!(session.logic().moves().len(), 4);
}

#[test]
fn turn_delay_paces_every_turn() {
    let ticks = vec!["tick 1"; 2];
    let (players, _) = scripted_players(&["a", "b"], vec![ticks.clone(), ticks]);
    let config = quiet_config()
        .with_max_rounds(Some(2))
        .with_turn_delay(Some(Duration::from_millis(20)));
    let mut session = GameSession::with_rules(players, Endless::default(), config)
        .unwrap()
        .with_sink(Box::new(MemorySink::default()));

    let start = Instant::now();
    let outcome = session.run().unwrap();

    assert!(start.elapsed() >= Duration::from_millis(80));
    assert_eq!(outcome.rounds_played, 2);
    assert_eq!(session.logic().moves().len(), 4);
}
