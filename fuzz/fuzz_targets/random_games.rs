#![no_main]
use iridium::game::position::Position;
use libfuzzer_sys::fuzz_target;
use pretty_assertions::assert_eq;

// Every byte picks one of the legal moves.
fuzz_target!(|data: &[u8]| {
    let mut position = Position::starting();
    for &choice in data {
        let moves = position.legal_moves();
        assert_eq!(moves.is_empty(), position.is_game_over());
        if moves.is_empty() {
            break;
        }
        let before = position.clone();
        position.play(moves[usize::from(choice) % moves.len()]);
        let mut undone = position.clone();
        undone.unplay();
        assert_eq!(undone, before);
    }
    let rebuilt = Position::from_moves(position.history().iter().copied())
        .expect("replaying played moves succeeds");
    assert_eq!(rebuilt, position);
});
