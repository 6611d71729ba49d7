#![no_main]
use iridium::game::core::Move;
use iridium::game::position::Position;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let input = match std::str::from_utf8(data) {
        Ok(input) => input,
        Err(_) => return,
    };
    let mut position = Position::starting();
    for notation in input.split_whitespace() {
        let Ok(next_move) = Move::from_notation(notation) else {
            return;
        };
        assert_eq!(next_move.to_string(), notation);
        if position.try_play(next_move).is_err() {
            return;
        }
    }
});
