//! Parser of the line-based text protocol spoken by the [`super::Engine`].
//!
//! The protocol is modeled after UCI: the client sends one command per line
//! and the engine answers with `info` lines and results.

use crate::search::Strategy;

#[derive(Debug, PartialEq)]
pub(super) enum Command {
    Hello,
    IsReady,
    SetOption {
        option: EngineOption,
        value: OptionValue,
    },
    NewGame,
    SetPosition {
        moves: Vec<String>,
    },
    Play(String),
    Go {
        movetime: Option<u64>,
        iterations: Option<u32>,
        depth: Option<u8>,
    },
    Moves,
    Display,
    Result,
    Quit,
    Unknown(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum EngineOption {
    MoveTime,
    Iterations,
    Exploration,
    Reward,
    RetainTree,
    Strategy,
    Depth,
}

#[derive(Debug, PartialEq)]
pub(super) enum OptionValue {
    Integer(u64),
    Float(f64),
    Boolean(bool),
    Strategy(Strategy),
}

fn parse_go(parts: &[&str]) -> Command {
    let mut movetime = None;
    let mut iterations = None;
    let mut depth = None;

    for pair in parts[1..].chunks(2) {
        match pair {
            ["movetime", value] => movetime = value.parse().ok(),
            ["iterations", value] => iterations = value.parse().ok(),
            ["depth", value] => depth = value.parse().ok(),
            _ => {},
        }
    }

    Command::Go {
        movetime,
        iterations,
        depth,
    }
}

fn parse_option(name: &str) -> Option<EngineOption> {
    match name {
        "MoveTime" => Some(EngineOption::MoveTime),
        "Iterations" => Some(EngineOption::Iterations),
        "Exploration" => Some(EngineOption::Exploration),
        "Reward" => Some(EngineOption::Reward),
        "RetainTree" => Some(EngineOption::RetainTree),
        "Strategy" => Some(EngineOption::Strategy),
        "Depth" => Some(EngineOption::Depth),
        _ => None,
    }
}

fn parse_value(option: EngineOption, value: &str) -> Option<OptionValue> {
    match option {
        EngineOption::MoveTime
        | EngineOption::Iterations
        | EngineOption::Reward
        | EngineOption::Depth => value.parse().ok().map(OptionValue::Integer),
        EngineOption::Exploration => value.parse().ok().map(OptionValue::Float),
        EngineOption::RetainTree => value.parse().ok().map(OptionValue::Boolean),
        EngineOption::Strategy => Strategy::try_from(value).ok().map(OptionValue::Strategy),
    }
}

fn parse_setoption(parts: &[&str]) -> Command {
    let unknown = || Command::Unknown(parts.join(" "));
    let [_, "name", name, "value", value] = parts else {
        return unknown();
    };
    let Some(option) = parse_option(name) else {
        return unknown();
    };
    match parse_value(option, value) {
        Some(value) => Command::SetOption { option, value },
        None => unknown(),
    }
}

fn parse_setposition(parts: &[&str]) -> Command {
    match parts {
        [_, "startpos"] => Command::SetPosition { moves: vec![] },
        [_, "startpos", "moves", moves @ ..] => Command::SetPosition {
            moves: moves.iter().map(|s| (*s).to_string()).collect(),
        },
        _ => Command::Unknown(parts.join(" ")),
    }
}

impl Command {
    pub(super) fn parse(input: &str) -> Self {
        let parts: Vec<&str> = input.split_whitespace().collect();

        if parts.is_empty() {
            return Self::Unknown(input.trim().to_string());
        }

        match parts[0] {
            "hello" => Self::Hello,
            "isready" => Self::IsReady,
            "setoption" => parse_setoption(&parts),
            "newgame" => Self::NewGame,
            "position" => parse_setposition(&parts),
            "play" if parts.len() == 2 => Self::Play(parts[1].to_string()),
            "go" => parse_go(&parts),
            "moves" => Self::Moves,
            "d" => Self::Display,
            "result" => Self::Result,
            "quit" => Self::Quit,
            _ => Self::Unknown(parts.join(" ")),
        }
    }
}
