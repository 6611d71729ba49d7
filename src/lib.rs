//! Ultimate Tic-Tac-Toe engine built around Monte Carlo Tree Search.
//!
//! - [`game`] implements the rules: positions, legal moves, terminal
//!   detection and random playouts.
//! - [`evaluation`] scores positions for the negamax search.
//! - [`search`] contains the MCTS driver and the alternative negamax search.
//! - [`Engine`] speaks a line-based text protocol on top of them.

pub mod evaluation;
pub mod game;
pub mod search;

mod engine;
pub use engine::{bench, make_rng, Engine, Settings};
use shadow_rs::shadow;

shadow!(build);

/// Build type and target. Produced by `build.rs`.
const FEATURES: &str = include_str!(concat!(env!("OUT_DIR"), "/features"));

/// Returns the full engine version that can be used to identify how it was
/// built in the first place.
#[must_use]
pub fn engine_version() -> String {
    format!(
        "{} (commit {}, branch {})",
        build::PKG_VERSION,
        build::SHORT_COMMIT,
        build::BRANCH
    )
}

/// Prints informations about the engine version, author and GitHub repository
/// on engine startup. Goes to stderr, stdout is reserved for the protocol.
pub fn print_engine_info() {
    eprintln!("Iridium Ultimate Tic-Tac-Toe engine {}", engine_version());
    eprintln!("<https://github.com/kirillbobyrev/iridium>");
}

/// Prints information the build type, features and whether the build is clean
/// to stderr on engine startup.
pub fn print_binary_info() {
    eprintln!("Release build: {}", !shadow_rs::is_debug());
    eprintln!("Features: {FEATURES}");
    if !shadow_rs::git_clean() {
        eprintln!("Warning: built with uncommitted changes");
    }
    eprintln!();
}
