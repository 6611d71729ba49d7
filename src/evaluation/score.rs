use std::cmp::Ordering;
use std::fmt::Display;
use std::ops::Neg;

/// The score represents the relative value of the position (in heuristic
/// units) or a forced win/loss in N plies (if one is found).
///
/// A compact i32 representation is used to store the score in both cases.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Score {
    value: i32,
}

impl Score {
    /// Score of a drawn game, also used for positions nobody is ahead in.
    pub const DRAW: Self = Self { value: 0 };
    /// Bound of the search window. Real scores, decisive ones included, are
    /// strictly inside `(-INFINITY, INFINITY)`.
    pub const INFINITY: Self = Self {
        value: 1_000_000_000,
    };

    /// `(-INFINITY, -INFINITY + DECISIVE_RANGE)` and `(INFINITY -
    /// DECISIVE_RANGE, INFINITY)` are reserved for game-theoretic results.
    /// `[-INFINITY + DECISIVE_RANGE, INFINITY - DECISIVE_RANGE]` is for
    /// heuristic evaluations.
    const DECISIVE_RANGE: i32 = 1000;
    /// Score of winning right away.
    const WIN: i32 = Self::INFINITY.value - 1;

    /// Creates a new score in heuristic units.
    ///
    /// The value must be in the range `[-INFINITY + DECISIVE_RANGE, INFINITY -
    /// DECISIVE_RANGE]`.
    #[must_use]
    pub fn heuristic(value: i32) -> Self {
        assert!(value.abs() < Self::INFINITY.value - Self::DECISIVE_RANGE);
        Self { value }
    }

    /// Creates a new score representing the side to move winning in `plies`
    /// half-moves. Faster wins score higher.
    #[must_use]
    pub fn win_in(plies: u8) -> Self {
        Self {
            value: Self::WIN - i32::from(plies),
        }
    }

    /// Creates a new score representing the side to move losing in `plies`
    /// half-moves. Slower losses score higher.
    #[must_use]
    pub fn loss_in(plies: u8) -> Self {
        -Self::win_in(plies)
    }

    /// Returns the number of plies until the game is decided: positive if the
    /// side to move wins, negative otherwise.
    ///
    /// # Panics
    ///
    /// Panics if the score is not decisive.
    #[must_use]
    pub fn plies_to_end(&self) -> i32 {
        assert!(self.is_decisive());
        let plies = Self::WIN - self.value.abs();
        match self.value.cmp(&0) {
            Ordering::Greater => plies,
            Ordering::Less => -plies,
            Ordering::Equal => unreachable!(),
        }
    }

    /// Returns `true` if the score represents a forced result, not a
    /// heuristic evaluation.
    #[must_use]
    pub fn is_decisive(&self) -> bool {
        self.value.abs() > Self::INFINITY.value - Self::DECISIVE_RANGE
    }
}

impl Neg for Score {
    type Output = Self;

    /// Mirrors evaluation to other player's perspective.
    fn neg(self) -> Self::Output {
        Self { value: -self.value }
    }
}

impl Display for Score {
    /// Formats the score for the `info` lines of the protocol.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_decisive() {
            write!(f, "win {}", self.plies_to_end())
        } else {
            write!(f, "cp {}", self.value)
        }
    }
}
