//! # Page Break Decisions
//!
//! Blocks are never split. Before each block the engine asks whether it can
//! go on the current page, must move to a fresh one, or has to be placed
//! anyway because even an empty body cannot hold it.

/// What to do with the next block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakDecision {
    /// Place it at the cursor.
    Place,
    /// Open a new page first.
    NewPage,
    /// Place it at the cursor even though it runs past the body bottom.
    Overflow,
}

/// The state of the body area when a block is about to be placed.
#[derive(Debug, Clone, Copy)]
pub struct BodySpace {
    pub cursor: f64,
    pub bottom: f64,
    /// The page already holds body content.
    pub occupied: bool,
}

impl BodySpace {
    pub fn remaining(&self) -> f64 {
        (self.bottom - self.cursor).max(0.0)
    }
}

/// Decide where a block of `height` goes. `forced` is an explicit
/// `page-break`.
pub fn decide_break(space: BodySpace, height: f64, forced: bool) -> BreakDecision {
    if !space.occupied {
        return if space.cursor + height > space.bottom + EPSILON {
            BreakDecision::Overflow
        } else {
            BreakDecision::Place
        };
    }
    if forced || space.cursor + height > space.bottom + EPSILON {
        BreakDecision::NewPage
    } else {
        BreakDecision::Place
    }
}

/// Rounding slack so exact fits are not pushed over.
const EPSILON: f64 = 1e-6;
