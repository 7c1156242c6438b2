//! Pauses that let the page finish updating after an interaction

#[cfg(test)]
use std::cell::RefCell;
use std::ops::Range;
use std::thread;
use std::time::Duration;

use rand::Rng;

/// Points in the navigation protocol that are followed by a pause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    AfterConsent,
    AfterOverlayClosed,
    DropdownOpened,
    PageSizeApplied,
    BetweenCards,
    AfterNextPage,
}

impl Pause {
    /// Seconds to wait, drawn uniformly from this range
    pub fn range(&self) -> Range<f64> {
        match self {
            Pause::AfterConsent | Pause::AfterOverlayClosed | Pause::DropdownOpened => 1.0..2.0,
            Pause::PageSizeApplied | Pause::AfterNextPage => 2.0..4.0,
            Pause::BetweenCards => 0.2..0.5,
        }
    }
}

pub trait SettlePolicy {
    fn pause(&self, pause: Pause);
}

/// Sleeps a random duration within each pause's range
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomizedSettle;

impl SettlePolicy for RandomizedSettle {
    fn pause(&self, pause: Pause) {
        let secs = rand::thread_rng().gen_range(pause.range());
        thread::sleep(Duration::from_secs_f64(secs));
    }
}

/// Never waits
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSettle;

impl SettlePolicy for NoSettle {
    fn pause(&self, _pause: Pause) {}
}

/// Never waits, but remembers every pause it was asked for
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSettle {
    pauses: RefCell<Vec<Pause>>,
}

#[cfg(test)]
impl RecordingSettle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses(&self) -> Vec<Pause> {
        self.pauses.borrow().clone()
    }
}

#[cfg(test)]
impl SettlePolicy for RecordingSettle {
    fn pause(&self, pause: Pause) {
        self.pauses.borrow_mut().push(pause);
    }
}
