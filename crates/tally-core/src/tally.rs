//! Shared vote tally
//!
//! The tally is the only state shared between the HTTP handler (writer) and
//! the render loop (reader). It lives behind a blocking critical-section
//! mutex so a vote is applied as one indivisible step and a snapshot never
//! observes half of one.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

/// One of the two choices a client can vote for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Red,
    Blue,
}

impl Vote {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Blue => "blue",
        }
    }
}

/// Point-in-time copy of the counters and the strip split point.
///
/// `split_point` is not recomputed from the counters. Each red vote moves it
/// one pixel up and each blue vote one pixel down, saturating at
/// `0..=strip_length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub red_count: u64,
    pub blue_count: u64,
    pub split_point: usize,
}

impl Tally {
    pub const fn total(&self) -> u64 {
        self.red_count.saturating_add(self.blue_count)
    }

    /// Share of all votes cast for `vote`, or `0.0` before the first vote.
    pub fn fraction(&self, vote: Vote) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let count = match vote {
            Vote::Red => self.red_count,
            Vote::Blue => self.blue_count,
        };
        count as f64 / total as f64
    }
}

/// Lock-protected tally, created once at startup and shared by reference.
pub struct TallyStore {
    strip_length: usize,
    inner: Mutex<CriticalSectionRawMutex, RefCell<Tally>>,
}

impl TallyStore {
    /// Create a store whose split point starts in the middle of the strip.
    pub const fn new(strip_length: usize) -> Self {
        Self {
            strip_length,
            inner: Mutex::new(RefCell::new(Tally {
                red_count: 0,
                blue_count: 0,
                split_point: strip_length / 2,
            })),
        }
    }

    pub const fn strip_length(&self) -> usize {
        self.strip_length
    }

    /// Count one vote and shift the split point towards its colour.
    pub fn record_vote(&self, vote: Vote) {
        let limit = self.strip_length;
        self.inner.lock(|tally| {
            let mut tally = tally.borrow_mut();
            match vote {
                Vote::Red => {
                    tally.red_count = tally.red_count.saturating_add(1);
                    if tally.split_point < limit {
                        tally.split_point += 1;
                    }
                }
                Vote::Blue => {
                    tally.blue_count = tally.blue_count.saturating_add(1);
                    tally.split_point = tally.split_point.saturating_sub(1);
                }
            }
        });
    }

    pub fn read_snapshot(&self) -> Tally {
        self.inner.lock(|tally| *tally.borrow())
    }
}
