//! Play-order calculation for a device loop.
//!
//! Spot counts are reduced by their greatest common divisor to the smallest
//! repeating unit, then the occurrences of every jingle are interleaved so
//! each one is spread across the loop instead of played in a block:
//! `{A: 4, B: 2, C: 1}` becomes `A B A C A B A`, not `A A A A B B C`.
//!
//! Occurrence `k` of a jingle repeated `r` times ideally sits at
//! `(k + 0.5) / r` of the loop. Slots are filled in that order, except that a
//! jingle which has already played must play again within
//! `ceil(total / r)` slots. A bounded depth-first search keeps every such
//! deadline satisfiable; loops longer than [`MAX_SEARCH_SLOTS`] and inputs
//! that exhaust the search budget fall back to the plain ideal-position
//! order. Loops longer than [`MAX_LOOP_SLOTS`] are refused.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

/// Upper bound on search nodes before giving up on the spacing guarantee.
const SEARCH_STEP_BUDGET: usize = 20_000;

/// Longest loop the spacing search is attempted on.
pub const MAX_SEARCH_SLOTS: usize = 2_000;

/// Longest loop computed at all.
pub const MAX_LOOP_SLOTS: u64 = 100_000;

/// A scheduled entry that is currently allowed to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveJingle {
    pub jingle_id: i32,
    pub title: String,
    pub filename: String,
    pub spots: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PlayOrderEntry {
    pub jingle_id: i32,
    pub title: String,
    pub filename: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PlayOrderResult {
    pub play_order: Vec<PlayOrderEntry>,
    /// Occurrences of each jingle in one loop.
    pub ad_counts: BTreeMap<i32, u32>,
    pub gcd: u32,
    pub total_ads: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("play loop of {total} slots exceeds the limit of {limit}")]
pub struct LoopTooLong {
    pub total: u64,
    pub limit: u64,
}

/// Computes the repeating play loop for a set of effective jingles.
///
/// Entries are lanes in input order; two entries for the same jingle stay
/// separate lanes and their counts add up in `ad_counts`. Entries with zero
/// spots are ignored, callers are expected to reject them earlier.
pub fn compute_play_order(jingles: &[EffectiveJingle]) -> Result<PlayOrderResult, LoopTooLong> {
    let lanes: Vec<&EffectiveJingle> = jingles.iter().filter(|j| j.spots > 0).collect();
    if lanes.is_empty() {
        return Ok(PlayOrderResult::default());
    }

    let gcd = lanes.iter().fold(0, |acc, lane| gcd(acc, lane.spots));
    let repeats: Vec<u32> = lanes.iter().map(|lane| lane.spots / gcd).collect();

    let total: u64 = repeats.iter().map(|&r| u64::from(r)).sum();
    if total > MAX_LOOP_SLOTS {
        return Err(LoopTooLong { total, limit: MAX_LOOP_SLOTS });
    }

    let mut ad_counts = BTreeMap::new();
    for (lane, repeat) in lanes.iter().zip(&repeats) {
        *ad_counts.entry(lane.jingle_id).or_insert(0) += repeat;
    }

    let play_order: Vec<PlayOrderEntry> = interleave(&repeats)
        .into_iter()
        .map(|index| {
            let lane = lanes[index];
            PlayOrderEntry {
                jingle_id: lane.jingle_id,
                title: lane.title.clone(),
                filename: lane.filename.clone(),
            }
        })
        .collect();

    Ok(PlayOrderResult { total_ads: play_order.len(), play_order, ad_counts, gcd })
}

pub fn gcd(a: u32, b: u32) -> u32 {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Returns lane indices for one loop, `repeats[i]` occurrences of lane `i`.
pub fn interleave(repeats: &[u32]) -> Vec<usize> {
    interleave_with_budget(repeats, SEARCH_STEP_BUDGET)
}

fn interleave_with_budget(repeats: &[u32], budget: usize) -> Vec<usize> {
    let total: usize = repeats.iter().map(|&r| r as usize).sum();
    if total > MAX_SEARCH_SLOTS {
        debug!("Play loop of {} slots is too long to search; using ideal-position order", total);
        return ideal_position_order(repeats);
    }

    let mut search = Interleaver::new(repeats, budget);
    if search.run() {
        search.sequence
    } else {
        warn!(
            "Play-order search exhausted its budget for repeats {:?}; using ideal-position order",
            repeats
        );
        ideal_position_order(repeats)
    }
}

/// Sorts every occurrence by its ideal position `(k + 0.5) / r`, ties by lane
/// then occurrence.
pub fn ideal_position_order(repeats: &[u32]) -> Vec<usize> {
    let mut occurrences: Vec<(usize, u64)> = repeats
        .iter()
        .enumerate()
        .flat_map(|(lane, &r)| (0..r as u64).map(move |k| (lane, k)))
        .collect();
    occurrences.sort_by(|&(lane_a, k_a), &(lane_b, k_b)| {
        let lhs = (2 * k_a + 1) * repeats[lane_b] as u64;
        let rhs = (2 * k_b + 1) * repeats[lane_a] as u64;
        lhs.cmp(&rhs).then(lane_a.cmp(&lane_b)).then(k_a.cmp(&k_b))
    });
    occurrences.into_iter().map(|(lane, _)| lane).collect()
}

/// Search state for one slot: the lanes to try in order, the next one to
/// try, and the placement to undo before trying it.
struct Frame {
    candidates: Vec<usize>,
    next: usize,
    placed: Option<(usize, Option<usize>)>,
}

struct Interleaver<'a> {
    repeats: &'a [u32],
    total: usize,
    /// Longest allowed distance between consecutive occurrences of a lane.
    max_gap: Vec<usize>,
    placed: Vec<u32>,
    last: Vec<Option<usize>>,
    sequence: Vec<usize>,
    steps: usize,
    budget: usize,
}

impl<'a> Interleaver<'a> {
    fn new(repeats: &'a [u32], budget: usize) -> Self {
        let total: usize = repeats.iter().map(|&r| r as usize).sum();
        Self {
            repeats,
            total,
            max_gap: repeats.iter().map(|&r| total.div_ceil(r as usize)).collect(),
            placed: vec![0; repeats.len()],
            last: vec![None; repeats.len()],
            sequence: Vec::with_capacity(total),
            steps: 0,
            budget,
        }
    }

    fn remaining(&self, lane: usize) -> u32 {
        self.repeats[lane] - self.placed[lane]
    }

    /// Slot by which the lane's next occurrence is wanted, as a fraction:
    /// the earlier of its ideal slot and its spacing deadline.
    fn urgency(&self, lane: usize) -> (u64, u64) {
        let ideal = (
            (2 * self.placed[lane] as u64 + 1) * self.total as u64,
            2 * self.repeats[lane] as u64,
        );
        match self.last[lane] {
            Some(last) => {
                let deadline = (last + self.max_gap[lane]) as u64;
                if deadline * ideal.1 < ideal.0 { (deadline, 1) } else { ideal }
            }
            None => ideal,
        }
    }

    fn candidates(&self) -> Vec<usize> {
        let mut lanes: Vec<usize> =
            (0..self.repeats.len()).filter(|&lane| self.remaining(lane) > 0).collect();
        lanes.sort_by(|&a, &b| {
            let (num_a, den_a) = self.urgency(a);
            let (num_b, den_b) = self.urgency(b);
            match (num_a * den_b).cmp(&(num_b * den_a)) {
                Ordering::Equal => a.cmp(&b),
                other => other,
            }
        });
        lanes
    }

    /// Opens the frame for the next slot, charging one step of the budget.
    fn open_frame(&mut self) -> Option<Frame> {
        if self.steps >= self.budget {
            return None;
        }
        self.steps += 1;
        Some(Frame { candidates: self.candidates(), next: 0, placed: None })
    }

    fn place(&mut self, lane: usize, slot: usize) {
        self.placed[lane] += 1;
        self.last[lane] = Some(slot);
        self.sequence.push(lane);
    }

    fn unplace(&mut self, lane: usize, previous: Option<usize>) {
        self.sequence.pop();
        self.last[lane] = previous;
        self.placed[lane] -= 1;
    }

    /// Depth-first search over slots with an explicit frame stack. Returns
    /// false when the budget runs out or no arrangement exists.
    fn run(&mut self) -> bool {
        if self.total == 0 {
            return true;
        }
        let Some(first) = self.open_frame() else {
            return false;
        };
        let mut frames = vec![first];

        while let Some(frame) = frames.last_mut() {
            if let Some((lane, previous)) = frame.placed.take() {
                self.unplace(lane, previous);
            }
            let next = frame.candidates.get(frame.next).copied();
            let Some(lane) = next else {
                frames.pop();
                continue;
            };
            frame.next += 1;

            let slot = self.sequence.len();
            frame.placed = Some((lane, self.last[lane]));
            self.place(lane, slot);

            if !self.is_feasible(slot + 1) {
                continue;
            }
            if slot + 1 == self.total {
                return true;
            }
            match self.open_frame() {
                Some(opened) => frames.push(opened),
                None => return false,
            }
        }
        false
    }

    /// Necessary condition for completing the loop from `next`: no started
    /// lane is past its deadline, and for every horizon the occurrences that
    /// started lanes must play by then fit in the slots left.
    fn is_feasible(&self, next: usize) -> bool {
        let pending: Vec<(usize, usize, usize)> = (0..self.repeats.len())
            .filter(|&lane| self.remaining(lane) > 0)
            .filter_map(|lane| {
                self.last[lane].map(|last| {
                    (last + self.max_gap[lane], self.max_gap[lane], self.remaining(lane) as usize)
                })
            })
            .collect();

        if pending.iter().any(|&(deadline, _, _)| deadline < next) {
            return false;
        }

        (next..self.total).all(|horizon| {
            let demand: usize = pending
                .iter()
                .filter(|&&(deadline, _, _)| deadline <= horizon)
                .map(|&(deadline, gap, remaining)| remaining.min((horizon - deadline) / gap + 1))
                .sum();
            demand <= horizon - next + 1
        })
    }
}
