use std::cmp::Ordering;

use super::time::Time;

// reserving this many elements up front avoids repeated reallocation during
// the early growth of a bag; real query bags stay in the low hundreds.
const BAG_RESERVE: usize = 256;

/// One label in a multi-criteria query: arrival time at the node, number of
/// transfers taken, and total time spent walking.  All three criteria are
/// minimized.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Element {
    pub arrival_time: Time,
    pub transfers: u32,
    pub walking_time: Time,
}

impl Element {
    pub fn new(arrival_time: Time, transfers: u32, walking_time: Time) -> Element {
        Element { arrival_time, transfers, walking_time }
    }

    /// True iff self is at least as good on every criterion and strictly
    /// better on at least one.
    pub fn dominates(&self, other: &Element) -> bool {
        self.arrival_time <= other.arrival_time
            && self.transfers <= other.transfers
            && self.walking_time <= other.walking_time
            && (self.arrival_time < other.arrival_time
                || self.transfers < other.transfers
                || self.walking_time < other.walking_time)
    }

    /// A copy of this element moved along a walking leg of the given time.
    /// `extra_transfers` is 1 when the leg counts as a transfer, 0 when it
    /// does not (walking away from the query source).
    pub fn shifted(&self, walk: Time, extra_transfers: u32) -> Element {
        Element {
            arrival_time: self.arrival_time.saturating_add(walk),
            transfers: self.transfers + extra_transfers,
            walking_time: self.walking_time.saturating_add(walk),
        }
    }
}

// lexicographic order, used only to compare bags as sets
impl Ord for Element {
    fn cmp(&self, other: &Element) -> Ordering {
        (self.arrival_time, self.transfers, self.walking_time)
            .cmp(&(other.arrival_time, other.transfers, other.walking_time))
    }
}

impl PartialOrd for Element {
    fn partial_cmp(&self, other: &Element) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An insertion-maintained Pareto front of `Element`s.  Iteration order is
/// unspecified; no element in the bag dominates another.
#[derive(Clone, Debug, Default)]
pub struct ParetoBag {
    elements: Vec<Element>,
}

impl ParetoBag {
    pub fn new() -> ParetoBag {
        ParetoBag { elements: Vec::new() }
    }

    /// Insert an element unless some current member dominates or equals it;
    /// members dominated by the new element are removed.  Returns whether
    /// the element went in.
    pub fn insert(&mut self, elem: Element) -> bool {
        if self.elements.iter().any(|ee| ee.dominates(&elem) || *ee == elem) {
            return false;
        }

        if self.elements.capacity() == 0 {
            self.elements.reserve(BAG_RESERVE);
        }
        self.elements.retain(|ee| !elem.dominates(ee));
        self.elements.push(elem);
        true
    }

    /// Merge another bag into this one, element by element.
    pub fn merge(&mut self, other: &ParetoBag) {
        for elem in &other.elements {
            self.insert(*elem);
        }
    }

    pub fn iter(&self) -> std::slice::Iter<Element> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The best arrival time over all labels in the bag, or INF if empty.
    pub fn earliest_arrival(&self) -> Time {
        self.elements.iter().map(|ee| ee.arrival_time).min().unwrap_or(Time::INF)
    }
}

// bags are equal iff they hold the same set of elements, in any order
impl PartialEq for ParetoBag {
    fn eq(&self, other: &ParetoBag) -> bool {
        let mut lhs = self.elements.clone();
        let mut rhs = other.elements.clone();
        lhs.sort();
        rhs.sort();
        lhs == rhs
    }
}

impl Eq for ParetoBag {}
