use super::time::Time;

/// One Pareto-optimal journey for a fixed stop pair: leave at `dep`, arrive
/// by `arr`.  Larger `dep` and smaller `arr` are both better.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ProfilePair {
    pub dep: Time,
    pub arr: Time,
}

impl ProfilePair {
    pub fn new(dep: Time, arr: Time) -> ProfilePair {
        ProfilePair { dep, arr }
    }

    /// A pair dominates another when it departs no earlier and arrives no
    /// later.  Unlike the three-criterion bag, equal pairs dominate each
    /// other; the profile never stores duplicates.
    pub fn dominates(&self, other: &ProfilePair) -> bool {
        self.dep >= other.dep && self.arr <= other.arr
    }
}

/// The Pareto set of (departure, arrival) pairs for one node, stored sorted
/// by strictly decreasing departure time.  Because dominated pairs are
/// removed on insertion, arrival times also decrease along the list.  A
/// sentinel `(INF, INF)` pair is always present at the front.
#[derive(Clone, Debug)]
pub struct Profile {
    pairs: Vec<ProfilePair>,
}

impl Default for Profile {
    fn default() -> Profile {
        Profile::new()
    }
}

impl Profile {
    pub fn new() -> Profile {
        Profile { pairs: vec![ProfilePair::new(Time::INF, Time::INF)] }
    }

    /// Number of stored pairs, sentinel included.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<ProfilePair> {
        self.pairs.iter()
    }

    /// True iff some stored pair departs no earlier than `pair` and arrives
    /// no later.
    pub fn dominates(&self, pair: &ProfilePair) -> bool {
        self.pairs.iter().any(|pp| pp.dominates(pair))
    }

    /// Insert `pair` unless it is dominated.
    pub fn emplace(&mut self, pair: ProfilePair) {
        if self.dominates(&pair) {
            return;
        }
        self.emplace_unchecked(pair);
    }

    /// Insert `pair` without the domination check; the caller must have
    /// already established that no stored pair dominates it.
    pub fn emplace_unchecked(&mut self, pair: ProfilePair) {
        // find the insertion point preserving decreasing departure times
        let idx = self.pairs.partition_point(|pp| pp.dep > pair.dep);
        self.pairs.insert(idx, pair);

        // pairs dominated by the new one all sit directly after it: they
        // depart no later, and arrival times decrease along the list, so
        // the ones arriving no earlier form a contiguous run
        let run = self.pairs[idx + 1..].partition_point(|pp| pp.arr >= pair.arr);
        self.pairs.drain(idx + 1..idx + 1 + run);
    }

    /// Best arrival at the profile's target for someone present at this
    /// node at time `tt`: the arrival of the last pair departing at or
    /// after `tt`.  Scanning from the back, the first match is the answer;
    /// the sentinel guarantees one exists.
    pub fn point_query(&self, tt: Time) -> Time {
        for pp in self.pairs.iter().rev() {
            if pp.dep >= tt {
                return pp.arr;
            }
        }
        Time::INF
    }
}
