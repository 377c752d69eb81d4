use super::pareto_bag::{Element, ParetoBag};
use super::profile::{Profile, ProfilePair};
use super::time::Time;
use super::timetable::{NodeId, Timetable};

/// The Connection Scan query engine.  One instance serves one query at a
/// time: call `init()`, then exactly one of the query methods, then
/// `clear()`.  The timetable is borrowed read-only, so several engines can
/// share it from different threads; all mutable state lives in the scratch
/// arrays below, sized to the timetable's node and trip ranges.
///
/// Callers are trusted to pass node ids within the timetable's range;
/// queries themselves cannot fail, and an unreachable target comes back as
/// `Time::INF` (forward) or `Time::NEG_INF` (backward).
pub struct ConnectionScan<'a> {
    timetable: &'a Timetable,
    use_hl: bool,

    // per-node scratch
    earliest_arrival: Vec<Time>,
    latest_departure: Vec<Time>,
    stop_profile: Vec<Profile>,
    walk_to_target: Vec<Time>,
    node_bags: Vec<ParetoBag>,

    // per-trip scratch
    is_reached: Vec<bool>,
    trip_best: Vec<Time>,
}

impl<'a> ConnectionScan<'a> {
    pub fn new(timetable: &'a Timetable, use_hl: bool) -> ConnectionScan<'a> {
        ConnectionScan {
            timetable,
            use_hl,
            earliest_arrival: vec![],
            latest_departure: vec![],
            stop_profile: vec![],
            walk_to_target: vec![],
            node_bags: vec![],
            is_reached: vec![],
            trip_best: vec![],
        }
    }

    /// Size and reset the scratch arrays.  Must be called before each query.
    pub fn init(&mut self) {
        let num_nodes = self.timetable.max_node_id + 1;
        let num_trips = self.timetable.max_trip_id + 1;

        self.earliest_arrival.clear();
        self.earliest_arrival.resize(num_nodes, Time::INF);
        self.latest_departure.clear();
        self.latest_departure.resize(num_nodes, Time::NEG_INF);
        self.stop_profile.clear();
        self.stop_profile.resize(num_nodes, Profile::new());
        self.walk_to_target.clear();
        self.walk_to_target.resize(num_nodes, Time::INF);
        self.node_bags.clear();
        self.node_bags.resize(num_nodes, ParetoBag::new());

        self.is_reached.clear();
        self.is_reached.resize(num_trips, false);
        self.trip_best.clear();
        self.trip_best.resize(num_trips, Time::INF);
    }

    /// Release the scratch arrays after a query.
    pub fn clear(&mut self) {
        self.earliest_arrival.clear();
        self.latest_departure.clear();
        self.stop_profile.clear();
        self.walk_to_target.clear();
        self.node_bags.clear();
        self.is_reached.clear();
        self.trip_best.clear();
    }

    /// Earliest arrival at `target` when leaving `source` at
    /// `departure_time`.
    pub fn query(&mut self, source: NodeId, target: NodeId, departure_time: Time) -> Time {
        self.query_with_pruning(source, target, departure_time, true)
    }

    /// Same as `query`, with target pruning switchable (the profile query
    /// needs a full, unpruned scan; tests use it to validate pruning).
    pub fn query_with_pruning(
        &mut self,
        source: NodeId,
        target: NodeId,
        departure_time: Time,
        target_pruning: bool,
    ) -> Time {
        let timetable = self.timetable;

        // the traveller is at the source at the departure time, and can
        // walk from there to its neighbours
        self.earliest_arrival[source as usize] = departure_time;
        if !self.use_hl {
            for transfer in &timetable.stops[source as usize].transfers {
                self.earliest_arrival[transfer.target as usize] =
                    departure_time.saturating_add(transfer.time);
            }
        } else {
            // push the departure time to the source's out-hubs, then on to
            // every stop that lists those hubs as in-hubs
            for link in &timetable.stops[source as usize].out_hubs {
                self.earliest_arrival[link.hub as usize] =
                    departure_time.saturating_add(link.time);
            }
            for link in &timetable.stops[source as usize].out_hubs {
                let at_hub = self.earliest_arrival[link.hub as usize];
                for &(walk, stop) in &timetable.inverse_in_hubs[link.hub as usize] {
                    let tmp = at_hub.saturating_add(walk);
                    if tmp < self.earliest_arrival[stop as usize] {
                        self.earliest_arrival[stop as usize] = tmp;
                    }
                }
            }
        }

        // binary search for the first connection departing at or after the
        // departure time; the array is sorted by departure time first
        let first = timetable.connections.partition_point(|cc| cc.dep_time < departure_time);

        for ci in first..timetable.connections.len() {
            let conn = timetable.connections[ci];

            if target_pruning && self.earliest_arrival[target as usize] <= conn.dep_time {
                break;
            }

            if self.use_hl && !self.is_reached[conn.trip as usize] {
                self.update_from_in_hubs(conn.dep_stop);
            }

            // boardable if the trip was boarded upstream, or we can be at
            // the departure stop in time
            if self.is_reached[conn.trip as usize]
                || self.earliest_arrival[conn.dep_stop as usize] <= conn.dep_time
            {
                self.is_reached[conn.trip as usize] = true;

                if conn.arr_time < self.earliest_arrival[conn.arr_stop as usize] {
                    self.earliest_arrival[conn.arr_stop as usize] = conn.arr_time;
                    self.relax_outgoing_walks(conn.arr_stop, conn.arr_time, target);
                }
            }
        }

        // the target may still be improvable through its in-hubs; give it
        // one refresh on the way out, whether the scan was pruned or ran dry
        if self.use_hl {
            self.update_from_in_hubs(target);
        }

        self.earliest_arrival[target as usize]
    }

    /// Refresh a stop's earliest arrival from its in-hubs.  No early exit
    /// here: hub arrival times are not monotone during the scan, so every
    /// link must be checked.
    fn update_from_in_hubs(&mut self, node: NodeId) {
        for link in &self.timetable.stops[node as usize].in_hubs {
            let tmp = self.earliest_arrival[link.hub as usize].saturating_add(link.time);
            if tmp < self.earliest_arrival[node as usize] {
                self.earliest_arrival[node as usize] = tmp;
            }
        }
    }

    /// Relax the walking edges leaving a stop just reached at `arrival`.
    /// The lists are sorted by walking time, so the scan can stop at the
    /// first candidate that cannot beat the target's current arrival.
    fn relax_outgoing_walks(&mut self, stop: NodeId, arrival: Time, target: NodeId) {
        if !self.use_hl {
            for transfer in &self.timetable.stops[stop as usize].transfers {
                let tmp = arrival.saturating_add(transfer.time);
                if tmp > self.earliest_arrival[target as usize] {
                    break;
                }
                if tmp < self.earliest_arrival[transfer.target as usize] {
                    self.earliest_arrival[transfer.target as usize] = tmp;
                }
            }
        } else {
            for link in &self.timetable.stops[stop as usize].out_hubs {
                let tmp = arrival.saturating_add(link.time);
                if tmp > self.earliest_arrival[target as usize] {
                    break;
                }
                if tmp < self.earliest_arrival[link.hub as usize] {
                    self.earliest_arrival[link.hub as usize] = tmp;
                }
            }
        }
    }

    /// Latest departure from `source` that still reaches `target` by
    /// `arrival_time`.  The mirror image of `query`: the scan walks the
    /// connection array backward, alighting replaces boarding, and values
    /// grow toward the latest feasible departure.
    pub fn backward_query(&mut self, source: NodeId, target: NodeId, arrival_time: Time) -> Time {
        let timetable = self.timetable;

        self.latest_departure[target as usize] = arrival_time;
        if !self.use_hl {
            for transfer in &timetable.stops[target as usize].backward_transfers {
                self.latest_departure[transfer.target as usize] =
                    arrival_time.saturating_sub(transfer.time);
            }
        } else {
            for link in &timetable.stops[target as usize].in_hubs {
                self.latest_departure[link.hub as usize] =
                    arrival_time.saturating_sub(link.time);
            }
            for link in &timetable.stops[target as usize].in_hubs {
                let at_hub = self.latest_departure[link.hub as usize];
                for &(walk, stop) in &timetable.inverse_out_hubs[link.hub as usize] {
                    let tmp = at_hub.saturating_sub(walk);
                    if tmp > self.latest_departure[stop as usize] {
                        self.latest_departure[stop as usize] = tmp;
                    }
                }
            }
        }

        // every connection arriving by arrival_time departs by it too, so
        // starting just before the first departure at or after it covers
        // them all
        let first_after = timetable.connections.partition_point(|cc| cc.dep_time < arrival_time);

        for ci in (0..first_after).rev() {
            let conn = timetable.connections[ci];
            if conn.arr_time > arrival_time {
                continue;
            }

            if self.latest_departure[source as usize] >= conn.arr_time {
                break;
            }

            if self.use_hl && !self.is_reached[conn.trip as usize] {
                self.update_from_out_hubs(conn.arr_stop);
            }

            // alightable if the trip was alighted downstream, or we can
            // still make it from the arrival stop to the target
            if self.is_reached[conn.trip as usize]
                || self.latest_departure[conn.arr_stop as usize] >= conn.arr_time
            {
                self.is_reached[conn.trip as usize] = true;

                if conn.dep_time > self.latest_departure[conn.dep_stop as usize] {
                    self.latest_departure[conn.dep_stop as usize] = conn.dep_time;
                    self.relax_incoming_walks(conn.dep_stop, conn.dep_time, source);
                }
            }
        }

        // mirror of the forward query's exit refresh, on the source side
        if self.use_hl {
            self.update_from_out_hubs(source);
        }

        self.latest_departure[source as usize]
    }

    /// Refresh a stop's latest departure from its out-hubs (the backward
    /// counterpart of `update_from_in_hubs`; same no-early-exit rule).
    fn update_from_out_hubs(&mut self, node: NodeId) {
        for link in &self.timetable.stops[node as usize].out_hubs {
            let tmp = self.latest_departure[link.hub as usize].saturating_sub(link.time);
            if tmp > self.latest_departure[node as usize] {
                self.latest_departure[node as usize] = tmp;
            }
        }
    }

    /// Relax the walking edges arriving at a stop one must leave by
    /// `departure`.
    fn relax_incoming_walks(&mut self, stop: NodeId, departure: Time, source: NodeId) {
        if !self.use_hl {
            for transfer in &self.timetable.stops[stop as usize].backward_transfers {
                let tmp = departure.saturating_sub(transfer.time);
                if tmp < self.latest_departure[source as usize] {
                    break;
                }
                if tmp > self.latest_departure[transfer.target as usize] {
                    self.latest_departure[transfer.target as usize] = tmp;
                }
            }
        } else {
            for link in &self.timetable.stops[stop as usize].in_hubs {
                let tmp = departure.saturating_sub(link.time);
                if tmp < self.latest_departure[source as usize] {
                    break;
                }
                if tmp > self.latest_departure[link.hub as usize] {
                    self.latest_departure[link.hub as usize] = tmp;
                }
            }
        }
    }

    /// All Pareto-optimal (departure, arrival) pairs from `source` to
    /// `target` over the whole day.
    ///
    /// A full-day forward scan first marks which trips are usable at all;
    /// the reverse-chronological main scan then only ever consults that
    /// fixed reachability.  Scanning by decreasing departure time means
    /// that when a connection is processed, every journey leaving later is
    /// already reflected in the profiles and in `trip_best`.
    pub fn profile_query(&mut self, source: NodeId, target: NodeId) -> Profile {
        let timetable = self.timetable;

        self.query_with_pruning(source, target, Time::new(0), false);

        // walking time from every node to the target
        self.walk_to_target[target as usize] = Time::new(0);
        if !self.use_hl {
            for transfer in &timetable.stops[target as usize].backward_transfers {
                self.walk_to_target[transfer.target as usize] = transfer.time;
            }
        } else {
            for link in &timetable.stops[target as usize].in_hubs {
                self.walk_to_target[link.hub as usize] = link.time;
            }
            for link in &timetable.stops[target as usize].in_hubs {
                let from_hub = self.walk_to_target[link.hub as usize];
                for &(walk, stop) in &timetable.inverse_out_hubs[link.hub as usize] {
                    let tmp = from_hub.saturating_add(walk);
                    if tmp < self.walk_to_target[stop as usize] {
                        self.walk_to_target[stop as usize] = tmp;
                    }
                }
            }
        }

        for ci in (0..timetable.connections.len()).rev() {
            let conn = timetable.connections[ci];
            if !self.is_reached[conn.trip as usize] {
                continue;
            }

            // walk from the arrival stop straight to the target
            let t1 = conn.arr_time.saturating_add(self.walk_to_target[conn.arr_stop as usize]);
            // stay seated on this trip
            let t2 = self.trip_best[conn.trip as usize];
            // transfer at the arrival stop, possibly via an out-hub
            let mut t3 = self.stop_profile[conn.arr_stop as usize].point_query(conn.arr_time);
            if self.use_hl {
                for link in &timetable.stops[conn.arr_stop as usize].out_hubs {
                    let via_hub = self.stop_profile[link.hub as usize]
                        .point_query(conn.arr_time.saturating_add(link.time));
                    t3 = t3.min(via_hub);
                }
            }

            let t_conn = t1.min(t2).min(t3);
            let pair = ProfilePair::new(conn.dep_time, t_conn);

            // no journey starting with this connection beats what the
            // source already has
            if self.stop_profile[source as usize].dominates(&pair) {
                continue;
            }

            if !self.stop_profile[conn.dep_stop as usize].dominates(&pair) {
                // the domination check just ran, skip repeating it
                self.stop_profile[conn.dep_stop as usize].emplace_unchecked(pair);

                // anyone who can walk to the departure stop can use this
                // journey too, leaving correspondingly earlier
                if !self.use_hl {
                    for transfer in &timetable.stops[conn.dep_stop as usize].backward_transfers {
                        self.stop_profile[transfer.target as usize].emplace(ProfilePair::new(
                            conn.dep_time.saturating_sub(transfer.time),
                            t_conn,
                        ));
                    }
                } else {
                    for link in &timetable.stops[conn.dep_stop as usize].in_hubs {
                        self.stop_profile[link.hub as usize].emplace(ProfilePair::new(
                            conn.dep_time.saturating_sub(link.time),
                            t_conn,
                        ));
                    }
                }
            }

            self.trip_best[conn.trip as usize] = t_conn;
        }

        self.stop_profile[source as usize].clone()
    }

    /// The Pareto set over (arrival time, transfers, walking time) from
    /// `source` to `target`, leaving at `departure_time`.  Every node
    /// carries a bag of labels instead of a single arrival time.  No
    /// target pruning: the target's Pareto front can keep growing until
    /// the end of the scan.
    pub fn mc_query(&mut self, source: NodeId, target: NodeId, departure_time: Time) -> ParetoBag {
        let timetable = self.timetable;

        self.node_bags[source as usize].insert(Element::new(departure_time, 0, Time::new(0)));

        // walking away from the source does not count as a transfer
        if !self.use_hl {
            for transfer in &timetable.stops[source as usize].transfers {
                self.node_bags[transfer.target as usize].insert(Element::new(
                    departure_time.saturating_add(transfer.time),
                    0,
                    transfer.time,
                ));
            }
        } else {
            for link in &timetable.stops[source as usize].out_hubs {
                self.node_bags[link.hub as usize].insert(Element::new(
                    departure_time.saturating_add(link.time),
                    0,
                    link.time,
                ));
            }
            for link in &timetable.stops[source as usize].out_hubs {
                let labels: Vec<Element> =
                    self.node_bags[link.hub as usize].iter().cloned().collect();
                for &(walk, stop) in &timetable.inverse_in_hubs[link.hub as usize] {
                    for elem in &labels {
                        self.node_bags[stop as usize].insert(elem.shifted(walk, 0));
                    }
                }
            }
        }

        let first = timetable.connections.partition_point(|cc| cc.dep_time < departure_time);

        for ci in first..timetable.connections.len() {
            let conn = timetable.connections[ci];

            if self.use_hl && !self.is_reached[conn.trip as usize] {
                self.pull_bag_from_in_hubs(conn.dep_stop);
            }

            let boardable = self.is_reached[conn.trip as usize]
                || self.node_bags[conn.dep_stop as usize]
                    .iter()
                    .any(|ee| ee.arrival_time <= conn.dep_time);
            if !boardable {
                continue;
            }
            self.is_reached[conn.trip as usize] = true;

            // riding the connection carries every label at the departure
            // stop to the arrival stop, arriving when the vehicle does
            let labels: Vec<Element> =
                self.node_bags[conn.dep_stop as usize].iter().cloned().collect();
            let mut improved = false;
            for elem in labels {
                let ridden = Element::new(conn.arr_time, elem.transfers, elem.walking_time);
                improved |= self.node_bags[conn.arr_stop as usize].insert(ridden);
            }

            if improved {
                self.relax_outgoing_walks_mc(conn.arr_stop);
            }
        }

        // final pull at the target, mirroring the source-side push
        if self.use_hl {
            self.pull_bag_from_in_hubs(target);
        }

        self.node_bags[target as usize].clone()
    }

    /// Merge the bags of a stop's in-hubs into the stop's own bag, shifted
    /// by the walking legs.  The hub-to-stop leg completes a walk whose
    /// transfer was already counted on the stop-to-hub side.
    fn pull_bag_from_in_hubs(&mut self, node: NodeId) {
        for link in &self.timetable.stops[node as usize].in_hubs {
            let labels: Vec<Element> =
                self.node_bags[link.hub as usize].iter().cloned().collect();
            for elem in labels {
                self.node_bags[node as usize].insert(elem.shifted(link.time, 0));
            }
        }
    }

    /// Spread a stop's labels over its outgoing walking edges; each edge
    /// taken mid-journey costs one transfer.
    fn relax_outgoing_walks_mc(&mut self, stop: NodeId) {
        let labels: Vec<Element> = self.node_bags[stop as usize].iter().cloned().collect();
        if !self.use_hl {
            for transfer in &self.timetable.stops[stop as usize].transfers {
                for elem in &labels {
                    self.node_bags[transfer.target as usize]
                        .insert(elem.shifted(transfer.time, 1));
                }
            }
        } else {
            for link in &self.timetable.stops[stop as usize].out_hubs {
                for elem in &labels {
                    self.node_bags[link.hub as usize].insert(elem.shifted(link.time, 1));
                }
            }
        }
    }
}
