use std::cmp::Ordering;

use rayon::prelude::*;

use super::time::Time;

/// Identifies a transit stop or a hub node; the two share one dense id space.
pub type NodeId = u32;
/// Identifies one vehicle running one ordered sequence of connections.
pub type TripId = u32;

/// A fixed-time pedestrian footpath between two stops.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Transfer {
    pub source: NodeId,
    pub target: NodeId,
    pub time: Time,
}

/// A walking edge between a stop and a hub node.  Stored on the stop's
/// in-hub list (walk hub -> stop) or out-hub list (walk stop -> hub).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct HubLink {
    pub stop: NodeId,
    pub hub: NodeId,
    pub time: Time,
}

#[derive(Clone, Debug)]
pub struct Stop {
    pub id: NodeId,
    pub transfers: Vec<Transfer>,
    pub backward_transfers: Vec<Transfer>,
    pub in_hubs: Vec<HubLink>,
    pub out_hubs: Vec<HubLink>,
}

impl Stop {
    fn new(id: NodeId) -> Stop {
        Stop {
            id,
            transfers: vec![],
            backward_transfers: vec![],
            in_hubs: vec![],
            out_hubs: vec![],
        }
    }
}

/// One vehicle movement between two consecutive stops of a trip.
#[derive(Copy, Clone, Debug)]
pub struct Connection {
    pub trip: TripId,
    pub dep_stop: NodeId,
    pub arr_stop: NodeId,
    pub dep_time: Time,
    pub arr_time: Time,
    pub seq: u32,
}

impl Connection {
    // the scan order everything depends on: by departure time, ties broken
    // so that connections of one trip appear in travel order
    fn sort_key(&self) -> (Time, Time, TripId, u32) {
        (self.dep_time, self.arr_time, self.trip, self.seq)
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Connection) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for Connection {}

impl Ord for Connection {
    fn cmp(&self, other: &Connection) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Connection {
    fn partial_cmp(&self, other: &Connection) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One row of a trip's schedule: the trip calls at `stop`, arriving at
/// `arrival_time` and departing at `departure_time`, in position `seq`
/// along the trip.
#[derive(Copy, Clone, Debug)]
pub struct StopTimeEvent {
    pub stop: NodeId,
    pub arrival_time: Time,
    pub departure_time: Time,
    pub seq: u32,
}

/// The full static timetable: stops with their walking edges, plus the
/// globally sorted connection array.  Built once (via the `add_*` methods
/// and a final `finalize()` call) and immutable afterwards; query engines
/// borrow it read-only.
pub struct Timetable {
    pub stops: Vec<Stop>,
    pub connections: Vec<Connection>,
    // for each hub id, the stops listing it as an in-hub (resp. out-hub),
    // with the walking time of that link
    pub inverse_in_hubs: Vec<Vec<(Time, NodeId)>>,
    pub inverse_out_hubs: Vec<Vec<(Time, NodeId)>>,
    pub max_node_id: usize,
    pub max_trip_id: usize,
}

impl Default for Timetable {
    fn default() -> Timetable {
        Timetable::new()
    }
}

impl Timetable {
    pub fn new() -> Timetable {
        Timetable {
            stops: vec![],
            connections: vec![],
            inverse_in_hubs: vec![],
            inverse_out_hubs: vec![],
            max_node_id: 0,
            max_trip_id: 0,
        }
    }

    /// Make sure a stop with this id exists, materializing empty
    /// placeholder stops for any gap in the id range.
    pub fn ensure_stop(&mut self, id: NodeId) {
        while self.stops.len() <= id as usize {
            self.stops.push(Stop::new(self.stops.len() as NodeId));
        }
        self.max_node_id = self.max_node_id.max(id as usize);
    }

    pub fn add_transfer(&mut self, from: NodeId, to: NodeId, time: Time) {
        self.ensure_stop(from);
        self.ensure_stop(to);
        self.stops[from as usize].transfers.push(Transfer { source: from, target: to, time });
        self.stops[to as usize].backward_transfers.push(Transfer {
            source: to,
            target: from,
            time,
        });
    }

    /// Record that `stop` can be reached by walking from `hub`.
    pub fn add_in_hub(&mut self, stop: NodeId, hub: NodeId, time: Time) {
        self.ensure_stop(stop);
        self.ensure_stop(hub);
        self.stops[stop as usize].in_hubs.push(HubLink { stop, hub, time });
    }

    /// Record that `hub` can be reached by walking from `stop`.
    pub fn add_out_hub(&mut self, stop: NodeId, hub: NodeId, time: Time) {
        self.ensure_stop(stop);
        self.ensure_stop(hub);
        self.stops[stop as usize].out_hubs.push(HubLink { stop, hub, time });
    }

    /// Add a single connection directly.
    pub fn add_connection(&mut self, conn: Connection) {
        self.ensure_stop(conn.dep_stop);
        self.ensure_stop(conn.arr_stop);
        self.max_trip_id = self.max_trip_id.max(conn.trip as usize);
        self.connections.push(conn);
    }

    /// Add all connections of one trip from its schedule events.  Events
    /// are paired in stop-sequence order; each consecutive pair becomes a
    /// connection carrying the departure event's sequence number.
    pub fn add_trip(&mut self, trip: TripId, events: &[StopTimeEvent]) {
        let mut events = events.to_vec();
        events.sort_by_key(|ee| ee.seq);

        for pair in events.windows(2) {
            self.add_connection(Connection {
                trip,
                dep_stop: pair[0].stop,
                arr_stop: pair[1].stop,
                dep_time: pair[0].departure_time,
                arr_time: pair[1].arrival_time,
                seq: pair[0].seq,
            });
        }
        self.max_trip_id = self.max_trip_id.max(trip as usize);
    }

    /// Sort every per-stop list and the global connection array, and build
    /// the inverse hub indexes.  Must be called once, after all inputs are
    /// added and before any query runs.
    pub fn finalize(&mut self) {
        // transfers ascend by walking time (ties by target) so the query
        // scan can stop early; hub links likewise
        self.stops.par_iter_mut().for_each(|stop| {
            stop.transfers.sort_by_key(|tt| (tt.time, tt.target));
            stop.backward_transfers.sort_by_key(|tt| (tt.time, tt.target));
            stop.in_hubs.sort_by_key(|hh| (hh.time, hh.hub));
            stop.out_hubs.sort_by_key(|hh| (hh.time, hh.hub));
        });

        self.connections.sort_unstable();

        self.inverse_in_hubs = vec![vec![]; self.max_node_id + 1];
        self.inverse_out_hubs = vec![vec![]; self.max_node_id + 1];
        for stop in &self.stops {
            for link in &stop.in_hubs {
                self.inverse_in_hubs[link.hub as usize].push((link.time, stop.id));
            }
            for link in &stop.out_hubs {
                self.inverse_out_hubs[link.hub as usize].push((link.time, stop.id));
            }
        }
        for links in self.inverse_in_hubs.iter_mut().chain(self.inverse_out_hubs.iter_mut()) {
            links.sort_unstable();
        }
    }

    pub fn num_stops(&self) -> usize {
        self.stops.len()
    }

    pub fn num_connections(&self) -> usize {
        self.connections.len()
    }

    /// Log some statistics about the loaded dataset.
    pub fn summary(&self) {
        let num_transfers: usize = self.stops.iter().map(|ss| ss.transfers.len()).sum();
        let num_hubs: usize =
            self.stops.iter().map(|ss| ss.in_hubs.len() + ss.out_hubs.len()).sum();

        log::info!("{} stops", self.stops.len());
        log::info!("{} transfers", num_transfers);
        if num_hubs > 0 {
            log::info!("{:.3} hubs per stop on average",
                       num_hubs as f64 / self.stops.len() as f64);
        }
        log::info!("{} connections", self.connections.len());
    }
}
