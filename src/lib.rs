// imports of other modules from this crate
mod time;
pub use time::Time;

mod pareto_bag;
pub use pareto_bag::{Element, ParetoBag};

mod profile;
pub use profile::{Profile, ProfilePair};

mod timetable;
pub use timetable::{Connection, HubLink, NodeId, Stop, StopTimeEvent, Timetable, Transfer, TripId};

mod loader;
pub use loader::{distance_to_time, load_timetable};

mod csa;
pub use csa::ConnectionScan;

mod experiments;
pub use experiments::{read_queries, Experiment, Query, QueryMode};

#[cfg(test)]
mod test_utils;
