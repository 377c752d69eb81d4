use super::time::Time;
use super::timetable::{Connection, NodeId, Timetable, TripId};

/// Shorthand for building a connection from raw numbers.
pub fn conn(
    trip: TripId,
    dep_stop: NodeId,
    arr_stop: NodeId,
    dep_time: i64,
    arr_time: i64,
    seq: u32,
) -> Connection {
    Connection {
        trip,
        dep_stop,
        arr_stop,
        dep_time: Time::new(dep_time),
        arr_time: Time::new(arr_time),
        seq,
    }
}

/// Three stops in a row, served by two single-connection trips that meet
/// at stop 1 with a 10-unit slack and no walking anywhere.
pub fn two_trip_timetable() -> Timetable {
    let mut timetable = Timetable::new();
    timetable.add_connection(conn(0, 0, 1, 100, 200, 0));
    timetable.add_connection(conn(1, 1, 2, 210, 300, 0));
    timetable.finalize();
    timetable
}
