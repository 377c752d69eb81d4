use std::error::Error;
use std::fs::File;
use std::path::Path;

use flate2::read::GzDecoder;
use itertools::Itertools;
use serde::Deserialize;

use super::time::Time;
use super::timetable::{NodeId, StopTimeEvent, Timetable, TripId};

// assumed pedestrian speed when converting hub distances to walking times
const WALK_SPEED_KMH: f64 = 4.0;

/// Convert a hub-link distance (in the dataset's fixed unit) to a walking
/// time at 4 km/h.
pub fn distance_to_time(distance: u64) -> Time {
    Time::new((9.0 * distance as f64 / (25.0 * WALK_SPEED_KMH)).round() as i64)
}

#[derive(Deserialize)]
struct StopRouteRow {
    stop_id: NodeId,
}

#[derive(Deserialize)]
struct TransferRow {
    from_stop_id: NodeId,
    to_stop_id: NodeId,
    min_transfer_time: i64,
}

// .gr rows have no header: just three space-separated fields
#[derive(Deserialize)]
struct HubRow(NodeId, NodeId, u64);

#[derive(Deserialize)]
struct StopTimeRow {
    trip_id: TripId,
    arrival_time: i64,
    departure_time: i64,
    stop_id: NodeId,
    stop_sequence: u32,
}

/// Load a dataset directory into a finalized `Timetable`.  With `use_hl`
/// the walking model comes from the hub-label files; otherwise from the
/// stop-to-stop transfer file.  Any missing file or malformed row aborts
/// the load.
pub fn load_timetable(dir: &Path, use_hl: bool) -> Result<Timetable, Box<dyn Error>> {
    let started = std::time::Instant::now();
    log::info!("parsing the dataset at {}...", dir.display());

    let mut timetable = Timetable::new();
    parse_stops(&mut timetable, dir)?;
    if use_hl {
        parse_hubs(&mut timetable, dir)?;
    } else {
        parse_transfers(&mut timetable, dir)?;
    }
    parse_connections(&mut timetable, dir)?;
    timetable.finalize();

    log::info!("finished parsing in {:.1}s", started.elapsed().as_secs_f64());
    Ok(timetable)
}

/// Open a gzipped csv file with a header row.
fn gz_csv_reader(path: &Path) -> Result<csv::Reader<GzDecoder<File>>, Box<dyn Error>> {
    Ok(csv::Reader::from_reader(GzDecoder::new(open_file(path)?)))
}

/// Open a gzipped headerless space-separated file (the .gr hub format).
fn gz_gr_reader(path: &Path) -> Result<csv::Reader<GzDecoder<File>>, Box<dyn Error>> {
    let reader = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .from_reader(GzDecoder::new(open_file(path)?));
    Ok(reader)
}

fn open_file(path: &Path) -> Result<File, Box<dyn Error>> {
    File::open(path).map_err(|err| format!("couldn't open {}: {}", path.display(), err).into())
}

fn row_error(path: &Path, err: csv::Error) -> Box<dyn Error> {
    format!("malformed row in {}: {}", path.display(), err).into()
}

/// The stop_routes file determines the set of stop ids; other columns are
/// ignored, and repeated ids are fine.
fn parse_stops(timetable: &mut Timetable, dir: &Path) -> Result<(), Box<dyn Error>> {
    let path = dir.join("stop_routes.csv.gz");
    let mut reader = gz_csv_reader(&path)?;
    for result in reader.deserialize() {
        let row: StopRouteRow = result.map_err(|err| row_error(&path, err))?;
        timetable.ensure_stop(row.stop_id);
    }
    Ok(())
}

fn parse_transfers(timetable: &mut Timetable, dir: &Path) -> Result<(), Box<dyn Error>> {
    let path = dir.join("transfers.csv.gz");
    let mut reader = gz_csv_reader(&path)?;
    for result in reader.deserialize() {
        let row: TransferRow = result.map_err(|err| row_error(&path, err))?;
        timetable.add_transfer(row.from_stop_id, row.to_stop_id, Time::new(row.min_transfer_time));
    }
    Ok(())
}

/// In-hub rows are `stop hub distance`; out-hub rows are `hub stop distance`.
fn parse_hubs(timetable: &mut Timetable, dir: &Path) -> Result<(), Box<dyn Error>> {
    let path = dir.join("in_hubs.gr.gz");
    let mut reader = gz_gr_reader(&path)?;
    for result in reader.deserialize() {
        let HubRow(stop, hub, distance) = result.map_err(|err| row_error(&path, err))?;
        timetable.add_in_hub(stop, hub, distance_to_time(distance));
    }

    let path = dir.join("out_hubs.gr.gz");
    let mut reader = gz_gr_reader(&path)?;
    for result in reader.deserialize() {
        let HubRow(hub, stop, distance) = result.map_err(|err| row_error(&path, err))?;
        timetable.add_out_hub(stop, hub, distance_to_time(distance));
    }
    Ok(())
}

fn parse_connections(timetable: &mut Timetable, dir: &Path) -> Result<(), Box<dyn Error>> {
    let path = dir.join("stop_times.csv.gz");
    let mut reader = gz_csv_reader(&path)?;

    let mut rows = vec![];
    for result in reader.deserialize() {
        let row: StopTimeRow = result.map_err(|err| row_error(&path, err))?;
        rows.push(row);
    }

    // group the schedule rows by trip; consecutive events of a trip become
    // its connections
    let trip_events = rows
        .into_iter()
        .map(|row| {
            let event = StopTimeEvent {
                stop: row.stop_id,
                arrival_time: Time::new(row.arrival_time),
                departure_time: Time::new(row.departure_time),
                seq: row.stop_sequence,
            };
            (row.trip_id, event)
        })
        .into_group_map();

    for (trip_id, events) in trip_events {
        timetable.add_trip(trip_id, &events);
    }
    Ok(())
}
