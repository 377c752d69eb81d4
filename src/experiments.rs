use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Deserialize;

use super::csa::ConnectionScan;
use super::time::Time;
use super::timetable::{NodeId, Timetable};

/// Which query variant an experiment runs.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum QueryMode {
    EarliestArrival,
    Profile,
    MultiCriteria,
}

/// One benchmark query: find a journey from `source` to `target` departing
/// at `time`.  The rank column records the Dijkstra-rank bucket of ranked
/// query sets; it is carried through but not interpreted.
#[derive(Copy, Clone, Debug)]
pub struct Query {
    pub rank: u16,
    pub source: NodeId,
    pub target: NodeId,
    pub time: Time,
}

#[derive(Deserialize)]
struct QueryRow {
    rank: u16,
    source: NodeId,
    target: NodeId,
    time: i64,
}

/// Read the dataset's query file (`queries.csv`, or `rank_queries.csv`
/// when `ranked` is set).
pub fn read_queries(dir: &Path, ranked: bool) -> Result<Vec<Query>, Box<dyn Error>> {
    let file_name = if ranked { "rank_queries.csv" } else { "queries.csv" };
    let path = dir.join(file_name);
    let file = File::open(&path)
        .map_err(|err| format!("couldn't open {}: {}", path.display(), err))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut queries = vec![];
    for result in reader.deserialize() {
        let row: QueryRow = result
            .map_err(|err| format!("malformed row in {}: {}", path.display(), err))?;
        queries.push(Query {
            rank: row.rank,
            source: row.source,
            target: row.target,
            time: Time::new(row.time),
        });
    }
    Ok(queries)
}

// what one timed query produced; unused fields stay at their defaults
// depending on the mode
struct QueryOutcome {
    running_time_ms: f64,
    arrival_time: Time,
    n_journey: usize,
    bag_size: usize,
}

/// Runs a set of queries against a timetable, timing each one, and writes
/// the result CSVs the experiment scripts expect.
pub struct Experiment<'a> {
    timetable: &'a Timetable,
    queries: Vec<Query>,
    mode: QueryMode,
    use_hl: bool,
    dataset: String,
    output_dir: PathBuf,
}

impl<'a> Experiment<'a> {
    pub fn new(
        timetable: &'a Timetable,
        queries: Vec<Query>,
        mode: QueryMode,
        use_hl: bool,
        dataset: &str,
        output_dir: &Path,
    ) -> Experiment<'a> {
        Experiment {
            timetable,
            queries,
            mode,
            use_hl,
            dataset: String::from(dataset),
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// The tag used in output file names: CSA, HLCSA, pCSA, pHLCSA, mcCSA
    /// or mcHLCSA.
    pub fn algorithm_name(&self) -> String {
        let mode_prefix = match self.mode {
            QueryMode::EarliestArrival => "",
            QueryMode::Profile => "p",
            QueryMode::MultiCriteria => "mc",
        };
        let hub_prefix = if self.use_hl { "HL" } else { "" };
        format!("{}{}CSA", mode_prefix, hub_prefix)
    }

    /// Run every query once, timing the query call alone (scratch setup
    /// and teardown are excluded), then write the result files.
    pub fn run(&self) -> Result<(), Box<dyn Error>> {
        log::info!("running {} {} queries on {}...",
                   self.queries.len(), self.algorithm_name(), self.dataset);

        let mut csa = ConnectionScan::new(self.timetable, self.use_hl);
        let mut outcomes = Vec::with_capacity(self.queries.len());

        for (ii, query) in self.queries.iter().enumerate() {
            csa.init();
            let started = Instant::now();

            let mut outcome = QueryOutcome {
                running_time_ms: 0.,
                arrival_time: Time::INF,
                n_journey: 0,
                bag_size: 0,
            };
            match self.mode {
                QueryMode::EarliestArrival => {
                    outcome.arrival_time = csa.query(query.source, query.target, query.time);
                }
                QueryMode::Profile => {
                    let profile = csa.profile_query(query.source, query.target);
                    outcome.n_journey = profile.len();
                }
                QueryMode::MultiCriteria => {
                    let bag = csa.mc_query(query.source, query.target, query.time);
                    outcome.arrival_time = bag.earliest_arrival();
                    outcome.bag_size = bag.len();
                }
            }

            outcome.running_time_ms = started.elapsed().as_secs_f64() * 1000.;
            csa.clear();

            log::debug!("query {} (rank {}): {:.4} ms", ii, query.rank, outcome.running_time_ms);
            outcomes.push(outcome);
        }

        if !outcomes.is_empty() {
            let total: f64 = outcomes.iter().map(|oo| oo.running_time_ms).sum();
            log::info!("average running time: {:.4} ms", total / outcomes.len() as f64);
        }

        self.write_results(&outcomes)
    }

    fn output_path(&self, suffix: &str) -> PathBuf {
        let file_name = format!("{}_{}_{}.csv", self.dataset, self.algorithm_name(), suffix);
        self.output_dir.join(file_name)
    }

    fn write_results(&self, outcomes: &[QueryOutcome]) -> Result<(), Box<dyn Error>> {
        if self.mode == QueryMode::Profile {
            // profile runs report the journey count next to the timing
            let mut writer = csv::Writer::from_path(self.output_path("stats"))?;
            writer.write_record(["running_time", "n_journey"])?;
            for oo in outcomes {
                writer.write_record(&[
                    format!("{:.4}", oo.running_time_ms),
                    format!("{}", oo.n_journey),
                ])?;
            }
            writer.flush()?;
            return Ok(());
        }

        let mut writer = csv::Writer::from_path(self.output_path("running_time"))?;
        writer.write_record(["running_time"])?;
        for oo in outcomes {
            writer.write_record(&[format!("{:.4}", oo.running_time_ms)])?;
        }
        writer.flush()?;

        let mut writer = csv::Writer::from_path(self.output_path("arrival_times"))?;
        writer.write_record(["arrival_time"])?;
        for oo in outcomes {
            writer.write_record(&[format!("{}", oo.arrival_time)])?;
        }
        writer.flush()?;

        if self.mode == QueryMode::MultiCriteria {
            let mut writer = csv::Writer::from_path(self.output_path("bag_sizes"))?;
            writer.write_record(["bag_size"])?;
            for oo in outcomes {
                writer.write_record(&[format!("{}", oo.bag_size)])?;
            }
            writer.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Write;

    use tempfile::tempdir;

    use super::super::test_utils::two_trip_timetable;
    use super::*;

    #[test]
    fn test_algorithm_names() {
        let timetable = two_trip_timetable();
        let cases = [
            (QueryMode::EarliestArrival, false, "CSA"),
            (QueryMode::EarliestArrival, true, "HLCSA"),
            (QueryMode::Profile, false, "pCSA"),
            (QueryMode::Profile, true, "pHLCSA"),
            (QueryMode::MultiCriteria, false, "mcCSA"),
            (QueryMode::MultiCriteria, true, "mcHLCSA"),
        ];
        for (mode, use_hl, expected) in cases {
            let exp = Experiment::new(&timetable, vec![], mode, use_hl, "test", Path::new("."));
            assert_eq!(exp.algorithm_name(), expected);
        }
    }

    #[test]
    fn test_read_queries() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let mut file = File::create(dir.path().join("queries.csv"))?;
        write!(file, "rank,source,target,time\n0,0,2,50\n3,1,2,100\n")?;
        drop(file);

        let queries = read_queries(dir.path(), false)?;
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].source, 0);
        assert_eq!(queries[0].time, Time::new(50));
        assert_eq!(queries[1].rank, 3);

        // the ranked variant reads a different file, absent here
        assert!(read_queries(dir.path(), true).is_err());
        Ok(())
    }

    fn scenario_queries() -> Vec<Query> {
        vec![
            Query { rank: 0, source: 0, target: 2, time: Time::new(0) },
            Query { rank: 0, source: 0, target: 2, time: Time::new(150) },
        ]
    }

    #[test]
    fn test_run_earliest_arrival_outputs() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let timetable = two_trip_timetable();
        let exp = Experiment::new(
            &timetable,
            scenario_queries(),
            QueryMode::EarliestArrival,
            false,
            "tiny",
            dir.path(),
        );
        exp.run()?;

        let arrivals = fs::read_to_string(dir.path().join("tiny_CSA_arrival_times.csv"))?;
        assert_eq!(arrivals, "arrival_time\n300\ninf\n");

        let timings = fs::read_to_string(dir.path().join("tiny_CSA_running_time.csv"))?;
        let mut lines = timings.lines();
        assert_eq!(lines.next(), Some("running_time"));
        for line in lines {
            let ms: f64 = line.parse()?;
            assert!(ms >= 0.);
        }
        Ok(())
    }

    #[test]
    fn test_run_profile_outputs() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let timetable = two_trip_timetable();
        let exp = Experiment::new(
            &timetable,
            scenario_queries(),
            QueryMode::Profile,
            false,
            "tiny",
            dir.path(),
        );
        exp.run()?;

        let stats = fs::read_to_string(dir.path().join("tiny_pCSA_stats.csv"))?;
        let lines: Vec<&str> = stats.lines().collect();
        assert_eq!(lines[0], "running_time,n_journey");
        // one optimal journey plus the sentinel pair
        assert!(lines[1].ends_with(",2"));
        Ok(())
    }

    #[test]
    fn test_run_mc_outputs() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let timetable = two_trip_timetable();
        let exp = Experiment::new(
            &timetable,
            scenario_queries(),
            QueryMode::MultiCriteria,
            false,
            "tiny",
            dir.path(),
        );
        exp.run()?;

        let arrivals = fs::read_to_string(dir.path().join("tiny_mcCSA_arrival_times.csv"))?;
        assert_eq!(arrivals, "arrival_time\n300\ninf\n");
        let bag_sizes = fs::read_to_string(dir.path().join("tiny_mcCSA_bag_sizes.csv"))?;
        assert_eq!(bag_sizes, "bag_size\n1\n0\n");
        Ok(())
    }
}
