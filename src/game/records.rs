//! Best runs, kept as a top 10 in the user's data directory.

use std::cmp::Ordering;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::{
    GameSystems,
    state::{RunEnded, RunStats},
};
use crate::persist::{data_path, load_json, save_json};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<RunRecords>();
    app.add_systems(Startup, load_run_records);
    app.add_systems(Update, record_finished_runs.after(GameSystems::Effects));
}

const MAX_RECORDS: usize = 10;
const RECORDS_FILE: &str = "records.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub stage_reached: u32,
    pub robots_destroyed: u32,
    pub run_time: f32,
    pub won: bool,
}

impl RunRecord {
    pub fn from_stats(stats: &RunStats, won: bool) -> Self {
        Self {
            stage_reached: stats.stage_reached,
            robots_destroyed: stats.robots_destroyed,
            run_time: stats.run_time,
            won,
        }
    }

    /// Deeper first, then more robots, then faster.
    fn rank(&self, other: &Self) -> Ordering {
        other
            .stage_reached
            .cmp(&self.stage_reached)
            .then(other.robots_destroyed.cmp(&self.robots_destroyed))
            .then(self.run_time.total_cmp(&other.run_time))
    }
}

#[derive(Resource, Debug, Default, Serialize, Deserialize)]
pub struct RunRecords {
    pub entries: Vec<RunRecord>,
    /// Position of the run that just ended, if it made the list.
    #[serde(skip)]
    pub latest: Option<usize>,
}

impl RunRecords {
    /// Returns the record's position if it made the top 10.
    pub fn insert(&mut self, record: RunRecord) -> Option<usize> {
        let pos = self
            .entries
            .iter()
            .position(|e| record.rank(e) == Ordering::Less)
            .unwrap_or(self.entries.len());
        if pos >= MAX_RECORDS {
            return None;
        }
        self.entries.insert(pos, record);
        self.entries.truncate(MAX_RECORDS);
        Some(pos)
    }

    pub fn best(&self) -> Option<&RunRecord> {
        self.entries.first()
    }
}

fn load_run_records(mut records: ResMut<RunRecords>) {
    let Some(path) = data_path(RECORDS_FILE) else {
        warn!("Could not determine data directory for run records");
        return;
    };
    match load_json::<RunRecords>(&path) {
        Ok(Some(loaded)) => {
            info!("Loaded {} run records from {:?}", loaded.entries.len(), path);
            *records = loaded;
        }
        Ok(None) => info!("No run records at {:?}, starting fresh", path),
        Err(e) => warn!("Ignoring run records: {:#}", e),
    }
}

fn record_finished_runs(
    mut ended: MessageReader<RunEnded>,
    stats: Res<RunStats>,
    mut records: ResMut<RunRecords>,
) {
    for run in ended.read() {
        let latest = records.insert(RunRecord::from_stats(&stats, run.won));
        records.latest = latest;
        let Some(rank) = latest else {
            continue;
        };
        info!("Run placed #{} in the records", rank + 1);

        let Some(path) = data_path(RECORDS_FILE) else {
            warn!("Could not determine data directory for saving run records");
            continue;
        };
        match save_json(&path, &*records) {
            Ok(()) => info!("Saved run records to {:?}", path),
            Err(e) => warn!("Failed to save run records: {:#}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(stage_reached: u32, robots_destroyed: u32, run_time: f32) -> RunRecord {
        RunRecord {
            stage_reached,
            robots_destroyed,
            run_time,
            won: false,
        }
    }

    #[test]
    fn test_records_order_by_floor_then_robots_then_time() {
        let mut records = RunRecords::default();
        records.insert(record(3, 40, 300.0));
        records.insert(record(5, 10, 900.0));
        records.insert(record(3, 55, 500.0));
        records.insert(record(3, 40, 200.0));

        let order: Vec<_> = records
            .entries
            .iter()
            .map(|r| (r.stage_reached, r.robots_destroyed, r.run_time))
            .collect();
        assert_eq!(
            order,
            vec![
                (5, 10, 900.0),
                (3, 55, 500.0),
                (3, 40, 200.0),
                (3, 40, 300.0)
            ]
        );
    }

    #[test]
    fn test_only_ten_records_are_kept() {
        let mut records = RunRecords::default();
        for stage in 1..=10 {
            assert!(records.insert(record(stage, 0, 60.0)).is_some());
        }
        assert_eq!(records.insert(record(1, 0, 90.0)), None);
        assert_eq!(records.insert(record(9, 3, 10.0)), Some(1));
        assert_eq!(records.entries.len(), MAX_RECORDS);
        assert_eq!(records.best().map(|r| r.stage_reached), Some(10));
        assert_eq!(records.entries.last().map(|r| r.stage_reached), Some(2));
    }

    #[test]
    fn test_records_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RECORDS_FILE);
        let mut records = RunRecords::default();
        records.insert(record(4, 22, 321.5));
        records.latest = Some(0);

        save_json(&path, &records).unwrap();
        let loaded: RunRecords = load_json(&path).unwrap().unwrap();
        assert_eq!(loaded.entries, records.entries);
        assert_eq!(loaded.latest, None);
    }
}
