//! JSON summary sink for assembled datasets.
//!
//! Writes the axes and per-parameter sample counts of a dataset; the
//! assembly core never sees this layout.

use chrono::{DateTime, Utc};
use grid_assembly::{Dataset, DatasetSink};
use grid_common::BoundingBox;
use serde::Serialize;
use std::fs::File;
use std::io;
use std::path::Path;

#[derive(Serialize)]
struct ParameterSummary {
    id: u16,
    name: String,
    present_samples: usize,
}

#[derive(Serialize)]
struct DatasetSummary {
    level_type: u8,
    times: Vec<DateTime<Utc>>,
    levels: Vec<f64>,
    nx: usize,
    ny: usize,
    bounds: BoundingBox,
    parameters: Vec<ParameterSummary>,
}

pub struct JsonSummarySink;

impl DatasetSink for JsonSummarySink {
    fn write(&self, dataset: &Dataset, dest: &Path) -> io::Result<()> {
        let axes = dataset.axes();
        let parameters = axes
            .parameters
            .iter()
            .enumerate()
            .map(|(p, param)| {
                let present = (0..axes.times.len())
                    .flat_map(|t| (0..axes.levels.len()).map(move |l| (t, l)))
                    .map(|(t, l)| {
                        dataset
                            .plane(t, l, p)
                            .iter()
                            .filter(|v| !v.is_nan())
                            .count()
                    })
                    .sum();
                ParameterSummary {
                    id: param.id,
                    name: param.name.clone(),
                    present_samples: present,
                }
            })
            .collect();

        let summary = DatasetSummary {
            level_type: axes.level_type,
            times: axes.times.times(),
            levels: axes.levels.clone(),
            nx: axes.grid.nx,
            ny: axes.grid.ny,
            bounds: axes.grid.geographic_bounds(),
            parameters,
        };

        let file = File::create(dest)?;
        serde_json::to_writer_pretty(file, &summary).map_err(io::Error::other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_assembly::{AssemblyConfig, Pipeline};
    use test_utils::RecordBuilder;

    #[test]
    fn test_summary_written_as_json() {
        let record = RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3).build();
        let config = AssemblyConfig::default();
        let output = Pipeline::new(&config).run_records(vec![record]).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("summary.json");
        JsonSummarySink.write(&output.datasets[0], &dest).unwrap();

        let text = std::fs::read_to_string(&dest).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["level_type"], 1);
        assert_eq!(value["nx"], 3);
        assert_eq!(value["parameters"][0]["id"], 11);
        assert_eq!(value["parameters"][0]["present_samples"], 9);
    }
}
