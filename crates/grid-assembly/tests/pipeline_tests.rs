//! End-to-end pipeline tests over synthetic record batches.

use grid_assembly::{
    AssemblyConfig, AssemblyError, Pipeline, RejectReason,
};
use grid_common::{
    level_types, params, BoundingBox, LevelFilter, LevelMatch, ParamRemap, RemapTable, VecSource,
};
use test_utils::{latlon_grid, test_time, RecordBuilder};

#[test]
fn test_single_record_roundtrip() {
    let values: Vec<f32> = (0..16).map(|v| v as f32).collect();
    let record = RecordBuilder::latlon(0.0, 0.0, 15.0, 15.0, 4, 4)
        .values(values.clone())
        .build();

    let config = AssemblyConfig::default();
    let output = Pipeline::new(&config).run_records(vec![record]).unwrap();

    assert!(output.rejected.is_empty());
    assert_eq!(output.datasets.len(), 1);
    let ds = &output.datasets[0];
    assert_eq!(ds.axes().level_type, level_types::SURFACE);
    assert_eq!(ds.axes().grid.nx, 4);
    // Canonical-orientation input survives unchanged.
    for row in 0..4 {
        for col in 0..4 {
            assert_eq!(ds.get(0, 0, 0, col, row), values[row * 4 + col]);
        }
    }
}

#[test]
fn test_empty_batch_after_filtering_is_empty_result() {
    let record = RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3).build();
    let config = AssemblyConfig {
        levels: LevelFilter {
            rejected: vec![LevelMatch::AllOfType(level_types::SURFACE)],
            accepted_types: None,
        },
        ..AssemblyConfig::default()
    };

    let output = Pipeline::new(&config).run_records(vec![record]).unwrap();

    // Nothing to contribute is an empty result, not an error.
    assert!(output.datasets.is_empty());
    assert_eq!(output.rejected.len(), 1);
    assert_eq!(output.rejected[0].1, RejectReason::RejectedLevel);
    assert_eq!(output.record_count, 1);
}

#[test]
fn test_rejected_records_are_counted_not_dropped() {
    let good = RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3).build();
    let mut bad = RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3).build();
    bad.values.truncate(4);

    let config = AssemblyConfig::default();
    let output = Pipeline::new(&config).run_records(vec![good, bad]).unwrap();

    assert_eq!(output.datasets.len(), 1);
    assert_eq!(output.rejected.len(), 1);
    assert_eq!(
        output.rejected[0].1,
        RejectReason::SampleCountMismatch {
            expected: 9,
            actual: 4
        }
    );
}

#[test]
fn test_remap_conflict_aborts_run() {
    let precip = RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3)
        .param(61, "precipitation")
        .build();
    let rh = RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3)
        .param(52, "relative humidity")
        .build();

    let config = AssemblyConfig {
        remap: RemapTable::new(vec![ParamRemap {
            source_id: 61,
            level: None,
            target_id: 52,
            target_name: "relative humidity".to_string(),
            conversion: None,
            force_surface: false,
        }]),
        ..AssemblyConfig::default()
    };

    let err = Pipeline::new(&config)
        .run_records(vec![precip, rh])
        .unwrap_err();
    assert!(matches!(err, AssemblyError::RemapConflict { id: 52 }));
}

#[test]
fn test_stitch_two_tiles_into_covering_grid() {
    // Two adjacent 3x3 tiles over [0,10] and [10,20] longitude stitch
    // into one 5x3 grid covering [0,20]; the shared edge column is not
    // duplicated.
    let west = RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3)
        .uniform(1.0)
        .build();
    let east = RecordBuilder::latlon(10.0, 0.0, 20.0, 10.0, 3, 3)
        .uniform(2.0)
        .build();

    let config = AssemblyConfig {
        stitch: true,
        ..AssemblyConfig::default()
    };
    let output = Pipeline::new(&config)
        .run_records(vec![west, east])
        .unwrap();

    assert_eq!(output.datasets.len(), 1);
    let ds = &output.datasets[0];
    assert_eq!(ds.axes().grid.nx, 5);
    assert_eq!(ds.axes().grid.ny, 3);
    let bounds = ds.axes().grid.geographic_bounds();
    assert_eq!(bounds, BoundingBox::new(0.0, 0.0, 20.0, 10.0));
    assert_eq!(ds.get(0, 0, 0, 0, 0), 1.0);
    assert_eq!(ds.get(0, 0, 0, 4, 0), 2.0);
}

#[test]
fn test_crop_to_subgrid() {
    let record = RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 11, 11).build();
    let config = AssemblyConfig {
        crop: Some(BoundingBox::new(2.0, 3.0, 6.0, 8.0)),
        ..AssemblyConfig::default()
    };

    let output = Pipeline::new(&config).run_records(vec![record]).unwrap();

    let ds = &output.datasets[0];
    assert_eq!(ds.axes().grid.nx, 5);
    assert_eq!(ds.axes().grid.ny, 6);
    // A crop fully inside the source leaves no missing cells.
    let plane = ds.plane(0, 0, 0);
    assert!(plane.iter().all(|v| !v.is_nan()));
    // Crop cell (0,0) is source point (lon 2, lat 3).
    assert_eq!(ds.get(0, 0, 0, 0, 0), (3 * 11 + 2) as f32);
}

#[test]
fn test_target_grid_reprojection() {
    let record = RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 11, 11).build();
    let config = AssemblyConfig {
        target_grid: Some(latlon_grid(0.0, 0.0, 10.0, 10.0, 6, 6)),
        ..AssemblyConfig::default()
    };

    let output = Pipeline::new(&config).run_records(vec![record]).unwrap();

    let ds = &output.datasets[0];
    assert_eq!(ds.axes().grid.nx, 6);
    assert_eq!(ds.axes().grid.ny, 6);
    // Target points coincide with every second source point.
    assert_eq!(ds.get(0, 0, 0, 1, 0), 2.0);
}

#[test]
fn test_at_most_one_write_with_priority_overwrite() {
    let first = RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3)
        .uniform(1.0)
        .build();
    let duplicate = RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3)
        .uniform(2.0)
        .build();
    let corrected = RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3)
        .uniform(3.0)
        .corrected()
        .build();

    let config = AssemblyConfig::default();

    // Non-priority duplicate never changes an already-written cell.
    let output = Pipeline::new(&config)
        .run_records(vec![first.clone(), duplicate.clone()])
        .unwrap();
    assert_eq!(output.datasets[0].get(0, 0, 0, 1, 1), 1.0);

    // A corrected report always overwrites.
    let output = Pipeline::new(&config)
        .run_records(vec![first, duplicate, corrected])
        .unwrap();
    assert_eq!(output.datasets[0].get(0, 0, 0, 1, 1), 3.0);
}

#[test]
fn test_hybrid_pressure_derivation() {
    let surface_pressure = RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3)
        .param(params::PRESSURE, "pressure")
        .uniform(1013.0)
        .build();
    let hybrid_temp = RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3)
        .param(params::TEMPERATURE, "temperature")
        .level(level_types::HYBRID, 1.0)
        .coefficients(vec![0.0, 1.0])
        .uniform(12.0)
        .build();

    let config = AssemblyConfig::default();
    let output = Pipeline::new(&config)
        .run_records(vec![surface_pressure, hybrid_temp])
        .unwrap();

    let hybrid = output
        .datasets
        .iter()
        .find(|d| d.axes().level_type == level_types::HYBRID)
        .unwrap();
    let p_idx = hybrid.axes().param_index(params::PRESSURE).unwrap();
    // 1013 hPa with a=0, b=1 under the legacy /100 normalization.
    let p = hybrid.get(0, 0, p_idx, 1, 1);
    assert!((p - 10.13).abs() < 1e-4, "p = {}", p);
}

#[test]
fn test_relative_humidity_derivation_on_isobaric_levels() {
    let temp = RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3)
        .param(params::TEMPERATURE, "temperature")
        .level(level_types::ISOBARIC, 1000.0)
        .uniform(15.0)
        .build();
    let q = RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3)
        .param(params::SPECIFIC_HUMIDITY, "specific humidity")
        .level(level_types::ISOBARIC, 1000.0)
        .uniform(0.0075)
        .build();

    let config = AssemblyConfig::default();
    let output = Pipeline::new(&config).run_records(vec![temp, q]).unwrap();

    let ds = &output.datasets[0];
    let rh_idx = ds.axes().param_index(params::RELATIVE_HUMIDITY).unwrap();
    let rh = ds.get(0, 0, rh_idx, 1, 1);
    assert!((60.0..80.0).contains(&rh), "rh = {}", rh);
}

#[test]
fn test_derived_rh_never_overwrites_observed_values() {
    let temp = RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3)
        .param(params::TEMPERATURE, "temperature")
        .level(level_types::ISOBARIC, 1000.0)
        .uniform(15.0)
        .build();
    let q = RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3)
        .param(params::SPECIFIC_HUMIDITY, "specific humidity")
        .level(level_types::ISOBARIC, 1000.0)
        .uniform(0.0075)
        .build();
    let observed_rh = RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3)
        .param(params::RELATIVE_HUMIDITY, "relative humidity")
        .level(level_types::ISOBARIC, 1000.0)
        .uniform(42.0)
        .build();

    let config = AssemblyConfig::default();
    let output = Pipeline::new(&config)
        .run_records(vec![temp, q, observed_rh])
        .unwrap();

    let ds = &output.datasets[0];
    let rh_idx = ds.axes().param_index(params::RELATIVE_HUMIDITY).unwrap();
    assert_eq!(ds.get(0, 0, rh_idx, 1, 1), 42.0);
}

#[test]
fn test_multi_source_run_merges_batches() {
    let sources: Vec<Box<dyn grid_common::RecordSource + Send>> = vec![
        Box::new(VecSource::new(vec![
            RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3)
                .valid_time(test_time(0))
                .build(),
        ])),
        Box::new(VecSource::new(vec![
            RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3)
                .valid_time(test_time(6))
                .build(),
        ])),
    ];

    let config = AssemblyConfig::default();
    let output = Pipeline::new(&config).run_sources(sources).unwrap();

    assert_eq!(output.datasets.len(), 1);
    assert_eq!(output.datasets[0].axes().times.len(), 2);
}

#[test]
fn test_sequential_decode_gives_same_result() {
    let build = || -> Vec<Box<dyn grid_common::RecordSource + Send>> {
        vec![
            Box::new(VecSource::new(vec![
                RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3)
                    .valid_time(test_time(0))
                    .build(),
            ])),
            Box::new(VecSource::new(vec![
                RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3)
                    .valid_time(test_time(6))
                    .build(),
            ])),
        ]
    };

    let parallel_config = AssemblyConfig::default();
    let sequential_config = AssemblyConfig {
        sequential_decode: true,
        ..AssemblyConfig::default()
    };

    let a = Pipeline::new(&parallel_config).run_sources(build()).unwrap();
    let b = Pipeline::new(&sequential_config)
        .run_sources(build())
        .unwrap();
    assert_eq!(a.datasets.len(), b.datasets.len());
    assert_eq!(
        a.datasets[0].axes().times.len(),
        b.datasets[0].axes().times.len()
    );
}

#[test]
fn test_time_staggered_accumulation_variants() {
    let three_hour = RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3)
        .param(61, "precipitation")
        .accumulation(3)
        .uniform(1.5)
        .build();
    let six_hour = RecordBuilder::latlon(0.0, 0.0, 10.0, 10.0, 3, 3)
        .param(61, "precipitation")
        .accumulation(6)
        .uniform(4.5)
        .build();

    let config = AssemblyConfig {
        accumulation: Some(grid_assembly::AccumulationSelect {
            hours: 3,
            complement: false,
        }),
        ..AssemblyConfig::default()
    };
    let output = Pipeline::new(&config)
        .run_records(vec![three_hour, six_hour])
        .unwrap();

    assert_eq!(output.datasets.len(), 1);
    assert_eq!(output.datasets[0].get(0, 0, 0, 0, 0), 1.5);
    assert_eq!(output.rejected.len(), 1);
    assert_eq!(output.rejected[0].1, RejectReason::AccumulationWindow);
}
