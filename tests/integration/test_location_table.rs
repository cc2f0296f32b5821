// Copyright © 2024 Pathway

use super::helpers::{at, celsius_values, current, sst, variant, waves};

use envdisp_engine::engine::{
    EnvironmentTables, LocationKey, LocationTable, Payload, ReductionPolicy, SstData, WavesData,
};

#[test]
fn test_ingest_twice_is_idempotent() -> eyre::Result<()> {
    let batch = vec![
        sst(41.0, -8.0, 10, 15.0),
        sst(41.0, -8.0, 20, 16.0),
        sst(42.0, -9.0, 10, 14.0),
    ];

    let mut once = LocationTable::new();
    once.ingest_merge(batch.clone());
    let mut twice = LocationTable::new();
    twice.ingest_merge(batch.clone());
    let stats = twice.ingest_merge(batch);

    assert_eq!(stats.appended, 0);
    assert_eq!(stats.duplicates, 3);
    assert_eq!(once.len(), twice.len());
    for (key, record) in once.iter() {
        let other = twice.get(key).expect("location missing after second ingest");
        assert_eq!(celsius_values(record.history()), celsius_values(other.history()));
    }
    Ok(())
}

#[test]
fn test_first_observation_seeds_history() -> eyre::Result<()> {
    let mut table = LocationTable::new();
    table.ingest_merge(vec![sst(41.0, -8.0, 10, 15.0)]);
    table.ingest_merge(vec![sst(41.0, -8.0, 20, 16.0)]);

    let record = table.get_at(41.0, -8.0).expect("location missing");
    assert_eq!(celsius_values(record.history()), vec![(10, 15.0), (20, 16.0)]);
    assert_eq!(record.representative.payload, SstData::new(15.0));
    assert_eq!(record.representative.timestamp, at(10));
    Ok(())
}

#[test]
fn test_same_batch_duplicate_keeps_first() -> eyre::Result<()> {
    let mut table = LocationTable::new();
    let stats = table.ingest_merge(vec![sst(41.0, -8.0, 10, 15.0), sst(41.0, -8.0, 10, 99.0)]);

    assert_eq!(stats.new_locations, 1);
    assert_eq!(stats.duplicates, 1);
    let record = table.get_at(41.0, -8.0).expect("location missing");
    assert_eq!(celsius_values(record.history()), vec![(10, 15.0)]);
    Ok(())
}

#[test]
fn test_locations_are_exact_coordinates() -> eyre::Result<()> {
    let mut table = LocationTable::new();
    table.ingest_merge(vec![
        sst(41.0, -8.0, 10, 15.0),
        sst(41.000_000_1, -8.0, 10, 15.0),
        sst(41.0, -8.0, 20, 15.5),
    ]);

    assert_eq!(table.len(), 2);
    assert_eq!(table.history_len(), 3);
    assert!(table.get(&LocationKey::new(41.000_000_1, -8.0)).is_some());
    Ok(())
}

#[test]
fn test_samples_equal_by_location_only() -> eyre::Result<()> {
    assert_eq!(sst(41.0, -8.0, 10, 15.0), sst(41.0, -8.0, 99, 30.0));
    assert_ne!(sst(41.0, -8.0, 10, 15.0), sst(41.0, -8.5, 10, 15.0));
    Ok(())
}

#[test]
fn test_non_finite_coordinates_are_skipped() -> eyre::Result<()> {
    let mut table = LocationTable::new();
    let stats = table.ingest_merge(vec![sst(f64::NAN, -8.0, 10, 15.0), sst(41.0, -8.0, 10, 15.0)]);

    assert_eq!(stats.malformed, 1);
    assert_eq!(table.len(), 1);
    Ok(())
}

#[test]
fn test_non_finite_values_are_skipped() -> eyre::Result<()> {
    let mut table = LocationTable::new();
    let stats = table.ingest_merge(vec![
        sst(41.0, -8.0, 10, 10.0),
        sst(41.0, -8.0, 20, f64::NAN),
        sst(41.0, -8.0, 30, 20.0),
    ]);

    assert_eq!(stats.malformed, 1);
    assert_eq!(stats.appended, 2);
    let record = table.get_at(41.0, -8.0).expect("missing");
    assert_eq!(celsius_values(record.history()), vec![(10, 10.0), (30, 20.0)]);

    table.reduce(ReductionPolicy::Mean, at(40));
    let record = table.get_at(41.0, -8.0).expect("missing");
    assert_eq!(record.representative.payload, SstData::new(15.0));

    table.reduce(ReductionPolicy::MostRecent, at(25));
    let record = table.get_at(41.0, -8.0).expect("missing");
    assert_eq!(record.representative.payload, SstData::new(10.0));
    Ok(())
}

#[test]
fn test_environment_ingest_skips_non_finite_values() -> eyre::Result<()> {
    let mut tables = EnvironmentTables::new();
    let stats = tables.ingest(vec![
        variant(waves(41.0, -8.0, 10, f64::INFINITY)),
        variant(sst(41.0, -8.0, 10, 12.0)),
    ]);

    assert_eq!(stats.malformed, 1);
    assert!(tables.waves.is_empty());
    assert_eq!(tables.sst.len(), 1);
    Ok(())
}

#[test]
fn test_cross_batch_merge_incoming_wins() -> eyre::Result<()> {
    let mut target: LocationTable<SstData> =
        vec![sst(41.0, -8.0, 10, 1.0), sst(41.0, -8.0, 20, 2.0)]
            .into_iter()
            .collect();
    let incoming: LocationTable<SstData> =
        vec![sst(41.0, -8.0, 20, 20.0), sst(41.0, -8.0, 30, 3.0)]
            .into_iter()
            .collect();

    let stats = target.cross_batch_merge(&incoming);

    assert_eq!(stats.replaced, 1);
    assert_eq!(stats.appended, 1);
    let mut values = celsius_values(target.get_at(41.0, -8.0).expect("missing").history());
    values.sort_by_key(|(seconds, _)| *seconds);
    assert_eq!(values, vec![(10, 1.0), (20, 20.0), (30, 3.0)]);

    let untouched = celsius_values(incoming.get_at(41.0, -8.0).expect("missing").history());
    assert_eq!(untouched, vec![(20, 20.0), (30, 3.0)]);
    Ok(())
}

#[test]
fn test_cross_batch_merge_creates_missing_locations() -> eyre::Result<()> {
    let mut target: LocationTable<SstData> = LocationTable::new();
    let incoming: LocationTable<SstData> = vec![sst(1.0, 2.0, 10, 5.0)].into_iter().collect();

    let stats = target.cross_batch_merge(&incoming);
    assert_eq!(stats.new_locations, 1);
    assert_eq!(
        celsius_values(target.get_at(1.0, 2.0).expect("missing").history()),
        vec![(10, 5.0)]
    );

    let empty = LocationTable::new();
    let stats = target.cross_batch_merge(&empty);
    assert_eq!(stats.appended, 0);
    assert_eq!(target.len(), 1);
    Ok(())
}

#[test]
fn test_short_field_slices_are_undefined() -> eyre::Result<()> {
    let celsius = SstData::new(1.0).with_fields(&[]);
    assert!(celsius.celsius.is_nan());

    let sea = WavesData::new(1.0, 8.0, 270.0).with_fields(&[2.0]);
    assert_eq!(sea.significant_height, 2.0);
    assert!(sea.peak_period.is_nan());
    assert!(!sea.is_defined());
    Ok(())
}

#[test]
fn test_current_info_is_kept_per_entry() -> eyre::Result<()> {
    let mut table = LocationTable::new();
    let mut first = current(41.0, -8.0, 10, 20.0, 90.0);
    first.payload = first.payload.with_info("radar A");
    table.ingest_merge(vec![first]);

    let record = table.get_at(41.0, -8.0).expect("missing");
    assert_eq!(record.history()[0].payload.info, "radar A");
    assert!(record.representative.payload.is_defined());
    Ok(())
}
