// Copyright © 2024 Pathway

use super::helpers::{at, celsius_values, sst};

use envdisp_engine::engine::{
    retention_cutoff, Duration, LocationRecord, LocationTable, ReductionPolicy, SstData,
};

#[test]
fn test_purge_boundary_is_inclusive() -> eyre::Result<()> {
    let mut table: LocationTable<SstData> = vec![
        sst(1.0, 1.0, 100, 1.0),
        sst(2.0, 2.0, 99, 2.0),
        sst(3.0, 3.0, 90, 3.0),
        sst(3.0, 3.0, 100, 3.5),
        sst(3.0, 3.0, 110, 4.0),
    ]
    .into_iter()
    .collect();
    table.reduce(ReductionPolicy::MostRecent, at(1000));

    let stats = table.purge(Some(at(100)));

    assert_eq!(stats.dropped_locations, 1);
    assert_eq!(stats.trimmed_entries, 1);
    assert!(table.get_at(1.0, 1.0).is_some());
    assert!(table.get_at(2.0, 2.0).is_none());
    assert_eq!(
        celsius_values(table.get_at(3.0, 3.0).expect("missing").history()),
        vec![(100, 3.5), (110, 4.0)]
    );
    Ok(())
}

#[test]
fn test_trim_can_empty_history_but_keeps_representative() -> eyre::Result<()> {
    let mut record = LocationRecord::new(sst(1.0, 1.0, 50, 1.0));
    assert_eq!(record.trim_before(at(100)), 1);
    assert!(record.history().is_empty());
    assert_eq!(record.representative.payload, SstData::new(1.0));
    Ok(())
}

#[test]
fn test_purge_trims_but_keeps_fresh_locations() -> eyre::Result<()> {
    let mut table: LocationTable<SstData> = vec![
        sst(1.0, 1.0, 50, 1.0),
        sst(1.0, 1.0, 60, 1.5),
        sst(1.0, 1.0, 200, 2.0),
    ]
    .into_iter()
    .collect();
    table.reduce(ReductionPolicy::MostRecent, at(1000));

    let stats = table.purge(Some(at(100)));
    assert_eq!(stats.dropped_locations, 0);
    assert_eq!(stats.trimmed_entries, 2);
    let record = table.get_at(1.0, 1.0).expect("missing");
    assert_eq!(celsius_values(record.history()), vec![(200, 2.0)]);
    assert_eq!(record.representative.timestamp, at(200));
    Ok(())
}

#[test]
fn test_purge_disabled_is_a_no_op() -> eyre::Result<()> {
    let mut table: LocationTable<SstData> = vec![sst(1.0, 1.0, 0, 1.0)].into_iter().collect();
    let stats = table.purge(None);
    assert_eq!(stats.dropped_locations, 0);
    assert_eq!(stats.trimmed_entries, 0);
    assert_eq!(table.len(), 1);
    Ok(())
}

#[test]
fn test_no_valid_data_is_purged_once_history_expires() -> eyre::Result<()> {
    let mut table: LocationTable<SstData> = vec![sst(1.0, 1.0, 500, 1.0)].into_iter().collect();
    table.reduce(ReductionPolicy::MostRecent, at(100));
    assert!(table.get_at(1.0, 1.0).expect("missing").representative.timestamp.is_epoch());

    assert_eq!(table.purge(Some(at(10))).dropped_locations, 0);
    assert_eq!(table.len(), 1);

    assert_eq!(table.purge(Some(at(600))).dropped_locations, 1);
    assert!(table.is_empty());
    Ok(())
}

#[test]
fn test_stale_representative_with_fresh_history_survives() -> eyre::Result<()> {
    let mut table: LocationTable<SstData> = vec![sst(1.0, 1.0, 50, 1.0)].into_iter().collect();
    table.reduce(ReductionPolicy::MostRecent, at(60));
    table.ingest_merge(vec![sst(1.0, 1.0, 300, 2.0)]);

    let stats = table.purge(Some(at(100)));
    assert_eq!(stats.dropped_locations, 0);
    assert_eq!(stats.trimmed_entries, 1);

    table.reduce(ReductionPolicy::MostRecent, at(400));
    let record = table.get_at(1.0, 1.0).expect("missing");
    assert_eq!(celsius_values(record.history()), vec![(300, 2.0)]);
    assert_eq!(record.representative.payload, SstData::new(2.0));
    Ok(())
}

#[test]
fn test_retention_cutoff() -> eyre::Result<()> {
    assert_eq!(retention_cutoff(at(7200), Some(Duration::from_hours(1.0))), Some(at(3600)));
    assert_eq!(retention_cutoff(at(7200), None), None);
    Ok(())
}
