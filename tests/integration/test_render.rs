// Copyright © 2024 Pathway

use std::f64::consts::FRAC_PI_2;
use std::sync::atomic::AtomicBool;

use super::helpers::{at, current, sst, variant, waves, LinearProjection};

use envdisp_engine::engine::{
    bin_table, render_cells, render_layer, BinningParams, Cell, ChlorophyllData, Config,
    CurrentData, EnvironmentTables, LocationTable, Partitioning, ReductionPolicy, SstData, Visual,
    WavesData, WindData,
};

fn sst_cells(stale_cutoff: i64) -> Vec<Cell<SstData>> {
    let mut table: LocationTable<SstData> =
        vec![sst(10.0, 10.0, 100, 15.0), sst(10.0, 50.0, 500, 40.0)]
            .into_iter()
            .collect();
    table.reduce(ReductionPolicy::MostRecent, at(1000));
    let mut params = BinningParams::new(Config::default().sst.cell_size().expect("non-zero"));
    params.freshness_cutoff = Some(at(stale_cutoff));
    bin_table(
        &table,
        &LinearProjection::new(100.0, 100.0),
        &params,
        &AtomicBool::new(false),
    )
    .completed()
    .expect("pass was not aborted")
    .cells
}

#[test]
fn test_stale_cells_get_half_alpha() -> eyre::Result<()> {
    let config = Config::default();
    let cells = sst_cells(300);
    let data = render_cells(
        &cells,
        &config.sst,
        config.transparency,
        &LinearProjection::new(100.0, 100.0),
        &|value: f64| value,
    );

    assert_eq!(data.len(), 2);
    assert!(data[0].stale);
    assert_eq!(data[0].alpha, 64);
    assert!(!data[1].stale);
    assert_eq!(data[1].alpha, 128);
    Ok(())
}

#[test]
fn test_sst_color_is_normalized_between_bounds() -> eyre::Result<()> {
    let config = Config::default();
    let data = render_cells(
        &sst_cells(0),
        &config.sst,
        200,
        &LinearProjection::new(100.0, 100.0),
        &|value: f64| value,
    );

    assert_eq!(data[0].color, Some(0.5));
    assert_eq!(data[1].color, Some(1.0));
    assert_eq!(data[0].rotation, None);
    Ok(())
}

#[test]
fn test_legend_depends_on_zoom() -> eyre::Result<()> {
    let config = Config::default();
    let mut projection = LinearProjection::new(100.0, 100.0);
    projection.zoom = config.sst.legend_from_zoom - 1;
    let hidden = render_cells(&sst_cells(0), &config.sst, 128, &projection, &|_: f64| ());
    assert_eq!(hidden[0].legend, None);

    projection.zoom = config.sst.legend_from_zoom;
    let shown = render_cells(&sst_cells(0), &config.sst, 128, &projection, &|_: f64| ());
    assert_eq!(shown[0].legend.as_deref(), Some("15.0\u{b0}C"));

    let mut style = config.sst.clone();
    style.legend = false;
    let disabled = render_cells(&sst_cells(0), &style, 128, &projection, &|_: f64| ());
    assert_eq!(disabled[0].legend, None);
    Ok(())
}

#[test]
fn test_per_variable_rules() -> eyre::Result<()> {
    let config = Config::default();

    let current = CurrentData::new(100.0, 90.0);
    assert_eq!(current.normalized(&config.currents), 0.5);
    let angle = current.icon_angle().expect("currents have a direction");
    assert!(angle.abs() < 1e-12);
    assert_eq!(current.legend_text().as_deref(), Some("100.0cm/s"));

    let wind = WindData::new(0.0, 10.0);
    assert!((wind.heading_deg() - 90.0).abs() < 1e-9);
    let angle = wind.icon_angle().expect("wind has a direction");
    assert!((angle - FRAC_PI_2).abs() < 1e-9);
    assert_eq!(wind.legend_text(), None);
    assert!((wind.speed_knots() - 19.438_444_924_406_05).abs() < 1e-9);

    let chlorophyll = ChlorophyllData::new(30.005);
    assert!((chlorophyll.normalized(&config.chlorophyll) - 0.5).abs() < 1e-12);
    assert_eq!(chlorophyll.legend_text().as_deref(), Some("30.0mg/m\u{b3}"));
    Ok(())
}

#[test]
fn test_rotation_subtracts_map_rotation() -> eyre::Result<()> {
    let mut table: LocationTable<CurrentData> =
        vec![current(10.0, 10.0, 100, 50.0, 0.0)].into_iter().collect();
    table.reduce(ReductionPolicy::MostRecent, at(1000));
    let mut projection = LinearProjection::new(100.0, 100.0);
    projection.rotation = 0.25;
    let cells = bin_table(
        &table,
        &projection,
        &BinningParams::new(Config::default().currents.cell_size().expect("non-zero")),
        &AtomicBool::new(false),
    )
    .completed()
    .expect("pass was not aborted")
    .cells;

    let data = render_cells(&cells, &Config::default().currents, 128, &projection, &|_: f64| 0u8);
    let rotation = data[0].rotation.expect("currents have a direction");
    assert!((rotation - (FRAC_PI_2 - 0.25)).abs() < 1e-12);
    Ok(())
}

#[test]
fn test_colour_map_can_be_disabled() -> eyre::Result<()> {
    let mut style = Config::default().sst;
    style.use_color_map = false;
    let data = render_cells(
        &sst_cells(0),
        &style,
        128,
        &LinearProjection::new(100.0, 100.0),
        &|value: f64| value,
    );
    assert!(data.iter().all(|datum| datum.color.is_none()));
    Ok(())
}

#[test]
fn test_render_layer_from_snapshot() -> eyre::Result<()> {
    let now = at(100_000);
    let mut tables = EnvironmentTables::new();
    tables.ingest(vec![
        variant(waves(10.0, 10.0, 99_000, 3.5)),
        variant(waves(10.0, 11.0, 99_500, 1.5)),
        variant(sst(10.0, 10.0, 99_000, 12.0)),
    ]);
    tables.reduce(ReductionPolicy::MostRecent, now);
    let mut config = Config::default();
    let projection = LinearProjection::new(100.0, 100.0);

    let layer = render_layer::<WavesData, f64, _, _>(
        &tables,
        &config,
        &projection,
        &|value: f64| value,
        now,
        Partitioning::Sequential,
        &AtomicBool::new(false),
    )?
    .expect("pass was not aborted");
    assert_eq!(layer.data.len(), 1);
    assert_eq!(layer.data[0].payload.significant_height, 2.5);
    assert_eq!(layer.stats.visible_locations, 2);

    config.sst.visible = false;
    let hidden = render_layer::<SstData, f64, _, _>(
        &tables,
        &config,
        &projection,
        &|value: f64| value,
        now,
        Partitioning::Sequential,
        &AtomicBool::new(false),
    )?
    .expect("hidden layers are not aborted");
    assert!(hidden.data.is_empty());

    let aborted = render_layer::<SstData, f64, _, _>(
        &tables,
        &Config::default(),
        &projection,
        &|value: f64| value,
        now,
        Partitioning::Sequential,
        &AtomicBool::new(true),
    )?;
    assert!(aborted.is_none());
    Ok(())
}
