use std::fs;

use demesne::{
    engine::{EngineBuilder, EngineSettings},
    scenario::ScenarioLoader,
};
use tempfile::tempdir;

#[test]
fn snapshots_are_written_on_interval() {
    let loader = ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"));
    let scenario = loader.load("scenarios/river_holdings.yaml").unwrap();
    let mut world = scenario.build_world().unwrap();
    let dir = tempdir().unwrap();
    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
        tick_days: 1,
        snapshot_interval_ticks: 5,
        snapshot_dir: dir.path().to_path_buf(),
    };
    let mut engine = EngineBuilder::new(settings).with_standard_systems().build();

    let mut written = Vec::new();
    engine
        .run_with_hook(&mut world, 10, |report| {
            if let Some(path) = report.snapshot_path {
                written.push(path);
            }
        })
        .unwrap();

    let expected = dir.path().join("river_holdings").join("tick_000010.json");
    assert_eq!(written.len(), 2);
    assert_eq!(written.last(), Some(&expected));

    let content = fs::read_to_string(&expected).unwrap();
    assert!(content.contains("\"scenario\": \"river_holdings\""));
    assert!(content.contains("\"written_at\""));

    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(value["snapshot"]["tick"], 10);
    assert_eq!(value["snapshot"]["calendar"]["day"], 10);
}
