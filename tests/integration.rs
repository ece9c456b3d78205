use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn geoharvest_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("geoharvest");
    path
}

fn webmap_fixture() -> Value {
    json!({
        "operationalLayers": [
            {
                "id": "slums-2019",
                "title": "Informal Settlements",
                "featureCollection": {"layers": [{
                    "layerDefinition": {"geometryType": "esriGeometryPolygon", "name": "Settlements 2019"},
                    "featureSet": {"features": [{
                        "geometry": {"rings": [
                            [[0.0, 0.0], [111319.49, 0.0], [111319.49, 111325.14], [0.0, 0.0]],
                            [[222638.98, 0.0], [333958.47, 0.0], [333958.47, 111325.14]]
                        ]},
                        "attributes": {"OBJECTID": 7, "Name": "Riverside"}
                    }]}
                }]}
            },
            {
                "id": "empty",
                "title": "Nothing here",
                "featureCollection": {"layers": [{
                    "layerDefinition": {"geometryType": "esriGeometryPoint", "name": "Wells"},
                    "featureSet": {"features": []}
                }]}
            },
            {"id": "basemap", "title": "Imagery"}
        ]
    })
}

fn setup_webmap_env(webmap: &Value) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let input = root.join("webmap.json");
    fs::write(&input, serde_json::to_string_pretty(webmap).unwrap()).unwrap();

    let config_content = format!(
        r#"[webmap]
input = "{}"
output_dir = "{}"
source_app_id = "app-123"
file_prefix = "atlas_"
"#,
        input.display(),
        root.join("out").display()
    );
    let config_path = root.join("geoharvest.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_geoharvest(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = geoharvest_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("--progress")
        .arg("off")
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run geoharvest binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_webmap_exports_non_empty_layers_only() {
    let (tmp, config_path) = setup_webmap_env(&webmap_fixture());

    let (stdout, stderr, success) = run_geoharvest(&config_path, &["webmap"]);
    assert!(success, "webmap failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Exported:"));

    let out_dir = tmp.path().join("out");
    let files: Vec<String> = fs::read_dir(&out_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(files, vec!["atlas_settlements_2019.geojson".to_string()]);
    assert!(stdout.contains("atlas_settlements_2019.geojson"));

    let doc: Value = serde_json::from_str(
        &fs::read_to_string(out_dir.join("atlas_settlements_2019.geojson")).unwrap(),
    )
    .unwrap();
    assert_eq!(doc["type"], "FeatureCollection");
    assert_eq!(doc["metadata"]["feature_count"], 1);
    assert_eq!(doc["metadata"]["source_app_id"], "app-123");
    assert_eq!(doc["metadata"]["source_layer_id"], "slums-2019");
    assert_eq!(doc["metadata"]["source_layer_title"], "Informal Settlements");
    assert_eq!(doc["metadata"]["geometry_type"], "esriGeometryPolygon");

    let feature = &doc["features"][0];
    assert_eq!(feature["properties"]["Name"], "Riverside");
    assert_eq!(feature["geometry"]["type"], "MultiPolygon");
    let polygons = feature["geometry"]["coordinates"].as_array().unwrap();
    assert_eq!(polygons.len(), 2);

    // Second ring arrived open and must come out closed.
    let ring = polygons[1][0].as_array().unwrap();
    assert_eq!(ring.first(), ring.last());
    let lon = ring[1][0].as_f64().unwrap();
    assert!((lon - 3.0).abs() < 1e-3, "lon = {}", lon);
}

#[test]
fn test_webmap_cli_flags_override_config() {
    let (tmp, config_path) = setup_webmap_env(&webmap_fixture());
    let other = tmp.path().join("elsewhere");

    let (stdout, stderr, success) = run_geoharvest(
        &config_path,
        &[
            "webmap",
            "--output-dir",
            other.to_str().unwrap(),
            "--source-app-id",
            "override",
        ],
    );
    assert!(success, "webmap failed: stdout={}, stderr={}", stdout, stderr);
    assert!(!tmp.path().join("out").exists());

    let doc: Value = serde_json::from_str(
        &fs::read_to_string(other.join("atlas_settlements_2019.geojson")).unwrap(),
    )
    .unwrap();
    assert_eq!(doc["metadata"]["source_app_id"], "override");
}

#[test]
fn test_webmap_without_exportable_layers_fails() {
    let webmap = json!({
        "operationalLayers": [{
            "id": "pts",
            "featureCollection": {"layers": [{
                "layerDefinition": {"geometryType": "esriGeometryMultipoint", "name": "Clusters"},
                "featureSet": {"features": [{"geometry": {"points": [[0.0, 0.0]]}}]}
            }]}
        }]
    });
    let (_tmp, config_path) = setup_webmap_env(&webmap);

    let (stdout, stderr, success) = run_geoharvest(&config_path, &["webmap"]);
    assert!(!success, "expected failure, stdout={}", stdout);
    assert!(
        stderr.contains("No feature collection layers were exported."),
        "stderr: {}",
        stderr
    );
}

#[test]
fn test_webmap_missing_input_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("geoharvest.toml");
    fs::write(
        &config_path,
        format!(
            "[webmap]\ninput = \"{}\"\n",
            tmp.path().join("nope.json").display()
        ),
    )
    .unwrap();

    let (_, stderr, success) = run_geoharvest(&config_path, &["webmap"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read web map"), "stderr: {}", stderr);
}

#[test]
fn test_invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("bad.toml");
    fs::write(&config_path, "[kyc]\nsleep_secs = -1.0\n").unwrap();

    let (_, stderr, success) = run_geoharvest(&config_path, &["kyc", "--dry-run"]);
    assert!(!success);
    assert!(stderr.contains("sleep_secs"), "stderr: {}", stderr);
}

#[test]
fn test_missing_config_file_is_reported() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) =
        run_geoharvest(&tmp.path().join("absent.toml"), &["webmap"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"), "stderr: {}", stderr);
}
