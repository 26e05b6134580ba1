use std::error::Error;
use std::path::Path;

use assert_cmd::Command;
use tempfile::tempdir;

fn write_solid_png(path: &Path, width: u32, height: u32, value: u8) {
    let img = image::GrayImage::from_pixel(width, height, image::Luma([value]));
    img.save(path).expect("test fixture image must encode");
}

/// A config with `PIXEL_RANDOM_INIT = False`, so separate process
/// invocations of the same image converge to the same final potentials —
/// the default config's random initial potential would otherwise make a
/// `segment` run and a later `validate` run of the same image disagree.
fn write_deterministic_config(path: &Path) {
    let mut cfg = odlm_core::Config::default();
    cfg.pixels.pixel_random_init = false;
    cfg.save_ini(path).expect("config must write");
}

#[test]
fn config_init_then_show_round_trips_ini() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let ini = tmp.path().join("odlm.ini");

    Command::cargo_bin("odlm")?
        .args(["config", "init", "--out", ini.to_str().unwrap()])
        .assert()
        .success();
    assert!(ini.exists());

    let output = Command::cargo_bin("odlm")?
        .args(["config", "show", "--config", ini.to_str().unwrap()])
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("POT_THRESHOLD"));

    Ok(())
}

#[test]
fn segment_runs_on_a_solid_image_and_writes_a_snapshot() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let image_path = tmp.path().join("solid.png");
    write_solid_png(&image_path, 8, 8, 128);
    let snapshot_path = tmp.path().join("snap.tsv");

    Command::cargo_bin("odlm")?
        .args([
            "segment",
            image_path.to_str().unwrap(),
            "--out",
            snapshot_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    let text = std::fs::read_to_string(&snapshot_path)?;
    assert!(text.starts_with("id\tlabel\tpotential\n"));
    // 8x8 solid image: one row per neuron plus the header.
    assert_eq!(text.lines().count(), 8 * 8 + 1);

    Ok(())
}

#[test]
fn validate_confirms_a_snapshot_just_taken_from_the_same_image() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let image_path = tmp.path().join("solid.png");
    write_solid_png(&image_path, 6, 6, 64);
    let snapshot_path = tmp.path().join("snap.tsv");
    let config_path = tmp.path().join("odlm.ini");
    write_deterministic_config(&config_path);

    Command::cargo_bin("odlm")?
        .args([
            "segment",
            image_path.to_str().unwrap(),
            "--config",
            config_path.to_str().unwrap(),
            "--out",
            snapshot_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    Command::cargo_bin("odlm")?
        .args([
            "validate",
            snapshot_path.to_str().unwrap(),
            image_path.to_str().unwrap(),
            "--config",
            config_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    Ok(())
}

#[test]
fn config_init_rejects_out_combined_with_global() -> Result<(), Box<dyn Error>> {
    // `--out` is meaningless once `--global` picks the destination; passing
    // both is ambiguous intent, not a silently-ignored flag.
    Command::cargo_bin("odlm")?
        .args(["config", "init", "--out", "custom.ini", "--global"])
        .assert()
        .failure();

    Ok(())
}

#[test]
fn segment_json_flag_emits_a_parseable_json_object() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let image_path = tmp.path().join("solid.png");
    write_solid_png(&image_path, 4, 4, 200);

    let output = Command::cargo_bin("odlm")?
        .args(["segment", image_path.to_str().unwrap(), "--json"])
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    let value: serde_json::Value = serde_json::from_str(stdout.trim())?;
    assert_eq!(value["command"], "segment");
    assert!(value["cascades"].is_number());

    Ok(())
}
