//! Tab-separated neuron state snapshots for offline inspection and
//! regression validation.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::neuron::Neuron;

/// Tolerance used by [`validate_state`] when comparing saved and current
/// potentials.
pub const POT_TOLERANCE: f32 = 5.0e-4;

/// Write `id\tlabel\tpotential`, one row per neuron in `id` order, to
/// `path`.
pub fn save_state_to_file(neurons: &[Neuron], path: impl AsRef<Path>) -> Result<()> {
    let mut out = String::new();
    let _ = writeln!(out, "id\tlabel\tpotential");
    for n in neurons {
        let _ = writeln!(out, "{}\t{}\t{:.6}", n.id, n.label, n.pot);
    }
    fs::write(path, out)?;
    Ok(())
}

/// Parsed row of a snapshot file.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SnapshotRow {
    id: usize,
    label: i32,
    pot: f32,
}

fn parse_snapshot(text: &str) -> Result<Vec<SnapshotRow>> {
    let mut rows = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if idx == 0 {
            continue; // header
        }
        if line.trim().is_empty() {
            continue;
        }
        let mut parts = line.split('\t');
        let (id, label, pot) = (|| {
            let id = parts.next()?.parse::<usize>().ok()?;
            let label = parts.next()?.parse::<i32>().ok()?;
            let pot = parts.next()?.parse::<f32>().ok()?;
            Some((id, label, pot))
        })()
        .ok_or_else(|| CoreError::validation(format!("malformed snapshot row {}: {:?}", idx + 1, line)))?;
        rows.push(SnapshotRow { id, label, pot });
    }
    Ok(rows)
}

/// Compare `neurons` against a previously saved snapshot file.
///
/// Returns `Ok(())` when every row's `(id, label)` matches exactly and
/// `pot` is within [`POT_TOLERANCE`]; otherwise returns a
/// [`CoreError::Validation`] describing the first mismatch.
pub fn validate_layer_state(neurons: &[Neuron], path: impl AsRef<Path>) -> Result<()> {
    let text = fs::read_to_string(path)?;
    let rows = parse_snapshot(&text)?;
    if rows.len() != neurons.len() {
        return Err(CoreError::validation(format!(
            "snapshot has {} rows, layer has {} neurons",
            rows.len(),
            neurons.len()
        )));
    }
    for row in &rows {
        let n = neurons
            .get(row.id)
            .ok_or_else(|| CoreError::validation(format!("snapshot references unknown id {}", row.id)))?;
        if n.label != row.label {
            return Err(CoreError::validation(format!(
                "id {}: label {} != expected {}",
                row.id, n.label, row.label
            )));
        }
        if (n.pot - row.pot).abs() > POT_TOLERANCE {
            return Err(CoreError::validation(format!(
                "id {}: pot {} differs from expected {} by more than {}",
                row.id, n.pot, row.pot, POT_TOLERANCE
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_neurons() -> Vec<Neuron> {
        vec![
            Neuron::new(0, 0, 2, 5, 1.01, 0.75),
            Neuron::new(1, 0, 2, 5, 1.01, 0.5),
        ]
    }

    #[test]
    fn round_trip_validates_unchanged_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.tsv");
        let neurons = sample_neurons();
        save_state_to_file(&neurons, &path).unwrap();
        assert!(validate_layer_state(&neurons, &path).is_ok());
    }

    #[test]
    fn small_potential_drift_within_tolerance_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.tsv");
        let neurons = sample_neurons();
        save_state_to_file(&neurons, &path).unwrap();
        let mut drifted = neurons;
        drifted[0].pot += 1.0e-5;
        assert!(validate_layer_state(&drifted, &path).is_ok());
    }

    #[test]
    fn potential_drift_beyond_tolerance_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.tsv");
        let neurons = sample_neurons();
        save_state_to_file(&neurons, &path).unwrap();
        let mut drifted = neurons;
        drifted[0].pot += 1.0e-3;
        assert!(validate_layer_state(&drifted, &path).is_err());
    }

    #[test]
    fn label_mismatch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.tsv");
        let neurons = sample_neurons();
        save_state_to_file(&neurons, &path).unwrap();
        let mut drifted = neurons;
        drifted[0].label += 1;
        assert!(validate_layer_state(&drifted, &path).is_err());
    }

    #[test]
    fn format_has_expected_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.tsv");
        save_state_to_file(&sample_neurons(), &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("id\tlabel\tpotential\n"));
    }
}
