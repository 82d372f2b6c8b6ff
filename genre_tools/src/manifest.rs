use anyhow::{Context, Result};
use genre_core::{DatasetIndex, Split, SplitLayout};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

#[derive(Debug, Serialize)]
struct ManifestLine<'a> {
    audio_name: &'a str,
    audio_path: String,
    label: &'a str,
    index: usize,
}

/// Write one JSON line per entry of `split` under `root`. Returns the count.
pub fn write_manifest(root: &Path, split: Split, out_path: &Path) -> Result<usize> {
    let index = DatasetIndex::build(root, split, &SplitLayout::default())
        .with_context(|| format!("failed to index {}", root.display()))?;

    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let out_file = File::create(out_path)
        .with_context(|| format!("Failed to create output: {}", out_path.display()))?;
    let mut writer = BufWriter::new(out_file);

    for entry in index.entries() {
        let line = ManifestLine {
            audio_name: &entry.audio_name,
            audio_path: entry.audio_path.to_string_lossy().to_string(),
            label: &entry.label,
            index: entry.index,
        };
        serde_json::to_writer(&mut writer, &line)?;
        writer.write_all(b"\n")?;
    }

    writer.flush()?;
    tracing::info!(%split, entries = index.len(), out = %out_path.display(), "wrote manifest");
    Ok(index.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn writes_one_line_per_valid_entry() {
        let dir = tempdir().unwrap();
        for label in ["jazz", "blues"] {
            let label_dir = dir.path().join("genres").join(label);
            fs::create_dir_all(&label_dir).unwrap();
            for i in 0..100 {
                fs::write(label_dir.join(format!("{label}.{i:05}.wav")), b"").unwrap();
            }
        }

        let out = dir.path().join("manifests/valid.jsonl");
        let count = write_manifest(dir.path(), Split::Valid, &out).unwrap();
        assert_eq!(count, 20);

        let text = fs::read_to_string(&out).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 20);
        assert_eq!(lines[0]["audio_name"], "blues.00090.wav");
        assert_eq!(lines[0]["index"], 0);
        assert_eq!(lines[19]["label"], "jazz");
    }
}
