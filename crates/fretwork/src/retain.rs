//! Retain: persist finished songs and feed them back into the case bank.
//!
//! The revised song is written through the interchange codec to a
//! collision-avoided filename, then (when requested) the written file is
//! decoded again and ingested measure by measure - the same path original
//! input takes, so retained cases pass the bank's own round-trip and
//! duplicate rules.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use casebank::{CaseEntry, CaseId, CaseStore, Provenance};
use tabs::{JsonCodec, NotationCodec, Song};

use crate::complexity::{score_measure, CalcType, WeightSet};
use crate::features::{measure_vector, FeatureAnalyzer};

/// Retain options.
#[derive(Debug, Clone)]
pub struct RetainOptions {
    pub output_dir: PathBuf,
    /// Re-ingest the written file into the case bank.
    pub add_to_bank: bool,
}

/// Ingest one song's measures into the bank, computing the cached
/// feature vectors and scores. Measures with nothing sounding are
/// skipped - there is nothing to retrieve from them. Returns the ids in
/// measure order (duplicates resolve to their existing id).
pub fn ingest_song(
    song: &Song,
    source_file: &str,
    track_index: usize,
    store: &dyn CaseStore,
    analyzer: &dyn FeatureAnalyzer,
    weights: &WeightSet,
    calc: CalcType,
) -> Result<Vec<CaseId>> {
    let mut ids = Vec::new();

    for measure in &song.measures {
        let Some(scores) = score_measure(measure, weights, calc) else {
            continue;
        };
        let features = measure_vector(measure, analyzer);

        let entry = CaseEntry {
            measure: measure.clone(),
            provenance: Provenance::new(source_file, track_index, measure.meta.number),
            features: features.into_raw(),
            complexity: scores.complexity,
            difficulty: scores.difficulty,
        };
        ids.push(store.add(&entry).context("adding case to bank")?);
    }

    info!(
        source = source_file,
        track = track_index,
        cases = ids.len(),
        "ingested song"
    );
    Ok(ids)
}

/// Build a fresh output path for the title: `<title>.json`, with a short
/// random suffix appended while the name is taken.
fn fresh_path(output_dir: &Path, title: &str) -> PathBuf {
    let stem = sanitize(title);
    let mut path = output_dir.join(format!("{stem}.json"));
    while path.exists() {
        let suffix: String = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        path = output_dir.join(format!("{stem}-{suffix}.json"));
    }
    path
}

fn sanitize(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "untitled".into()
    } else {
        cleaned
    }
}

/// Write the songs under the output directory and optionally re-ingest
/// them. Returns the written path. Directory-creation and write failures
/// are reported as errors for the caller to log - never a panic.
pub fn retain(
    songs: &[Song],
    title: &str,
    store: &dyn CaseStore,
    analyzer: &dyn FeatureAnalyzer,
    weights: &WeightSet,
    calc: CalcType,
    options: &RetainOptions,
) -> Result<PathBuf> {
    std::fs::create_dir_all(&options.output_dir).with_context(|| {
        format!(
            "creating output directory {}",
            options.output_dir.display()
        )
    })?;

    let path = fresh_path(&options.output_dir, title);
    let codec = JsonCodec;
    codec
        .encode(songs, &path)
        .with_context(|| format!("writing retained song to {}", path.display()))?;
    info!(path = %path.display(), songs = songs.len(), "retained song file");

    if options.add_to_bank {
        // Re-read what was actually written: retained cases go through the
        // same decode path as original input.
        let reloaded = codec
            .decode(&path)
            .context("re-reading retained file for ingestion")?;
        if let Err(err) = tabs::verify_roundtrip(&reloaded) {
            warn!(path = %path.display(), error = %err, "retained file failed round-trip, not ingesting");
        } else {
            let source = path.display().to_string();
            for (track_index, song) in reloaded.iter().enumerate() {
                ingest_song(song, &source, track_index, store, analyzer, weights, calc)?;
            }
        }
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use casebank::FileBank;
    use tabs::{
        AdornedNote, Measure, MeasureMeta, Note, SongMeta, Time, Tuning,
    };
    use tempfile::TempDir;

    use crate::features::BuiltinAnalyzer;

    fn one_bar_song(title: &str, fret: u8) -> Song {
        let note = AdornedNote::unadorned(Note::fretted(
            Tuning::standard_bass(),
            2,
            fret,
            Time::new(0, 1),
            Time::new(1, 1),
        ));
        Song {
            meta: SongMeta {
                title: title.into(),
                ..Default::default()
            },
            measures: vec![Measure::new(
                MeasureMeta::numbered(1),
                Time::new(0, 1),
                vec![note],
            )],
        }
    }

    #[test]
    fn retain_twice_produces_distinct_files() -> Result<()> {
        let bank_dir = TempDir::new()?;
        let out_dir = TempDir::new()?;
        let bank = FileBank::at_path(bank_dir.path())?;
        let weights = WeightSet::standard();
        let options = RetainOptions {
            output_dir: out_dir.path().to_path_buf(),
            add_to_bank: true,
        };

        let song = one_bar_song("Groove", 5);
        let first = retain(
            std::slice::from_ref(&song),
            "Groove",
            &bank,
            &BuiltinAnalyzer,
            &weights,
            CalcType::Bgm,
            &options,
        )?;
        let second = retain(
            &[song],
            "Groove",
            &bank,
            &BuiltinAnalyzer,
            &weights,
            CalcType::Bgm,
            &options,
        )?;

        assert_ne!(first, second);
        assert!(first.exists());
        assert!(second.exists());
        assert_eq!(first.file_name().unwrap(), "Groove.json");
        assert!(second
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("Groove-"));

        // Identical content twice: the bank deduplicates to one entry.
        assert_eq!(bank.len()?, 1);
        Ok(())
    }

    #[test]
    fn distinct_songs_grow_the_bank() -> Result<()> {
        let bank_dir = TempDir::new()?;
        let out_dir = TempDir::new()?;
        let bank = FileBank::at_path(bank_dir.path())?;
        let weights = WeightSet::standard();
        let options = RetainOptions {
            output_dir: out_dir.path().to_path_buf(),
            add_to_bank: true,
        };

        for (title, fret) in [("A", 3u8), ("B", 7u8)] {
            retain(
                &[one_bar_song(title, fret)],
                title,
                &bank,
                &BuiltinAnalyzer,
                &weights,
                CalcType::Bgm,
                &options,
            )?;
        }

        assert_eq!(bank.len()?, 2);
        Ok(())
    }

    #[test]
    fn add_to_bank_false_leaves_bank_untouched() -> Result<()> {
        let bank_dir = TempDir::new()?;
        let out_dir = TempDir::new()?;
        let bank = FileBank::at_path(bank_dir.path())?;
        let weights = WeightSet::standard();

        retain(
            &[one_bar_song("Quiet", 5)],
            "Quiet",
            &bank,
            &BuiltinAnalyzer,
            &weights,
            CalcType::Bgm,
            &RetainOptions {
                output_dir: out_dir.path().to_path_buf(),
                add_to_bank: false,
            },
        )?;

        assert!(bank.is_empty()?);
        Ok(())
    }

    #[test]
    fn titles_are_sanitized_for_the_filesystem() {
        assert_eq!(sanitize("My Song / Take 2"), "My_Song___Take_2");
        assert_eq!(sanitize(""), "untitled");
    }

    #[test]
    fn unwritable_output_directory_reports_an_error() {
        let bank_dir = TempDir::new().unwrap();
        let bank = FileBank::at_path(bank_dir.path()).unwrap();
        let weights = WeightSet::standard();

        let result = retain(
            &[one_bar_song("Nope", 5)],
            "Nope",
            &bank,
            &BuiltinAnalyzer,
            &weights,
            CalcType::Bgm,
            &RetainOptions {
                output_dir: PathBuf::from("/proc/fretwork-cannot-write-here"),
                add_to_bank: false,
            },
        );
        assert!(result.is_err());
    }
}
