//! The CBR orchestrator: retrieve, reuse, revise, retain.
//!
//! One engine instance owns the case store, the analyzer backend, and the
//! parameter set; songs flow through it measure by measure. Batch entry
//! points skip corrupt files with a warning and keep going - a bad input
//! never aborts the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use casebank::CaseStore;
use tabs::{JsonCodec, Measure, NotationCodec, PluckingTechnique, Song};

use crate::complexity::{CalcType, WeightSet};
use crate::features::{BuiltinAnalyzer, FeatureAnalyzer};
use crate::retain::{ingest_song, retain, RetainOptions};
use crate::retrieve::{retrieve, RetrievalParams, RetrieveMethod, Retrieved};
use crate::reuse::adapt;
use crate::revise::{revise_song, ReviseOptions};

/// Which knob the relaxation loop turns first when retrieval comes back
/// empty. The interleaving is a policy choice, not a fixed algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelaxPolicy {
    /// Lower the similarity threshold step by step, then widen the
    /// percentile window once the threshold bottoms out.
    ThresholdFirst,
    /// Widen the percentile window step by step, then lower the
    /// threshold once the window is fully open.
    PercentileFirst,
}

/// Full parameter set for the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CbrConfig {
    pub complexity_weight: i8,
    pub difficulty_weight: i8,
    pub method: RetrieveMethod,
    pub similarity_threshold: f64,
    pub percentile_range: Option<(f64, f64)>,
    /// How much one relaxation step moves the active knob.
    pub relax_step: f64,
    /// Upper bound on relaxation retries per measure.
    pub max_relaxations: u32,
    pub relax_policy: RelaxPolicy,
    pub weight_set: String,
    pub calc: CalcType,
    pub gp5_wellformed: bool,
    pub base_plucking: PluckingTechnique,
}

impl Default for CbrConfig {
    fn default() -> Self {
        Self {
            complexity_weight: 1,
            difficulty_weight: 1,
            method: RetrieveMethod::Best,
            similarity_threshold: 95.0,
            percentile_range: None,
            relax_step: 5.0,
            max_relaxations: 4,
            relax_policy: RelaxPolicy::ThresholdFirst,
            weight_set: "standard".into(),
            calc: CalcType::Bgm,
            gp5_wellformed: false,
            base_plucking: PluckingTechnique::Finger,
        }
    }
}

/// Outcome of a batch run: which files landed where, and which were
/// skipped with what complaint.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub succeeded: Vec<(PathBuf, PathBuf)>,
    pub failed: Vec<(PathBuf, String)>,
}

/// The retrieve-reuse-revise-retain engine.
pub struct CbrEngine {
    store: Arc<dyn CaseStore>,
    analyzer: Arc<dyn FeatureAnalyzer>,
    config: CbrConfig,
}

impl CbrEngine {
    /// Create with the built-in analyzer backend.
    pub fn new(store: Arc<dyn CaseStore>, config: CbrConfig) -> Self {
        Self {
            store,
            analyzer: Arc::new(BuiltinAnalyzer),
            config,
        }
    }

    /// Create with a custom analyzer backend.
    pub fn with_analyzer(
        store: Arc<dyn CaseStore>,
        analyzer: Arc<dyn FeatureAnalyzer>,
        config: CbrConfig,
    ) -> Self {
        Self {
            store,
            analyzer,
            config,
        }
    }

    pub fn config(&self) -> &CbrConfig {
        &self.config
    }

    fn weights(&self) -> Result<WeightSet> {
        WeightSet::named(&self.config.weight_set)
            .with_context(|| format!("resolving weight set '{}'", self.config.weight_set))
    }

    fn retrieval_params(&self) -> RetrievalParams {
        RetrievalParams {
            complexity_weight: self.config.complexity_weight,
            difficulty_weight: self.config.difficulty_weight,
            method: self.config.method,
            similarity_threshold: self.config.similarity_threshold,
            percentile_range: self.config.percentile_range,
        }
    }

    /// Retrieval with the bounded relaxation loop.
    ///
    /// An empty result is not an error; each retry relaxes one knob per
    /// the configured policy until something matches or the bound runs
    /// out.
    pub fn retrieve_relaxed(&self, target: &Measure) -> Result<Vec<Retrieved>> {
        let mut params = self.retrieval_params();

        for attempt in 0..=self.config.max_relaxations {
            let found = retrieve(self.store.as_ref(), target, &params, self.analyzer.as_ref())?;
            if !found.is_empty() {
                if attempt > 0 {
                    info!(
                        measure = target.meta.number,
                        attempt,
                        threshold = params.similarity_threshold,
                        "retrieval succeeded after relaxation"
                    );
                }
                return Ok(found);
            }
            if attempt == self.config.max_relaxations {
                break;
            }
            relax(&mut params, self.config.relax_policy, self.config.relax_step);
        }

        Ok(Vec::new())
    }

    /// Adorn a single measure: retrieve (with relaxation) then reuse.
    /// Revision needs neighboring measures and happens at song level.
    pub fn adorn_measure(&self, measure: &Measure) -> Result<Measure> {
        let candidates = self.retrieve_relaxed(measure)?;
        if candidates.is_empty() {
            debug!(
                measure = measure.meta.number,
                "no usable case, keeping neutral adornments"
            );
        }
        Ok(adapt(measure, &candidates).measure)
    }

    /// Run retrieve, reuse and revise over every measure of a song.
    pub fn adorn_song(&self, song: &Song) -> Result<Song> {
        let mut measures = Vec::with_capacity(song.measures.len());
        for measure in &song.measures {
            measures.push(self.adorn_measure(measure)?);
        }

        let adorned = Song {
            meta: song.meta.clone(),
            measures,
        };
        let options = ReviseOptions {
            gp5_wellformed: self.config.gp5_wellformed,
            base_plucking: self.config.base_plucking,
        };
        Ok(revise_song(&adorned, &options))
    }

    /// Persist revised songs and (optionally) grow the case bank.
    pub fn retain_songs(
        &self,
        songs: &[Song],
        title: &str,
        options: &RetainOptions,
    ) -> Result<PathBuf> {
        retain(
            songs,
            title,
            self.store.as_ref(),
            self.analyzer.as_ref(),
            &self.weights()?,
            self.config.calc,
            options,
        )
    }

    /// Seed the bank from an already-adorned interchange file.
    pub fn seed_from_file(&self, path: &Path) -> Result<usize> {
        let songs = JsonCodec.decode(path).context("decoding seed file")?;
        tabs::verify_roundtrip(&songs).context("seed file failed round-trip check")?;

        let weights = self.weights()?;
        let source = path.display().to_string();
        let mut count = 0;
        for (track_index, song) in songs.iter().enumerate() {
            count += ingest_song(
                song,
                &source,
                track_index,
                self.store.as_ref(),
                self.analyzer.as_ref(),
                &weights,
                self.config.calc,
            )?
            .len();
        }
        Ok(count)
    }

    /// Decode, adorn, revise and retain one input file. The decoded songs
    /// must survive the round-trip check; a corrupt file is an error the
    /// batch layer turns into a skip.
    pub fn process_file(&self, input: &Path, options: &RetainOptions) -> Result<PathBuf> {
        let songs = JsonCodec.decode(input).context("decoding input file")?;
        tabs::verify_roundtrip(&songs).context("input failed round-trip check")?;

        let mut adorned = Vec::with_capacity(songs.len());
        for song in &songs {
            adorned.push(self.adorn_song(song)?);
        }

        let title = adorned
            .first()
            .map(|s| s.meta.title.clone())
            .filter(|t| !t.is_empty())
            .or_else(|| {
                input
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "untitled".into());

        self.retain_songs(&adorned, &title, options)
    }

    /// Process a batch of input files, printing and collecting per-file
    /// failures instead of aborting.
    pub fn process_batch(&self, inputs: &[PathBuf], options: &RetainOptions) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for input in inputs {
            match self.process_file(input, options) {
                Ok(output) => {
                    info!(input = %input.display(), output = %output.display(), "file adorned");
                    outcome.succeeded.push((input.clone(), output));
                }
                Err(err) => {
                    warn!(input = %input.display(), error = %err, "skipping file");
                    outcome.failed.push((input.clone(), format!("{err:#}")));
                }
            }
        }

        info!(
            ok = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "batch complete"
        );
        outcome
    }
}

/// One relaxation step: lower the similarity threshold (floored at 0) or
/// widen the percentile window (clamped to [0, 100]) per the policy.
fn relax(params: &mut RetrievalParams, policy: RelaxPolicy, step: f64) {
    let threshold_floored = params.similarity_threshold <= 0.0;
    let window_open = params
        .percentile_range
        .map(|(low, high)| low <= 0.0 && high >= 100.0)
        .unwrap_or(true);

    let lower_threshold = match policy {
        RelaxPolicy::ThresholdFirst => !threshold_floored,
        RelaxPolicy::PercentileFirst => window_open,
    };

    if lower_threshold {
        params.similarity_threshold = (params.similarity_threshold - step).max(0.0);
        debug!(threshold = params.similarity_threshold, "relaxed similarity threshold");
    } else if let Some((low, high)) = params.percentile_range {
        params.percentile_range = Some(((low - step).max(0.0), (high + step).min(100.0)));
        debug!(window = ?params.percentile_range, "widened percentile window");
    } else {
        // No window to widen and the threshold is floored; nothing left.
        params.similarity_threshold = (params.similarity_threshold - step).max(0.0);
    }
}
