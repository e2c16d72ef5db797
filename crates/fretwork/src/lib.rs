//! Case-based reasoning for bass tablature adornment.
//!
//! Bare pitch/rhythm measures go in; idiomatically adorned measures come
//! out. The engine retrieves similar previously-adorned measures from the
//! case bank, transplants their adornments onto the target, repairs the
//! result for musical consistency, and feeds finished songs back into the
//! bank:
//!
//! - [`features`]: musiplectic technique classification and feature vectors
//! - [`complexity`]: the Bgm/Evc complexity and difficulty model
//! - [`similarity`]: feature-vector similarity percentages
//! - [`retrieve`]: ranked, consolidated candidate search over the bank
//! - [`reuse`]: adornment transplantation with positional fallback
//! - [`revise`]: transition-consistency repair rules
//! - [`retain`]: persist and re-ingest finished songs
//! - [`pipeline`]: the orchestrator tying the stages together

pub mod complexity;
pub mod features;
pub mod pipeline;
pub mod retain;
pub mod retrieve;
pub mod reuse;
pub mod revise;
pub mod similarity;

pub use complexity::{
    recombine, score_measure, score_notes, score_song, BarScores, CalcType, Scores, WeightError,
    WeightSet,
};
pub use features::{
    classify, measure_vector, note_vector, plucking_tags, AttackModifier, BuiltinAnalyzer,
    FeatureAnalyzer, FeatureVector, FretRegion, TechniqueTag, FEATURE_DIM,
};
pub use pipeline::{BatchOutcome, CbrConfig, CbrEngine, RelaxPolicy};
pub use retain::{ingest_song, retain, RetainOptions};
pub use retrieve::{
    consolidate, heuristic, rank_cases, retrieve, select, Candidate, RetrievalParams,
    RetrieveMethod, Retrieved, ScoredCase,
};
pub use reuse::{adapt, AdaptedMeasure};
pub use revise::{revise_measure, revise_song, string_crossing, ReviseOptions};
pub use similarity::{is_match, measure_similarity, similarity_pct, vector_similarity};
