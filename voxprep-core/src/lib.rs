//! # voxprep-core
//!
//! Training-clip preparation and speech-quality scoring engine.
//!
//! ## Architecture
//!
//! ```text
//! WavSource ──► AudioBuffer ──► segment() ──► {Clip…} ──► ClipWriter      (prep)
//!                     │
//!                     └──► analyze() ──► FeatureSet ──► diagnose()        (eval)
//!                                                            │
//!                    BatchRunner ──► many DiagnosisReports ──► aggregate()
//! ```
//!
//! Every numeric stage is a pure function of one buffer; batches fan files
//! out over a bounded worker pool where a bad file is counted and skipped,
//! never fatal.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod batch;
pub mod diagnose;
pub mod error;
pub mod features;
pub mod segment;

// Convenience re-exports for downstream crates
pub use audio::{AudioBuffer, AudioSource, ClipWriter, WavSource};
pub use batch::{
    aggregate, evaluate_file, BatchOutcome, BatchRunner, CancelHandle, FileEvaluation,
    RankedSummary, Verdict,
};
pub use diagnose::{diagnose, DiagnosisReport, DiagnosisThresholds, LinguisticReport};
pub use error::VoxprepError;
pub use features::{analyze, FeatureSet};
pub use segment::{segment, Clip, Segmentation, SegmenterConfig, SegmentStats};
