//! High-level inspection API.
//!
//! [`Inspector`] is the primary entry point: it owns an [`InspectConfig`]
//! and runs the full per-frame pipeline — registration, difference
//! emphasis, component cleaning, contour classification — strictly in
//! capture order, then aggregates the frames into one verdict.
//!
//! The pipeline is pure: persistence of the representative artifacts is a
//! separate, explicit step through an [`ArtifactStore`](crate::store::ArtifactStore).

use image::{DynamicImage, GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::classify::{classify, ClassifyConfig};
use crate::components::{clean, CleanConfig};
use crate::consensus::{aggregate, ConsensusConfig, Verdict};
use crate::frame::{classify_frame, FrameReport, FrameResult};
use crate::register::{align, AlignmentError, RegisterConfig};
use crate::store::{ArtifactStore, StorageError};
use crate::threshold::emphasize_raised;

/// Top-level inspection configuration. Every policy constant of the
/// pipeline is a named field here with the reference default.
#[derive(Debug, Clone, Default)]
pub struct InspectConfig {
    pub register: RegisterConfig,
    pub clean: CleanConfig,
    pub classify: ClassifyConfig,
    pub consensus: ConsensusConfig,
}

/// Inspection failure.
#[derive(Debug)]
pub enum InspectError {
    /// The request carried no candidate frames.
    NoFrames,
    /// Registration of one frame failed; the whole request aborts with
    /// the frame index and the underlying cause.
    Alignment { frame: usize, source: AlignmentError },
}

impl std::fmt::Display for InspectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoFrames => write!(f, "no candidate frames supplied"),
            Self::Alignment { frame, source } => {
                write!(f, "alignment failed on frame {frame}: {source}")
            }
        }
    }
}

impl std::error::Error for InspectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Alignment { source, .. } => Some(source),
            Self::NoFrames => None,
        }
    }
}

/// Full result of one inspection request.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub verdict: Verdict,
    pub operator_dependent: bool,
    /// Index of the representative frame.
    pub representative: usize,
    /// The representative frame's original capture.
    pub representative_image: RgbImage,
    /// The representative frame's cleaned difference mask.
    pub representative_diff: GrayImage,
    /// Per-frame results in capture order.
    pub frames: Vec<FrameResult>,
    /// Annotated aligned images, one per frame (diagnostic).
    pub annotated: Vec<RgbImage>,
}

/// Serializable inspection summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionReport {
    pub verdict: Verdict,
    pub operator_dependent: bool,
    pub representative: usize,
    pub frames: Vec<FrameReport>,
}

impl Inspection {
    pub fn report(&self) -> InspectionReport {
        InspectionReport {
            verdict: self.verdict,
            operator_dependent: self.operator_dependent,
            representative: self.representative,
            frames: self.frames.iter().map(FrameReport::from).collect(),
        }
    }

    /// Persist the representative pair under `root/sub` as
    /// `{serial}.png` and `{serial}_diff.png`.
    pub fn persist(
        &self,
        store: &dyn ArtifactStore,
        root: &str,
        sub: &str,
        serial: &str,
    ) -> Result<(), StorageError> {
        let images = [
            DynamicImage::ImageRgb8(self.representative_image.clone()),
            DynamicImage::ImageLuma8(self.representative_diff.clone()),
        ];
        let names = [format!("{serial}.png"), format!("{serial}_diff.png")];
        store.save(
            root,
            sub,
            &images,
            &[names[0].as_str(), names[1].as_str()],
        )
    }
}

/// Inspection engine. Create once, inspect many requests; each request
/// computes entirely from its inputs and leaves no state behind.
#[derive(Debug, Clone, Default)]
pub struct Inspector {
    config: InspectConfig,
}

impl Inspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: InspectConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InspectConfig {
        &self.config
    }

    /// Mutable access for post-construction tuning.
    pub fn config_mut(&mut self) -> &mut InspectConfig {
        &mut self.config
    }

    /// Run one inspection: evaluate each frame in capture order, then
    /// aggregate. Any frame failing registration aborts the request.
    pub fn inspect(
        &self,
        master: &RgbImage,
        frames: &[RgbImage],
    ) -> Result<Inspection, InspectError> {
        if frames.is_empty() {
            return Err(InspectError::NoFrames);
        }

        let mut results = Vec::with_capacity(frames.len());
        let mut annotated = Vec::with_capacity(frames.len());
        for (i, frame) in frames.iter().enumerate() {
            let reg = align(master, frame, &self.config.register)
                .map_err(|source| InspectError::Alignment { frame: i, source })?;

            let diff = emphasize_raised(&reg.mask);
            let cleaned = clean(&diff, &self.config.clean);
            let classification = classify(
                &cleaned,
                &reg.master_contours,
                &reg.aligned,
                &self.config.classify,
            );

            let contour_count = classification.candidate_contours.len();
            let matched_count = classification.matched_count;
            let class = classify_frame(contour_count, matched_count);
            tracing::info!(
                "frame {i}: {contour_count} contours, {matched_count} matched, {class:?}"
            );

            results.push(FrameResult {
                mask: cleaned,
                contour_count,
                matched_count,
                class,
            });
            annotated.push(classification.annotated);
        }

        let consensus = aggregate(&results, &self.config.consensus);
        let representative = consensus.representative;
        Ok(Inspection {
            verdict: consensus.verdict,
            operator_dependent: consensus.operator_dependent,
            representative,
            representative_image: frames[representative].clone(),
            representative_diff: results[representative].mask.clone(),
            frames: results,
            annotated,
        })
    }
}
