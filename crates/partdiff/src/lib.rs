//! partdiff — pure-Rust visual inspection of manufactured parts against a
//! master reference image.
//!
//! A candidate part is photographed N times; each capture is registered
//! onto the master's pixel frame, differenced, cleaned and classified,
//! and the per-frame outcomes are aggregated into one pass/fail verdict.
//! The pipeline stages are:
//!
//! 1. **Preprocess** – color → single-channel intensity.
//! 2. **Register** – pyramid Harris keypoints + gradient-histogram
//!    descriptors, ratio-test matching, RANSAC homography, perspective
//!    warp into the master frame.
//! 3. **Difference** – Otsu-threshold combination of master foreground
//!    and warped candidate, re-binarized to emphasize raised regions.
//! 4. **Clean** – connected-component filtering: noise blobs and thin
//!    registration seams drop out.
//! 5. **Classify** – external contours of the cleaned mask, Hu-moment
//!    shape matching against master geometry.
//! 6. **Consensus** – per-frame clean/ambiguous/defect classification,
//!    representative-frame selection, majority verdict.
//!
//! # Public API
//! [`Inspector`] and [`InspectConfig`] are the primary entry points;
//! stage modules stay public for tools that need individual steps.
//! Cameras and artifact storage are seams ([`FrameSource`],
//! [`ArtifactStore`]) — the core only touches decoded rasters.

pub mod classify;
pub mod components;
pub mod consensus;
pub mod contours;
pub mod features;
pub mod frame;
pub mod homography;
pub mod inspect;
pub mod moments;
pub mod preprocess;
pub mod register;
pub mod source;
pub mod store;
pub mod threshold;
pub mod warp;

pub use consensus::{Consensus, ConsensusConfig, Verdict};
pub use frame::{FrameClass, FrameReport, FrameResult};
pub use inspect::{InspectConfig, InspectError, Inspection, InspectionReport, Inspector};
pub use register::{AlignmentError, RegisterConfig, Registration};
pub use source::{CaptureError, FrameSource, ReplaySource};
pub use store::{ArtifactStore, DirectoryStore, StorageError};
