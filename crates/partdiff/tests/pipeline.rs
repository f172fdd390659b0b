//! End-to-end inspections on synthetic captures.
//!
//! The synthetic part is a deterministic block-noise texture (so feature
//! matching is unambiguous) with one deliberately flat dark region where
//! defects can be planted with a known footprint.

use image::{Luma, Rgb, RgbImage};
use partdiff::{DirectoryStore, FrameClass, InspectError, Inspector, Verdict};

const W: u32 = 160;
const H: u32 = 120;

/// Flat dark region of the part where the difference logic is exact.
const PATCH: (u32, u32, u32, u32) = (90, 70, 44, 36);

/// Defect footprint planted inside the dark patch: bright material where
/// the master is dark.
const DEFECT: (u32, u32, u32, u32) = (98, 78, 28, 20);

fn master_image() -> RgbImage {
    let mut img = RgbImage::new(W, H);
    for (x, y, p) in img.enumerate_pixels_mut() {
        let (bx, by) = (x / 4, y / 4);
        let mut s = bx.wrapping_mul(0x9E37_79B9) ^ by.wrapping_mul(0x85EB_CA6B);
        s ^= s >> 13;
        s = s.wrapping_mul(0xC2B2_AE35);
        s ^= s >> 16;
        let v = (s % 236) as u8 + 10;
        p.0 = [v, v, v];
    }
    let (px, py, pw, ph) = PATCH;
    for y in py..py + ph {
        for x in px..px + pw {
            img.put_pixel(x, y, Rgb([15, 15, 15]));
        }
    }
    img
}

fn defective_frame(master: &RgbImage) -> RgbImage {
    let mut img = master.clone();
    let (dx, dy, dw, dh) = DEFECT;
    for y in dy..dy + dh {
        for x in dx..dx + dw {
            img.put_pixel(x, y, Rgb([255, 255, 255]));
        }
    }
    img
}

#[test]
fn identical_captures_pass_clean() {
    let master = master_image();
    let frames = vec![master.clone(), master.clone(), master.clone()];
    let inspection = Inspector::new().inspect(&master, &frames).unwrap();

    assert_eq!(inspection.verdict, Verdict::Pass);
    assert!(!inspection.operator_dependent);
    assert_eq!(inspection.representative, 0);
    for f in &inspection.frames {
        assert_eq!(f.class, FrameClass::Clean);
        assert_eq!(f.contour_count, 0);
        assert_eq!(f.matched_count, 0);
        let fg = f.mask.pixels().filter(|p| p[0] != 0).count();
        assert!(fg * 100 < (W * H) as usize, "noise floor exceeded: {fg}");
    }
}

#[test]
fn single_defective_frame_still_passes_and_is_representative() {
    let master = master_image();
    let frames = vec![
        master.clone(),
        master.clone(),
        defective_frame(&master),
    ];
    let inspection = Inspector::new().inspect(&master, &frames).unwrap();

    // Two clean frames out of three: the verdict stays pass.
    assert_eq!(inspection.verdict, Verdict::Pass);
    // The defective frame has the most contours, so it is representative.
    assert_eq!(inspection.representative, 2);
    assert_ne!(inspection.frames[2].class, FrameClass::Clean);
    assert!(inspection.frames[2].contour_count > 0);
    // The planted defect shows up in the representative diff.
    let (dx, dy, dw, dh) = DEFECT;
    let center = inspection
        .representative_diff
        .get_pixel(dx + dw / 2, dy + dh / 2);
    assert_eq!(*center, Luma([255u8]));
    // The flag mirrors whether any frame was ambiguous.
    let any_ambiguous = inspection
        .frames
        .iter()
        .any(|f| f.class == FrameClass::Ambiguous);
    assert_eq!(inspection.operator_dependent, any_ambiguous);
}

#[test]
fn all_defective_frames_fail() {
    let master = master_image();
    let bad = defective_frame(&master);
    let frames = vec![bad.clone(), bad.clone(), bad.clone()];
    let inspection = Inspector::new().inspect(&master, &frames).unwrap();

    assert_eq!(inspection.verdict, Verdict::Fail);
    for f in &inspection.frames {
        assert_ne!(f.class, FrameClass::Clean);
    }
}

#[test]
fn featureless_frame_aborts_the_request() {
    let master = master_image();
    let frames = vec![master.clone(), RgbImage::new(W, H)];
    let err = Inspector::new().inspect(&master, &frames).unwrap_err();
    match err {
        InspectError::Alignment { frame, .. } => assert_eq!(frame, 1),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn representative_pair_persists_through_directory_store() {
    let master = master_image();
    let frames = vec![master.clone(), master.clone(), master.clone()];
    let inspection = Inspector::new().inspect(&master, &frames).unwrap();

    let base = std::env::temp_dir().join(format!("partdiff-e2e-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&base);
    let store = DirectoryStore::new(&base);
    inspection
        .persist(&store, "inspections", "model-x", "sn-0042")
        .unwrap();

    let dir = base.join("inspections/model-x");
    assert!(dir.join("sn-0042.png").is_file());
    assert!(dir.join("sn-0042_diff.png").is_file());

    // The persisted image is the representative capture, byte for byte.
    let saved = image::open(dir.join("sn-0042.png")).unwrap().to_rgb8();
    assert_eq!(saved.as_raw(), inspection.representative_image.as_raw());
    std::fs::remove_dir_all(&base).unwrap();
}
