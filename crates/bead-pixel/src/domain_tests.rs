//! Domain-critical regression tests for bead-pixel.
//!
//! These tests cut across modules and guard specific failure classes, not
//! happy paths. Each test documents the regression it guards against.

use crate::analyze::morphology_invariants_hold;
use crate::color::{Lab, LinearRgb, Rgb8, Xyz};
use crate::grid::PixelCell;
use crate::palette::Palette;
use crate::pipeline::{CancelToken, Phase, RecognizeError, Recognizer};
use crate::quantize::Quantizer;
use crate::raster::ImageView;
use crate::sample::SampleMode;
use crate::testutil::{synth_bead_board, synth_rgba};

fn craft_palette() -> Palette {
    Palette::from_hex([
        ("Test", "Black", "#000000"),
        ("Test", "White", "#FFFFFF"),
        ("Test", "Red", "#DC2828"),
        ("Test", "Blue", "#5050F0"),
        ("Test", "Yellow", "#F0DC28"),
        ("Test", "Gray", "#808080"),
    ])
    .unwrap()
}

// ============================================================================
// Color space: the full conversion chain must be stable
// ============================================================================

/// If this breaks, it means: the sRGB <-> linear <-> XYZ <-> Lab chain has
/// drifted, and every palette match in both pipelines is silently wrong.
/// The round-trip error bound is half a CIEDE2000 unit, well below the
/// perceptual match threshold of 2.0.
#[test]
fn test_color_chain_round_trip_error() {
    let mut worst = 0.0f32;
    for r in (0..=255).step_by(17) {
        for g in (0..=255).step_by(51) {
            for b in (0..=255).step_by(51) {
                let rgb = Rgb8::new(r as u8, g as u8, b as u8);
                let lab = Lab::from(rgb);
                let back = Rgb8::from(LinearRgb::from(Xyz::from(lab)));
                let err = lab.delta_e_2000(Lab::from(back));
                worst = worst.max(err);
                assert!(
                    err < 0.5,
                    "round-trip delta E {err} for {rgb:?} exceeds 0.5"
                );
            }
        }
    }
    assert!(worst < 0.5, "worst round-trip error {worst}");
}

// ============================================================================
// Quantizer: output is always a full grid of palette members
// ============================================================================

/// If this breaks, it means: some sampling mode produces colors outside the
/// palette or leaves cells unassigned, so saved designs would reference
/// colors the user cannot buy.
#[test]
fn test_quantizer_output_always_in_palette() {
    let palette = craft_palette();
    let data = synth_rgba(37, 23, |x, y| {
        Rgb8::new(
            (x * 13 % 256) as u8,
            (y * 29 % 256) as u8,
            ((x ^ y) * 7 % 256) as u8,
        )
    });
    let img = ImageView::new(&data, 37, 23).unwrap();

    for mode in [
        SampleMode::Dominant,
        SampleMode::Average,
        SampleMode::Center,
        SampleMode::Diagonal45,
        SampleMode::Original,
    ] {
        for edge_trim in [false, true] {
            let grid = Quantizer::new()
                .mode(mode)
                .edge_trim(edge_trim)
                .quantize(&img, 9, 11, &palette)
                .unwrap();
            assert_eq!(grid.rows() * grid.cols(), 99);
            for (r, c, cell) in grid.cells() {
                match cell {
                    PixelCell::Bead { id, confidence, .. } => {
                        assert!(
                            palette.get(id).is_some(),
                            "mode {mode:?}: cell ({r},{c}) has unknown id {id}"
                        );
                        assert!((0.0..=1.0).contains(confidence));
                    }
                    PixelCell::Empty => {
                        panic!("mode {mode:?}: cell ({r},{c}) left empty")
                    }
                }
            }
        }
    }
}

// ============================================================================
// Recognition: structural invariants of the output grid
// ============================================================================

fn recognition_board() -> (Vec<u8>, usize, usize) {
    synth_board_with(|r, c| {
        if (2 * r + c) % 5 >= 3 {
            None
        } else if r == c {
            Some(Rgb8::new(80, 80, 240))
        } else {
            Some(Rgb8::new(220, 40, 40))
        }
    })
}

fn synth_board_with(
    color: impl Fn(usize, usize) -> Option<Rgb8>,
) -> (Vec<u8>, usize, usize) {
    (synth_bead_board(300, 300, 12, 20.0, 30.0, color), 300, 300)
}

/// If this breaks, it means: grid normalization regressed: the output grid
/// carries empty margin rows or columns, so saved designs shift around
/// between recognition runs.
#[test]
fn test_recognition_grid_is_normalized() {
    let (data, w, h) = recognition_board();
    let result = Recognizer::new()
        .recognize(&data, w, h, &craft_palette(), |_, _| {}, &CancelToken::new())
        .unwrap();

    let grid = &result.grid;
    assert!(
        (0..grid.cols()).any(|c| grid.get(0, c).is_bead()),
        "first row has no bead"
    );
    assert!(
        (0..grid.rows()).any(|r| grid.get(r, 0).is_bead()),
        "first column has no bead"
    );
    assert!(
        (0..grid.cols()).any(|c| grid.get(grid.rows() - 1, c).is_bead()),
        "last row has no bead"
    );
    assert!(
        (0..grid.rows()).any(|r| grid.get(r, grid.cols() - 1).is_bead()),
        "last column has no bead"
    );
}

/// If this breaks, it means: the morphological post-processing no longer
/// converges: isolated speckles or contrasty holes survive, which shows up
/// as lone stray beads in recognized designs.
#[test]
fn test_recognition_morphology_invariants() {
    let (data, w, h) = recognition_board();
    let result = Recognizer::new()
        .recognize(&data, w, h, &craft_palette(), |_, _| {}, &CancelToken::new())
        .unwrap();

    assert!(morphology_invariants_hold(
        &result.analyses,
        result.model.rows,
        result.model.cols,
    ));
}

/// If this breaks, it means: per-cell color extraction or palette matching
/// is assigning the wrong palette entries, so recognized patterns would have
/// the right shape but the wrong colors.
#[test]
fn test_recognition_color_fidelity() {
    let (data, w, h) = recognition_board();
    let result = Recognizer::new()
        .recognize(&data, w, h, &craft_palette(), |_, _| {}, &CancelToken::new())
        .unwrap();

    let grid = &result.grid;
    assert_eq!((grid.rows(), grid.cols()), (12, 12));

    let mut mismatches = 0;
    for (r, c, cell) in grid.cells() {
        if let PixelCell::Bead { id, .. } = cell {
            let expected = if r == c { "Blue" } else { "Red" };
            if id.name != expected {
                mismatches += 1;
            }
        }
    }
    assert!(
        mismatches <= 2,
        "{mismatches} beads matched to the wrong palette color"
    );
}

/// If this breaks, it means: the progress contract regressed. Fractions
/// must be monotone, end at 1.0, and follow the phase order.
#[test]
fn test_recognition_progress_contract() {
    let (data, w, h) = recognition_board();
    let mut events: Vec<(Phase, f32)> = Vec::new();
    Recognizer::new()
        .recognize(
            &data,
            w,
            h,
            &craft_palette(),
            |p, f| events.push((p, f)),
            &CancelToken::new(),
        )
        .unwrap();

    assert!(events.windows(2).all(|w| w[0].1 <= w[1].1), "{events:?}");
    assert_eq!(events.first().map(|e| e.0), Some(Phase::Load));
    assert_eq!(events.last().map(|e| (e.0, e.1)), Some((Phase::Finalize, 1.0)));

    let detect_at = events.iter().position(|e| e.0 == Phase::Detect).unwrap();
    let analyze_at = events.iter().position(|e| e.0 == Phase::Analyze).unwrap();
    assert!(detect_at < analyze_at);
}

/// If this breaks, it means: cancellation during per-cell color work is no
/// longer honored, so a cancel request leaves the UI waiting on a run that
/// keeps burning CPU.
#[test]
fn test_cancellation_during_color_phase() {
    let (data, w, h) = recognition_board();
    let cancel = CancelToken::new();
    let cancel_inner = cancel.clone();

    let mut colors_seen = 0usize;
    let result = Recognizer::new().recognize(
        &data,
        w,
        h,
        &craft_palette(),
        |phase, _| {
            if phase == Phase::Colors {
                colors_seen += 1;
                if colors_seen == 3 {
                    cancel_inner.cancel();
                }
            }
        },
        &cancel,
    );

    assert!(matches!(result, Err(RecognizeError::Cancelled)));
    assert!(
        colors_seen <= 4,
        "per-cell work continued after cancel: {colors_seen} cells"
    );
}

/// If this breaks, it means: recognition stopped being reproducible. The
/// K-means seed must derive from the cell index alone.
#[test]
fn test_recognition_is_reproducible() {
    let (data, w, h) = recognition_board();
    let palette = craft_palette();

    let a = Recognizer::new()
        .recognize(&data, w, h, &palette, |_, _| {}, &CancelToken::new())
        .unwrap();
    let b = Recognizer::new()
        .recognize(&data, w, h, &palette, |_, _| {}, &CancelToken::new())
        .unwrap();

    assert_eq!(a.grid, b.grid);
    assert_eq!(a.model, b.model);
}
