//! Phase selection and per-phase visual parameters.
//!
//! The sequence has no stored animation state: which phase is active and how
//! it looks are closed-form functions of the accumulated clock, so playback is
//! frame-rate independent and every boundary can be tested directly.

/// Vertical spacing between lines, and the unit for block-position biases.
pub const MARGIN: f32 = 20.0;

/// End of the opening text, start of the title interval.
pub const OPENING_END_SECS: f32 = 8.0;

/// End of the title interval, start of the crawl.
pub const TITLE_END_SECS: f32 = 15.0;

/// End of the whole sequence; the host is asked for the next screen here.
pub const SEQUENCE_END_SECS: f32 = 42.0;

/// Upward crawl velocity in units per second.
pub const CRAWL_SPEED: f32 = 40.0;

/// Start of the music fade-out tail.
pub const FADE_START_SECS: f32 = 37.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Opening,
    Title,
    Crawl,
}

/// Derived visual parameters for one frame. Pure data, recomputed per frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisualParams {
    /// Text opacity in `[0, 1]`.
    pub alpha: f32,
    /// Font scale multiplier, `> 0` whenever `visible`.
    pub scale: f32,
    /// Crawl scroll offset (upward-positive); meaningful only in `Crawl`.
    pub scroll: f32,
    /// Whether the phase draws anything at all this frame.
    pub visible: bool,
    /// Whether the composite applies the perspective warp.
    pub warp: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseFrame {
    pub phase: Phase,
    pub params: VisualParams,
}

/// Select the active phase. Negative inputs clamp into `Opening`.
pub fn phase_of(elapsed: f32) -> Phase {
    if elapsed < OPENING_END_SECS {
        Phase::Opening
    } else if elapsed < TITLE_END_SECS {
        Phase::Title
    } else {
        Phase::Crawl
    }
}

/// Opening text opacity: ramp up over `[0,1)`, hold at 1 through `6`, ramp
/// down over `(6,7)` as `(7-t)/2`, fully transparent from `7`.
pub fn opening_alpha(elapsed: f32) -> f32 {
    let alpha = if elapsed < 1.0 {
        elapsed
    } else if elapsed > 6.0 {
        (7.0 - elapsed) / 2.0
    } else {
        1.0
    };
    alpha.clamp(0.0, 1.0)
}

/// Title font scale on the open interval `(8,15)`: zoom in as `4/(t-8)`,
/// hold at 2 through `[10,13]`, shrink as `15-t`.
///
/// Diverges as `t -> 8` from above; callers gate on the same exclusive `> 8`
/// bound that keeps the frame at exactly 8 blank.
pub fn title_scale(elapsed: f32) -> f32 {
    if elapsed < 10.0 {
        4.0 / (elapsed - OPENING_END_SECS)
    } else if elapsed > 13.0 {
        TITLE_END_SECS - elapsed
    } else {
        2.0
    }
}

/// Crawl scroll offset: starts one margin below the screen edge and rises at
/// a constant `CRAWL_SPEED`.
pub fn crawl_scroll(elapsed: f32) -> f32 {
    -MARGIN + (elapsed - TITLE_END_SECS) * CRAWL_SPEED
}

/// Theme volume: unity until the fade tail, then a linear ramp to silence at
/// the end of the sequence, clamped non-negative.
pub fn music_volume(elapsed: f32) -> f32 {
    if elapsed > FADE_START_SECS {
        ((SEQUENCE_END_SECS - elapsed) / (SEQUENCE_END_SECS - FADE_START_SECS)).clamp(0.0, 1.0)
    } else {
        1.0
    }
}

pub fn finished(elapsed: f32) -> bool {
    elapsed >= SEQUENCE_END_SECS
}

/// Phase and visual parameters for one frame, as a single pure function of
/// the clock.
pub fn frame_at(elapsed: f32) -> PhaseFrame {
    let phase = phase_of(elapsed);
    let params = match phase {
        Phase::Opening => VisualParams {
            alpha: opening_alpha(elapsed),
            scale: 1.0,
            scroll: 0.0,
            visible: elapsed < 7.0,
            warp: false,
        },
        Phase::Title => {
            // Strictly (8,15): the single blank frame at exactly 8 is part of
            // the observable timing contract.
            let visible = elapsed > OPENING_END_SECS && elapsed < TITLE_END_SECS;
            VisualParams {
                alpha: 1.0,
                scale: if visible { title_scale(elapsed) } else { 1.0 },
                scroll: 0.0,
                visible,
                warp: false,
            }
        }
        Phase::Crawl => VisualParams {
            alpha: 1.0,
            scale: 1.0,
            scroll: crawl_scroll(elapsed),
            visible: true,
            warp: true,
        },
    };
    PhaseFrame { phase, params }
}
