//! The intro sequence screen: clock, phase-driven drawing, audio cueing and
//! the one-shot hand-off to the next screen.

use crate::{
    audio::{AudioDevice, AudioTrack},
    compositor::WarpCompositor,
    core::{Canvas, FrameRgba, SequenceClock},
    error::CinecrawlResult,
    layout::{self, FontProvider},
    phase::{self, Phase},
    script::SequenceScript,
};

/// Screen-stack capability: the sequencer asks for the next screen exactly
/// once, at the end of the sequence.
pub trait ScreenHost {
    fn push_screen(&mut self, id: &str);
}

/// Time-driven intro sequencer.
///
/// `update` advances the clock and drives audio and the end transition;
/// `render` captures the active phase's text offscreen and composites it to a
/// screen frame, warped once the crawl begins. Every visual parameter is a
/// pure function of accumulated time, so playback is frame-rate independent.
pub struct CrawlSequencer<D: AudioDevice> {
    clock: SequenceClock,
    script: SequenceScript,
    compositor: WarpCompositor,
    audio: D,
    track: Option<D::Track>,
    started: bool,
    finished: bool,
}

impl<D: AudioDevice> CrawlSequencer<D> {
    pub fn new(canvas: Canvas, script: SequenceScript, audio: D) -> CinecrawlResult<Self> {
        Ok(Self::with_compositor(
            WarpCompositor::new(canvas)?,
            script,
            audio,
        ))
    }

    /// Build around an existing compositor, e.g. a GPU-backed one.
    pub fn with_compositor(compositor: WarpCompositor, script: SequenceScript, audio: D) -> Self {
        Self {
            clock: SequenceClock::new(),
            script,
            compositor,
            audio,
            track: None,
            started: false,
            finished: false,
        }
    }

    pub fn elapsed(&self) -> f32 {
        self.clock.elapsed()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[tracing::instrument(skip(self, host))]
    pub fn update(&mut self, dt: f32, host: &mut dyn ScreenHost) {
        if self.finished {
            return;
        }

        if !self.started {
            self.started = true;
            // The acquisition call pins the clock at zero; playback starts
            // within the same frame. A missing track degrades to a silent
            // run rather than aborting the sequence.
            match self.audio.load(&self.script.theme_track) {
                Ok(mut track) => {
                    track.play();
                    self.track = Some(track);
                }
                Err(err) => tracing::warn!(
                    error = %err,
                    track = %self.script.theme_track,
                    "theme track unavailable, continuing silent"
                ),
            }
            return;
        }

        self.clock.advance(dt);
        let elapsed = self.clock.elapsed();

        if elapsed > phase::FADE_START_SECS
            && let Some(track) = self.track.as_mut()
        {
            track.set_volume(phase::music_volume(elapsed));
        }

        if phase::finished(elapsed) {
            self.finished = true;
            host.push_screen(&self.script.next_screen);
            // The track is released here so the stop happens exactly once
            // even if the host disposes the screen afterwards.
            if let Some(mut track) = self.track.take() {
                track.stop();
            }
        }
    }

    #[tracing::instrument(skip_all)]
    pub fn render(&mut self, font: &mut dyn FontProvider) -> CinecrawlResult<FrameRgba> {
        let frame = phase::frame_at(self.clock.elapsed());
        let canvas = self.compositor.canvas();
        let script = &self.script;

        self.compositor.capture(|scene| {
            if !frame.params.visible {
                return Ok(());
            }

            let params = frame.params;
            let (lines, placed) = match frame.phase {
                Phase::Opening => {
                    let lines = &script.opening_lines;
                    let placed =
                        layout::centered_block(font, canvas, lines, params.scale, phase::MARGIN)?;
                    (lines, placed)
                }
                Phase::Title => {
                    let lines = &script.title_lines;
                    let placed =
                        layout::centered_block(font, canvas, lines, params.scale, phase::MARGIN)?;
                    (lines, placed)
                }
                Phase::Crawl => {
                    let lines = &script.crawl_lines;
                    // The scroll offset rises from one margin below the
                    // bottom edge; in raster coordinates that is a top that
                    // starts past the screen height and decreases.
                    let top = canvas.height as f32 - params.scroll;
                    let placed = layout::scrolled_block(
                        font,
                        canvas,
                        lines,
                        params.scale,
                        phase::MARGIN,
                        top,
                    )?;
                    (lines, placed)
                }
            };

            for (line, place) in lines.iter().zip(&placed) {
                font.draw_line(scene, line, params.scale, place.x, place.y, params.alpha)?;
            }
            Ok(())
        })?;

        self.compositor.composite(frame.params.warp)
    }

    /// Release the audio track. Safe to call more than once; GPU-side
    /// resources are released when the sequencer is dropped.
    pub fn dispose(&mut self) {
        if let Some(mut track) = self.track.take() {
            track.stop();
        }
    }
}
