use std::{cell::RefCell, rc::Rc};

use cinecrawl::{
    AudioDevice, AudioTrack, Canvas, CinecrawlResult, CrawlSequencer, FontProvider, FrameRgba,
    ScreenHost, SequenceScript,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn digest_u64(bytes: &[u8]) -> u64 {
    let mut state = 0x9E37_79B9_7F4A_7C15u64;
    for chunk in bytes.chunks(8) {
        let mut v = 0u64;
        for (i, &b) in chunk.iter().enumerate() {
            v |= (b as u64) << (i * 8);
        }
        state = mix64(state ^ v);
    }
    state
}

/// Font stub that draws every line as a solid box sized by its metrics; no
/// real font files needed to exercise the full render path.
struct BlockFont {
    line_height: f32,
    advance: f32,
}

impl BlockFont {
    fn new() -> Self {
        Self {
            line_height: 8.0,
            advance: 4.0,
        }
    }
}

impl FontProvider for BlockFont {
    fn line_height(&mut self, scale: f32) -> CinecrawlResult<f32> {
        Ok(self.line_height * scale)
    }

    fn text_width(&mut self, text: &str, scale: f32) -> CinecrawlResult<f32> {
        Ok(text.chars().count() as f32 * self.advance * scale)
    }

    fn draw_line(
        &mut self,
        scene: &mut vello_cpu::RenderContext,
        text: &str,
        scale: f32,
        x: f32,
        y: f32,
        alpha: f32,
    ) -> CinecrawlResult<()> {
        if text.is_empty() {
            return Ok(());
        }
        let width = self.text_width(text, scale)?;
        let height = self.line_height(scale)?;

        scene.set_transform(vello_cpu::kurbo::Affine::translate((
            f64::from(x),
            f64::from(y),
        )));
        if alpha < 1.0 {
            scene.push_opacity_layer(alpha.clamp(0.0, 1.0));
        }
        scene.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
        scene.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(width),
            f64::from(height),
        ));
        if alpha < 1.0 {
            scene.pop_layer();
        }
        Ok(())
    }
}

#[derive(Default)]
struct RecordingHost {
    pushed: Vec<String>,
}

impl ScreenHost for RecordingHost {
    fn push_screen(&mut self, id: &str) {
        self.pushed.push(id.to_string());
    }
}

#[derive(Clone, Default)]
struct TrackLog {
    plays: Rc<RefCell<u32>>,
    stops: Rc<RefCell<u32>>,
    volumes: Rc<RefCell<Vec<f32>>>,
}

struct LoggingTrack(TrackLog);

impl AudioTrack for LoggingTrack {
    fn play(&mut self) {
        *self.0.plays.borrow_mut() += 1;
    }

    fn stop(&mut self) {
        *self.0.stops.borrow_mut() += 1;
    }

    fn set_volume(&mut self, volume: f32) {
        self.0.volumes.borrow_mut().push(volume);
    }
}

struct LoggingAudio(TrackLog);

impl AudioDevice for LoggingAudio {
    type Track = LoggingTrack;

    fn load(&mut self, _id: &str) -> CinecrawlResult<LoggingTrack> {
        Ok(LoggingTrack(self.0.clone()))
    }
}

fn new_sequencer(log: TrackLog) -> CrawlSequencer<LoggingAudio> {
    CrawlSequencer::new(
        Canvas {
            width: 256,
            height: 256,
        },
        SequenceScript::default(),
        LoggingAudio(log),
    )
    .unwrap()
}

fn is_black(frame: &FrameRgba) -> bool {
    frame
        .data
        .chunks_exact(4)
        .all(|px| px == &[0, 0, 0, 255])
}

fn has_content(frame: &FrameRgba) -> bool {
    frame.data.chunks_exact(4).any(|px| px[0] > 0)
}

#[test]
fn forty_three_unit_updates_end_the_sequence_once() {
    init_tracing();
    let log = TrackLog::default();
    let mut seq = new_sequencer(log.clone());
    let mut host = RecordingHost::default();

    for call in 1..=43u32 {
        seq.update(1.0, &mut host);
        let pushes = host.pushed.len();
        let stops = *log.stops.borrow();
        if call < 43 {
            assert_eq!(pushes, 0, "push fired early on call {call}");
            assert_eq!(stops, 0, "stop fired early on call {call}");
        } else {
            assert_eq!(pushes, 1);
            assert_eq!(stops, 1);
        }
    }
    assert_eq!(host.pushed, vec!["menu".to_string()]);
    assert_eq!(*log.plays.borrow(), 1);
}

#[test]
fn render_before_any_update_is_well_defined() {
    let mut seq = new_sequencer(TrackLog::default());
    let mut font = BlockFont::new();
    // Opening alpha at 0 is 0: an opaque black frame, not a crash.
    let frame = seq.render(&mut font).unwrap();
    assert_eq!(frame.width, 256);
    assert_eq!(frame.height, 256);
    assert!(is_black(&frame));
}

#[test]
fn opening_text_is_visible_mid_phase() {
    let mut seq = new_sequencer(TrackLog::default());
    let mut host = RecordingHost::default();
    let mut font = BlockFont::new();

    seq.update(0.0, &mut host);
    seq.update(4.0, &mut host);
    let frame = seq.render(&mut font).unwrap();
    assert!(has_content(&frame));
}

#[test]
fn frame_at_exactly_eight_is_blank_then_title_appears() {
    let log = TrackLog::default();
    let mut seq = new_sequencer(log);
    let mut host = RecordingHost::default();
    let mut font = BlockFont::new();

    for _ in 0..9 {
        seq.update(1.0, &mut host);
    }
    assert_eq!(seq.elapsed(), 8.0);
    assert!(is_black(&seq.render(&mut font).unwrap()));

    seq.update(0.5, &mut host);
    assert!(has_content(&seq.render(&mut font).unwrap()));
}

#[test]
fn crawl_renders_deterministically() {
    let mut seq = new_sequencer(TrackLog::default());
    let mut host = RecordingHost::default();
    let mut font = BlockFont::new();

    seq.update(0.0, &mut host);
    seq.update(20.0, &mut host);

    let a = seq.render(&mut font).unwrap();
    let b = seq.render(&mut font).unwrap();
    assert!(has_content(&a));
    assert_eq!(digest_u64(&a.data), digest_u64(&b.data));
}

#[test]
fn every_frame_of_a_full_run_is_opaque() {
    init_tracing();
    let log = TrackLog::default();
    let mut seq = new_sequencer(log.clone());
    let mut host = RecordingHost::default();
    let mut font = BlockFont::new();

    seq.update(0.0, &mut host);
    while !seq.is_finished() {
        let frame = seq.render(&mut font).unwrap();
        assert!(frame.data.chunks_exact(4).all(|px| px[3] == 255));
        seq.update(0.5, &mut host);
    }

    assert_eq!(host.pushed, vec!["menu".to_string()]);
    assert_eq!(*log.stops.borrow(), 1);
    let volumes = log.volumes.borrow();
    assert!(!volumes.is_empty());
    assert!(volumes.iter().all(|v| (0.0..=1.0).contains(v)));
    assert!(volumes.windows(2).all(|w| w[1] <= w[0]));
}

#[test]
fn custom_next_screen_is_honored() {
    let script = SequenceScript {
        next_screen: "credits".to_string(),
        ..SequenceScript::default()
    };
    let mut seq = CrawlSequencer::new(
        Canvas {
            width: 64,
            height: 64,
        },
        script,
        LoggingAudio(TrackLog::default()),
    )
    .unwrap();
    let mut host = RecordingHost::default();
    for _ in 0..43 {
        seq.update(1.0, &mut host);
    }
    assert_eq!(host.pushed, vec!["credits".to_string()]);
}

#[test]
fn dispose_after_the_end_transition_is_safe() {
    let log = TrackLog::default();
    let mut seq = new_sequencer(log.clone());
    let mut host = RecordingHost::default();

    for _ in 0..43 {
        seq.update(1.0, &mut host);
    }
    seq.dispose();
    seq.dispose();
    // The end transition already released the track; disposal adds nothing.
    assert_eq!(*log.stops.borrow(), 1);
}
