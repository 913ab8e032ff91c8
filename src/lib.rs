#![forbid(unsafe_code)]

pub mod audio;
pub mod compositor;
pub mod core;
pub mod error;
pub mod layout;
pub mod phase;
pub mod script;
pub mod sequencer;
pub mod warp_cpu;
#[cfg(feature = "gpu")]
pub mod warp_gpu;

pub use audio::{AudioDevice, AudioTrack, NullAudio, NullTrack};
#[cfg(feature = "audio")]
pub use audio::{KiraAudio, KiraTrack};
pub use compositor::{TOP_INSET_PX, WarpCompositor};
pub use core::{Canvas, FrameRgba, SequenceClock};
pub use error::{CinecrawlError, CinecrawlResult};
pub use layout::{CrawlFont, FontProvider, LinePlacement, TextBrush};
pub use phase::{Phase, PhaseFrame, VisualParams};
pub use script::SequenceScript;
pub use sequencer::{CrawlSequencer, ScreenHost};
#[cfg(feature = "gpu")]
pub use warp_gpu::GpuWarpCompositor;
