use crate::{
    core::{Canvas, FrameRgba},
    error::{CinecrawlError, CinecrawlResult},
    warp_cpu,
};

/// Pixels the top edge of the captured quad is pulled inward per side during
/// a warped composite, on top of the shader's per-pixel compression.
pub const TOP_INSET_PX: f32 = 20.0;

/// Owns the offscreen render target and presents it to the screen.
///
/// A frame is produced in two passes: `capture` rasterizes the caller's scene
/// into the offscreen target, `composite` presents the target over an opaque
/// black screen, warped or straight.
pub struct WarpCompositor {
    canvas: Canvas,
    width: u16,
    height: u16,
    target: vello_cpu::Pixmap,
    #[cfg(feature = "gpu")]
    gpu: Option<crate::warp_gpu::GpuWarpCompositor>,
}

impl WarpCompositor {
    pub fn new(canvas: Canvas) -> CinecrawlResult<Self> {
        if canvas.width == 0 || canvas.height == 0 {
            return Err(CinecrawlError::resource(
                "offscreen target dimensions must be > 0",
            ));
        }
        let width: u16 = canvas
            .width
            .try_into()
            .map_err(|_| CinecrawlError::resource("offscreen target width exceeds u16"))?;
        let height: u16 = canvas
            .height
            .try_into()
            .map_err(|_| CinecrawlError::resource("offscreen target height exceeds u16"))?;

        Ok(Self {
            canvas,
            width,
            height,
            target: vello_cpu::Pixmap::new(width, height),
            #[cfg(feature = "gpu")]
            gpu: None,
        })
    }

    /// Compositor that captures on the CPU but presents through the GPU warp
    /// program. Fails if no adapter or device is available.
    #[cfg(feature = "gpu")]
    pub fn new_gpu(canvas: Canvas) -> CinecrawlResult<Self> {
        let mut this = Self::new(canvas)?;
        this.gpu = Some(crate::warp_gpu::GpuWarpCompositor::new(canvas)?);
        Ok(this)
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Rasterize one frame's content into the offscreen target.
    ///
    /// The target is cleared to transparent black before `draw` runs and the
    /// scene context is resolved into the target on success and failure
    /// alike; there is no begin/end pair for callers to leak.
    pub fn capture<F>(&mut self, draw: F) -> CinecrawlResult<()>
    where
        F: FnOnce(&mut vello_cpu::RenderContext) -> CinecrawlResult<()>,
    {
        clear_pixmap(&mut self.target);

        let mut scene = vello_cpu::RenderContext::new(self.width, self.height);
        let drawn = draw(&mut scene);
        scene.flush();
        scene.render_to_pixmap(&mut self.target);
        drawn
    }

    /// Present the captured target over an opaque black screen.
    pub fn composite(&self, warp: bool) -> CinecrawlResult<FrameRgba> {
        let src = self.target.data_as_u8_slice();

        #[cfg(feature = "gpu")]
        if let Some(gpu) = &self.gpu {
            return gpu.composite(src, warp, TOP_INSET_PX);
        }

        let data = if warp {
            warp_cpu::warp_rgba8_premul(src, self.canvas.width, self.canvas.height, TOP_INSET_PX)?
        } else {
            opaque_over_black(src)
        };
        Ok(FrameRgba {
            width: self.canvas.width,
            height: self.canvas.height,
            data,
        })
    }
}

fn clear_pixmap(pixmap: &mut vello_cpu::Pixmap) {
    for px in pixmap.data_as_u8_slice_mut().chunks_exact_mut(4) {
        px.copy_from_slice(&[0, 0, 0, 0]);
    }
}

/// Premultiplied source over an opaque black screen: color passes through,
/// alpha collapses to fully opaque.
fn opaque_over_black(src: &[u8]) -> Vec<u8> {
    let mut out = src.to_vec();
    for px in out.chunks_exact_mut(4) {
        px[3] = 255;
    }
    out
}
