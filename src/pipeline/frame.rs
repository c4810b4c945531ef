use crate::pipeline::buffer_pool::PooledBuffer;

/// A decoded video frame as produced by a [`crate::FrameSource`].
///
/// Pixels are RGBA8, row-major, `stride` bytes per row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Bytes per row; at least `width * 4`.
    pub stride: usize,
    /// Whether rows are stored bottom-up.
    pub flipped: bool,
    /// Pixel bytes.
    pub data: Vec<u8>,
}

impl VideoFrame {
    /// Copy pixels into a tightly packed, top-down `target` of the same size.
    pub(crate) fn copy_into(&self, target: &mut PooledBuffer) {
        let row = self.width as usize * 4;
        let height = self.height as usize;
        let dst = target.data_mut();
        for y in 0..height {
            let src_y = if self.flipped { height - 1 - y } else { y };
            let src = &self.data[src_y * self.stride..src_y * self.stride + row];
            dst[y * row..(y + 1) * row].copy_from_slice(src);
        }
    }

    /// Return `true` when `data` is large enough for the declared geometry.
    pub fn is_well_formed(&self) -> bool {
        let row = self.width as usize * 4;
        self.stride >= row
            && self.data.len() >= self.stride.saturating_mul(self.height as usize)
    }
}

/// A frame with subtitles rendered onto it, ready for display.
///
/// Shared as `Arc<RenderedFrame>` between the pipeline and the sink; its pixel buffer goes back
/// to the pipeline's pool when the last `Arc` is dropped.
#[derive(Debug)]
pub struct RenderedFrame {
    /// Source frame number.
    pub frame_number: u64,
    /// Time (ms) used to select and render subtitles.
    pub time_ms: i64,
    /// YCbCr matrix the source decoded this frame with.
    pub color_space: String,
    /// Whether subtitles were rendered onto this frame.
    pub has_subtitles: bool,
    pub(crate) pixels: PooledBuffer,
}

impl RenderedFrame {
    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Tightly packed, top-down RGBA8 pixels.
    pub fn data(&self) -> &[u8] {
        self.pixels.data()
    }

    /// RGBA of the pixel at (`x`, `y`), if in bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let i = (y as usize * self.width() as usize + x as usize) * 4;
        let p = self.data().get(i..i + 4)?;
        Some([p[0], p[1], p[2], p[3]])
    }
}
