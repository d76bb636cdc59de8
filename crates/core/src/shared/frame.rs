use ndarray::ArrayView3;

/// Byte layout of a frame's pixels.
///
/// Cameras deliver 32-bit BGRA; still images are decoded to packed RGB.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
    Bgra8,
}

impl PixelFormat {
    pub fn channels(self) -> u8 {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Bgra8 => 4,
        }
    }

    /// Byte offsets of the red, green and blue samples within one pixel.
    pub fn rgb_offsets(self) -> [usize; 3] {
        match self {
            PixelFormat::Rgb8 => [0, 1, 2],
            PixelFormat::Bgra8 => [2, 1, 0],
        }
    }
}

/// A single camera or image frame: contiguous pixels in row-major order.
///
/// Frames move between threads by value and are never shared.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (format.channels() as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            format,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn channels(&self) -> u8 {
        self.format.channels()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Red, green and blue samples of the pixel at `(x, y)`.
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let c = self.channels() as usize;
        let base = (y as usize * self.width as usize + x as usize) * c;
        let [r, g, b] = self.format.rgb_offsets();
        [self.data[base + r], self.data[base + g], self.data[base + b]]
    }

    /// Converts to tightly packed RGBA, as expected by image widgets.
    pub fn to_rgba(&self) -> Vec<u8> {
        let pixels = self.width as usize * self.height as usize;
        let c = self.channels() as usize;
        let [r, g, b] = self.format.rgb_offsets();
        let mut out = Vec::with_capacity(pixels * 4);
        for px in self.data.chunks_exact(c) {
            out.extend_from_slice(&[px[r], px[g], px[b], 255]);
        }
        out
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels() as usize,
        )
    }
}
