use ndarray::ArrayView3;

/// A single video frame or still image: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the domain layer
/// treats pixel data as opaque.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// An RGB frame with every byte set to `value` (0 = black).
    pub fn solid(width: u32, height: u32, value: u8) -> Self {
        let len = (width as usize) * (height as usize) * 3;
        Self::new(vec![value; len], width, height, 3, 0)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns a copy of this frame renumbered to `index`.
    pub fn with_index(&self, index: usize) -> Self {
        Self {
            index,
            ..self.clone()
        }
    }

    /// Blends the frame towards black: `alpha = 1.0` keeps it unchanged,
    /// `alpha = 0.0` yields a black frame.
    pub fn faded(&self, alpha: f32, index: usize) -> Self {
        let alpha = alpha.clamp(0.0, 1.0);
        let blended = self
            .as_ndarray()
            .mapv(|v| (v as f32 * alpha).round().min(255.0) as u8);
        let (data, _) = blended.into_raw_vec_and_offset();
        Self::new(data, self.width, self.height, self.channels, index)
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
