/// One pixel color. Channels are opaque integers on a common scale; the decoder
/// produces 16-bit values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

impl Color {
    pub const fn new(red: u16, green: u16, blue: u16) -> Self {
        Self { red, green, blue }
    }

    pub const fn gray(v: u16) -> Self {
        Self { red: v, green: v, blue: v }
    }

    pub fn channels(self) -> [u16; 3] {
        [self.red, self.green, self.blue]
    }

    /// Squared Euclidean distance in RGB space.
    #[inline]
    pub fn distance_sq(self, o: Self) -> u64 {
        let dr = self.red as i64 - o.red as i64;
        let dg = self.green as i64 - o.green as i64;
        let db = self.blue as i64 - o.blue as i64;
        (dr * dr + dg * dg + db * db) as u64
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sample {
    pub color: Color,
    /// Index of the owning cluster, `None` until the first assignment pass.
    pub cluster: Option<usize>,
}

impl Sample {
    pub fn new(color: Color) -> Self {
        Self { color, cluster: None }
    }
}

/// Row-major grid of samples with fixed dimensions.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelGrid {
    width: usize,
    height: usize,
    samples: Vec<Sample>,
}

impl PixelGrid {
    /// Builds a grid from row-major colors. Returns `None` when the color count
    /// does not match `width * height`.
    pub fn from_colors(width: usize, height: usize, colors: Vec<Color>) -> Option<Self> {
        if colors.len() != width.checked_mul(height)? {
            return None;
        }
        let samples = colors.into_iter().map(Sample::new).collect();
        Some(Self { width, height, samples })
    }

    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> Color) -> Self {
        let mut samples = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                samples.push(Sample::new(f(x, y)));
            }
        }
        Self { width, height, samples }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&Sample> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.samples.get(y * self.width + x)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub(crate) fn samples_mut(&mut self) -> &mut [Sample] {
        &mut self.samples
    }

    /// Cluster index of every sample in row-major order.
    pub fn assignments(&self) -> Vec<Option<usize>> {
        self.samples.iter().map(|s| s.cluster).collect()
    }
}
