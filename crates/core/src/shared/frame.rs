use ndarray::{ArrayView2, ArrayViewMut2};

/// Planar 8-bit sample layouts understood by the filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Gray8,
    Yuv420p,
    Yuv422p,
    Yuv444p,
}

impl PixelFormat {
    pub fn num_planes(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            _ => 3,
        }
    }

    pub fn is_yuv(self) -> bool {
        !matches!(self, PixelFormat::Gray8)
    }

    /// Horizontal and vertical chroma subsampling as log2 factors.
    pub fn subsampling(self) -> (u32, u32) {
        match self {
            PixelFormat::Gray8 | PixelFormat::Yuv444p => (0, 0),
            PixelFormat::Yuv422p => (1, 0),
            PixelFormat::Yuv420p => (1, 1),
        }
    }

    /// Dimensions of `plane` for a frame of `width` x `height` luma samples.
    pub fn plane_dimensions(self, width: usize, height: usize, plane: usize) -> (usize, usize) {
        if plane == 0 {
            return (width, height);
        }
        let (ssw, ssh) = self.subsampling();
        (
            (width + (1 << ssw) - 1) >> ssw,
            (height + (1 << ssh) - 1) >> ssh,
        )
    }
}

/// Field order of a frame, mirroring the `_FieldBased` frame property.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FieldBased {
    #[default]
    Progressive,
    BottomFieldFirst,
    TopFieldFirst,
}

impl FieldBased {
    pub fn is_interlaced(self) -> bool {
        !matches!(self, FieldBased::Progressive)
    }
}

/// One channel of a frame: contiguous samples in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plane {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl Plane {
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            width * height,
            "plane data length must equal width * height"
        );
        Self {
            data,
            width,
            height,
        }
    }

    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self::new(vec![value; width * height], width, height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    pub fn as_ndarray(&self) -> ArrayView2<'_, u8> {
        ArrayView2::from_shape((self.height, self.width), &self.data)
            .expect("Plane data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut2<'_, u8> {
        ArrayViewMut2::from_shape((self.height, self.width), &mut self.data)
            .expect("Plane data length must match dimensions")
    }
}

/// A single planar video/image frame.
///
/// Pixel format conversion happens at I/O boundaries only; filters operate
/// on the planes directly.
#[derive(Clone, Debug)]
pub struct Frame {
    format: PixelFormat,
    width: usize,
    height: usize,
    planes: Vec<Plane>,
    index: usize,
    field_based: FieldBased,
}

impl Frame {
    pub fn new(
        format: PixelFormat,
        width: usize,
        height: usize,
        planes: Vec<Plane>,
        index: usize,
    ) -> Self {
        debug_assert_eq!(
            planes.len(),
            format.num_planes(),
            "plane count must match pixel format"
        );
        debug_assert!(
            planes.iter().enumerate().all(|(i, p)| {
                (p.width(), p.height()) == format.plane_dimensions(width, height, i)
            }),
            "plane dimensions must match pixel format"
        );
        Self {
            format,
            width,
            height,
            planes,
            index,
            field_based: FieldBased::Progressive,
        }
    }

    /// Frame with every plane filled with a constant value.
    pub fn filled(format: PixelFormat, width: usize, height: usize, values: &[u8], index: usize) -> Self {
        let planes = (0..format.num_planes())
            .map(|i| {
                let (w, h) = format.plane_dimensions(width, height, i);
                Plane::filled(w, h, values[i.min(values.len() - 1)])
            })
            .collect();
        Self::new(format, width, height, planes, index)
    }

    pub fn with_field_based(mut self, field_based: FieldBased) -> Self {
        self.field_based = field_based;
        self
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn field_based(&self) -> FieldBased {
        self.field_based
    }

    pub fn num_planes(&self) -> usize {
        self.planes.len()
    }

    pub fn plane(&self, plane: usize) -> &Plane {
        &self.planes[plane]
    }

    pub fn plane_mut(&mut self, plane: usize) -> &mut Plane {
        &mut self.planes[plane]
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Returns a frame that keeps this frame's properties but swaps in new planes.
    pub fn with_planes(&self, planes: Vec<Plane>) -> Self {
        let mut out = Self::new(self.format, self.width, self.height, planes, self.index);
        out.field_based = self.field_based;
        out
    }
}
