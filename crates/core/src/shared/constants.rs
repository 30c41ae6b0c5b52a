pub const DEFAULT_RADIUS: i32 = 3;
pub const DEFAULT_LOW_THRESHOLD: i32 = 0;
pub const DEFAULT_HIGH_THRESHOLD: i32 = 220;

pub const SMOOTH_UV_DEFAULT_THRESHOLD: i32 = 270;
pub const SMOOTH_UV_MIN_RADIUS: i32 = 1;
pub const SMOOTH_UV_MAX_RADIUS: i32 = 7;
pub const SMOOTH_UV_MAX_THRESHOLD: i32 = 450;

/// Local luma range at which the edge mask saturates to full strength.
pub const EDGE_MASK_KNEE: i32 = 90;

/// Edge mask: 255 where local luma range exceeds the knee, linear ramp below.
pub const EDGE_MASK_EXPR: &str = "x y - 90 > 255 x y - 255 90 / * ?";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
