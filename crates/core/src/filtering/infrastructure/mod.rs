pub mod expr_filter;
pub mod extrema;
pub mod masked_merge;
pub mod native_host;
pub mod smooth_uv;
