pub mod rainbow_smooth_processor;
