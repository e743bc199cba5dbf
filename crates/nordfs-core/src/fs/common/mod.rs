/// Common types for image access
pub mod image;

pub use image::{Image, PAGE_SIZE};
