pub mod allocator;
pub mod generator;
pub mod image;
pub mod memory;
pub mod romfile;

pub use generator::layout;
pub use image::{BankImage, Image, Placement, RegionImage};
