pub mod common;
pub mod image;
pub mod provider;

pub use common::*;
pub use image::*;
pub use provider::*;
