pub mod height_field;
pub mod raster;

pub use height_field::{HeightField, extract};
pub use raster::{ImageLoader, LoadedImage, RasterImage, decode_raster};
