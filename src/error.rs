use std::path::PathBuf;

use thiserror::Error;

use crate::surface::Shape;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("not a supported raster image (expected png or jpeg)")]
    InvalidFormat,

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no image loaded")]
    NoImage,

    #[error("displacement requires the flat panel shape, got {0:?}")]
    UnsupportedShape(Shape),
}
