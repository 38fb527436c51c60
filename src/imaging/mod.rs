//! Preview generation.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Decode** | `image::ImageReader` (PNG, JPEG, WebP, BMP, TIFF) |
//! | **Flatten** | alpha composited onto opaque white |
//! | **Resize** | `image::imageops::resize` with `Lanczos3`, fit within a box |
//! | **Encode** | `JpegEncoder` at the configured quality |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::fit_within;
pub use operations::{
    PREVIEWS_DIR, PreviewOutcome, THUMBS_DIR, create_preview, preview_path, thumb_path,
};
pub use params::{PreviewParams, Quality};
pub use rust_backend::RustBackend;
