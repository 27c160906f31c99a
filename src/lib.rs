//! A raster graphics device for callback-driven plotting hosts.
//!
//! The host drives a [`Device`] through the [`GraphicsDevice`] callbacks (pages, clips,
//! primitives, text, rasters, metrics). The device turns each callback into a drawable
//! command list and hands it to a [`RenderingLibrary`], which owns the actual canvases.
//! Backends for cairo and SVG are behind the `cairo` and `svg` features; the
//! recording backend is always available.

pub mod api;
pub mod clip;
pub mod color;
pub mod device;
pub mod draw;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod host;
pub mod options;
pub mod raster;
pub mod style;
pub mod text;

pub mod backends {
    #[cfg(feature = "cairo")]
    pub mod cairo;
    pub mod recording;
    #[cfg(feature = "svg")]
    pub mod svg;
}

pub use api::{Capabilities, Drawable, ImageData, Point, RenderingLibrary};
pub use color::Color;
pub use device::{Device, pop_last_active};
pub use error::{DeviceError, Result};
pub use geometry::Geometry;
pub use host::{DeviceId, DeviceRegistry, GraphicsContext, GraphicsDevice, NullRegistry};
pub use options::DeviceOptions;
