//! Caption text: font resolution, wrapping and rasterization.

pub(crate) mod builtin;
pub mod font;
pub mod layout;
pub mod raster;

pub use font::{FontOrigin, FontSpec, ResolvedFont, resolve_font};
pub use raster::{GlyphCoverage, TextImage, TextRasterizer, TextStyle};
