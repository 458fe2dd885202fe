//! In-memory document model for a sprite: the root [`Sprite`] aggregate,
//! its layer tree, per-frame cels, palettes, tilesets, tags and slices.
//!
//! Ownership flows strictly top-down from the sprite through the root
//! layer group; depth and parentage are derived by traversal rather than
//! stored. Linked cels hold only their target frame number and are
//! resolved against the owning layer on demand.

mod cel;
mod color;
mod document;
mod image;
mod layer;
mod palette;
mod slice;
mod sprite;
mod tag;
mod tileset;
mod user_data;

pub use cel::{Cel, CelContent};
pub use color::{Grid, PixelRatio, Rgba32};
pub use document::Document;
pub use image::{ColorMode, Image};
pub use layer::{BlendMode, GroupLayer, ImageLayer, Layer, LayerCore, LayerFlags, TilemapLayer};
pub use palette::Palette;
pub use slice::{Slice, SliceKey};
pub use sprite::{FrameInfo, Sprite};
pub use tag::{AnimationDirection, Tag};
pub use tileset::{TILE_INDEX_MASK, TileFlags, Tileset, decode_tile_ref, encode_tile_ref};
pub use user_data::UserData;
