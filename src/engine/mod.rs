//! The plane pipeline: visplane registry, clip storage, scanline mapping,
//! ripple animation, sloped-plane projection and the span emitter.

pub mod clip;
pub mod emit;
pub mod flatmap;
pub mod ripple;
pub mod slope;
pub mod visplane;

pub use clip::{ClipBands, FfloorClipBand, MAX_FFLOORS};
pub use emit::{FrameInputs, PlaneRenderer, plane_bounds};
pub use flatmap::{FlatMapper, MappedSpan};
pub use ripple::RippleState;
pub use slope::{SlopeVectors, SpanVectors};
pub use visplane::{PlaneArgs, PlaneId, PlaneSet, SENTINEL_BOTTOM, SENTINEL_TOP, Visplane};
