//! Doom-style floor/ceiling rasterization: visibility-merged plane records
//! ("visplanes"), column-bounds to horizontal-span conversion, and a
//! palette-indexed software backend.
//!
//! The crate is organized the way the data flows:
//!
//! * [`fixed`] — 16.16 fixed point, binary angles, fine trig tables.
//! * [`world`] — flats, light/translucency tables, extra-floor and slope
//!   descriptors, the per-frame view state.
//! * [`engine`] — the plane pipeline proper: registry, clip bands, scanline
//!   mapper, ripple, slope solver and the span emitter.
//! * [`renderer`] — the [`renderer::SpanDrawer`] seam and the software
//!   implementation behind it.

pub mod engine;
pub mod fixed;
pub mod renderer;
pub mod world;

pub use engine::{FrameInputs, PlaneArgs, PlaneId, PlaneRenderer};
pub use fixed::{Angle, Fixed};
pub use renderer::{SoftwareDrawer, SpanDrawer};
pub use world::{FlatBank, LightBank, TransTables, WorldRefs};
