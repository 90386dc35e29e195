//! Drawing abstraction layer.
//!
//! *The plane pipeline never touches a pixel buffer directly.*
//! It converts visplanes into fully parameterized [`SpanArgs`] /
//! [`SkyColumnArgs`] and hands them to a type that implements
//! [`SpanDrawer`].  The drawing mode is decided **once per plane** (see
//! [`SpanKind`]), never per pixel.

use crate::engine::slope::SpanVectors;
use crate::fixed::Fixed;
use crate::world::assets::{ColormapRow, Flat, MAXLIGHTZ, TransTable};

/// How the texel reaches the framebuffer.
#[derive(Clone, Copy)]
pub enum SpanKind<'a> {
    /// Straight colormapped copy.
    Opaque,
    /// Opaque, but palette index [`crate::world::assets::TRANSPARENT_PIXEL`]
    /// stays a hole.
    Splat,
    Translucent { transmap: &'a TransTable },
    TranslucentSplat { transmap: &'a TransTable },
    /// No texel sampling at all: remap whatever is already on screen.
    Fog,
    /// Translucent blend against the frozen pre-pass snapshot, displaced by
    /// `bgofs` rows.
    Water { transmap: &'a TransTable },
}

/// Light selection for one span.
#[derive(Clone, Copy)]
pub enum SpanLight<'a> {
    /// Flat spans: the shade row was picked per scanline from the distance
    /// zone table.
    Row(&'a ColormapRow),
    /// Tilted spans: depth varies per pixel, so the drawer picks a row per
    /// pixel from the zone table.  `depth_scale / iz` recovers the 16.16
    /// view distance from the interpolated inverse depth.
    Zoned {
        zmap: &'a [u8; MAXLIGHTZ],
        rows: &'a [ColormapRow],
        depth_scale: f32,
    },
}

/// One horizontal textured run, ready to rasterize.
pub struct SpanArgs<'a> {
    pub y: i32,
    pub x1: i32,
    pub x2: i32,

    /* texture-space walk (flat planes) */
    pub xfrac: Fixed,
    pub yfrac: Fixed,
    pub xstep: Fixed,
    pub ystep: Fixed,

    /// Vertical ripple displacement in screen rows, already clamped.
    pub bgofs: i32,
    /// Alternating water texel bob.
    pub waterofs: Fixed,

    pub source: &'a Flat,
    pub light: SpanLight<'a>,
    pub kind: SpanKind<'a>,
    /// Per-pixel interpolation vectors; `Some` switches the drawer to the
    /// tilted walk and `xfrac`/`xstep` are ignored.
    pub tilt: Option<&'a SpanVectors>,

    pub centerx: i32,
    pub centery: i32,
}

/// One vertical sky strip.  Sky bypasses texture-space spans entirely and
/// draws angular-indexed columns.
pub struct SkyColumnArgs<'a> {
    pub x: i32,
    pub yl: i32,
    pub yh: i32,
    pub iscale: Fixed,
    pub texturemid: Fixed,
    pub centery: i32,
    /// One column of the sky texture, already picked by angle.
    pub source: &'a [u8],
    pub texheight: u32,
    pub colormap: &'a ColormapRow,
}

/// Low-level pixel sink.  Implementations own the backbuffer; the plane
/// pipeline only parameterizes and invokes.
pub trait SpanDrawer {
    fn draw_span(&mut self, span: &SpanArgs<'_>);

    fn draw_sky_column(&mut self, col: &SkyColumnArgs<'_>);

    /// Freeze the backbuffer rows `top..bottom` into a secondary buffer.
    /// The water span kind samples this copy instead of the live buffer so
    /// pixels written earlier in the same frame cannot feed back.
    fn snapshot_rows(&mut self, top: i32, bottom: i32);
}

pub mod software;

pub use software::SoftwareDrawer;
