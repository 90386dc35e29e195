//! Palette-indexed software backend for the span and sky drawers.
//!
//! Owns two 8-bit buffers: the live backbuffer and the frozen backdrop the
//! water spans sample from.  Palette resolution to RGB happens outside, at
//! presentation time.

use crate::fixed::{FRACBITS, Fixed};
use crate::renderer::{SkyColumnArgs, SpanArgs, SpanDrawer, SpanKind, SpanLight};
use crate::world::assets::{ColormapRow, Flat, LIGHTZSHIFT, MAXLIGHTZ, TRANSPARENT_PIXEL, TransTable};

pub struct SoftwareDrawer {
    width: usize,
    height: usize,
    frame: Vec<u8>,
    backdrop: Vec<u8>,
}

#[inline]
fn sample(flat: &Flat, xfrac: Fixed, yfrac: Fixed) -> u8 {
    let (tx, ty) = match flat.shift {
        Some(_) => (
            ((xfrac.0 >> FRACBITS) & (flat.width as i32 - 1)) as u32,
            ((yfrac.0 >> FRACBITS) & (flat.height as i32 - 1)) as u32,
        ),
        None => (
            (xfrac.0 >> FRACBITS).rem_euclid(flat.width as i32) as u32,
            (yfrac.0 >> FRACBITS).rem_euclid(flat.height as i32) as u32,
        ),
    };
    flat.pixels[(ty * flat.width + tx) as usize]
}

#[inline]
fn blend(transmap: &TransTable, shaded: u8, dest: u8) -> u8 {
    transmap[((shaded as usize) << 8) | dest as usize]
}

impl SoftwareDrawer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            frame: vec![0; width * height],
            backdrop: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut [u8] {
        &mut self.frame
    }

    pub fn clear(&mut self, color: u8) {
        self.frame.fill(color);
    }

    /// Flat walk: one colormap row for the whole span, texture coordinates
    /// advanced by constant steps.
    fn draw_flat_span(&mut self, s: &SpanArgs<'_>) {
        let SpanLight::Row(cm) = s.light else {
            return;
        };
        let row = s.y as usize * self.width;
        let mut xfrac = s.xfrac;
        let mut yfrac = s.yfrac;

        match s.kind {
            SpanKind::Opaque => {
                for x in s.x1..=s.x2 {
                    self.frame[row + x as usize] = cm[sample(s.source, xfrac, yfrac) as usize];
                    xfrac += s.xstep;
                    yfrac += s.ystep;
                }
            }
            SpanKind::Splat => {
                for x in s.x1..=s.x2 {
                    let px = sample(s.source, xfrac, yfrac);
                    if px != TRANSPARENT_PIXEL {
                        self.frame[row + x as usize] = cm[px as usize];
                    }
                    xfrac += s.xstep;
                    yfrac += s.ystep;
                }
            }
            SpanKind::Translucent { transmap } => {
                for x in s.x1..=s.x2 {
                    let i = row + x as usize;
                    let shaded = cm[sample(s.source, xfrac, yfrac) as usize];
                    self.frame[i] = blend(transmap, shaded, self.frame[i]);
                    xfrac += s.xstep;
                    yfrac += s.ystep;
                }
            }
            SpanKind::TranslucentSplat { transmap } => {
                for x in s.x1..=s.x2 {
                    let px = sample(s.source, xfrac, yfrac);
                    if px != TRANSPARENT_PIXEL {
                        let i = row + x as usize;
                        self.frame[i] = blend(transmap, cm[px as usize], self.frame[i]);
                    }
                    xfrac += s.xstep;
                    yfrac += s.ystep;
                }
            }
            SpanKind::Fog => {
                for x in s.x1..=s.x2 {
                    let i = row + x as usize;
                    self.frame[i] = cm[self.frame[i] as usize];
                }
            }
            SpanKind::Water { transmap } => {
                // blend against the displaced snapshot row, never the live
                // buffer, and bob the texture with the alternating offset
                let src_row = (s.y + s.bgofs) as usize * self.width;
                yfrac += s.waterofs;
                for x in s.x1..=s.x2 {
                    let shaded = cm[sample(s.source, xfrac, yfrac) as usize];
                    self.frame[row + x as usize] =
                        blend(transmap, shaded, self.backdrop[src_row + x as usize]);
                    xfrac += s.xstep;
                    yfrac += s.ystep;
                }
            }
        }
    }

    /// Tilted walk: interpolate `u/z`, `v/z`, `1/z` across the span and
    /// divide per pixel.
    fn draw_tilted_span(&mut self, s: &SpanArgs<'_>, vecs: &crate::engine::slope::SpanVectors) {
        let SpanLight::Zoned { zmap, rows, depth_scale } = s.light else {
            return;
        };
        let row = s.y as usize * self.width;
        let dy = (s.centery - s.y) as f32;
        let dx = (s.x1 - s.centerx) as f32;

        let mut iz = vecs.sz.z + vecs.sz.y * dy + vecs.sz.x * dx;
        let mut uz = vecs.su.z + vecs.su.y * dy + vecs.su.x * dx;
        let mut vz = vecs.sv.z + vecs.sv.y * dy + vecs.sv.x * dx;

        let water_row = (s.y + s.bgofs) as usize * self.width;

        for x in s.x1..=s.x2 {
            let z = 1.0 / iz;
            let u = Fixed((uz * z) as i64 as i32);
            let v = Fixed((vz * z) as i64 as i32) + s.waterofs;

            let dist = (depth_scale * z.abs()) as i32;
            let pindex = ((dist >> LIGHTZSHIFT) as usize).min(MAXLIGHTZ - 1);
            let cm: &ColormapRow = &rows[zmap[pindex] as usize];

            let i = row + x as usize;
            match s.kind {
                SpanKind::Opaque => {
                    self.frame[i] = cm[sample(s.source, u, v) as usize];
                }
                SpanKind::Splat => {
                    let px = sample(s.source, u, v);
                    if px != TRANSPARENT_PIXEL {
                        self.frame[i] = cm[px as usize];
                    }
                }
                SpanKind::Translucent { transmap } => {
                    let shaded = cm[sample(s.source, u, v) as usize];
                    self.frame[i] = blend(transmap, shaded, self.frame[i]);
                }
                SpanKind::TranslucentSplat { transmap } => {
                    let px = sample(s.source, u, v);
                    if px != TRANSPARENT_PIXEL {
                        self.frame[i] = blend(transmap, cm[px as usize], self.frame[i]);
                    }
                }
                SpanKind::Fog => {
                    self.frame[i] = cm[self.frame[i] as usize];
                }
                SpanKind::Water { transmap } => {
                    let shaded = cm[sample(s.source, u, v) as usize];
                    self.frame[i] =
                        blend(transmap, shaded, self.backdrop[water_row + x as usize]);
                }
            }

            iz += vecs.sz.x;
            uz += vecs.su.x;
            vz += vecs.sv.x;
        }
    }
}

impl SpanDrawer for SoftwareDrawer {
    fn draw_span(&mut self, s: &SpanArgs<'_>) {
        match s.tilt {
            Some(vecs) => self.draw_tilted_span(s, vecs),
            None => self.draw_flat_span(s),
        }
    }

    fn draw_sky_column(&mut self, c: &SkyColumnArgs<'_>) {
        let mut frac = c.texturemid + c.iscale * (c.yl - c.centery);
        for y in c.yl..=c.yh {
            let ty = frac.to_int().rem_euclid(c.texheight as i32) as usize;
            self.frame[y as usize * self.width + c.x as usize] = c.colormap[c.source[ty] as usize];
            frac += c.iscale;
        }
    }

    fn snapshot_rows(&mut self, top: i32, bottom: i32) {
        let a = (top.max(0) as usize * self.width).min(self.frame.len());
        let b = ((bottom.max(0) as usize) * self.width).min(self.frame.len());
        self.backdrop[a..b].copy_from_slice(&self.frame[a..b]);
    }
}

/*──────────────────────────────── Tests ───────────────────────────────*/
