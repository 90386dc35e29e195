//! Frame orchestration: turns the per-column bounds stored in each visplane
//! into horizontal spans and hands them to a [`SpanDrawer`].
//!
//! One [`PlaneRenderer`] owns all per-frame plane state (registry, clip
//! bands, mapping cache, ripple animation).  A frame runs:
//!
//! 1. [`PlaneRenderer::clear_frame`]
//! 2. wall/BSP traversal registers planes via [`PlaneRenderer::find_plane`],
//!    [`PlaneRenderer::check_plane`] and fills column bounds
//! 3. [`PlaneRenderer::draw_planes`] rasterizes ordinary planes; stacked
//!    extra-floor and polyobject planes are drawn later by the masked
//!    sorter through [`PlaneRenderer::draw_single_plane`]

use crate::engine::clip::ClipBands;
use crate::engine::flatmap::FlatMapper;
use crate::engine::ripple::RippleState;
use crate::engine::slope::{self, SpanVectors};
use crate::engine::visplane::{PlaneArgs, PlaneId, PlaneSet, SENTINEL_BOTTOM, SENTINEL_TOP, Visplane};
use crate::fixed::{ANGLETOSKYSHIFT, Fixed, finecosine};
use crate::renderer::{SkyColumnArgs, SpanArgs, SpanDrawer, SpanKind, SpanLight};
use crate::world::assets::{
    AssetError, FlatBank, FlatId, LIGHTLEVELS, LIGHTSEGSHIFT, LIGHTZSHIFT, LightBank, MAXLIGHTZ,
    TransTables,
};
use crate::world::ffloor::{FfloorFlags, PolyFlags, Slope, WorldRefs};
use crate::world::view::ViewFrame;

/// Everything a draw call borrows from outside the plane pipeline.
#[derive(Clone, Copy)]
pub struct FrameInputs<'a> {
    pub view: &'a ViewFrame,
    pub world: WorldRefs<'a>,
    pub flats: &'a FlatBank,
    pub lights: &'a LightBank,
    pub trans: &'a TransTables,
}

/// Drawing mode of one plane, fixed before the first span.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Opaque,
    Splat,
    Trans(u8),
    TransSplat(u8),
    Fog,
    Water(u8),
}

/// Sloped-plane state shared by every span of one plane.
struct TiltCtx {
    slope: Slope,
    xoffs: Fixed,
    yoffs: Fixed,
    base: SpanVectors,
}

pub struct PlaneRenderer {
    pub planes: PlaneSet,
    pub clips: ClipBands,
    mapper: FlatMapper,
    ripple: RippleState,
    /// Start column of the open span on each row.
    span_start: Vec<i32>,
}

impl PlaneRenderer {
    pub fn new(max_width: usize, max_height: usize, sky_flat: FlatId) -> Self {
        Self {
            planes: PlaneSet::new(max_width, sky_flat),
            clips: ClipBands::new(max_width),
            mapper: FlatMapper::new(max_height),
            ripple: RippleState::new(),
            span_start: vec![0; max_height],
        }
    }

    /// Reset all per-frame state.  `leveltime` drives the ripple animation.
    pub fn clear_frame(&mut self, view: &ViewFrame, leveltime: u32) {
        self.planes.clear_frame();
        self.clips.clear_frame(view.width, view.height);
        self.mapper.reset_cache();
        self.mapper.configure(view.viewangle, view.centerxfrac);
        self.ripple.update(leveltime);
    }

    pub fn find_plane(&mut self, view: &ViewFrame, world: &WorldRefs<'_>, args: &PlaneArgs) -> PlaneId {
        self.planes.find_or_create(view, world, args)
    }

    pub fn check_plane(&mut self, id: PlaneId, start: i32, stop: i32) -> PlaneId {
        self.planes.check_plane(id, start, stop)
    }

    pub fn expand_plane(&mut self, id: PlaneId, start: i32, stop: i32) {
        self.planes.expand_plane(id, start, stop)
    }

    /// Rasterize every ordinary plane registered this frame.  Extra-floor
    /// and polyobject planes are skipped; they sort against sprites and get
    /// drawn individually later in the frame.
    pub fn draw_planes(
        &mut self,
        inputs: &FrameInputs<'_>,
        drawer: &mut dyn SpanDrawer,
    ) -> Result<(), AssetError> {
        for id in self.planes.active_ids() {
            {
                let pl = self.planes.get(id);
                if pl.ffloor.is_some() || pl.polyobj.is_some() {
                    continue;
                }
            }
            self.draw_single_plane(inputs, drawer, id)?;
        }
        Ok(())
    }

    /// Rasterize one plane: pick the drawing mode and light source once,
    /// then stream its column bounds out as spans.
    pub fn draw_single_plane(
        &mut self,
        inputs: &FrameInputs<'_>,
        drawer: &mut dyn SpanDrawer,
        id: PlaneId,
    ) -> Result<(), AssetError> {
        let view = inputs.view;

        let (minx, maxx, picnum) = {
            let pl = self.planes.get(id);
            (pl.minx, pl.maxx, pl.picnum)
        };
        if minx > maxx {
            return Ok(());
        }
        debug_assert!(minx >= 0 && maxx < view.width, "plane columns outside the viewport");

        if picnum == self.planes.sky_flat() {
            self.draw_sky_plane(inputs, drawer, id);
            return Ok(());
        }

        let mut mode = Mode::Opaque;
        let mut ripple_active = false;
        let light;
        {
            let pl = self.planes.get(id);
            // fog colormaps keep sector light even on blended surfaces
            let extra_fog = pl
                .extra_colormap
                .map(|c| inputs.lights.extra(c).fog)
                .unwrap_or(false);
            let own = pl.lightlevel >> LIGHTSEGSHIFT;

            if let Some(poid) = pl.polyobj {
                let po = &inputs.world.polyobjs[poid as usize];
                if po.translucency >= 10 {
                    return Ok(());
                }
                if po.translucency > 0 {
                    let t = po.translucency as u8;
                    mode = if po.flags.contains(PolyFlags::SPLAT) {
                        Mode::TransSplat(t)
                    } else {
                        Mode::Trans(t)
                    };
                } else if po.flags.contains(PolyFlags::SPLAT) {
                    mode = Mode::Splat;
                }
                light = if po.translucency == 0 || extra_fog { own } else { LIGHTLEVELS - 1 };
            } else if let Some(fid) = pl.ffloor {
                let ff = &inputs.world.ffloors[fid as usize];
                if ff.flags.contains(FfloorFlags::TRANSLUCENT) {
                    match TransTables::alpha_to_transnum(ff.alpha) {
                        None => return Ok(()),
                        // opaque fallback still keeps transparent texel holes
                        Some(0) => mode = Mode::Splat,
                        Some(t) => {
                            mode = if ff.flags.contains(FfloorFlags::SPLAT) {
                                Mode::TransSplat(t)
                            } else {
                                Mode::Trans(t)
                            };
                        }
                    }
                    // blended planes draw full-bright; the blend table
                    // carries the shading.  The opaque fallback does not.
                    light = if matches!(mode, Mode::Splat) || extra_fog {
                        own
                    } else {
                        LIGHTLEVELS - 1
                    };
                } else if ff.flags.contains(FfloorFlags::FOG) {
                    mode = Mode::Fog;
                    light = own;
                } else {
                    if ff.flags.contains(FfloorFlags::SPLAT) {
                        mode = Mode::Splat;
                    }
                    light = own;
                }
                if ff.flags.contains(FfloorFlags::RIPPLE) {
                    ripple_active = true;
                    // rippling translucent water reads the backbuffer rows
                    // it displaces, so it blends against a frozen copy
                    if let Mode::Trans(t) = mode {
                        mode = Mode::Water(t);
                    }
                }
            } else {
                light = own;
            }
        }
        let light = light.clamp(0, LIGHTLEVELS - 1);

        if let Mode::Water(_) = mode {
            let pl = self.planes.get_mut(id);
            plane_bounds(pl);
            let top = (pl.high - 8).max(0);
            let bottom = (pl.low + 8).min(view.height);
            drawer.snapshot_rows(top, bottom);
        }

        let flat = inputs.flats.flat(picnum)?;

        // tilted planes get their interpolation vectors up front; the plane
        // height only matters for the ripple depth falloff there
        let (tilt, planeheight) = {
            let pl = self.planes.get(id);
            match pl.slope {
                Some(sid) => {
                    let sl = inputs.world.slopes[sid as usize];
                    let mut xoffs = pl.xoffs;
                    let mut yoffs = pl.yoffs;
                    match flat.shift {
                        Some(shift) => slope::adjust_offsets_po2(
                            &mut xoffs,
                            &mut yoffs,
                            (sl.origin.0, sl.origin.1),
                            shift,
                        ),
                        None => slope::adjust_offsets_npo2(
                            &mut xoffs,
                            &mut yoffs,
                            (sl.origin.0, sl.origin.1),
                            flat.width,
                            flat.height,
                        ),
                    }
                    let sp = slope::slope_plane(
                        &sl, pl.viewx, pl.viewy, pl.viewz, xoffs, yoffs, pl.viewangle, pl.plangle,
                    );
                    let base = slope::span_vectors(&sp, view.focallenf);
                    let height = (sl.z_at(pl.viewx, pl.viewy) - pl.viewz).abs();
                    (Some(TiltCtx { slope: sl, xoffs, yoffs, base }), height)
                }
                None => (None, (pl.height - pl.viewz).abs()),
            }
        };

        {
            // both pad cells get full sentinels; a stale bottom there could
            // otherwise truncate the final span flush
            let pl = self.planes.get_mut(id);
            let (minx, maxx) = (pl.minx, pl.maxx);
            pl.set_top(minx - 1, SENTINEL_TOP);
            pl.set_top(maxx + 1, SENTINEL_TOP);
            pl.set_bottom(minx - 1, SENTINEL_BOTTOM);
            pl.set_bottom(maxx + 1, SENTINEL_BOTTOM);
        }

        let Self { planes, mapper, ripple, span_start, .. } = self;
        let pl = planes.get(id);

        mapper.configure(pl.viewangle + pl.plangle, view.centerxfrac);
        mapper.set_plane(planeheight, pl.xoffs, pl.yoffs);
        ripple.active = ripple_active;

        let shade_rows = inputs
            .lights
            .shade_rows(pl.extra_colormap.map(|c| inputs.lights.extra(c)));
        let zmap = inputs.lights.zlight_row(light);
        let kind = match mode {
            Mode::Opaque => SpanKind::Opaque,
            Mode::Splat => SpanKind::Splat,
            Mode::Trans(t) => SpanKind::Translucent { transmap: inputs.trans.get(t) },
            Mode::TransSplat(t) => SpanKind::TranslucentSplat { transmap: inputs.trans.get(t) },
            Mode::Fog => SpanKind::Fog,
            Mode::Water(t) => SpanKind::Water { transmap: inputs.trans.get(t) },
        };
        let span_angle = pl.viewangle + pl.plangle;

        let mut emit = |y: i32, x1: i32, x2: i32| {
            let yslope = view.yslope[y as usize];
            let mut bgofs = 0;

            if let Some(tc) = &tilt {
                let mut vecs = tc.base;
                if ripple.active {
                    let bg = ripple.offset_at(planeheight, yslope);
                    ripple.rotate(span_angle, bg);
                    let sp = slope::slope_plane(
                        &tc.slope,
                        pl.viewx,
                        pl.viewy,
                        pl.viewz,
                        tc.xoffs + ripple.xfrac,
                        tc.yoffs + ripple.yfrac,
                        pl.viewangle,
                        pl.plangle,
                    );
                    vecs = slope::span_vectors(&sp, view.focallenf);
                    bgofs = RippleState::clamp_row_offset(bg, y, view.height);
                }
                drawer.draw_span(&SpanArgs {
                    y,
                    x1,
                    x2,
                    xfrac: Fixed::ZERO,
                    yfrac: Fixed::ZERO,
                    xstep: Fixed::ZERO,
                    ystep: Fixed::ZERO,
                    bgofs,
                    waterofs: ripple.waterofs,
                    source: flat,
                    light: SpanLight::Zoned {
                        zmap,
                        rows: shade_rows,
                        depth_scale: planeheight.to_f32() * view.focallenf * 65536.0,
                    },
                    kind,
                    tilt: Some(&vecs),
                    centerx: view.centerx,
                    centery: view.centery,
                });
                return;
            }

            let ms = mapper.map(y, x1, view.centerx, view.centery, yslope);
            let mut xfrac = ms.xfrac;
            let mut yfrac = ms.yfrac;
            if ripple.active {
                let bg = ripple.offset_at(planeheight, yslope);
                ripple.rotate(span_angle, bg);
                xfrac += ripple.xfrac;
                yfrac += ripple.yfrac;
                bgofs = RippleState::clamp_row_offset(bg, y, view.height);
            }

            let pindex = ((ms.distance.0 >> LIGHTZSHIFT) as usize).min(MAXLIGHTZ - 1);
            let row = &shade_rows[zmap[pindex] as usize];

            drawer.draw_span(&SpanArgs {
                y,
                x1,
                x2,
                xfrac,
                yfrac,
                xstep: ms.xstep,
                ystep: ms.ystep,
                bgofs,
                waterofs: ripple.waterofs,
                source: flat,
                light: SpanLight::Row(row),
                kind,
                tilt: None,
                centerx: view.centerx,
                centery: view.centery,
            });
        };

        let stop = pl.maxx + 1;
        for x in pl.minx..=stop {
            make_spans(
                span_start,
                view.height,
                x,
                pl.top(x - 1) as i32,
                pl.bottom(x - 1) as i32,
                pl.top(x) as i32,
                pl.bottom(x) as i32,
                &mut emit,
            );
        }

        self.ripple.active = false;
        Ok(())
    }

    /// Sky planes bypass spans entirely: each used column becomes one
    /// vertical strip of the sky texture picked by view angle, always at
    /// full brightness so sector light cannot darken the sky.
    fn draw_sky_plane(&mut self, inputs: &FrameInputs<'_>, drawer: &mut dyn SpanDrawer, id: PlaneId) {
        let view = inputs.view;
        let sky = inputs.flats.sky_texture();
        let colormap = &inputs.lights.shade_rows(None)[0];
        let pl = self.planes.get(id);

        for x in pl.minx..=pl.maxx {
            let yl = pl.top(x) as i32;
            let yh = pl.bottom(x) as i32;
            if yl > yh {
                continue;
            }
            let colangle = view.xtoviewangle[x as usize];
            let angle = (pl.viewangle + colangle).0 >> ANGLETOSKYSHIFT;
            drawer.draw_sky_column(&SkyColumnArgs {
                x,
                yl,
                yh,
                // off-center columns see the sky at an angle; the cosine
                // keeps the texel step aspect-correct across the screen
                iscale: view.skyscale.mul(finecosine(colangle.fine())),
                texturemid: sky.texturemid,
                centery: view.centery,
                source: sky.column(angle),
                texheight: sky.height,
                colormap,
            });
        }
    }
}

/// Find the vertical extent of a plane over its whole column range.
/// `low` is exclusive (one past the last row), `high` inclusive.
pub fn plane_bounds(pl: &mut Visplane) {
    let mut hi = pl.top(pl.minx) as i32;
    let mut low = pl.bottom(pl.minx) as i32 + 1;
    for x in (pl.minx + 1)..=pl.maxx {
        hi = hi.min(pl.top(x) as i32);
        low = low.max(pl.bottom(x) as i32 + 1);
    }
    pl.high = hi;
    pl.low = low;
}

/// Column-to-span boundary walk.  Compares the previous column's interval
/// `[t1, b1]` against the current `[t2, b2]`: rows leaving the interval are
/// emitted as finished spans, rows entering it record their start column.
/// Sentinel bounds make out-of-range columns empty intervals, so the edges
/// of the plane need no special casing.  Bounds past the last viewport row
/// are clamped; the clamp keeps empty intervals empty.
fn make_spans(
    span_start: &mut [i32],
    height: i32,
    x: i32,
    mut t1: i32,
    mut b1: i32,
    mut t2: i32,
    mut b2: i32,
    emit: &mut impl FnMut(i32, i32, i32),
) {
    t1 = t1.min(height - 1);
    b1 = b1.min(height - 1);
    t2 = t2.min(height - 1);
    b2 = b2.min(height - 1);

    while t1 < t2 && t1 <= b1 {
        emit(t1, span_start[t1 as usize], x - 1);
        t1 += 1;
    }
    while b1 > b2 && b1 >= t1 {
        emit(b1, span_start[b1 as usize], x - 1);
        b1 -= 1;
    }
    while t2 < t1 && t2 <= b2 {
        span_start[t2 as usize] = x;
        t2 += 1;
    }
    while b2 > b1 && b2 >= t2 {
        span_start[b2 as usize] = x;
        b2 -= 1;
    }
}

/*──────────────────────────────── Tests ───────────────────────────────*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Angle;
    use crate::world::assets::{Flat, SkyTexture};
    use crate::world::ffloor::{Ffloor, Polyobj};

    const W: i32 = 64;
    const H: i32 = 48;

    #[derive(Default)]
    struct Recorder {
        spans: Vec<(i32, i32, i32, &'static str)>,
        sky_cols: Vec<(i32, i32, i32)>,
        snapshots: Vec<(i32, i32)>,
    }

    impl SpanDrawer for Recorder {
        fn draw_span(&mut self, s: &SpanArgs<'_>) {
            let kind = match s.kind {
                SpanKind::Opaque => "opaque",
                SpanKind::Splat => "splat",
                SpanKind::Translucent { .. } => "trans",
                SpanKind::TranslucentSplat { .. } => "transsplat",
                SpanKind::Fog => "fog",
                SpanKind::Water { .. } => "water",
            };
            self.spans.push((s.y, s.x1, s.x2, kind));
        }

        fn draw_sky_column(&mut self, c: &SkyColumnArgs<'_>) {
            self.sky_cols.push((c.x, c.yl, c.yh));
        }

        fn snapshot_rows(&mut self, top: i32, bottom: i32) {
            self.snapshots.push((top, bottom));
        }
    }

    struct Fixture {
        view: ViewFrame,
        flats: FlatBank,
        lights: LightBank,
        trans: TransTables,
        ffloors: Vec<Ffloor>,
        polyobjs: Vec<Polyobj>,
        slopes: Vec<Slope>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut flats = FlatBank::default_with_checker();
            flats
                .insert(Flat::new("GRASS", 64, 64, vec![5; 64 * 64]).unwrap())
                .unwrap();
            let sky = flats
                .insert(Flat::new("F_SKY1", 64, 64, vec![0; 64 * 64]).unwrap())
                .unwrap();
            flats.mark_sky(sky, SkyTexture::default());
            Self {
                view: ViewFrame::new(W, H),
                flats,
                lights: LightBank::identity(),
                trans: TransTables::passthrough(),
                ffloors: Vec::new(),
                polyobjs: Vec::new(),
                slopes: Vec::new(),
            }
        }

        fn world(&self) -> WorldRefs<'_> {
            WorldRefs {
                ffloors: &self.ffloors,
                polyobjs: &self.polyobjs,
                slopes: &self.slopes,
            }
        }

        fn inputs(&self) -> FrameInputs<'_> {
            FrameInputs {
                view: &self.view,
                world: self.world(),
                flats: &self.flats,
                lights: &self.lights,
                trans: &self.trans,
            }
        }

        fn renderer(&self) -> PlaneRenderer {
            let mut r = PlaneRenderer::new(W as usize, H as usize, self.flats.sky_flat());
            r.clear_frame(&self.view, 0);
            r
        }

        fn args(&self, picnum: FlatId) -> PlaneArgs {
            PlaneArgs {
                height: Fixed::from_int(64),
                picnum,
                lightlevel: 255,
                xoffs: Fixed::ZERO,
                yoffs: Fixed::ZERO,
                plangle: Angle::ZERO,
                extra_colormap: None,
                ffloor: None,
                polyobj: None,
                slope: None,
            }
        }
    }

    fn fill_columns(r: &mut PlaneRenderer, id: PlaneId, x1: i32, x2: i32, top: impl Fn(i32) -> u16, bottom: impl Fn(i32) -> u16) {
        let pl = r.planes.get_mut(id);
        pl.minx = x1;
        pl.maxx = x2;
        for x in x1..=x2 {
            pl.set_top(x, top(x));
            pl.set_bottom(x, bottom(x));
        }
    }

    /// Every (x, y) pixel of the recorded spans, for coverage comparison.
    fn span_pixels(spans: &[(i32, i32, i32, &str)]) -> Vec<(i32, i32)> {
        let mut px = Vec::new();
        for &(y, x1, x2, _) in spans {
            for x in x1..=x2 {
                px.push((x, y));
            }
        }
        px.sort_unstable();
        px
    }

    #[test]
    fn rectangle_becomes_one_span_per_row() {
        let fx = Fixture::new();
        let mut r = fx.renderer();
        let grass = fx.flats.id("GRASS").unwrap();
        let id = r.find_plane(&fx.view, &fx.world(), &fx.args(grass));
        fill_columns(&mut r, id, 10, 19, |_| 30, |_| 34);

        let mut rec = Recorder::default();
        r.draw_single_plane(&fx.inputs(), &mut rec, id).unwrap();

        assert_eq!(rec.spans.len(), 5);
        for &(y, x1, x2, kind) in &rec.spans {
            assert_eq!((x1, x2), (10, 19), "row {y}");
            assert_eq!(kind, "opaque");
            assert_eq!(rec.spans.iter().filter(|s| s.0 == y).count(), 1, "row {y} split");
        }
    }

    #[test]
    fn full_screen_plane_covers_every_row() {
        let fx = Fixture::new();
        let mut r = fx.renderer();
        let grass = fx.flats.id("GRASS").unwrap();
        let id = r.find_plane(&fx.view, &fx.world(), &fx.args(grass));
        fill_columns(&mut r, id, 0, W - 1, |_| 0, |_| (H - 1) as u16);

        let mut rec = Recorder::default();
        r.draw_single_plane(&fx.inputs(), &mut rec, id).unwrap();

        assert_eq!(rec.spans.len(), H as usize);
        let mut rows: Vec<i32> = rec.spans.iter().map(|s| s.0).collect();
        rows.sort_unstable();
        assert_eq!(rows, (0..H).collect::<Vec<_>>());
        assert!(rec.spans.iter().all(|s| (s.1, s.2) == (0, W - 1)));
    }

    #[test]
    fn span_conversion_is_pixel_lossless() {
        let fx = Fixture::new();
        let mut r = fx.renderer();
        let grass = fx.flats.id("GRASS").unwrap();
        let id = r.find_plane(&fx.view, &fx.world(), &fx.args(grass));
        // a staircase with a gap column in the middle
        fill_columns(
            &mut r,
            id,
            5,
            30,
            |x| if x == 17 { 0xffff } else { (25 + (x % 7)) as u16 },
            |x| if x == 17 { 0 } else { (38 - (x % 5)) as u16 },
        );

        let mut expected = Vec::new();
        {
            let pl = r.planes.get(id);
            for x in 5..=30 {
                if !pl.column_used(x) {
                    continue;
                }
                for y in pl.top(x)..=pl.bottom(x) {
                    expected.push((x, y as i32));
                }
            }
        }
        expected.sort_unstable();

        let mut rec = Recorder::default();
        r.draw_single_plane(&fx.inputs(), &mut rec, id).unwrap();
        assert_eq!(span_pixels(&rec.spans), expected);
    }

    #[test]
    fn empty_plane_draws_nothing() {
        let fx = Fixture::new();
        let mut r = fx.renderer();
        let grass = fx.flats.id("GRASS").unwrap();
        let id = r.find_plane(&fx.view, &fx.world(), &fx.args(grass));
        let mut rec = Recorder::default();
        r.draw_single_plane(&fx.inputs(), &mut rec, id).unwrap();
        assert!(rec.spans.is_empty());
    }

    #[test]
    fn sky_plane_dispatches_columns() {
        let fx = Fixture::new();
        let mut r = fx.renderer();
        let id = r.find_plane(&fx.view, &fx.world(), &fx.args(fx.flats.sky_flat()));
        fill_columns(&mut r, id, 0, 9, |_| 0, |_| 20);

        let mut rec = Recorder::default();
        r.draw_single_plane(&fx.inputs(), &mut rec, id).unwrap();
        assert!(rec.spans.is_empty());
        assert_eq!(rec.sky_cols.len(), 10);
        assert_eq!(rec.sky_cols[0], (0, 0, 20));
    }

    #[test]
    fn draw_planes_skips_deferred_planes() {
        let mut fx = Fixture::new();
        fx.ffloors.push(Ffloor { flags: FfloorFlags::empty(), alpha: 255 });
        let mut r = fx.renderer();
        let grass = fx.flats.id("GRASS").unwrap();

        let plain = r.find_plane(&fx.view, &fx.world(), &fx.args(grass));
        fill_columns(&mut r, plain, 0, 5, |_| 10, |_| 12);

        let mut fa = fx.args(grass);
        fa.ffloor = Some(0);
        let stacked = r.find_plane(&fx.view, &fx.world(), &fa);
        fill_columns(&mut r, stacked, 0, 5, |_| 20, |_| 22);

        let mut rec = Recorder::default();
        r.draw_planes(&fx.inputs(), &mut rec).unwrap();
        assert!(rec.spans.iter().all(|s| s.0 >= 10 && s.0 <= 12));

        // the stacked plane still draws on demand
        let mut rec2 = Recorder::default();
        r.draw_single_plane(&fx.inputs(), &mut rec2, stacked).unwrap();
        assert!(!rec2.spans.is_empty());
    }

    #[test]
    fn translucent_water_snapshots_its_rows() {
        let mut fx = Fixture::new();
        fx.ffloors.push(Ffloor {
            flags: FfloorFlags::TRANSLUCENT | FfloorFlags::RIPPLE | FfloorFlags::SWIMMABLE,
            alpha: 128,
        });
        let mut r = fx.renderer();
        let grass = fx.flats.id("GRASS").unwrap();
        let mut fa = fx.args(grass);
        fa.ffloor = Some(0);
        let id = r.find_plane(&fx.view, &fx.world(), &fa);
        fill_columns(&mut r, id, 4, 20, |_| 30, |_| 40);

        let mut rec = Recorder::default();
        r.draw_single_plane(&fx.inputs(), &mut rec, id).unwrap();
        assert!(rec.spans.iter().all(|s| s.3 == "water"));
        // snapshot covers the plane's extent padded by the ripple amplitude
        assert_eq!(rec.snapshots, vec![(22, H.min(49))]);
    }

    #[test]
    fn fog_and_splat_modes_select() {
        let mut fx = Fixture::new();
        fx.ffloors.push(Ffloor { flags: FfloorFlags::FOG, alpha: 255 });
        fx.ffloors.push(Ffloor { flags: FfloorFlags::SPLAT, alpha: 255 });
        let mut r = fx.renderer();
        let grass = fx.flats.id("GRASS").unwrap();

        for (fid, expect) in [(0u16, "fog"), (1u16, "splat")] {
            let mut fa = fx.args(grass);
            fa.ffloor = Some(fid);
            let id = r.find_plane(&fx.view, &fx.world(), &fa);
            fill_columns(&mut r, id, 0, 3, |_| 10, |_| 11);
            let mut rec = Recorder::default();
            r.draw_single_plane(&fx.inputs(), &mut rec, id).unwrap();
            assert!(rec.spans.iter().all(|s| s.3 == expect), "{expect}");
        }
    }

    #[test]
    fn translucent_polyobject_splat_blends() {
        let mut fx = Fixture::new();
        fx.polyobjs.push(Polyobj {
            angle: Angle::ZERO,
            center_x: Fixed::ZERO,
            center_y: Fixed::ZERO,
            translucency: 4,
            flags: PolyFlags::SPLAT,
        });
        let mut r = fx.renderer();
        let grass = fx.flats.id("GRASS").unwrap();
        let mut a = fx.args(grass);
        a.polyobj = Some(0);
        let id = r.find_plane(&fx.view, &fx.world(), &a);
        fill_columns(&mut r, id, 0, 3, |_| 10, |_| 11);

        let mut rec = Recorder::default();
        r.draw_single_plane(&fx.inputs(), &mut rec, id).unwrap();
        // translucency takes priority; the splat flag picks the hole-aware
        // blend, not the opaque splat
        assert!(!rec.spans.is_empty());
        assert!(rec.spans.iter().all(|s| s.3 == "transsplat"));
    }

    #[test]
    fn translucency_wins_over_fog() {
        let mut fx = Fixture::new();
        fx.ffloors.push(Ffloor {
            flags: FfloorFlags::TRANSLUCENT | FfloorFlags::FOG,
            alpha: 128,
        });
        let mut r = fx.renderer();
        let grass = fx.flats.id("GRASS").unwrap();
        let mut fa = fx.args(grass);
        fa.ffloor = Some(0);
        let id = r.find_plane(&fx.view, &fx.world(), &fa);
        fill_columns(&mut r, id, 0, 3, |_| 10, |_| 11);

        let mut rec = Recorder::default();
        r.draw_single_plane(&fx.inputs(), &mut rec, id).unwrap();
        assert!(rec.spans.iter().all(|s| s.3 == "trans"));
    }

    #[test]
    fn opaque_alpha_fallback_keeps_texel_holes() {
        let mut fx = Fixture::new();
        fx.ffloors.push(Ffloor { flags: FfloorFlags::TRANSLUCENT, alpha: 255 });
        let mut r = fx.renderer();
        let grass = fx.flats.id("GRASS").unwrap();
        let mut fa = fx.args(grass);
        fa.ffloor = Some(0);
        let id = r.find_plane(&fx.view, &fx.world(), &fa);
        fill_columns(&mut r, id, 0, 3, |_| 10, |_| 11);

        let mut rec = Recorder::default();
        r.draw_single_plane(&fx.inputs(), &mut rec, id).unwrap();
        assert!(!rec.spans.is_empty());
        assert!(rec.spans.iter().all(|s| s.3 == "splat"));
    }

    #[test]
    fn invisible_alpha_skips_the_plane() {
        let mut fx = Fixture::new();
        fx.ffloors.push(Ffloor { flags: FfloorFlags::TRANSLUCENT, alpha: 5 });
        let mut r = fx.renderer();
        let grass = fx.flats.id("GRASS").unwrap();
        let mut fa = fx.args(grass);
        fa.ffloor = Some(0);
        let id = r.find_plane(&fx.view, &fx.world(), &fa);
        fill_columns(&mut r, id, 0, 3, |_| 10, |_| 11);

        let mut rec = Recorder::default();
        r.draw_single_plane(&fx.inputs(), &mut rec, id).unwrap();
        assert!(rec.spans.is_empty());
    }

    #[test]
    fn sloped_plane_spans_carry_tilt() {
        let mut fx = Fixture::new();
        fx.slopes.push(Slope {
            origin: (Fixed::ZERO, Fixed::ZERO, Fixed::from_int(32)),
            direction: (Fixed::UNIT, Fixed::ZERO),
            zdelta: Fixed::from_f64(0.25),
        });
        struct TiltCheck(u32);
        impl SpanDrawer for TiltCheck {
            fn draw_span(&mut self, s: &SpanArgs<'_>) {
                assert!(s.tilt.is_some());
                assert!(matches!(s.light, SpanLight::Zoned { .. }));
                self.0 += 1;
            }
            fn draw_sky_column(&mut self, _: &SkyColumnArgs<'_>) {}
            fn snapshot_rows(&mut self, _: i32, _: i32) {}
        }

        let mut r = fx.renderer();
        let grass = fx.flats.id("GRASS").unwrap();
        let mut a = fx.args(grass);
        a.slope = Some(0);
        let id = r.find_plane(&fx.view, &fx.world(), &a);
        fill_columns(&mut r, id, 0, 9, |_| 30, |_| 35);

        let mut chk = TiltCheck(0);
        r.draw_single_plane(&fx.inputs(), &mut chk, id).unwrap();
        assert_eq!(chk.0, 6);
    }

    #[test]
    fn stale_pad_cells_cannot_truncate_the_flush() {
        let fx = Fixture::new();
        let mut r = fx.renderer();
        let grass = fx.flats.id("GRASS").unwrap();
        let id = r.find_plane(&fx.view, &fx.world(), &fx.args(grass));
        fill_columns(&mut r, id, 10, 19, |_| 30, |_| 34);
        {
            // poison both pad cells with plausible-looking bounds
            let pl = r.planes.get_mut(id);
            pl.set_top(9, 2);
            pl.set_bottom(9, 40);
            pl.set_top(20, 2);
            pl.set_bottom(20, 40);
        }

        let mut rec = Recorder::default();
        r.draw_single_plane(&fx.inputs(), &mut rec, id).unwrap();
        assert_eq!(rec.spans.len(), 5);
        assert!(rec.spans.iter().all(|s| (s.1, s.2) == (10, 19)));
    }

    #[test]
    fn sky_columns_narrow_toward_screen_edges() {
        struct SkyScale(Vec<(i32, Fixed)>);
        impl SpanDrawer for SkyScale {
            fn draw_span(&mut self, _: &SpanArgs<'_>) {}
            fn draw_sky_column(&mut self, c: &SkyColumnArgs<'_>) {
                self.0.push((c.x, c.iscale));
            }
            fn snapshot_rows(&mut self, _: i32, _: i32) {}
        }

        let fx = Fixture::new();
        let mut r = fx.renderer();
        let id = r.find_plane(&fx.view, &fx.world(), &fx.args(fx.flats.sky_flat()));
        fill_columns(&mut r, id, 0, W - 1, |_| 0, |_| 20);

        let mut rec = SkyScale(Vec::new());
        r.draw_single_plane(&fx.inputs(), &mut rec, id).unwrap();
        let center = rec.0[W as usize / 2].1;
        let edge = rec.0[0].1;
        // a 90° FOV puts the edge column at 45°, stepping at cos 45° the rate
        assert!(edge < center);
        assert!((edge.to_f64() / center.to_f64() - 0.707).abs() < 0.02);
    }

    #[test]
    fn out_of_viewport_bounds_clamp_to_the_last_row() {
        let fx = Fixture::new();
        let mut r = fx.renderer();
        let grass = fx.flats.id("GRASS").unwrap();
        let id = r.find_plane(&fx.view, &fx.world(), &fx.args(grass));
        fill_columns(&mut r, id, 10, 14, |_| 40, |_| (H + 9) as u16);

        let mut rec = Recorder::default();
        r.draw_single_plane(&fx.inputs(), &mut rec, id).unwrap();
        assert_eq!(rec.spans.len(), (H - 40) as usize);
        assert!(rec.spans.iter().all(|s| s.0 < H && (s.1, s.2) == (10, 14)));
    }

    #[test]
    fn plane_bounds_cover_the_extent() {
        let fx = Fixture::new();
        let mut r = fx.renderer();
        let grass = fx.flats.id("GRASS").unwrap();
        let id = r.find_plane(&fx.view, &fx.world(), &fx.args(grass));
        fill_columns(&mut r, id, 5, 10, |x| (20 + x) as u16, |x| (40 - x) as u16);

        let pl = r.planes.get_mut(id);
        plane_bounds(pl);
        assert_eq!(pl.high, 25);
        assert_eq!(pl.low, 36); // bottom 35 at x=5, exclusive
    }
}
