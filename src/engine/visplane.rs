//! Visplane records, the recycling pool and the hash-bucketed registry.
//!
//! A visplane is one attribute-homogeneous fragment of floor or ceiling that
//! is visible somewhere this frame, with per-column top/bottom row bounds.
//! Records are heavyweight (two full-width row arrays), so the pool never
//! frees them: `clear_frame` pushes every active record onto a free stack and
//! the next frame overwrites them in place.

use crate::fixed::{Angle, Fixed, finecosine, finesine};
use crate::world::assets::{ColormapId, FlatId};
use crate::world::ffloor::{FfloorId, PolyobjId, SlopeId, WorldRefs};
use crate::world::view::ViewFrame;

/// Pool index of a visplane.  Stable within a frame; `clear_frame`
/// invalidates all ids.
pub type PlaneId = u16;

/// Bucket count of the registry.  Extra-floor planes (and their
/// `check_plane` siblings) all live in the last bucket and are never
/// deduplicated; skies shed their extra-floor reference and coalesce.
pub const NUM_BUCKETS: usize = 512;
const BUCKET_MASK: usize = NUM_BUCKETS - 1;

/// Column sentinels: a column outside the plane's range reads as an empty
/// interval, which is what makes the span-boundary walk branch-free.
pub const SENTINEL_TOP: u16 = 0xffff;
pub const SENTINEL_BOTTOM: u16 = 0x0000;

/// Attribute tuple for [`PlaneSet::find_or_create`].
#[derive(Clone, Copy, Debug)]
pub struct PlaneArgs {
    pub height: Fixed,
    pub picnum: FlatId,
    pub lightlevel: i32,
    pub xoffs: Fixed,
    pub yoffs: Fixed,
    pub plangle: Angle,
    pub extra_colormap: Option<ColormapId>,
    pub ffloor: Option<FfloorId>,
    pub polyobj: Option<PolyobjId>,
    pub slope: Option<SlopeId>,
}

pub struct Visplane {
    pub height: Fixed,
    pub picnum: FlatId,
    pub lightlevel: i32,
    pub xoffs: Fixed,
    pub yoffs: Fixed,
    pub plangle: Angle,
    pub extra_colormap: Option<ColormapId>,
    pub ffloor: Option<FfloorId>,
    pub polyobj: Option<PolyobjId>,
    pub slope: Option<SlopeId>,

    /// View snapshot active when the plane was created.
    pub viewx: Fixed,
    pub viewy: Fixed,
    pub viewz: Fixed,
    pub viewangle: Angle,

    /// Inclusive visible column range; empty while `minx > maxx`.
    pub minx: i32,
    pub maxx: i32,

    /// Vertical extent over the whole range, filled by `plane_bounds`.
    pub high: i32,
    pub low: i32,

    // one pad cell on each side so the emitter can write sentinels at
    // minx-1 / maxx+1 without branching
    top: Vec<u16>,
    bottom: Vec<u16>,

    next: Option<PlaneId>,
}

impl Visplane {
    fn with_width(max_width: usize) -> Self {
        Visplane {
            height: Fixed::ZERO,
            picnum: 0,
            lightlevel: 0,
            xoffs: Fixed::ZERO,
            yoffs: Fixed::ZERO,
            plangle: Angle::ZERO,
            extra_colormap: None,
            ffloor: None,
            polyobj: None,
            slope: None,
            viewx: Fixed::ZERO,
            viewy: Fixed::ZERO,
            viewz: Fixed::ZERO,
            viewangle: Angle::ZERO,
            minx: 0,
            maxx: -1,
            high: 0,
            low: 0,
            top: vec![SENTINEL_TOP; max_width + 2],
            bottom: vec![SENTINEL_BOTTOM; max_width + 2],
            next: None,
        }
    }

    /// Topmost visible row of column `x`; `x` may be `minx-1` or `maxx+1`.
    #[inline]
    pub fn top(&self, x: i32) -> u16 {
        self.top[(x + 1) as usize]
    }

    #[inline]
    pub fn bottom(&self, x: i32) -> u16 {
        self.bottom[(x + 1) as usize]
    }

    #[inline]
    pub fn set_top(&mut self, x: i32, v: u16) {
        self.top[(x + 1) as usize] = v;
    }

    #[inline]
    pub fn set_bottom(&mut self, x: i32, v: u16) {
        self.bottom[(x + 1) as usize] = v;
    }

    /// True if column `x` carries real (non-sentinel) bounds.
    #[inline]
    pub fn column_used(&self, x: i32) -> bool {
        self.top(x) != SENTINEL_TOP || self.bottom(x) != SENTINEL_BOTTOM
    }

    fn clear_columns(&mut self) {
        self.top.fill(SENTINEL_TOP);
        self.bottom.fill(SENTINEL_BOTTOM);
    }
}

/// Registry plus recycling pool: hash buckets of intrusively chained pool
/// indices, and a free stack of records waiting for reuse.
pub struct PlaneSet {
    planes: Vec<Visplane>,
    free: Vec<PlaneId>,
    buckets: Vec<Option<PlaneId>>,
    max_width: usize,
    sky_flat: FlatId,
}

#[inline]
fn bucket_hash(picnum: FlatId, lightlevel: i32, height: Fixed) -> usize {
    let h = (picnum as i32)
        .wrapping_mul(3)
        .wrapping_add(lightlevel)
        .wrapping_add(height.0.wrapping_mul(7));
    h as usize & BUCKET_MASK
}

impl PlaneSet {
    pub fn new(max_width: usize, sky_flat: FlatId) -> Self {
        Self {
            planes: Vec::new(),
            free: Vec::new(),
            buckets: vec![None; NUM_BUCKETS],
            max_width,
            sky_flat,
        }
    }

    #[inline]
    pub fn get(&self, id: PlaneId) -> &Visplane {
        &self.planes[id as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, id: PlaneId) -> &mut Visplane {
        &mut self.planes[id as usize]
    }

    pub fn sky_flat(&self) -> FlatId {
        self.sky_flat
    }

    /// Number of records the pool has ever allocated (capacity, not activity).
    pub fn pool_len(&self) -> usize {
        self.planes.len()
    }

    /// Move every active record onto the free stack without erasing its
    /// contents; reset the buckets.  Idempotent with respect to capacity.
    pub fn clear_frame(&mut self) {
        for b in 0..NUM_BUCKETS {
            let mut cur = self.buckets[b].take();
            while let Some(id) = cur {
                cur = self.planes[id as usize].next.take();
                self.free.push(id);
            }
        }
    }

    /// Pop from the free list, growing the backing store if it is empty, and
    /// link the record at the head of `bucket`.
    fn alloc(&mut self, bucket: usize) -> PlaneId {
        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                // the pool hands out u16 indices
                assert!(self.planes.len() < PlaneId::MAX as usize, "visplane pool exhausted");
                let id = self.planes.len() as PlaneId;
                self.planes.push(Visplane::with_width(self.max_width));
                id
            }
        };
        self.planes[id as usize].next = self.buckets[bucket];
        self.buckets[bucket] = Some(id);
        id
    }

    /// Seek a visplane with identical attributes, or allocate one.
    ///
    /// The stored offsets are the caller offsets shifted into view space and,
    /// for a rotated plane, rotated with it; polyobject planes fold the
    /// polyobject transform in as well.  Slopes keep their raw offsets — the
    /// sloped solver applies the view transform itself.
    pub fn find_or_create(
        &mut self,
        view: &ViewFrame,
        world: &WorldRefs<'_>,
        args: &PlaneArgs,
    ) -> PlaneId {
        let mut xoff = args.xoffs;
        let mut yoff = args.yoffs;
        let mut height = args.height;
        let mut lightlevel = args.lightlevel;

        if args.slope.is_none() {
            xoff += view.viewx;
            yoff -= view.viewy;
            if args.plangle != Angle::ZERO {
                // add the view offset, rotated by the plane angle
                let ang = args.plangle.to_radians();
                let x = xoff.to_f32();
                let y = yoff.to_f32();
                xoff = Fixed::from_f32(x * ang.cos() + y * ang.sin());
                yoff = Fixed::from_f32(-x * ang.sin() + y * ang.cos());
            }
        }

        if let Some(poid) = args.polyobj {
            let po = &world.polyobjs[poid as usize];
            if po.angle != Angle::ZERO {
                let fs = po.angle.fine();
                xoff -= finecosine(fs).mul(po.center_x) + finesine(fs).mul(po.center_y);
                yoff -= finesine(fs).mul(po.center_x) - finecosine(fs).mul(po.center_y);
            } else {
                xoff -= po.center_x;
                yoff += po.center_y;
            }
        }

        // Skies above different extra floors render identically, so force
        // them into matching attributes, drop the extra-floor reference and
        // let them share one ordinary record.  Ordinary sky planes keep
        // their height; that asymmetry is load-bearing for existing content.
        let sky = args.picnum == self.sky_flat;
        let ffloor = if sky { None } else { args.ffloor };
        if sky && args.ffloor.is_some() {
            height = Fixed::ZERO;
            lightlevel = 0;
        }

        let bucket = if ffloor.is_none() {
            let bucket = bucket_hash(args.picnum, lightlevel, height);
            let mut cur = self.buckets[bucket];
            while let Some(id) = cur {
                let check = &self.planes[id as usize];
                cur = check.next;
                // the last bucket mixes hashed planes with extra-floor
                // records; the latter never satisfy an ordinary lookup
                if check.polyobj != args.polyobj || check.ffloor != ffloor {
                    continue;
                }
                if check.height == height
                    && check.picnum == args.picnum
                    && check.lightlevel == lightlevel
                    && check.xoffs == xoff
                    && check.yoffs == yoff
                    && check.extra_colormap == args.extra_colormap
                    && check.viewx == view.viewx
                    && check.viewy == view.viewy
                    && check.viewz == view.viewz
                    && check.viewangle == view.viewangle
                    && check.plangle == args.plangle
                    && check.slope == args.slope
                {
                    return id;
                }
            }
            bucket
        } else {
            NUM_BUCKETS - 1
        };

        let id = self.alloc(bucket);
        let width = self.max_width as i32;
        let pl = &mut self.planes[id as usize];
        pl.height = height;
        pl.picnum = args.picnum;
        pl.lightlevel = lightlevel;
        pl.minx = width;
        pl.maxx = -1;
        pl.xoffs = xoff;
        pl.yoffs = yoff;
        pl.plangle = args.plangle;
        pl.extra_colormap = args.extra_colormap;
        pl.ffloor = ffloor;
        pl.polyobj = args.polyobj;
        pl.slope = args.slope;
        pl.viewx = view.viewx;
        pl.viewy = view.viewy;
        pl.viewz = view.viewz;
        pl.viewangle = view.viewangle;
        pl.clear_columns();
        id
    }

    /// Return the same plane if `[start, stop]` can be unioned into its range
    /// without touching a column that already has data, else allocate a
    /// sibling carrying the same attributes with cleared columns.
    pub fn check_plane(&mut self, id: PlaneId, start: i32, stop: i32) -> PlaneId {
        let pl = &self.planes[id as usize];

        let (intrl, unionl) = if start < pl.minx { (pl.minx, start) } else { (start, pl.minx) };
        let (intrh, unionh) = if stop > pl.maxx { (pl.maxx, stop) } else { (stop, pl.maxx) };

        let mut x = intrl;
        while x <= intrh {
            if pl.column_used(x) {
                break;
            }
            x += 1;
        }

        if x > intrh {
            // no visual conflict, extend in place
            let pl = &mut self.planes[id as usize];
            pl.minx = unionl;
            pl.maxx = unionh;
            return id;
        }

        // conflict: open a sibling plane for the new range; extra-floor
        // siblings stay in the dedicated bucket so ordinary lookups never
        // walk over them
        let bucket = if pl.ffloor.is_some() {
            NUM_BUCKETS - 1
        } else {
            bucket_hash(pl.picnum, pl.lightlevel, pl.height)
        };
        let new_id = self.alloc(bucket);
        let (old, new_pl) = if id < new_id {
            let (lo, hi) = self.planes.split_at_mut(new_id as usize);
            (&lo[id as usize], &mut hi[0])
        } else {
            let (lo, hi) = self.planes.split_at_mut(id as usize);
            (&hi[0], &mut lo[new_id as usize])
        };
        new_pl.height = old.height;
        new_pl.picnum = old.picnum;
        new_pl.lightlevel = old.lightlevel;
        new_pl.xoffs = old.xoffs;
        new_pl.yoffs = old.yoffs;
        new_pl.plangle = old.plangle;
        new_pl.extra_colormap = old.extra_colormap;
        new_pl.ffloor = old.ffloor;
        new_pl.polyobj = old.polyobj;
        new_pl.slope = old.slope;
        new_pl.viewx = old.viewx;
        new_pl.viewy = old.viewy;
        new_pl.viewz = old.viewz;
        new_pl.viewangle = old.viewangle;
        new_pl.minx = start;
        new_pl.maxx = stop;
        new_pl.clear_columns();
        new_id
    }

    /// Extra-floor fast path: widen the range without the conflict scan.
    /// Extra-floor planes are registered per subsector, and subsectors cannot
    /// overlap on screen.  Polyobject planes manage their own range.
    pub fn expand_plane(&mut self, id: PlaneId, start: i32, stop: i32) {
        let pl = &mut self.planes[id as usize];
        if pl.polyobj.is_some() {
            return;
        }
        pl.minx = pl.minx.min(start);
        pl.maxx = pl.maxx.max(stop);
    }

    /// Ids of every plane currently linked into a bucket, bucket by bucket.
    pub fn active_ids(&self) -> Vec<PlaneId> {
        let mut out = Vec::new();
        for b in 0..NUM_BUCKETS {
            let mut cur = self.buckets[b];
            while let Some(id) = cur {
                out.push(id);
                cur = self.planes[id as usize].next;
            }
        }
        out
    }
}

/*──────────────────────────────── Tests ───────────────────────────────*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::ANG90;

    const W: usize = 64;

    fn view() -> ViewFrame {
        ViewFrame::new(W as i32, 48)
    }

    fn args(height: i32, picnum: FlatId, light: i32) -> PlaneArgs {
        PlaneArgs {
            height: Fixed::from_int(height),
            picnum,
            lightlevel: light,
            xoffs: Fixed::ZERO,
            yoffs: Fixed::ZERO,
            plangle: Angle::ZERO,
            extra_colormap: None,
            ffloor: None,
            polyobj: None,
            slope: None,
        }
    }

    fn set(sky: FlatId) -> PlaneSet {
        PlaneSet::new(W, sky)
    }

    #[test]
    fn identical_attributes_reuse_the_record() {
        let mut ps = set(FlatId::MAX);
        let v = view();
        let w = WorldRefs::default();
        let a = ps.find_or_create(&v, &w, &args(64, 3, 255));
        let b = ps.find_or_create(&v, &w, &args(64, 3, 255));
        assert_eq!(a, b);
        assert_eq!(ps.pool_len(), 1);
    }

    #[test]
    fn any_differing_attribute_splits() {
        let mut ps = set(FlatId::MAX);
        let v = view();
        let w = WorldRefs::default();
        let base = ps.find_or_create(&v, &w, &args(64, 3, 255));
        assert_ne!(base, ps.find_or_create(&v, &w, &args(65, 3, 255)));
        assert_ne!(base, ps.find_or_create(&v, &w, &args(64, 4, 255)));
        assert_ne!(base, ps.find_or_create(&v, &w, &args(64, 3, 128)));
        let mut rotated = args(64, 3, 255);
        rotated.plangle = ANG90;
        assert_ne!(base, ps.find_or_create(&v, &w, &rotated));
    }

    #[test]
    fn one_fixed_unit_of_height_matters() {
        let mut ps = set(FlatId::MAX);
        let v = view();
        let w = WorldRefs::default();
        let a = ps.find_or_create(&v, &w, &args(64, 3, 255));
        let mut nudged = args(64, 3, 255);
        nudged.height = Fixed(nudged.height.0 + 1);
        let b = ps.find_or_create(&v, &w, &nudged);
        assert_ne!(a, b);
        // both stay independently extendable
        assert_eq!(ps.check_plane(a, 0, 10), a);
        assert_eq!(ps.check_plane(b, 0, 10), b);
    }

    #[test]
    fn forced_hash_collision_still_compares_exactly() {
        // picnum*3 + light + height*7: (1,0) and (0,3) with height 0 both
        // land in bucket 3
        assert_eq!(bucket_hash(1, 0, Fixed::ZERO), bucket_hash(0, 3, Fixed::ZERO));
        let mut ps = set(FlatId::MAX);
        let v = view();
        let w = WorldRefs::default();
        let a = ps.find_or_create(&v, &w, &args(0, 1, 0));
        let b = ps.find_or_create(&v, &w, &args(0, 0, 3));
        assert_ne!(a, b);
        // and each still finds itself afterwards
        assert_eq!(ps.find_or_create(&v, &w, &args(0, 1, 0)), a);
        assert_eq!(ps.find_or_create(&v, &w, &args(0, 0, 3)), b);
    }

    #[test]
    fn view_snapshot_is_part_of_identity() {
        let mut ps = set(FlatId::MAX);
        let mut v = view();
        let w = WorldRefs::default();
        let a = ps.find_or_create(&v, &w, &args(64, 3, 255));
        v.set_view(Fixed::from_int(32), Fixed::ZERO, Fixed::ZERO, Angle::ZERO);
        let b = ps.find_or_create(&v, &w, &args(64, 3, 255));
        assert_ne!(a, b);
    }

    #[test]
    fn extend_when_ranges_disjoint() {
        let mut ps = set(FlatId::MAX);
        let v = view();
        let w = WorldRefs::default();
        let id = ps.find_or_create(&v, &w, &args(64, 3, 255));
        {
            let pl = ps.get_mut(id);
            pl.minx = 10;
            pl.maxx = 20;
            for x in 10..=20 {
                pl.set_top(x, 5);
                pl.set_bottom(x, 9);
            }
        }
        // disjoint request unions into the same record
        let same = ps.check_plane(id, 30, 40);
        assert_eq!(same, id);
        assert_eq!(ps.get(id).minx, 10);
        assert_eq!(ps.get(id).maxx, 40);
    }

    #[test]
    fn split_when_overlap_has_data() {
        let mut ps = set(FlatId::MAX);
        let v = view();
        let w = WorldRefs::default();
        let id = ps.find_or_create(&v, &w, &args(64, 3, 255));
        {
            let pl = ps.get_mut(id);
            pl.minx = 10;
            pl.maxx = 20;
            for x in 10..=20 {
                pl.set_top(x, 5);
                pl.set_bottom(x, 9);
            }
        }
        let sibling = ps.check_plane(id, 15, 25);
        assert_ne!(sibling, id);
        let (old, new) = (ps.get(id), ps.get(sibling));
        // attributes copied, column data not
        assert_eq!(new.height, old.height);
        assert_eq!(new.picnum, old.picnum);
        assert_eq!((new.minx, new.maxx), (15, 25));
        assert!(!new.column_used(17));
        // old data intact
        assert_eq!(old.top(15), 5);
    }

    #[test]
    fn extra_floor_planes_never_merge() {
        let mut ps = set(FlatId::MAX);
        let v = view();
        let w = WorldRefs::default();
        let mut a = args(64, 3, 255);
        a.ffloor = Some(0);
        let first = ps.find_or_create(&v, &w, &a);
        let second = ps.find_or_create(&v, &w, &a);
        assert_ne!(first, second);
    }

    #[test]
    fn extra_floor_siblings_stay_out_of_ordinary_lookups() {
        let mut ps = set(FlatId::MAX);
        let v = view();
        let w = WorldRefs::default();
        let mut a = args(64, 3, 255);
        a.ffloor = Some(0);
        let id = ps.find_or_create(&v, &w, &a);
        {
            let pl = ps.get_mut(id);
            pl.minx = 10;
            pl.maxx = 20;
            for x in 10..=20 {
                pl.set_top(x, 5);
                pl.set_bottom(x, 9);
            }
        }
        let sibling = ps.check_plane(id, 15, 25);
        assert_ne!(sibling, id);
        assert_eq!(ps.get(sibling).ffloor, Some(0));

        // an ordinary request with identical attributes must not be handed
        // either stacked record
        let plain = ps.find_or_create(&v, &w, &args(64, 3, 255));
        assert_ne!(plain, id);
        assert_ne!(plain, sibling);
        assert!(ps.get(plain).ffloor.is_none());
    }

    #[test]
    fn sky_over_extra_floors_coalesces_attributes() {
        const SKY: FlatId = 9;
        let mut ps = set(SKY);
        let v = view();
        let w = WorldRefs::default();
        let mut a = args(100, SKY, 200);
        a.ffloor = Some(0);
        let mut b = args(-55, SKY, 90);
        b.ffloor = Some(1);
        let pa = ps.find_or_create(&v, &w, &a);
        let pb = ps.find_or_create(&v, &w, &b);
        // the forced height and light level make skies over different
        // stacked floors indistinguishable, so they share one record
        assert_eq!(pa, pb);
        assert_eq!(ps.get(pa).height, Fixed::ZERO);
        assert_eq!(ps.get(pa).lightlevel, 0);
        // the shared record is an ordinary sky plane
        assert!(ps.get(pa).ffloor.is_none());
        assert_eq!(ps.pool_len(), 1);
    }

    #[test]
    fn ordinary_sky_keeps_its_height() {
        const SKY: FlatId = 9;
        let mut ps = set(SKY);
        let v = view();
        let w = WorldRefs::default();
        let id = ps.find_or_create(&v, &w, &args(100, SKY, 200));
        assert_eq!(ps.get(id).height, Fixed::from_int(100));
        assert_eq!(ps.get(id).lightlevel, 200);
    }

    #[test]
    fn clear_frame_recycles_without_growth() {
        let mut ps = set(FlatId::MAX);
        let v = view();
        let w = WorldRefs::default();
        for i in 0..10 {
            ps.find_or_create(&v, &w, &args(i, 3, 255));
        }
        assert_eq!(ps.pool_len(), 10);
        for _ in 0..5 {
            ps.clear_frame();
        }
        for i in 0..10 {
            ps.find_or_create(&v, &w, &args(i, 3, 255));
        }
        // N clears followed by M allocations never grow past M records
        assert_eq!(ps.pool_len(), 10);
        assert_eq!(ps.active_ids().len(), 10);
    }

    #[test]
    fn offsets_follow_the_view_origin() {
        let mut ps = set(FlatId::MAX);
        let mut v = view();
        v.set_view(Fixed::from_int(128), Fixed::from_int(-64), Fixed::ZERO, Angle::ZERO);
        let w = WorldRefs::default();
        let id = ps.find_or_create(&v, &w, &args(64, 3, 255));
        assert_eq!(ps.get(id).xoffs, Fixed::from_int(128));
        assert_eq!(ps.get(id).yoffs, Fixed::from_int(64));
    }
}
