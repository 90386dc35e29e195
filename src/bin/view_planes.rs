use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use minifb::{Key, Window, WindowOptions};

use planecast::{
    Angle, Fixed, FrameInputs, PlaneArgs, PlaneId, PlaneRenderer, SoftwareDrawer, WorldRefs,
    world::{
        Ffloor, FfloorFlags, Flat, FlatBank, FlatId, LightBank, NUMCOLORMAPS, SkyTexture,
        Slope, TransTables, ViewFrame,
    },
};

const EYE_HEIGHT: f64 = 41.0;

/// Walkable demo scene: sky, sand ground, a rippling water pool and a
/// sloped rock hill, all drawn through the plane pipeline.
#[derive(Parser)]
#[command(about = "Floor/ceiling span rasterizer demo")]
struct Args {
    #[arg(long, default_value_t = 640)]
    width: usize,
    #[arg(long, default_value_t = 400)]
    height: usize,
    #[arg(long, default_value_t = 35)]
    fps: usize,
}

/// Four 64-entry ramps: gray, green, blue, sand.  Offset within a ramp is
/// brightness, so colormap rows can darken by sliding the offset.
fn build_palette() -> [u32; 256] {
    let mut pal = [0u32; 256];
    for i in 0..256usize {
        let off = (i & 63) as u32;
        let (r, g, b) = match i >> 6 {
            0 => (200 - off * 3, 200 - off * 3, 200 - off * 3),
            1 => (20, 180 - off * 2, 30),
            2 => (15, 60, 210 - off * 3),
            _ => (210 - off * 2, 180 - off * 2, 120 - off),
        };
        pal[i] = (r << 16) | (g << 8) | b;
    }
    pal
}

fn build_lights() -> LightBank {
    let mut rows = Vec::with_capacity(NUMCOLORMAPS);
    for c in 0..NUMCOLORMAPS {
        let mut row = [0u8; 256];
        for (i, v) in row.iter_mut().enumerate() {
            let base = i & !63;
            let off = (i & 63) + c * 2;
            *v = (base + off.min(63)) as u8;
        }
        rows.push(row);
    }
    LightBank::new(rows)
}

/// In-ramp mixing: keep the ramp of whichever side dominates, average the
/// brightness.  Crude, but palette-true and cheap.
fn build_trans() -> TransTables {
    TransTables::build(|t, src, dst| {
        let t = t as u32;
        let off = ((src as u32 & 63) * (10 - t) + (dst as u32 & 63) * t) / 10;
        let base = if t >= 5 { dst as u32 & !63 } else { src as u32 & !63 };
        (base + off.min(63)) as u8
    })
}

fn build_flats(bank: &mut FlatBank) -> Result<(FlatId, FlatId, FlatId)> {
    let mut grass = vec![0u8; 64 * 64];
    let mut water = vec![0u8; 64 * 64];
    for y in 0..64usize {
        for x in 0..64usize {
            let n = (x.wrapping_mul(7) ^ y.wrapping_mul(13)) & 31;
            grass[y * 64 + x] = (64 + 8 + n) as u8;
            water[y * 64 + x] = (128 + ((x + y) & 15)) as u8;
        }
    }
    // deliberately 48x48 so the hill exercises the arbitrary-size path
    let mut rock = vec![0u8; 48 * 48];
    for y in 0..48usize {
        for x in 0..48usize {
            rock[y * 48 + x] = (16 + ((x / 6 + y / 6) & 7) * 4) as u8;
        }
    }

    let grass = bank.insert(Flat::new("GRASS", 64, 64, grass)?)?;
    let water = bank.insert(Flat::new("WATER", 64, 64, water)?)?;
    let rock = bank.insert(Flat::new("ROCK", 48, 48, rock)?)?;

    let sky_id = bank.insert(Flat::new("F_SKY1", 64, 64, vec![0; 64 * 64])?)?;
    let mut cols = vec![0u8; 256 * 128];
    for x in 0..256usize {
        for y in 0..128usize {
            let band = y * 40 / 128;
            let wisp = (((x as f64 / 17.0).sin() * 3.0) as i64).unsigned_abs() as usize;
            cols[x * 128 + y] = (band + wisp).min(63) as u8;
        }
    }
    bank.mark_sky(sky_id, SkyTexture::new(256, 128, cols, Fixed::from_int(100))?);

    Ok((grass, water, rock))
}

/// Give a plane a rectangular block of column bounds, the way wall
/// traversal would.
fn fill_band(r: &mut PlaneRenderer, id: PlaneId, x1: i32, x2: i32, top: i32, bottom: i32) -> PlaneId {
    let id = r.check_plane(id, x1, x2);
    let pl = r.planes.get_mut(id);
    for x in x1..=x2 {
        pl.set_top(x, top as u16);
        pl.set_bottom(x, bottom as u16);
    }
    id
}

fn main() -> Result<()> {
    let args = Args::parse();
    let (w, h) = (args.width as i32, args.height as i32);

    let palette = build_palette();
    let lights = build_lights();
    let trans = build_trans();
    let mut flats = FlatBank::default_with_checker();
    let (grass, water, rock) = build_flats(&mut flats)?;

    let ffloors = [Ffloor {
        flags: FfloorFlags::TRANSLUCENT | FfloorFlags::RIPPLE | FfloorFlags::SWIMMABLE,
        alpha: 150,
    }];
    let slopes = [Slope {
        // hill rising to the east
        origin: (Fixed::from_int(96), Fixed::ZERO, Fixed::ZERO),
        direction: (Fixed::UNIT, Fixed::ZERO),
        zdelta: Fixed::from_f64(0.375),
    }];

    let mut view = ViewFrame::new(w, h);
    let mut renderer = PlaneRenderer::new(w as usize, h as usize, flats.sky_flat());
    let mut drawer = SoftwareDrawer::new(w as usize, h as usize);
    let mut rgb = vec![0u32; (w * h) as usize];

    let mut win = Window::new("planecast", w as usize, h as usize, WindowOptions::default())?;
    win.set_target_fps(args.fps);

    let (mut px, mut py) = (0.0f64, 0.0f64);
    let mut yaw = 0.0f64;
    let mut leveltime = 0u32;

    let mut acc_time = Duration::ZERO;
    let mut acc_frames = 0usize;
    let mut last_print = Instant::now();

    while win.is_open() && !win.is_key_down(Key::Escape) {
        let t0 = Instant::now();

        if win.is_key_down(Key::Left) {
            yaw += 0.045;
        }
        if win.is_key_down(Key::Right) {
            yaw -= 0.045;
        }
        let mut forward = 0.0;
        if win.is_key_down(Key::Up) || win.is_key_down(Key::W) {
            forward += 4.0;
        }
        if win.is_key_down(Key::Down) || win.is_key_down(Key::S) {
            forward -= 4.0;
        }
        px += yaw.cos() * forward;
        py += yaw.sin() * forward;

        view.set_view(
            Fixed::from_f64(px),
            Fixed::from_f64(py),
            Fixed::from_f64(EYE_HEIGHT),
            Angle::from_radians(yaw),
        );
        renderer.clear_frame(&view, leveltime);

        let world = WorldRefs {
            ffloors: &ffloors,
            polyobjs: &[],
            slopes: &slopes,
        };
        let base = PlaneArgs {
            height: Fixed::ZERO,
            picnum: grass,
            lightlevel: 255,
            xoffs: Fixed::ZERO,
            yoffs: Fixed::ZERO,
            plangle: Angle::ZERO,
            extra_colormap: None,
            ffloor: None,
            polyobj: None,
            slope: None,
        };
        let cy = view.centery;

        // sky fills everything above the horizon
        let sky = renderer.find_plane(&view, &world, &PlaneArgs {
            height: Fixed::from_int(128),
            picnum: flats.sky_flat(),
            ..base
        });
        fill_band(&mut renderer, sky, 0, w - 1, 0, cy - 1);

        // grass ground on the left two thirds, the sloped hill on the right
        let split = w * 2 / 3;
        let ground = renderer.find_plane(&view, &world, &base);
        fill_band(&mut renderer, ground, 0, split - 1, cy + 1, h - 1);

        let hill = renderer.find_plane(&view, &world, &PlaneArgs {
            height: slopes[0].z_at(view.viewx, view.viewy),
            picnum: rock,
            slope: Some(0),
            ..base
        });
        fill_band(&mut renderer, hill, split, w - 1, (cy - 12).max(0), h - 1);

        // translucent rippling pool over the grass, drawn deferred
        let pool = renderer.find_plane(&view, &world, &PlaneArgs {
            height: Fixed::from_int(16),
            picnum: water,
            lightlevel: 200,
            ffloor: Some(0),
            ..base
        });
        let pool = fill_band(&mut renderer, pool, w / 6, split - 1, cy + 8, (cy + 52).min(h - 1));

        let inputs = FrameInputs {
            view: &view,
            world,
            flats: &flats,
            lights: &lights,
            trans: &trans,
        };
        drawer.clear(0);
        renderer.draw_planes(&inputs, &mut drawer)?;
        renderer.draw_single_plane(&inputs, &mut drawer, pool)?;

        for (dst, &src) in rgb.iter_mut().zip(drawer.frame()) {
            *dst = palette[src as usize];
        }
        acc_time += t0.elapsed();
        acc_frames += 1;
        win.update_with_buffer(&rgb, w as usize, h as usize)?;

        if last_print.elapsed() >= Duration::from_secs(3) {
            let avg_ms = acc_time.as_secs_f64() * 1000.0 / acc_frames as f64;
            println!("avg render: {:.2} ms  ({:.1} FPS)", avg_ms, 1000.0 / avg_ms);
            acc_time = Duration::ZERO;
            acc_frames = 0;
            last_print = Instant::now();
        }

        leveltime = leveltime.wrapping_add(1);
    }
    Ok(())
}
