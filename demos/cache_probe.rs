//! Walkthrough of the tile cache lifecycle: ingest a rendered page, query
//! tiles for a viewport, rotate, and give memory back under pressure.
//!
//! Run with `cargo run --example cache_probe`; trace output lands in
//! `cache_probe.log`.

use std::fs::File;

use anyhow::Result;
use log::info;
use simplelog::{Config, LevelFilter, WriteLogger};
use tilekeep::{NormalizedRect, Pixmap, Rotation, TilesConfig, TilesManager};

/// Fakes a renderer: a smooth gradient so tile seams would be visible if
/// the cache ever served the wrong cut of the page.
fn gradient_page(width: u32, height: u32) -> Result<Pixmap> {
    let mut data = Vec::with_capacity((width as usize) * (height as usize) * 4);
    for y in 0..height {
        for x in 0..width {
            let r = (255 * x / width.max(1)) as u8;
            let g = (255 * y / height.max(1)) as u8;
            data.extend_from_slice(&[r, g, 128, 255]);
        }
    }
    Ok(Pixmap::from_raw(width, height, data)?)
}

fn main() -> Result<()> {
    WriteLogger::init(
        LevelFilter::Trace,
        Config::default(),
        File::create("cache_probe.log")?,
    )?;

    let (width, height) = (2400u32, 3000u32);
    let mut cache = TilesManager::with_config(
        width,
        height,
        Rotation::Deg0,
        TilesConfig {
            max_tile_pixels: 250_000,
        },
    );

    info!("ingesting a full {width}x{height} render");
    let page = gradient_page(width, height)?;
    cache.ingest(&page, NormalizedRect::full())?;
    println!(
        "after full ingest: {} tiles, {} bytes, covered: {}",
        cache.cached_tiles(),
        cache.total_bytes(),
        cache.is_covered(NormalizedRect::full())
    );

    let viewport = NormalizedRect::new(0.0, 0.0, 0.5, 0.33);
    let tiles = cache.query(viewport, false);
    println!(
        "viewport {viewport:?} painted from {} tiles, all ready: {}",
        tiles.len(),
        tiles.iter().all(|t| t.is_ready())
    );

    cache.set_rotation(Rotation::Deg90);
    println!(
        "after rotating 90 degrees, covered: {}",
        cache.is_covered(viewport)
    );

    info!("re-rendering for the rotated page");
    cache.ingest(&gradient_page(width, height)?, NormalizedRect::full())?;
    println!(
        "after re-ingest: covered again: {}",
        cache.is_covered(viewport)
    );

    let budget = cache.total_bytes() / 2;
    info!("memory pressure: asking for {budget} bytes back");
    cache.reclaim(budget);
    println!(
        "after reclaim: {} tiles, {} bytes, covered: {}",
        cache.cached_tiles(),
        cache.total_bytes(),
        cache.is_covered(NormalizedRect::full())
    );

    Ok(())
}
