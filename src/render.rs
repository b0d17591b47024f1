//! PNG rendering for collapsed grids.
//!
//! Each tile gets one flat colour: its display handle when that is a
//! `#rrggbb` string, otherwise a PICO-8 palette entry by catalog index.
//! Uncollapsed cells are left as background.

use collapse_core::{GridSnapshot, TileCatalog};
use image::{ImageBuffer, Rgba, RgbaImage};
use std::path::Path;

/// Background for uncollapsed cells (dark gray).
const BACKGROUND: [u8; 4] = [34, 34, 34, 255];

/// PICO-8 palette, for tiles without a colour handle.
const PICO8: [[u8; 4]; 16] = [
    [0x00, 0x00, 0x00, 0xFF], // black
    [0x1D, 0x2B, 0x53, 0xFF], // dark blue
    [0x7E, 0x25, 0x53, 0xFF], // dark purple
    [0x00, 0x87, 0x51, 0xFF], // dark green
    [0xAB, 0x52, 0x36, 0xFF], // brown
    [0x5F, 0x57, 0x4F, 0xFF], // dark gray
    [0xC2, 0xC3, 0xC7, 0xFF], // light gray
    [0xFF, 0xF1, 0xE8, 0xFF], // white
    [0xFF, 0x00, 0x4D, 0xFF], // red
    [0xFF, 0xA3, 0x00, 0xFF], // orange
    [0xFF, 0xEC, 0x27, 0xFF], // yellow
    [0x00, 0xE4, 0x36, 0xFF], // green
    [0x29, 0xAD, 0xFF, 0xFF], // blue
    [0x83, 0x76, 0x9C, 0xFF], // indigo
    [0xFF, 0x77, 0xA8, 0xFF], // pink
    [0xFF, 0xCC, 0xAA, 0xFF], // peach
];

/// Parse `#rrggbb` (leading `#` optional).
pub fn parse_hex_color(handle: &str) -> Option<[u8; 4]> {
    let hex = handle.strip_prefix('#').unwrap_or(handle);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?, 0xFF])
}

/// Colour for every tile, indexed by `TileId`.
pub fn tile_colors(catalog: &TileCatalog) -> Vec<[u8; 4]> {
    catalog
        .iter()
        .map(|(id, tile)| {
            tile.handle()
                .and_then(parse_hex_color)
                .unwrap_or(PICO8[id.index() % PICO8.len()])
        })
        .collect()
}

/// Image side length for `cells` cells of `pixel_size` pixels.
fn image_extent(cells: usize, pixel_size: u32) -> Option<u32> {
    u32::try_from(cells).ok()?.checked_mul(pixel_size)
}

/// Render a snapshot with one `pixel_size` square per cell.
///
/// Returns `None` when the image would not fit in `u32` dimensions.
pub fn render_2d(
    snapshot: &GridSnapshot,
    catalog: &TileCatalog,
    pixel_size: u32,
) -> Option<RgbaImage> {
    let pixel_size = pixel_size.max(1);
    let width = image_extent(snapshot.width, pixel_size)?;
    let height = image_extent(snapshot.height, pixel_size)?;
    let colors = tile_colors(catalog);

    let mut img: RgbaImage = ImageBuffer::from_pixel(width, height, Rgba(BACKGROUND));

    for (i, cell) in snapshot.cells.iter().enumerate() {
        let (x, y) = (i % snapshot.width.max(1), i / snapshot.width.max(1));
        if y >= snapshot.height {
            break;
        }
        let Some(color) = cell
            .tile
            .as_deref()
            .and_then(|name| catalog.id_of(name))
            .and_then(|id| colors.get(id.index()))
        else {
            continue;
        };

        // In range: x < width and y < height, both of which fit above.
        let x0 = x as u32 * pixel_size;
        let y0 = y as u32 * pixel_size;
        for dy in 0..pixel_size {
            for dx in 0..pixel_size {
                img.put_pixel(x0 + dx, y0 + dy, Rgba(*color));
            }
        }
    }

    Some(img)
}

pub fn save_png(img: &RgbaImage, path: &Path) -> Result<(), image::ImageError> {
    img.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use collapse_core::CellSnapshot;

    fn catalog() -> TileCatalog {
        TileCatalog::builder()
            .tile_with_handle("grass", 1, "#00e436")
            .tile("rock", 1)
            .tile_with_handle("odd", 1, "not-a-colour")
            .build()
            .unwrap()
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#29adff"), Some([0x29, 0xAD, 0xFF, 0xFF]));
        assert_eq!(parse_hex_color("FF004D"), Some([0xFF, 0x00, 0x4D, 0xFF]));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
        assert_eq!(parse_hex_color("prefabs/wall"), None);
    }

    #[test]
    fn test_tile_colors_fall_back_to_palette() {
        let colors = tile_colors(&catalog());
        assert_eq!(colors[0], [0x00, 0xE4, 0x36, 0xFF]);
        assert_eq!(colors[1], PICO8[1]);
        assert_eq!(colors[2], PICO8[2]);
    }

    #[test]
    fn test_render_2d() {
        let snapshot = GridSnapshot {
            width: 2,
            height: 1,
            cells: vec![
                CellSnapshot {
                    tile: Some("grass".to_string()),
                    remaining: 1,
                },
                CellSnapshot {
                    tile: None,
                    remaining: 2,
                },
            ],
        };
        let img = render_2d(&snapshot, &catalog(), 4).unwrap();
        assert_eq!(img.dimensions(), (8, 4));
        assert_eq!(img.get_pixel(1, 1).0, [0x00, 0xE4, 0x36, 0xFF]);
        assert_eq!(img.get_pixel(6, 2).0, BACKGROUND);
    }

    #[test]
    fn test_render_2d_rejects_oversized_image() {
        let wide = GridSnapshot {
            width: u32::MAX as usize,
            height: 1,
            cells: Vec::new(),
        };
        assert!(render_2d(&wide, &catalog(), 2).is_none());

        let huge = GridSnapshot {
            width: usize::MAX,
            height: 1,
            cells: Vec::new(),
        };
        assert!(render_2d(&huge, &catalog(), 1).is_none());
    }

    #[test]
    fn test_render_2d_ignores_cells_past_the_grid() {
        let grass = || CellSnapshot {
            tile: Some("grass".to_string()),
            remaining: 1,
        };
        let snapshot = GridSnapshot {
            width: 1,
            height: 1,
            cells: vec![grass(), grass()],
        };
        let img = render_2d(&snapshot, &catalog(), 2).unwrap();
        assert_eq!(img.dimensions(), (2, 2));
    }

    #[test]
    fn test_save_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.png");
        let img = ImageBuffer::from_pixel(2, 2, Rgba(BACKGROUND));
        save_png(&img, &path).unwrap();
        assert!(path.exists());
    }
}
