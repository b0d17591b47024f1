//! Catalog loading from JSON and XML tileset files.
//!
//! JSON lists every tile with its per-side neighbor names:
//!
//! ```json
//! { "tiles": [
//!     { "name": "grass", "weight": 3, "handle": "#00e436",
//!       "up": ["grass"], "right": ["grass", "sand"], "down": ["grass"], "left": ["grass"] }
//! ] }
//! ```
//!
//! XML tilesets declare tiles once and state adjacency as mirrored pairs:
//!
//! ```xml
//! <tileset>
//!   <tiles>
//!     <tile name="grass" weight="3" handle="#00e436"/>
//!     <tile name="sand"/>
//!   </tiles>
//!   <neighbors>
//!     <neighbor left="grass" right="sand"/>
//!     <neighbor top="sand" bottom="grass"/>
//!   </neighbors>
//! </tileset>
//! ```
//!
//! `left/right` allows `right` to the right of `left` (and the mirror);
//! `top/bottom` allows `bottom` below `top` (and the mirror).

use crate::catalog::{CatalogBuilder, Tile, TileCatalog, DEFAULT_WEIGHT};
use crate::direction::Direction;
use crate::error::LoadError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// JSON form of a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDef {
    pub tiles: Vec<TileDef>,
}

/// JSON form of one tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileDef {
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(default)]
    pub up: Vec<String>,
    #[serde(default)]
    pub right: Vec<String>,
    #[serde(default)]
    pub down: Vec<String>,
    #[serde(default)]
    pub left: Vec<String>,
}

fn default_weight() -> u32 {
    DEFAULT_WEIGHT
}

impl TileDef {
    fn side(&self, direction: Direction) -> &[String] {
        match direction {
            Direction::Up => &self.up,
            Direction::Right => &self.right,
            Direction::Down => &self.down,
            Direction::Left => &self.left,
        }
    }
}

impl CatalogDef {
    /// Build the catalog. Adjacency lists are taken as written, one-sided.
    pub fn build(&self) -> Result<TileCatalog, LoadError> {
        let mut builder = TileCatalog::builder();
        for tile in &self.tiles {
            builder = match &tile.handle {
                Some(handle) => builder.tile_with_handle(&tile.name, tile.weight, handle),
                None => builder.tile(&tile.name, tile.weight),
            };
        }
        for tile in &self.tiles {
            for direction in Direction::ALL {
                for neighbor in tile.side(direction) {
                    builder = builder.allow(&tile.name, direction, neighbor);
                }
            }
        }
        Ok(builder.build()?)
    }

    /// Inverse of `build`.
    pub fn from_catalog(catalog: &TileCatalog) -> Self {
        let names = |tile: &Tile, direction: Direction| -> Vec<String> {
            tile.neighbors(direction)
                .iter()
                .map(|&id| catalog.name(id).to_string())
                .collect()
        };
        let tiles = catalog
            .iter()
            .map(|(_, tile)| TileDef {
                name: tile.name().to_string(),
                weight: tile.weight(),
                handle: tile.handle().map(str::to_string),
                up: names(tile, Direction::Up),
                right: names(tile, Direction::Right),
                down: names(tile, Direction::Down),
                left: names(tile, Direction::Left),
            })
            .collect();
        Self { tiles }
    }
}

pub fn catalog_from_json_str(json: &str) -> Result<TileCatalog, LoadError> {
    let def: CatalogDef = serde_json::from_str(json)?;
    def.build()
}

/// Parse an XML tileset.
pub fn catalog_from_tileset_xml(xml: &str) -> Result<TileCatalog, LoadError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut builder = TileCatalog::builder();
    let mut in_tiles = false;
    let mut in_neighbors = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match element_name(e).as_str() {
                "tiles" => in_tiles = true,
                "neighbors" => in_neighbors = true,
                "tile" if in_tiles => builder = parse_tile(e, builder)?,
                "neighbor" if in_neighbors => builder = parse_neighbor(e, builder)?,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match element_name(e).as_str() {
                "tile" if in_tiles => builder = parse_tile(e, builder)?,
                "neighbor" if in_neighbors => builder = parse_neighbor(e, builder)?,
                _ => {}
            },
            Ok(Event::End(ref e)) => match std::str::from_utf8(e.name().as_ref()).unwrap_or("") {
                "tiles" => in_tiles = false,
                "neighbors" => in_neighbors = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(LoadError::Xml(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(builder.build()?)
}

/// Load a catalog file, choosing the format by extension (`.xml` or JSON).
pub fn load_catalog(path: impl AsRef<Path>) -> Result<TileCatalog, LoadError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let is_xml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));

    let catalog = if is_xml {
        catalog_from_tileset_xml(&text)?
    } else {
        catalog_from_json_str(&text)?
    };

    tracing::info!(
        "loaded {} tiles from {}",
        catalog.len(),
        path.display()
    );
    Ok(catalog)
}

fn element_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

/// Collect `(key, value)` attribute pairs of an element.
fn attributes(e: &BytesStart) -> Result<Vec<(String, String)>, LoadError> {
    let element = element_name(e);
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| LoadError::Xml(format!("<{}>: {}", element, err)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        out.push((key, value));
    }
    Ok(out)
}

fn find<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn parse_tile(
    e: &BytesStart,
    builder: CatalogBuilder,
) -> Result<CatalogBuilder, LoadError> {
    let attrs = attributes(e)?;
    let name = find(&attrs, "name").ok_or_else(|| LoadError::MissingAttribute {
        element: "tile".to_string(),
        attribute: "name".to_string(),
    })?;

    let weight = match find(&attrs, "weight") {
        Some(raw) => raw.parse::<u32>().map_err(|_| LoadError::InvalidAttribute {
            element: "tile".to_string(),
            attribute: "weight".to_string(),
            value: raw.to_string(),
        })?,
        None => DEFAULT_WEIGHT,
    };

    Ok(match find(&attrs, "handle") {
        Some(handle) => builder.tile_with_handle(name, weight, handle),
        None => builder.tile(name, weight),
    })
}

fn parse_neighbor(
    e: &BytesStart,
    builder: CatalogBuilder,
) -> Result<CatalogBuilder, LoadError> {
    let attrs = attributes(e)?;

    match (find(&attrs, "left"), find(&attrs, "right")) {
        (Some(left), Some(right)) => return Ok(builder.allow_pair(left, Direction::Right, right)),
        (Some(_), None) => return Err(missing_neighbor_attr("right")),
        (None, Some(_)) => return Err(missing_neighbor_attr("left")),
        (None, None) => {}
    }

    match (find(&attrs, "top"), find(&attrs, "bottom")) {
        (Some(top), Some(bottom)) => Ok(builder.allow_pair(top, Direction::Down, bottom)),
        (_, None) => Err(missing_neighbor_attr("bottom")),
        (None, Some(_)) => Err(missing_neighbor_attr("top")),
    }
}

fn missing_neighbor_attr(attribute: &str) -> LoadError {
    LoadError::MissingAttribute {
        element: "neighbor".to_string(),
        attribute: attribute.to_string(),
    }
}
