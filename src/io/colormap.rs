//! Fixed color maps for classification outputs.
use std::collections::BTreeMap;

use crate::io::job::LookupTable;
use crate::types::Product;

/// Label value reserved for pixels without a prediction.
pub const NODATA: u16 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const WHITE: Self = Self::new(255, 255, 255);
}

const CROPLAND_OTHER: Rgb = Rgb::new(186, 186, 186);
const CROPLAND_CROP: Rgb = Rgb::new(224, 24, 28);

// Qualitative cycle for crop types, assigned in ascending code order.
const CROPTYPE_CYCLE: [Rgb; 12] = [
    Rgb::new(230, 159, 0),
    Rgb::new(86, 180, 233),
    Rgb::new(0, 158, 115),
    Rgb::new(240, 228, 66),
    Rgb::new(0, 114, 178),
    Rgb::new(213, 94, 0),
    Rgb::new(204, 121, 167),
    Rgb::new(117, 112, 179),
    Rgb::new(102, 166, 30),
    Rgb::new(166, 118, 29),
    Rgb::new(231, 41, 138),
    Rgb::new(102, 102, 102),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorMap {
    entries: BTreeMap<u16, Rgb>,
}

impl ColorMap {
    pub fn for_product(product: Product, lookup_table: &LookupTable) -> Self {
        let mut entries = BTreeMap::new();
        match product {
            Product::Cropland => {
                entries.insert(0, CROPLAND_OTHER);
                entries.insert(1, CROPLAND_CROP);
            }
            Product::Croptype => {
                let mut codes: Vec<u16> = lookup_table
                    .values()
                    .copied()
                    .filter(|&c| c != NODATA)
                    .collect();
                codes.sort_unstable();
                codes.dedup();
                for (i, code) in codes.into_iter().enumerate() {
                    entries.insert(code, CROPTYPE_CYCLE[i % CROPTYPE_CYCLE.len()]);
                }
            }
        }
        entries.insert(NODATA, Rgb::WHITE);
        Self { entries }
    }

    pub fn get(&self, code: u16) -> Option<Rgb> {
        self.entries.get(&code).copied()
    }

    /// TIFF `ColorMap` tag for 8-bit palette images: 256 reds, 256 greens, 256 blues,
    /// each scaled to 16 bits. Codes above 255 are ignored.
    pub fn to_tiff_palette(&self) -> Vec<u16> {
        let mut palette = vec![0u16; 3 * 256];
        for (&code, rgb) in self.entries.range(..=255) {
            let i = code as usize;
            palette[i] = rgb.r as u16 * 257;
            palette[256 + i] = rgb.g as u16 * 257;
            palette[512 + i] = rgb.b as u16 * 257;
        }
        palette
    }

    /// Compact `code: #rrggbb` listing for metadata when no palette can be embedded.
    pub fn to_metadata_string(&self) -> String {
        self.entries
            .iter()
            .map(|(code, c)| format!("{}:#{:02x}{:02x}{:02x}", code, c.r, c.g, c.b))
            .collect::<Vec<_>>()
            .join(",")
    }
}
