use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind, colortype};
use tiff::tags::{PhotometricInterpretation, Tag};

use crate::error::{Error, Result};
use crate::io::raster::{GeoTags, tag};

const GDAL_METADATA: u16 = 42112;

/// Pixel data of one output band, row-major.
#[derive(Debug, Clone, Copy)]
pub enum BandData<'a> {
    U8(&'a [u8]),
    U16(&'a [u16]),
}

impl BandData<'_> {
    fn len(&self) -> usize {
        match self {
            BandData::U8(d) => d.len(),
            BandData::U16(d) => d.len(),
        }
    }
}

/// Everything needed to write one single-band GeoTIFF.
#[derive(Debug, Clone, Copy)]
pub struct SingleBandTiff<'a> {
    pub cols: usize,
    pub rows: usize,
    pub data: BandData<'a>,
    /// TIFF `ColorMap` values; only applied to 8-bit data
    pub palette: Option<&'a [u16]>,
    pub geo: &'a GeoTags,
    pub gdal_metadata: &'a str,
}

/// Write through a temp file in the target directory, then rename over `output`.
pub fn write_single_band_tiff(output: &Path, image: &SingleBandTiff<'_>) -> Result<()> {
    if image.data.len() != image.cols * image.rows {
        return Err(Error::Processing(format!(
            "band has {} pixels, expected {}x{}",
            image.data.len(),
            image.cols,
            image.rows
        )));
    }

    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut builder = tempfile::Builder::new();
    builder.prefix(".cropmap-").suffix(".tif.part");
    // Temp files default to 0600; outputs are shared map products.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o644));
    }
    let tmp = builder.tempfile_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        encode(&mut writer, image)?;
        writer.flush()?;
    }
    tmp.persist(output).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

fn encode<W: Write + Seek>(writer: W, image: &SingleBandTiff<'_>) -> Result<()> {
    let mut encoder = TiffEncoder::new(writer)?;
    let (cols, rows) = (image.cols as u32, image.rows as u32);
    match image.data {
        BandData::U8(data) => {
            let mut img = encoder.new_image::<colortype::Gray8>(cols, rows)?;
            write_tags(img.encoder(), image)?;
            if let Some(palette) = image.palette {
                let dir = img.encoder();
                dir.write_tag(
                    Tag::PhotometricInterpretation,
                    PhotometricInterpretation::RGBPalette.to_u16(),
                )?;
                dir.write_tag(Tag::ColorMap, palette)?;
            }
            img.write_data(data)?;
        }
        BandData::U16(data) => {
            let mut img = encoder.new_image::<colortype::Gray16>(cols, rows)?;
            write_tags(img.encoder(), image)?;
            img.write_data(data)?;
        }
    }
    Ok(())
}

fn write_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<'_, W, K>,
    image: &SingleBandTiff<'_>,
) -> Result<()> {
    for (code, values) in image.geo.f64_entries() {
        dir.write_tag(tag(code), values)?;
    }
    if let Some((code, keys)) = image.geo.geo_key_directory_entry() {
        dir.write_tag(tag(code), keys)?;
    }
    for (code, text) in image.geo.ascii_entries() {
        dir.write_tag(tag(code), text)?;
    }
    if !image.gdal_metadata.is_empty() {
        dir.write_tag(tag(GDAL_METADATA), image.gdal_metadata)?;
    }
    Ok(())
}
