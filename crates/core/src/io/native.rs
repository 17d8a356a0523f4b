//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate. Georeferencing is read from and written to the
//! ModelPixelScale and ModelTiepoint tags with PixelIsArea semantics; the
//! grid's vertex-registered origin sits half a cell inside the image corner.
//! The GDAL_NODATA tag marks values that become void cells.

use crate::error::{Error, Result};
use crate::raster::{ArgbImage, Georef, Grid};
use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{Gray32Float, RGBA8};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tiff::ColorType;
use tracing::debug;

const MODEL_PIXEL_SCALE_TAG: u16 = 33550;
const MODEL_TIEPOINT_TAG: u16 = 33922;
const GEO_KEY_DIRECTORY_TAG: u16 = 34735;
const GDAL_NODATA_TAG: u16 = 42113;

/// Read a single-band GeoTIFF file into a Grid
pub fn read_geotiff<P: AsRef<Path>>(path: P) -> Result<Grid> {
    let file = File::open(path.as_ref())?;
    decode_geotiff(file)
}

/// Read a single-band GeoTIFF from an in-memory buffer into a Grid
pub fn read_geotiff_from_buffer(data: &[u8]) -> Result<Grid> {
    decode_geotiff(Cursor::new(data))
}

fn decode_geotiff<R: Read + Seek>(reader: R) -> Result<Grid> {
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;
    let rows = height as usize;
    let cols = width as usize;

    match decoder.colortype()? {
        ColorType::Gray(_) => {}
        other => {
            return Err(Error::UnsupportedDataType(format!(
                "expected a single-band elevation image, found {:?}",
                other
            )))
        }
    }

    let mut data: Vec<f32> = match decoder.read_image()? {
        DecodingResult::F32(buf) => buf,
        DecodingResult::F64(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U8(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(|v| v as f32).collect(),
        _ => {
            return Err(Error::UnsupportedDataType(
                "unsupported TIFF sample format".to_string(),
            ))
        }
    };

    if let Some(nodata) = read_nodata(&mut decoder) {
        let voided = void_nodata(&mut data, nodata);
        debug!("GDAL_NODATA {} voided {} cells", nodata, voided);
    }

    let georef = read_georef(&mut decoder, rows).unwrap_or_default();
    Grid::from_vec(data, rows, cols, georef)
}

fn void_nodata(data: &mut [f32], nodata: f64) -> usize {
    if nodata.is_nan() {
        return 0;
    }
    let nodata = nodata as f32;
    let mut count = 0;
    for v in data.iter_mut().filter(|v| **v == nodata) {
        *v = f32::NAN;
        count += 1;
    }
    count
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    decoder
        .get_tag_ascii_string(Tag::Unknown(GDAL_NODATA_TAG))
        .ok()
        .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<f64>().ok())
}

/// Georeferencing from ModelPixelScale + ModelTiepoint
fn read_georef<R: Read + Seek>(decoder: &mut Decoder<R>, rows: usize) -> Option<Georef> {
    let scale = decoder
        .get_tag_f64_vec(Tag::Unknown(MODEL_PIXEL_SCALE_TAG))
        .ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::Unknown(MODEL_TIEPOINT_TAG)).ok()?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }
    // tiepoint: [I, J, K, X, Y, Z]; scale: [ScaleX, ScaleY, ScaleZ]
    let cell_size = scale[0];
    let corner_x = tiepoint[3] - tiepoint[0] * scale[0];
    let corner_y = tiepoint[4] + tiepoint[1] * scale[1];
    let west = corner_x + cell_size / 2.0;
    let north = corner_y - scale[1] / 2.0;
    let south = north - rows.saturating_sub(1) as f64 * cell_size;
    Some(Georef::new(cell_size, west, south))
}

/// Write a Grid to a 32-bit float GeoTIFF file
pub fn write_geotiff<P: AsRef<Path>>(grid: &Grid, path: P) -> Result<()> {
    let file = BufWriter::new(File::create(path.as_ref())?);
    encode_geotiff(grid, file)
}

/// Write a Grid to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer(grid: &Grid) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_geotiff(grid, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_geotiff<W: Write + Seek>(grid: &Grid, writer: W) -> Result<()> {
    let mut encoder = TiffEncoder::new(writer)?;
    let (rows, cols) = grid.shape();
    let mut image = encoder.new_image::<Gray32Float>(cols as u32, rows as u32)?;

    let cs = grid.cell_size();
    let scale = [cs, cs, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE_TAG), &scale[..])?;

    let tiepoint = [
        0.0,
        0.0,
        0.0,
        grid.west() - cs / 2.0,
        grid.north() + cs / 2.0,
        0.0,
    ];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_TIEPOINT_TAG), &tiepoint[..])?;

    // Version 1.1.0 with two keys: GTModelTypeGeoKey = Projected,
    // GTRasterTypeGeoKey = PixelIsArea
    let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];
    image
        .encoder()
        .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY_TAG), &geokeys[..])?;

    image
        .encoder()
        .write_tag(Tag::Unknown(GDAL_NODATA_TAG), "nan")?;

    image.write_data(grid.as_slice())?;
    Ok(())
}

/// Write an image as an 8-bit RGBA TIFF file
pub fn write_rgba_tiff<P: AsRef<Path>>(image: &ArgbImage, path: P) -> Result<()> {
    let file = BufWriter::new(File::create(path.as_ref())?);
    encode_rgba(image, file)
}

/// Write an image as an 8-bit RGBA TIFF into memory
pub fn write_rgba_tiff_to_buffer(image: &ArgbImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_rgba(image, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_rgba<W: Write + Seek>(image: &ArgbImage, writer: W) -> Result<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::Other("cannot encode an empty image".to_string()));
    }
    let mut encoder = TiffEncoder::new(writer)?;
    encoder.write_image::<RGBA8>(
        image.width() as u32,
        image.height() as u32,
        &image.to_rgba8(),
    )?;
    Ok(())
}
