//! Binary catalog readers.
//!
//! The catalogs are append-only streams of fixed-size packed records, read
//! sequentially until end-of-file or a short read. A missing file disables the
//! feature it feeds; it is never an error.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use bytemuck::{Pod, Zeroable};

/// One star record: ecliptic longitude/latitude [rad], apparent magnitude and
/// spectral class index. File order is ascending magnitude (brightest first).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarDataRec {
    pub lng: f64,
    pub lat: f64,
    pub mag: f64,
    pub spec_idx: u16,
}

/// One line segment on the celestial sphere, endpoints as lng/lat [rad].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineDataRec {
    pub lng1: f64,
    pub lat1: f64,
    pub lng2: f64,
    pub lat2: f64,
}

/// One constellation label record: centre position plus abbreviated and full
/// names.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstLabelRec {
    pub lng: f64,
    pub lat: f64,
    pub abbr: String,
    pub full: String,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct PackedStar {
    lng: f32,
    lat: f32,
    mag: f32,
    spec_idx: u16,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct PackedLine {
    lng1: f32,
    lat1: f32,
    lng2: f32,
    lat2: f32,
}

const STAR_REC_SIZE: usize = std::mem::size_of::<PackedStar>();
const LINE_REC_SIZE: usize = std::mem::size_of::<PackedLine>();

/// Fill `buf` from the reader; `Ok(false)` on a clean or short end of stream.
fn read_record(mut r: impl Read, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = r.read(&mut buf[filled..])?;
        if n == 0 {
            return Ok(false); // EOF; a partial record is discarded
        }
        filled += n;
    }
    Ok(true)
}

/// Read star records until end-of-file or the first record at or above
/// `max_mag` (the file is sorted brightest-first).
pub fn read_star_records(mut r: impl Read, max_mag: f64) -> io::Result<Vec<StarDataRec>> {
    let mut out = Vec::new();
    let mut buf = [0u8; STAR_REC_SIZE];
    while read_record(&mut r, &mut buf)? {
        let p: PackedStar = bytemuck::pod_read_unaligned(&buf);
        if f64::from(p.mag) >= max_mag {
            break;
        }
        out.push(StarDataRec {
            lng: f64::from(p.lng),
            lat: f64::from(p.lat),
            mag: f64::from(p.mag),
            spec_idx: p.spec_idx,
        });
    }
    Ok(out)
}

/// Read line segment records until end-of-file.
pub fn read_line_records(mut r: impl Read) -> io::Result<Vec<LineDataRec>> {
    let mut out = Vec::new();
    let mut buf = [0u8; LINE_REC_SIZE];
    while read_record(&mut r, &mut buf)? {
        let p: PackedLine = bytemuck::pod_read_unaligned(&buf);
        out.push(LineDataRec {
            lng1: f64::from(p.lng1),
            lat1: f64::from(p.lat1),
            lng2: f64::from(p.lng2),
            lat2: f64::from(p.lat2),
        });
    }
    Ok(out)
}

/// Read constellation label records: 2 x f64 centre position, 3-byte
/// abbreviation, u32 length-prefixed full name. Stops at the first truncated
/// record.
pub fn read_label_records(mut r: impl Read) -> io::Result<Vec<ConstLabelRec>> {
    let mut out = Vec::new();
    loop {
        let mut lng_buf = [0u8; 8];
        if !read_record(&mut r, &mut lng_buf)? {
            break;
        }
        let mut lat_buf = [0u8; 8];
        if !read_record(&mut r, &mut lat_buf)? {
            break;
        }
        let lng = f64::from_le_bytes(lng_buf);
        let lat = f64::from_le_bytes(lat_buf);

        let mut abbr = [0u8; 3];
        if !read_record(&mut r, &mut abbr)? {
            break;
        }
        let mut len_buf = [0u8; 4];
        if !read_record(&mut r, &mut len_buf)? {
            break;
        }
        let len = u32::from_le_bytes(len_buf) as usize;
        let mut full = vec![0u8; len];
        if !read_record(&mut r, &mut full)? {
            break;
        }
        out.push(ConstLabelRec {
            lng,
            lat,
            abbr: String::from_utf8_lossy(&abbr).into_owned(),
            full: String::from_utf8_lossy(&full).into_owned(),
        });
    }
    Ok(out)
}

fn open_catalog(dir: &Path, name: &str) -> Option<File> {
    let path = dir.join(name);
    match File::open(&path) {
        Ok(f) => Some(f),
        Err(_) => {
            log::warn!("celestial catalog {} not found; feature disabled", path.display());
            None
        }
    }
}

/// Load the star catalog from `dir/star.bin`. Empty when the file is missing.
pub fn load_star_data(dir: &Path, max_mag: f64) -> Vec<StarDataRec> {
    let Some(f) = open_catalog(dir, "star.bin") else {
        return Vec::new();
    };
    match read_star_records(io::BufReader::new(f), max_mag) {
        Ok(recs) => {
            log::info!("loaded {} records from star catalog", recs.len());
            recs
        }
        Err(e) => {
            log::warn!("star catalog read failed: {e}");
            Vec::new()
        }
    }
}

/// Load constellation line segments from `dir/const_lines.bin`.
pub fn load_constellation_lines(dir: &Path) -> Vec<LineDataRec> {
    load_lines(dir, "const_lines.bin")
}

/// Load constellation boundary segments from `dir/const_bnd.bin`.
pub fn load_constellation_boundaries(dir: &Path) -> Vec<LineDataRec> {
    load_lines(dir, "const_bnd.bin")
}

fn load_lines(dir: &Path, name: &str) -> Vec<LineDataRec> {
    let Some(f) = open_catalog(dir, name) else {
        return Vec::new();
    };
    match read_line_records(io::BufReader::new(f)) {
        Ok(recs) => recs,
        Err(e) => {
            log::warn!("line catalog {name} read failed: {e}");
            Vec::new()
        }
    }
}

/// Load constellation labels from `dir/const_labels.bin`.
pub fn load_constellation_labels(dir: &Path) -> Vec<ConstLabelRec> {
    let Some(f) = open_catalog(dir, "const_labels.bin") else {
        return Vec::new();
    };
    match read_label_records(io::BufReader::new(f)) {
        Ok(recs) => recs,
        Err(e) => {
            log::warn!("constellation label catalog read failed: {e}");
            Vec::new()
        }
    }
}
