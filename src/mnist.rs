//! Reader of the IDX files the MNIST dataset is distributed in
//!
//! # Label file
//! ```text
//! bytes 0-3:  0x00000801  (big-endian)
//! bytes 4-7:  N           (big-endian u32)
//! bytes 8..:  N labels, one byte each
//! ```
//!
//! # Image file
//! ```text
//! bytes  0-3:   0x00000803  (big-endian)
//! bytes  4-7:   N           (big-endian u32)
//! bytes  8-11:  rows        (big-endian u32)
//! bytes 12-15:  columns     (big-endian u32)
//! bytes 16..:   N * rows * columns pixels, row-major, one byte each
//! ```

use std::{
    fmt,
    io::{self, BufReader, Read},
    path::Path,
};

use thiserror::Error;
use tracing::{debug, warn};

pub const LABEL_MAGIC: u32 = 0x0000_0801;
pub const IMAGE_MAGIC: u32 = 0x0000_0803;

/// From dark to bright
const DENSITY: &[u8] = b" |+/?lpx9$#";

#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Zero to read every entry
    pub max_entries: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdxKind {
    Labels,
    Images,
}
impl fmt::Display for IdxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdxKind::Labels => f.write_str("labels"),
            IdxKind::Images => f.write_str("images"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdxData {
    Labels(Vec<u8>),
    Images(ImageSet),
}
impl IdxData {
    pub fn kind(&self) -> IdxKind {
        match self {
            IdxData::Labels(_) => IdxKind::Labels,
            IdxData::Images(_) => IdxKind::Images,
        }
    }
    pub fn len(&self) -> usize {
        match self {
            IdxData::Labels(labels) => labels.len(),
            IdxData::Images(images) => images.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
impl fmt::Display for IdxData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdxData::Labels(labels) => {
                for (i, label) in labels.iter().enumerate() {
                    writeln!(f, "Image {i}: {label}")?;
                }
                Ok(())
            }
            IdxData::Images(images) => fmt::Display::fmt(images, f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSet {
    rows: usize,
    columns: usize,
    /// `images[i]`: pixels of image $i$ in row-major order
    images: Vec<Vec<u8>>,
}
impl ImageSet {
    pub fn rows(&self) -> usize {
        self.rows
    }
    pub fn columns(&self) -> usize {
        self.columns
    }
    pub fn images(&self) -> &[Vec<u8>] {
        &self.images
    }
    pub fn len(&self) -> usize {
        self.images.len()
    }
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
impl fmt::Display for ImageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pixels) in self.images.iter().enumerate() {
            writeln!(f, "Image {i}:")?;
            write_image(f, pixels, self.columns)?;
        }
        Ok(())
    }
}

pub fn load_idx(path: impl AsRef<Path>, options: ReadOptions) -> Result<IdxData, IdxError> {
    let file = std::fs::File::open(path)?;
    read_idx(BufReader::new(file), options)
}

pub fn read_idx(mut rdr: impl Read, options: ReadOptions) -> Result<IdxData, IdxError> {
    let magic = read_u32(&mut rdr)?;
    let declared = read_usize(&mut rdr)?;
    let entries = match options.max_entries {
        0 => declared,
        max => declared.min(max),
    };
    let data = match magic {
        LABEL_MAGIC => {
            let mut labels = vec![];
            rdr.by_ref().take(entries as u64).read_to_end(&mut labels)?;
            if labels.len() < entries {
                return Err(IdxError::Truncated {
                    expected: entries,
                    read: labels.len(),
                });
            }
            IdxData::Labels(labels)
        }
        IMAGE_MAGIC => {
            let rows = read_usize(&mut rdr)?;
            let columns = read_usize(&mut rdr)?;
            let len = rows.checked_mul(columns).ok_or(IdxError::TooLarge)?;
            if len == 0 && entries != 0 {
                return Err(IdxError::EmptyImage { rows, columns });
            }
            entries
                .checked_mul(len)
                .filter(|&total| total <= isize::MAX as usize)
                .ok_or(IdxError::TooLarge)?;
            let mut images = vec![];
            for read in 0..entries {
                // Grows with the bytes actually present, not with the declared size
                let mut image = vec![];
                rdr.by_ref().take(len as u64).read_to_end(&mut image)?;
                if image.len() < len {
                    return Err(IdxError::Truncated {
                        expected: entries,
                        read,
                    });
                }
                images.push(image);
            }
            IdxData::Images(ImageSet {
                rows,
                columns,
                images,
            })
        }
        _ => return Err(IdxError::UnknownMagic(magic)),
    };
    debug!(kind = %data.kind(), declared, read = data.len(), "Read IDX data");
    Ok(data)
}

fn read_u32(rdr: &mut impl Read) -> Result<u32, IdxError> {
    let mut buf = [0; 4];
    rdr.read_exact(&mut buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => IdxError::TruncatedHeader,
        _ => IdxError::Io(e),
    })?;
    Ok(u32::from_be_bytes(buf))
}

fn read_usize(rdr: &mut impl Read) -> Result<usize, IdxError> {
    let x = read_u32(rdr)?;
    usize::try_from(x).map_err(|_| IdxError::TooLarge)
}

#[derive(Debug, Error)]
pub enum IdxError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Magic number {0:#010x} is neither labels (0x00000801) nor images (0x00000803)")]
    UnknownMagic(u32),
    #[error("The header ended early")]
    TruncatedHeader,
    #[error("Expected {expected} entries, but the data ended after {read}")]
    Truncated { expected: usize, read: usize },
    #[error("Dimensions do not fit in memory")]
    TooLarge,
    #[error("Images of {rows}x{columns} pixels hold no data")]
    EmptyImage { rows: usize, columns: usize },
}

/// Pair up an image set and a label set, given in either order
pub fn combine(a: IdxData, b: IdxData) -> Result<LabeledDataset, CombineError> {
    let (images, labels) = match (a, b) {
        (IdxData::Images(images), IdxData::Labels(labels))
        | (IdxData::Labels(labels), IdxData::Images(images)) => (images, labels),
        (a, _) => return Err(CombineError::SameKind(a.kind())),
    };
    if images.len() != labels.len() {
        warn!(
            images = images.len(),
            labels = labels.len(),
            "Refusing to combine"
        );
        return Err(CombineError::CountMismatch {
            images: images.len(),
            labels: labels.len(),
        });
    }
    let examples = images
        .images
        .into_iter()
        .zip(labels)
        .map(|(pixels, label)| LabeledExample { label, pixels })
        .collect();
    Ok(LabeledDataset {
        rows: images.rows,
        columns: images.columns,
        examples,
    })
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CombineError {
    #[error("Tried to combine two sets of {0}")]
    SameKind(IdxKind),
    #[error("Not the same number of entries ({images} images, {labels} labels)")]
    CountMismatch { images: usize, labels: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledDataset {
    rows: usize,
    columns: usize,
    examples: Vec<LabeledExample>,
}
impl LabeledDataset {
    pub fn rows(&self) -> usize {
        self.rows
    }
    pub fn columns(&self) -> usize {
        self.columns
    }
    pub fn pixels_per_image(&self) -> usize {
        self.rows * self.columns
    }
    pub fn examples(&self) -> &[LabeledExample] {
        &self.examples
    }
    pub fn len(&self) -> usize {
        self.examples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}
impl fmt::Display for LabeledDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, example) in self.examples.iter().enumerate() {
            writeln!(f, "Image {i}: Label {}", example.label)?;
            write_image(f, &example.pixels, self.columns)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledExample {
    pub label: u8,
    /// Row-major
    pub pixels: Vec<u8>,
}
impl LabeledExample {
    /// Pixels scaled into $[0, 1]$
    pub fn inputs(&self) -> impl Iterator<Item = f64> + '_ {
        self.pixels.iter().map(|&x| x as f64 / u8::MAX as f64)
    }
}

fn write_image(f: &mut fmt::Formatter<'_>, pixels: &[u8], columns: usize) -> fmt::Result {
    if columns == 0 {
        return Ok(());
    }
    for (y, row) in pixels.chunks(columns).enumerate() {
        write!(f, "Y {y:02}: ")?;
        for &pixel in row {
            write!(f, "{}", density(pixel))?;
        }
        writeln!(f)?;
    }
    Ok(())
}

fn density(pixel: u8) -> char {
    let i = (pixel as f64 / 25.5).round() as usize;
    DENSITY[i.min(DENSITY.len() - 1)] as char
}
