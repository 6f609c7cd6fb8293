//! NPY v1.0 binary arrays.
//!
//! Layout:
//!
//! ```text
//! \x93NUMPY  0x01 0x00  u16-le header_len  header  data
//! ```
//!
//! The header is an ASCII dict literal
//! `{'descr': '<f8', 'fortran_order': False, 'shape': (r, c), }` padded
//! with spaces and terminated by `\n` so that the data starts at a
//! multiple of [`HEADER_ALIGN`] bytes. Data is C-order little-endian
//! `f64` (`<f8`) or `f32` (`<f4`). Readers accept only what writers
//! produce: version 1.0, little-endian floats, C order.

use crate::error::ExportError;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// File magic.
pub const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Data offset alignment.
pub const HEADER_ALIGN: usize = 16;

const PREAMBLE: usize = MAGIC.len() + 2 + 2;

/// Element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dtype {
    /// Little-endian `f64`.
    F8,
    /// Little-endian `f32`.
    F4,
}

impl Dtype {
    /// The `descr` string.
    pub fn descr(self) -> &'static str {
        match self {
            Self::F8 => "<f8",
            Self::F4 => "<f4",
        }
    }

    /// Bytes per element.
    pub fn size(self) -> usize {
        match self {
            Self::F8 => 8,
            Self::F4 => 4,
        }
    }
}

/// Decoded element buffer.
#[derive(Clone, Debug, PartialEq)]
pub enum NpyData {
    /// `<f8` elements.
    F64(Vec<f64>),
    /// `<f4` elements.
    F32(Vec<f32>),
}

/// A decoded array.
#[derive(Clone, Debug, PartialEq)]
pub struct NpyArray {
    /// C-order shape.
    pub shape: Vec<usize>,
    /// Elements.
    pub data: NpyData,
}

impl NpyArray {
    /// Element type.
    pub fn dtype(&self) -> Dtype {
        match self.data {
            NpyData::F64(_) => Dtype::F8,
            NpyData::F32(_) => Dtype::F4,
        }
    }

    /// Elements widened to `f64`.
    pub fn to_f64(&self) -> Vec<f64> {
        match &self.data {
            NpyData::F64(v) => v.clone(),
            NpyData::F32(v) => v.iter().map(|&x| f64::from(x)).collect(),
        }
    }
}

fn shape_tuple(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [n] => format!("({n},)"),
        _ => {
            let parts: Vec<String> = shape.iter().map(|n| n.to_string()).collect();
            format!("({})", parts.join(", "))
        }
    }
}

fn element_count(shape: &[usize]) -> Result<usize, ExportError> {
    shape
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .ok_or_else(|| ExportError::malformed("shape overflows usize"))
}

/// Magic, version, length and padded header for `dtype` and `shape`.
///
/// # Examples
///
/// ```
/// use cairn_export::npy::{encode_header, Dtype, HEADER_ALIGN};
///
/// let h = encode_header(Dtype::F8, &[3]).unwrap();
/// assert_eq!(h.len() % HEADER_ALIGN, 0);
/// assert_eq!(h.last(), Some(&b'\n'));
/// ```
pub fn encode_header(dtype: Dtype, shape: &[usize]) -> Result<Vec<u8>, ExportError> {
    let dict = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
        dtype.descr(),
        shape_tuple(shape)
    );
    let unpadded = PREAMBLE + dict.len() + 1;
    let pad = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    let header_len = dict.len() + pad + 1;
    let header_len =
        u16::try_from(header_len).map_err(|_| ExportError::malformed("header too long"))?;

    let mut out = Vec::with_capacity(PREAMBLE + header_len as usize);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(dict.as_bytes());
    out.resize(out.len() + pad, b' ');
    out.push(b'\n');
    Ok(out)
}

fn check_len(shape: &[usize], len: usize) -> Result<(), ExportError> {
    let expected = element_count(shape)?;
    if expected != len {
        return Err(ExportError::DimensionMismatch {
            what: "array elements vs shape",
            expected,
            found: len,
        });
    }
    Ok(())
}

/// Write an `<f8` array.
pub fn write_f64<W: Write>(w: &mut W, shape: &[usize], data: &[f64]) -> Result<(), ExportError> {
    check_len(shape, data.len())?;
    w.write_all(&encode_header(Dtype::F8, shape)?)?;
    for v in data {
        w.write_all(&v.to_le_bytes())?;
    }
    Ok(())
}

/// Write an `<f4` array.
pub fn write_f32<W: Write>(w: &mut W, shape: &[usize], data: &[f32]) -> Result<(), ExportError> {
    check_len(shape, data.len())?;
    w.write_all(&encode_header(Dtype::F4, shape)?)?;
    for v in data {
        w.write_all(&v.to_le_bytes())?;
    }
    Ok(())
}

/// Value of `key` in a header dict literal.
fn dict_value<'a>(dict: &'a str, key: &str) -> Result<&'a str, ExportError> {
    let needle = format!("'{key}':");
    let start = dict
        .find(&needle)
        .ok_or_else(|| ExportError::malformed(format!("header has no '{key}'")))?
        + needle.len();
    let rest = dict[start..].trim_start();
    let end = if let Some(tail) = rest.strip_prefix('(') {
        tail.find(')').map(|i| i + 2)
    } else if let Some(tail) = rest.strip_prefix('\'') {
        tail.find('\'').map(|i| i + 2)
    } else {
        rest.find([',', '}'])
    };
    let end = end.ok_or_else(|| ExportError::malformed(format!("unterminated '{key}'")))?;
    Ok(rest[..end].trim())
}

fn parse_header(text: &str) -> Result<(Dtype, Vec<usize>), ExportError> {
    let dict = text.trim_end();
    if !dict.starts_with('{') || !dict.ends_with('}') {
        return Err(ExportError::malformed("header is not a dict literal"));
    }
    let dtype = match dict_value(dict, "descr")? {
        "'<f8'" => Dtype::F8,
        "'<f4'" => Dtype::F4,
        other => {
            return Err(ExportError::malformed(format!(
                "unsupported descr {other}"
            )))
        }
    };
    match dict_value(dict, "fortran_order")? {
        "False" => {}
        "True" => return Err(ExportError::malformed("fortran order is not supported")),
        other => {
            return Err(ExportError::malformed(format!(
                "bad fortran_order {other}"
            )))
        }
    }
    let tuple = dict_value(dict, "shape")?;
    let inner = tuple
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .ok_or_else(|| ExportError::malformed("shape is not a tuple"))?;
    let shape = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| ExportError::malformed(format!("bad shape entry '{s}'")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((dtype, shape))
}

/// Read and validate an array.
///
/// # Errors
///
/// Returns [`ExportError::MalformedArray`] on a bad magic, version,
/// header, alignment, element type, truncated body or trailing bytes.
pub fn read_npy<R: Read>(r: &mut R) -> Result<NpyArray, ExportError> {
    let mut preamble = [0u8; PREAMBLE];
    r.read_exact(&mut preamble)
        .map_err(|_| ExportError::malformed("truncated preamble"))?;
    if &preamble[..6] != MAGIC {
        return Err(ExportError::malformed("bad magic"));
    }
    if preamble[6..8] != [1, 0] {
        return Err(ExportError::malformed(format!(
            "unsupported version {}.{}",
            preamble[6], preamble[7]
        )));
    }
    let header_len = u16::from_le_bytes([preamble[8], preamble[9]]) as usize;
    if (PREAMBLE + header_len) % HEADER_ALIGN != 0 {
        return Err(ExportError::malformed("data offset is not aligned"));
    }
    let mut header = vec![0u8; header_len];
    r.read_exact(&mut header)
        .map_err(|_| ExportError::malformed("truncated header"))?;
    if header.last() != Some(&b'\n') {
        return Err(ExportError::malformed("header is not newline terminated"));
    }
    let text = std::str::from_utf8(&header)
        .map_err(|_| ExportError::malformed("header is not ASCII"))?;
    let (dtype, shape) = parse_header(text)?;

    let count = element_count(&shape)?;
    let bytes = count
        .checked_mul(dtype.size())
        .ok_or_else(|| ExportError::malformed("body size overflows usize"))?;
    // Grow with the bytes actually present; the header alone is untrusted.
    let mut body = Vec::new();
    r.by_ref().take(bytes as u64).read_to_end(&mut body)?;
    if body.len() != bytes {
        return Err(ExportError::malformed(format!(
            "expected {bytes} data bytes, found {}",
            body.len()
        )));
    }
    let mut probe = [0u8; 1];
    if r.read(&mut probe)? != 0 {
        return Err(ExportError::malformed("trailing bytes after data"));
    }

    let data = match dtype {
        Dtype::F8 => NpyData::F64(
            body.chunks_exact(8)
                .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
        ),
        Dtype::F4 => NpyData::F32(
            body.chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
    };
    Ok(NpyArray { shape, data })
}

/// Write an `<f8` array to `path`.
pub fn save_f64(path: &Path, shape: &[usize], data: &[f64]) -> Result<(), ExportError> {
    let mut w = BufWriter::new(File::create(path)?);
    write_f64(&mut w, shape, data)?;
    w.flush()?;
    Ok(())
}

/// Write an `<f4` array to `path`.
pub fn save_f32(path: &Path, shape: &[usize], data: &[f32]) -> Result<(), ExportError> {
    let mut w = BufWriter::new(File::create(path)?);
    write_f32(&mut w, shape, data)?;
    w.flush()?;
    Ok(())
}

/// Read an array from `path`.
pub fn load(path: &Path) -> Result<NpyArray, ExportError> {
    read_npy(&mut BufReader::new(File::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encoded(shape: &[usize], data: &[f64]) -> Vec<u8> {
        let mut buf = Vec::new();
        write_f64(&mut buf, shape, data).unwrap();
        buf
    }

    #[test]
    fn header_bytes_are_exact() {
        let h = encode_header(Dtype::F8, &[3]).unwrap();
        assert_eq!(h.len(), 80);
        assert_eq!(&h[..8], b"\x93NUMPY\x01\x00");
        assert_eq!(u16::from_le_bytes([h[8], h[9]]), 70);
        let dict = "{'descr': '<f8', 'fortran_order': False, 'shape': (3,), }";
        assert_eq!(&h[10..10 + dict.len()], dict.as_bytes());
        assert!(h[10 + dict.len()..79].iter().all(|&b| b == b' '));
        assert_eq!(h[79], b'\n');
    }

    #[test]
    fn shape_tuples() {
        assert_eq!(shape_tuple(&[]), "()");
        assert_eq!(shape_tuple(&[4]), "(4,)");
        assert_eq!(shape_tuple(&[2, 3]), "(2, 3)");
    }

    #[test]
    fn data_follows_header_little_endian() {
        let buf = encoded(&[2], &[1.0, -2.5]);
        assert_eq!(buf.len(), 80 + 16);
        assert_eq!(&buf[80..88], &1.0f64.to_le_bytes());
        assert_eq!(&buf[88..96], &(-2.5f64).to_le_bytes());
    }

    #[test]
    fn f32_round_trip() {
        let mut buf = Vec::new();
        write_f32(&mut buf, &[2, 2], &[0.5, 1.5, -3.0, 7.25]).unwrap();
        let a = read_npy(&mut buf.as_slice()).unwrap();
        assert_eq!(a.dtype(), Dtype::F4);
        assert_eq!(a.shape, vec![2, 2]);
        assert_eq!(a.data, NpyData::F32(vec![0.5, 1.5, -3.0, 7.25]));
        assert_eq!(a.to_f64(), vec![0.5, 1.5, -3.0, 7.25]);
    }

    #[test]
    fn write_rejects_shape_mismatch() {
        let mut buf = Vec::new();
        assert!(matches!(
            write_f64(&mut buf, &[2, 2], &[1.0; 3]),
            Err(ExportError::DimensionMismatch { .. })
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_rejects_corruption() {
        let good = encoded(&[2], &[1.0, 2.0]);
        let mut bad_magic = good.clone();
        bad_magic[1] = b'X';
        let mut bad_version = good.clone();
        bad_version[6] = 2;
        let truncated = good[..good.len() - 3].to_vec();
        let mut trailing = good.clone();
        trailing.push(0);
        let mut big_endian = good.clone();
        assert_eq!(big_endian[21], b'<');
        big_endian[21] = b'>';
        for bytes in [bad_magic, bad_version, truncated, trailing, big_endian] {
            assert!(matches!(
                read_npy(&mut bytes.as_slice()),
                Err(ExportError::MalformedArray { .. })
            ));
        }
    }

    #[test]
    fn huge_declared_shape_without_body_is_malformed() {
        for shape in [vec![1usize << 40], vec![usize::MAX / 16]] {
            let header = encode_header(Dtype::F8, &shape).unwrap();
            assert!(matches!(
                read_npy(&mut header.as_slice()),
                Err(ExportError::MalformedArray { .. })
            ));
        }
        let mut short = encode_header(Dtype::F4, &[1usize << 40]).unwrap();
        short.extend_from_slice(&1.0f32.to_le_bytes());
        assert!(matches!(
            read_npy(&mut short.as_slice()),
            Err(ExportError::MalformedArray { .. })
        ));
    }

    #[test]
    fn decode_rejects_fortran_order() {
        let mut bytes = encoded(&[2], &[1.0, 2.0]);
        let header = String::from_utf8_lossy(&bytes[10..80]).replace("False", "True ");
        bytes[10..80].copy_from_slice(header.as_bytes());
        assert!(read_npy(&mut bytes.as_slice()).is_err());
    }

    #[test]
    fn scalar_shape() {
        let buf = encoded(&[], &[4.0]);
        let a = read_npy(&mut buf.as_slice()).unwrap();
        assert!(a.shape.is_empty());
        assert_eq!(a.to_f64(), vec![4.0]);
    }

    proptest! {
        #[test]
        fn alignment_holds_for_any_shape(shape in prop::collection::vec(0usize..100_000, 0..6)) {
            let h = encode_header(Dtype::F8, &shape).unwrap();
            prop_assert_eq!(h.len() % HEADER_ALIGN, 0);
            let (_, parsed) = parse_header(std::str::from_utf8(&h[10..]).unwrap()).unwrap();
            prop_assert_eq!(parsed, shape);
        }
    }
}
