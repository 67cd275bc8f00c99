//! Reads a float matrix stored as a graph initializer inside an ONNX file.
//!
//! ONNX Runtime does not expose initializers, and the inswapper embedding
//! map lives there (last initializer, 512x512). This walks just enough of
//! the protobuf wire format to pull it out:
//! `ModelProto.graph (7) → GraphProto.initializer (5) → TensorProto`.

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use thiserror::Error;

const MODEL_GRAPH: u32 = 7;
const GRAPH_INITIALIZER: u32 = 5;
const TENSOR_DIMS: u32 = 1;
const TENSOR_DATA_TYPE: u32 = 2;
const TENSOR_FLOAT_DATA: u32 = 4;
const TENSOR_NAME: u32 = 8;
const TENSOR_RAW_DATA: u32 = 9;

/// `TensorProto.DataType.FLOAT`
const DATA_TYPE_FLOAT: u64 = 1;

#[derive(Error, Debug)]
pub enum InitializerError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed ONNX model: {0}")]
    Malformed(&'static str),
    #[error("model graph has no initializers")]
    Missing,
    #[error("initializer '{name}' is not a 2-D float matrix (dims {dims:?}, type {data_type})")]
    Unsupported {
        name: String,
        dims: Vec<u64>,
        data_type: u64,
    },
}

/// The last graph initializer of the model at `path`, as a 2-D matrix.
pub fn read_last_initializer(path: &Path) -> Result<Array2<f32>, InitializerError> {
    let bytes = fs::read(path).map_err(|e| InitializerError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    last_initializer_matrix(&bytes)
}

pub fn last_initializer_matrix(model: &[u8]) -> Result<Array2<f32>, InitializerError> {
    let graph = last_bytes_field(model, MODEL_GRAPH)?
        .ok_or(InitializerError::Malformed("model has no graph"))?;
    let tensor = last_bytes_field(graph, GRAPH_INITIALIZER)?.ok_or(InitializerError::Missing)?;
    parse_matrix(tensor)
}

enum Value<'a> {
    Varint(u64),
    Fixed64,
    Bytes(&'a [u8]),
    Fixed32(&'a [u8]),
}

struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn varint(&mut self) -> Result<u64, InitializerError> {
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let byte = *self
                .buf
                .get(self.pos)
                .ok_or(InitializerError::Malformed("truncated varint"))?;
            self.pos += 1;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(InitializerError::Malformed("varint too long"))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], InitializerError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or(InitializerError::Malformed("field runs past end of buffer"))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn next_field(&mut self) -> Result<Option<(u32, Value<'a>)>, InitializerError> {
        if self.pos >= self.buf.len() {
            return Ok(None);
        }
        let key = self.varint()?;
        let field = (key >> 3) as u32;
        let value = match key & 0x7 {
            0 => Value::Varint(self.varint()?),
            1 => {
                self.take(8)?;
                Value::Fixed64
            }
            2 => {
                let len = self.varint()? as usize;
                Value::Bytes(self.take(len)?)
            }
            5 => Value::Fixed32(self.take(4)?),
            _ => return Err(InitializerError::Malformed("unsupported wire type")),
        };
        Ok(Some((field, value)))
    }
}

fn last_bytes_field(message: &[u8], wanted: u32) -> Result<Option<&[u8]>, InitializerError> {
    let mut reader = WireReader::new(message);
    let mut last = None;
    while let Some((field, value)) = reader.next_field()? {
        if let (true, Value::Bytes(bytes)) = (field == wanted, value) {
            last = Some(bytes);
        }
    }
    Ok(last)
}

fn parse_matrix(tensor: &[u8]) -> Result<Array2<f32>, InitializerError> {
    let mut dims = Vec::new();
    let mut data_type = 0;
    let mut name = String::new();
    let mut values: Vec<f32> = Vec::new();

    let mut reader = WireReader::new(tensor);
    while let Some((field, value)) = reader.next_field()? {
        match (field, value) {
            (TENSOR_DIMS, Value::Varint(d)) => dims.push(d),
            (TENSOR_DIMS, Value::Bytes(packed)) => {
                let mut inner = WireReader::new(packed);
                while inner.pos < packed.len() {
                    dims.push(inner.varint()?);
                }
            }
            (TENSOR_DATA_TYPE, Value::Varint(t)) => data_type = t,
            (TENSOR_FLOAT_DATA, Value::Bytes(packed)) => values.extend(le_floats(packed)),
            (TENSOR_FLOAT_DATA, Value::Fixed32(single)) => values.extend(le_floats(single)),
            (TENSOR_NAME, Value::Bytes(raw)) => name = String::from_utf8_lossy(raw).into_owned(),
            (TENSOR_RAW_DATA, Value::Bytes(raw)) => values = le_floats(raw).collect(),
            _ => {}
        }
    }

    let unsupported = |dims: Vec<u64>| InitializerError::Unsupported {
        name: name.clone(),
        dims,
        data_type,
    };
    if data_type != DATA_TYPE_FLOAT || dims.len() != 2 {
        return Err(unsupported(dims));
    }
    let (Ok(rows), Ok(cols)) = (usize::try_from(dims[0]), usize::try_from(dims[1])) else {
        return Err(InitializerError::Malformed("initializer dims exceed address space"));
    };
    let shape = (rows, cols);
    if rows.checked_mul(cols) != Some(values.len()) {
        return Err(InitializerError::Malformed("initializer data length does not match dims"));
    }
    Array2::from_shape_vec(shape, values).map_err(|_| unsupported(dims))
}

fn le_floats(bytes: &[u8]) -> impl Iterator<Item = f32> + '_ {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}
