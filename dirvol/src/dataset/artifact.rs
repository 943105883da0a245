//! Dataset artifacts and their text encoding.
//!
//! Every artifact holds decimal text with one value per newline-terminated line.
//! Single value artifacts (dataspace, datatype, fill value) hold exactly one line, and the data artifact holds one line per element.

use derive_more::Display;
use dirvol_storage::{resolve, Bytes, NodeName, NodePath};
use thiserror::Error;

use super::ElementType;

/// One of the four files persisting a dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum ArtifactKind {
    /// The element count.
    #[display("dataspace")]
    Dataspace,
    /// The element type tag.
    #[display("datatype")]
    Datatype,
    /// The fill value.
    #[display("fillval")]
    FillValue,
    /// The elements.
    #[display("data")]
    Data,
}

impl ArtifactKind {
    /// The file extension of the artifact.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Dataspace => "dataspace",
            Self::Datatype => "datatype",
            Self::FillValue => "fillval",
            Self::Data => "data",
        }
    }

    /// The path of this artifact for the dataset `name` at `dataset_path`.
    #[must_use]
    pub fn path(self, dataset_path: &NodePath, name: &NodeName) -> NodePath {
        resolve(dataset_path, name, Some(self.extension()))
    }
}

/// An artifact decoding error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ArtifactDecodeError {
    /// The artifact is not valid UTF-8.
    #[error("artifact is not valid UTF-8")]
    InvalidUtf8,
    /// The last line of the artifact is not terminated.
    #[error("artifact does not end with a newline")]
    MissingNewline,
    /// A single value artifact is empty.
    #[error("artifact is empty")]
    Empty,
    /// A single value artifact holds more than one line.
    #[error("artifact holds more than one line")]
    ExtraLines,
    /// A line is not a decimal value in range.
    #[error("invalid decimal value {0:?}")]
    InvalidValue(String),
    /// The data artifact does not hold the expected number of elements.
    #[error("expected {expected} elements, found {found}")]
    ElementCount {
        /// The expected number of elements.
        expected: usize,
        /// The number of elements found.
        found: usize,
    },
}

fn encode_line(value: &str) -> Bytes {
    let mut line = String::with_capacity(value.len() + 1);
    line.push_str(value);
    line.push('\n');
    Bytes::from(line)
}

pub(crate) fn encode_extent(extent: u64) -> Bytes {
    encode_line(itoa::Buffer::new().format(extent))
}

pub(crate) fn encode_fill_value(fill_value: i32) -> Bytes {
    encode_line(itoa::Buffer::new().format(fill_value))
}

pub(crate) fn encode_element_type(element_type: ElementType) -> Bytes {
    encode_line(element_type.tag())
}

pub(crate) fn encode_elements(elements: impl IntoIterator<Item = i32>) -> Bytes {
    let mut buffer = itoa::Buffer::new();
    let mut encoded = Vec::new();
    for element in elements {
        encoded.extend_from_slice(buffer.format(element).as_bytes());
        encoded.push(b'\n');
    }
    Bytes::from(encoded)
}

fn text_lines(bytes: &[u8]) -> Result<impl Iterator<Item = &str>, ArtifactDecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ArtifactDecodeError::InvalidUtf8)?;
    let body = if text.is_empty() {
        None
    } else {
        Some(
            text.strip_suffix('\n')
                .ok_or(ArtifactDecodeError::MissingNewline)?,
        )
    };
    Ok(body.into_iter().flat_map(|body| body.split('\n')))
}

fn decode_line(bytes: &[u8]) -> Result<&str, ArtifactDecodeError> {
    let mut lines = text_lines(bytes)?;
    let line = lines.next().ok_or(ArtifactDecodeError::Empty)?;
    if lines.next().is_some() {
        return Err(ArtifactDecodeError::ExtraLines);
    }
    Ok(line)
}

fn parse<T: std::str::FromStr>(line: &str) -> Result<T, ArtifactDecodeError> {
    line.parse()
        .map_err(|_| ArtifactDecodeError::InvalidValue(line.to_string()))
}

pub(crate) fn decode_extent(bytes: &[u8]) -> Result<u64, ArtifactDecodeError> {
    parse(decode_line(bytes)?)
}

pub(crate) fn decode_fill_value(bytes: &[u8]) -> Result<i32, ArtifactDecodeError> {
    parse(decode_line(bytes)?)
}

/// Decode the raw tag of a datatype artifact, leaving its interpretation to the caller.
pub(crate) fn decode_element_type_tag(bytes: &[u8]) -> Result<&str, ArtifactDecodeError> {
    decode_line(bytes)
}

/// Decode exactly `elements.len()` elements into `elements`.
pub(crate) fn decode_elements_into(
    bytes: &[u8],
    elements: &mut [i32],
) -> Result<(), ArtifactDecodeError> {
    let expected = elements.len();
    let mut lines = text_lines(bytes)?;
    for (found, element) in elements.iter_mut().enumerate() {
        let line = lines
            .next()
            .ok_or(ArtifactDecodeError::ElementCount { expected, found })?;
        *element = parse(line)?;
    }
    let extra = lines.count();
    if extra > 0 {
        return Err(ArtifactDecodeError::ElementCount {
            expected,
            found: expected + extra,
        });
    }
    Ok(())
}
