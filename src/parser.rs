use std::fmt;
use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};

use crate::boxes::{BoxHeader, FourCC, Mp4Box, Payload};
use crate::registry::{Registry, Resolved};

/// Box type chain from the outermost ancestor down to the failing box,
/// e.g. `moov/trak/mdia`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxChain(Vec<FourCC>);

impl BoxChain {
    fn single(typ: FourCC) -> Self {
        Self(vec![typ])
    }

    fn prepend(&mut self, typ: FourCC) {
        self.0.insert(0, typ);
    }

    pub fn tags(&self) -> &[FourCC] {
        &self.0
    }
}

impl fmt::Display for BoxChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, t) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{t}")?;
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid box size {size} at {offset:#x}")]
    InvalidSize { size: u64, offset: u64 },
    #[error("truncated box header at {offset:#x}: {left} byte(s) left in region")]
    TruncatedHeader { offset: u64, left: u64 },
    #[error("box {chain} at {offset:#x}: declared size {size} exceeds region end {end:#x}")]
    SizeBeyondRegion { chain: BoxChain, offset: u64, size: u64, end: u64 },
    #[error("box {chain} payload at {offset:#x}: {source}")]
    Payload {
        chain: BoxChain,
        offset: u64,
        #[source]
        source: anyhow::Error,
    },
}

impl ParseError {
    fn with_parent(mut self, typ: FourCC) -> Self {
        match &mut self {
            ParseError::SizeBeyondRegion { chain, .. } | ParseError::Payload { chain, .. } => {
                chain.prepend(typ);
            }
            _ => {}
        }
        self
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Read one box header at the current position: 32-bit size and 4-byte
/// tag, with `size == 1` switching to a following 64-bit size. A declared
/// size smaller than the header itself (other than the to-region-end
/// marker 0) is corrupt.
pub fn read_box_header<R: Read + Seek>(r: &mut R) -> Result<BoxHeader> {
    let start = r.stream_position()?;
    let size32 = r.read_u32::<BigEndian>()?;
    let mut typ = [0u8; 4];
    r.read_exact(&mut typ)?;
    let mut size = size32 as u64;
    let mut header_size = 8u64;

    if size32 == 1 {
        size = r.read_u64::<BigEndian>()?;
        header_size = 16;
    }

    if size != 0 && size < header_size {
        return Err(ParseError::InvalidSize { size, offset: start });
    }

    Ok(BoxHeader { size, typ: FourCC(typ), header_size, start })
}

/// Parse every box in `[offset, offset + len)` into an owned tree.
///
/// The declared size of each box is bounds-checked against the enclosing
/// region, and a payload codec only ever sees its exact content span, so
/// a corrupt box cannot bleed into its siblings.
pub fn parse_tree<R: Read + Seek>(
    r: &mut R,
    registry: &Registry,
    offset: u64,
    len: u64,
) -> Result<Vec<Mp4Box>> {
    r.seek(SeekFrom::Start(offset))?;
    parse_children(r, registry, offset + len, None)
}

/// Parse sibling boxes until `parent_end`. Fewer than 8 bytes of trailing
/// region is a truncated header, not a silent stop.
pub fn parse_children<R: Read + Seek>(
    r: &mut R,
    registry: &Registry,
    parent_end: u64,
    parent: Option<FourCC>,
) -> Result<Vec<Mp4Box>> {
    let mut kids = Vec::new();
    loop {
        let pos = r.stream_position()?;
        if pos >= parent_end {
            break;
        }
        if parent_end - pos < 8 {
            return Err(ParseError::TruncatedHeader { offset: pos, left: parent_end - pos });
        }

        let h = read_box_header(r)?;
        let box_end = if h.size == 0 { parent_end } else { h.start + h.size };
        if box_end > parent_end {
            return Err(ParseError::SizeBeyondRegion {
                chain: BoxChain::single(h.typ),
                offset: h.start,
                size: h.size,
                end: parent_end,
            });
        }
        let content_start = h.start + h.header_size;
        if content_start > box_end {
            // size==0 box whose region cannot even hold the header
            return Err(ParseError::InvalidSize { size: h.size, offset: h.start });
        }
        let content_len = box_end - content_start;

        let payload = match registry.resolve(h.typ, parent) {
            Resolved::Container => {
                let children = parse_children(r, registry, box_end, Some(h.typ))
                    .map_err(|e| e.with_parent(h.typ))?;
                Payload::Container(children)
            }
            Resolved::Codec(codec) => {
                let content = read_slice(r, content_start, content_len)?;
                codec.parse(h.typ, &content).map_err(|e| ParseError::Payload {
                    chain: BoxChain::single(h.typ),
                    offset: content_start,
                    source: e,
                })?
            }
            Resolved::Unknown => Payload::Raw(read_slice(r, content_start, content_len)?),
        };

        r.seek(SeekFrom::Start(box_end))?;
        kids.push(Mp4Box { typ: h.typ, payload });
    }
    Ok(kids)
}

fn read_slice<R: Read + Seek>(r: &mut R, offset: u64, len: u64) -> std::io::Result<Vec<u8>> {
    r.seek(SeekFrom::Start(offset))?;
    let mut v = vec![0u8; len as usize];
    r.read_exact(&mut v)?;
    Ok(v)
}
