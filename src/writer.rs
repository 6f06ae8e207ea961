use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};

use crate::boxes::{FourCC, Mp4Box, Payload};

#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("box {typ}: content pass emitted {emitted} byte(s), size pass computed {computed}")]
    SizeContract { typ: FourCC, computed: u64, emitted: u64 },
}

pub type Result<T> = std::result::Result<T, WriteError>;

impl Mp4Box {
    /// Content length in bytes, computed bottom-up: children before
    /// parents, leaves from their field layout.
    pub fn content_size(&self) -> u64 {
        match &self.payload {
            Payload::Container(kids) => kids.iter().map(|k| k.total_size()).sum(),
            Payload::AvcConfig(cfg) => cfg.content_size(),
            Payload::Raw(bytes) => bytes.len() as u64,
            Payload::Custom(p) => p.content_size(),
        }
    }

    /// Total on-wire size including the header; switches to the 16-byte
    /// extended-size header when the 32-bit field cannot hold it.
    pub fn total_size(&self) -> u64 {
        let content = self.content_size();
        if content + 8 > u32::MAX as u64 {
            content + 16
        } else {
            content + 8
        }
    }
}

/// Serialize sibling boxes to the sink, returning the bytes written.
///
/// Sizes are recomputed for every box; nothing read at parse time is
/// trusted. Leaf content is staged and length-checked against the size
/// pass before the box's first byte reaches the sink, so a size-contract
/// bug can never corrupt the siblings that follow.
pub fn write_tree<W: Write>(boxes: &[Mp4Box], w: &mut W) -> Result<u64> {
    let mut written = 0u64;
    for b in boxes {
        written += write_box(b, w)?;
    }
    Ok(written)
}

fn write_box<W: Write>(b: &Mp4Box, w: &mut W) -> Result<u64> {
    let content_size = b.content_size();
    let total = b.total_size();

    match &b.payload {
        Payload::Container(kids) => {
            write_header(w, b.typ, total)?;
            let mut emitted = 0u64;
            for k in kids {
                emitted += write_box(k, w)?;
            }
            // Children enforce their own contracts, so the sum always
            // matches the size pass.
            debug_assert_eq!(emitted, content_size);
        }
        Payload::Raw(bytes) => {
            write_header(w, b.typ, total)?;
            w.write_all(bytes)?;
        }
        Payload::AvcConfig(cfg) => {
            let mut staged = Vec::with_capacity(content_size as usize);
            cfg.write_content(&mut staged);
            check_contract(b.typ, content_size, staged.len() as u64)?;
            write_header(w, b.typ, total)?;
            w.write_all(&staged)?;
        }
        Payload::Custom(p) => {
            let mut staged = Vec::with_capacity(content_size as usize);
            p.write_content(&mut staged);
            check_contract(b.typ, content_size, staged.len() as u64)?;
            write_header(w, b.typ, total)?;
            w.write_all(&staged)?;
        }
    }
    Ok(total)
}

fn write_header<W: Write>(w: &mut W, typ: FourCC, total: u64) -> Result<()> {
    if total > u32::MAX as u64 {
        w.write_u32::<BigEndian>(1)?;
        w.write_all(&typ.0)?;
        w.write_u64::<BigEndian>(total)?;
    } else {
        w.write_u32::<BigEndian>(total as u32)?;
        w.write_all(&typ.0)?;
    }
    Ok(())
}

fn check_contract(typ: FourCC, computed: u64, emitted: u64) -> Result<()> {
    if computed != emitted {
        return Err(WriteError::SizeContract { typ, computed, emitted });
    }
    Ok(())
}
