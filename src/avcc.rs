use serde::Serialize;

use crate::bits::{BitReader, BitWriter};
use crate::codec::{ByteReader, put_u8, put_u16};

/// Profiles whose decoder configuration carries the chroma/bit-depth
/// extension block (ISO/IEC 14496-15).
const EXT_PROFILES: [u8; 4] = [100, 110, 122, 144];

const MAX_SPS_COUNT: usize = 31; // 5-bit count field
const MAX_PPS_COUNT: usize = 255;
const MAX_EXT_COUNT: usize = 255;
const MAX_NAL_LEN: usize = 65535; // 16-bit length prefix

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvcConfigError {
    #[error("{what}: NAL unit is {len} bytes, limit {limit}")]
    NalTooLong { what: &'static str, len: usize, limit: usize },
    #[error("{what}: list already holds {len} entries, limit {limit}")]
    TooManyEntries { what: &'static str, len: usize, limit: usize },
    #[error("{what}: value {value} exceeds {max}")]
    OutOfRange { what: &'static str, value: u8, max: u8 },
}

/// AVC decoder configuration record, the `avcC` payload.
///
/// Parameter sets are opaque length-prefixed NAL units. The reserved bit
/// groups around the packed fields are kept as read, because not every
/// encoder writes them as all-ones and the record must re-serialize
/// byte-for-byte. When the extension block is absent, chroma format and
/// both bit-depth offsets read back as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvcConfigurationBox {
    pub configuration_version: u8,
    pub avc_profile_indication: u8,
    pub profile_compatibility: u8,
    pub avc_level_indication: u8,
    length_size_minus_one: u8,
    length_size_padding: u8, // 6 reserved bits
    sps_count_padding: u8,   // 3 reserved bits
    sequence_parameter_sets: Vec<Vec<u8>>,
    picture_parameter_sets: Vec<Vec<u8>>,
    has_exts: bool,
    chroma_format_padding: u8,    // 6 reserved bits
    chroma_format: Option<u8>,    // 2-bit field, None when the block is absent
    bit_depth_luma_padding: u8,   // 5 reserved bits
    bit_depth_luma_minus8: Option<u8>,
    bit_depth_chroma_padding: u8, // 5 reserved bits
    bit_depth_chroma_minus8: Option<u8>,
    sequence_parameter_set_exts: Vec<Vec<u8>>,
}

impl Default for AvcConfigurationBox {
    fn default() -> Self {
        Self {
            configuration_version: 1,
            avc_profile_indication: 66,
            profile_compatibility: 0,
            avc_level_indication: 0,
            length_size_minus_one: 3,
            length_size_padding: 0b11_1111,
            sps_count_padding: 0b111,
            sequence_parameter_sets: Vec::new(),
            picture_parameter_sets: Vec::new(),
            has_exts: true,
            chroma_format_padding: 0b11_1111,
            chroma_format: Some(1),
            bit_depth_luma_padding: 0b1_1111,
            bit_depth_luma_minus8: Some(0),
            bit_depth_chroma_padding: 0b1_1111,
            bit_depth_chroma_minus8: Some(0),
            sequence_parameter_set_exts: Vec::new(),
        }
    }
}

impl AvcConfigurationBox {
    /// Decode a record from the exact content span of an `avcC` box.
    ///
    /// Bytes the layout does not account for are an error, never silently
    /// skipped: a record that parses also re-serializes identically.
    pub fn parse(content: &[u8]) -> anyhow::Result<Self> {
        let mut r = ByteReader::new(content);
        let mut cfg = Self {
            configuration_version: r.u8()?,
            avc_profile_indication: r.u8()?,
            profile_compatibility: r.u8()?,
            avc_level_indication: r.u8()?,
            ..Self::default()
        };

        let mut bits = BitReader::new(r.take(2)?);
        cfg.length_size_padding = bits.read_bits(6)? as u8;
        cfg.length_size_minus_one = bits.read_bits(2)? as u8;
        cfg.sps_count_padding = bits.read_bits(3)? as u8;
        let sps_count = bits.read_bits(5)? as usize;

        cfg.sequence_parameter_sets = read_nal_units(&mut r, sps_count)?;
        let pps_count = r.u8()? as usize;
        cfg.picture_parameter_sets = read_nal_units(&mut r, pps_count)?;

        cfg.has_exts = r.remaining() >= 4;
        if cfg.has_exts && profile_has_exts(cfg.avc_profile_indication) {
            let mut bits = BitReader::new(r.take(3)?);
            cfg.chroma_format_padding = bits.read_bits(6)? as u8;
            cfg.chroma_format = Some(bits.read_bits(2)? as u8);
            cfg.bit_depth_luma_padding = bits.read_bits(5)? as u8;
            cfg.bit_depth_luma_minus8 = Some(bits.read_bits(3)? as u8);
            cfg.bit_depth_chroma_padding = bits.read_bits(5)? as u8;
            cfg.bit_depth_chroma_minus8 = Some(bits.read_bits(3)? as u8);
            let ext_count = r.u8()? as usize;
            cfg.sequence_parameter_set_exts = read_nal_units(&mut r, ext_count)?;
        } else {
            cfg.chroma_format = None;
            cfg.bit_depth_luma_minus8 = None;
            cfg.bit_depth_chroma_minus8 = None;
        }

        if r.remaining() > 0 {
            anyhow::bail!(
                "{} trailing byte(s) after decoder configuration record",
                r.remaining()
            );
        }
        Ok(cfg)
    }

    /// Content length in bytes, derived from the field layout. The box
    /// writer relies on `write_content` emitting exactly this many bytes.
    pub fn content_size(&self) -> u64 {
        let mut size = 5u64; // fixed fields + packed length-size byte
        size += 1;
        for sps in &self.sequence_parameter_sets {
            size += 2 + sps.len() as u64;
        }
        size += 1;
        for pps in &self.picture_parameter_sets {
            size += 2 + pps.len() as u64;
        }
        if self.writes_exts() {
            size += 4;
            for ext in &self.sequence_parameter_set_exts {
                size += 2 + ext.len() as u64;
            }
        }
        size
    }

    pub fn write_content(&self, out: &mut Vec<u8>) {
        put_u8(out, self.configuration_version);
        put_u8(out, self.avc_profile_indication);
        put_u8(out, self.profile_compatibility);
        put_u8(out, self.avc_level_indication);

        let mut bits = BitWriter::new();
        bits.write_bits(self.length_size_padding as u32, 6);
        bits.write_bits(self.length_size_minus_one as u32, 2);
        bits.write_bits(self.sps_count_padding as u32, 3);
        bits.write_bits(self.sequence_parameter_sets.len() as u32, 5);
        out.extend_from_slice(&bits.into_bytes());
        write_nal_units(out, &self.sequence_parameter_sets);

        put_u8(out, self.picture_parameter_sets.len() as u8);
        write_nal_units(out, &self.picture_parameter_sets);

        if self.writes_exts() {
            let mut bits = BitWriter::new();
            bits.write_bits(self.chroma_format_padding as u32, 6);
            bits.write_bits(self.chroma_format.unwrap_or(1) as u32, 2);
            bits.write_bits(self.bit_depth_luma_padding as u32, 5);
            bits.write_bits(self.bit_depth_luma_minus8.unwrap_or(0) as u32, 3);
            bits.write_bits(self.bit_depth_chroma_padding as u32, 5);
            bits.write_bits(self.bit_depth_chroma_minus8.unwrap_or(0) as u32, 3);
            out.extend_from_slice(&bits.into_bytes());
            put_u8(out, self.sequence_parameter_set_exts.len() as u8);
            write_nal_units(out, &self.sequence_parameter_set_exts);
        }
    }

    fn writes_exts(&self) -> bool {
        self.has_exts
            && profile_has_exts(self.avc_profile_indication)
            && self.chroma_format.is_some()
    }

    pub fn length_size_minus_one(&self) -> u8 {
        self.length_size_minus_one
    }

    pub fn set_length_size_minus_one(&mut self, v: u8) -> Result<(), AvcConfigError> {
        check_range("length_size_minus_one", v, 3)?;
        self.length_size_minus_one = v;
        Ok(())
    }

    pub fn sequence_parameter_sets(&self) -> &[Vec<u8>] {
        &self.sequence_parameter_sets
    }

    pub fn add_sequence_parameter_set(&mut self, nal: Vec<u8>) -> Result<(), AvcConfigError> {
        check_nal("sequence_parameter_sets", &nal)?;
        check_count("sequence_parameter_sets", self.sequence_parameter_sets.len(), MAX_SPS_COUNT)?;
        self.sequence_parameter_sets.push(nal);
        Ok(())
    }

    pub fn picture_parameter_sets(&self) -> &[Vec<u8>] {
        &self.picture_parameter_sets
    }

    pub fn add_picture_parameter_set(&mut self, nal: Vec<u8>) -> Result<(), AvcConfigError> {
        check_nal("picture_parameter_sets", &nal)?;
        check_count("picture_parameter_sets", self.picture_parameter_sets.len(), MAX_PPS_COUNT)?;
        self.picture_parameter_sets.push(nal);
        Ok(())
    }

    pub fn sequence_parameter_set_exts(&self) -> &[Vec<u8>] {
        &self.sequence_parameter_set_exts
    }

    pub fn add_sequence_parameter_set_ext(&mut self, nal: Vec<u8>) -> Result<(), AvcConfigError> {
        check_nal("sequence_parameter_set_exts", &nal)?;
        check_count("sequence_parameter_set_exts", self.sequence_parameter_set_exts.len(), MAX_EXT_COUNT)?;
        self.sequence_parameter_set_exts.push(nal);
        Ok(())
    }

    pub fn has_exts(&self) -> bool {
        self.has_exts
    }

    pub fn set_has_exts(&mut self, has_exts: bool) {
        self.has_exts = has_exts;
    }

    pub fn chroma_format(&self) -> Option<u8> {
        self.chroma_format
    }

    pub fn set_chroma_format(&mut self, v: u8) -> Result<(), AvcConfigError> {
        check_range("chroma_format", v, 3)?;
        self.chroma_format = Some(v);
        Ok(())
    }

    pub fn bit_depth_luma_minus8(&self) -> Option<u8> {
        self.bit_depth_luma_minus8
    }

    pub fn set_bit_depth_luma_minus8(&mut self, v: u8) -> Result<(), AvcConfigError> {
        check_range("bit_depth_luma_minus8", v, 7)?;
        self.bit_depth_luma_minus8 = Some(v);
        Ok(())
    }

    pub fn bit_depth_chroma_minus8(&self) -> Option<u8> {
        self.bit_depth_chroma_minus8
    }

    pub fn set_bit_depth_chroma_minus8(&mut self, v: u8) -> Result<(), AvcConfigError> {
        check_range("bit_depth_chroma_minus8", v, 7)?;
        self.bit_depth_chroma_minus8 = Some(v);
        Ok(())
    }
}

fn profile_has_exts(profile: u8) -> bool {
    EXT_PROFILES.contains(&profile)
}

fn read_nal_units(r: &mut ByteReader<'_>, count: usize) -> anyhow::Result<Vec<Vec<u8>>> {
    let mut units = Vec::with_capacity(count);
    for _ in 0..count {
        let len = r.u16()? as usize;
        units.push(r.take(len)?.to_vec());
    }
    Ok(units)
}

fn write_nal_units(out: &mut Vec<u8>, units: &[Vec<u8>]) {
    for nal in units {
        put_u16(out, nal.len() as u16);
        out.extend_from_slice(nal);
    }
}

fn check_nal(what: &'static str, nal: &[u8]) -> Result<(), AvcConfigError> {
    if nal.len() > MAX_NAL_LEN {
        return Err(AvcConfigError::NalTooLong { what, len: nal.len(), limit: MAX_NAL_LEN });
    }
    Ok(())
}

fn check_count(what: &'static str, len: usize, limit: usize) -> Result<(), AvcConfigError> {
    if len >= limit {
        return Err(AvcConfigError::TooManyEntries { what, len, limit });
    }
    Ok(())
}

fn check_range(what: &'static str, value: u8, max: u8) -> Result<(), AvcConfigError> {
    if value > max {
        return Err(AvcConfigError::OutOfRange { what, value, max });
    }
    Ok(())
}
