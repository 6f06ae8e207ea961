use std::fmt;

use crate::avcc::AvcConfigurationBox;

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub fn from_str(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        if b.len() == 4 {
            Some(FourCC([b[0], b[1], b[2], b[3]]))
        } else { None }
    }
    pub fn as_str_lossy(&self) -> String {
        self.0.iter().map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }
}
impl fmt::Debug for FourCC { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str_lossy()) } }
impl fmt::Display for FourCC { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str_lossy()) } }

/// Geometry of a box header as read from a byte source.
#[derive(Debug, Clone)]
pub struct BoxHeader {
    pub size: u64,        // total size including header, or 0=to region end
    pub typ: FourCC,
    pub header_size: u64, // 8, or 16 with a 64-bit extended size
    pub start: u64,       // source offset of header start
}

/// An externally defined leaf payload, registered through the registry so
/// vendor box types round-trip as decoded models instead of raw bytes.
///
/// `write_content` must emit exactly `content_size()` bytes; the writer
/// checks the contract before anything reaches the sink.
pub trait CustomPayload: fmt::Debug + Send + Sync {
    fn content_size(&self) -> u64;
    fn write_content(&self, out: &mut Vec<u8>);
}

/// What a box owns. Containers own an ordered child list (each child has
/// exactly one parent); leaves own a payload model. Unknown types keep
/// their payload bytes verbatim so parse then write is the identity for
/// content the engine does not understand.
#[derive(Debug)]
pub enum Payload {
    Container(Vec<Mp4Box>),
    AvcConfig(AvcConfigurationBox),
    Raw(Vec<u8>),
    Custom(Box<dyn CustomPayload>),
}

#[derive(Debug)]
pub struct Mp4Box {
    pub typ: FourCC,
    pub payload: Payload,
}

impl Mp4Box {
    pub fn container(typ: FourCC, children: Vec<Mp4Box>) -> Self {
        Self { typ, payload: Payload::Container(children) }
    }

    pub fn raw(typ: FourCC, bytes: Vec<u8>) -> Self {
        Self { typ, payload: Payload::Raw(bytes) }
    }

    pub fn avc_config(config: AvcConfigurationBox) -> Self {
        Self { typ: FourCC(*b"avcC"), payload: Payload::AvcConfig(config) }
    }

    pub fn custom(typ: FourCC, payload: Box<dyn CustomPayload>) -> Self {
        Self { typ, payload: Payload::Custom(payload) }
    }

    pub fn is_container(&self) -> bool {
        matches!(self.payload, Payload::Container(_))
    }

    pub fn children(&self) -> Option<&[Mp4Box]> {
        match &self.payload {
            Payload::Container(kids) => Some(kids),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Mp4Box>> {
        match &mut self.payload {
            Payload::Container(kids) => Some(kids),
            _ => None,
        }
    }

    /// First direct child with the given type, if this is a container.
    pub fn find(&self, typ: FourCC) -> Option<&Mp4Box> {
        self.children()?.iter().find(|c| c.typ == typ)
    }

    /// Descend a dotted path of 4CCs (e.g. "trak.mdia.minf"), taking the
    /// first match at each level.
    pub fn find_path(&self, path: &str) -> Option<&Mp4Box> {
        let mut current = self;
        for seg in path.split('.') {
            let typ = FourCC::from_str(seg)?;
            current = current.find(typ)?;
        }
        Some(current)
    }
}
