use std::collections::{HashMap, HashSet};

use crate::avcc::AvcConfigurationBox;
use crate::boxes::{FourCC, Payload};

/// Decodes the payload of a specific box type into an owned model.
///
/// The content slice is the box's exact content span; an implementation
/// must never look outside it. Errors are wrapped by the parser into a
/// structural-corruption error carrying the offset and box type chain.
pub trait BoxCodec: Send + Sync {
    fn parse(&self, typ: FourCC, content: &[u8]) -> anyhow::Result<Payload>;
}

/// Lookup key for a codec. `Within` entries disambiguate tags whose
/// meaning depends on the immediately enclosing box type; they win over
/// `Any` entries for the same tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxKey {
    Any(FourCC),
    Within { parent: FourCC, typ: FourCC },
}

/// Outcome of a registry lookup. `Unknown` is not a failure: the parser
/// keeps the payload bytes verbatim.
pub enum Resolved<'a> {
    Container,
    Codec(&'a dyn BoxCodec),
    Unknown,
}

/// Type-tag to box-implementation table.
///
/// Built once with the fluent `with_*` methods and never mutated during
/// parsing; lookups are pure, so one registry can serve concurrent parses
/// on separate threads.
pub struct Registry {
    codecs: HashMap<BoxKey, CodecEntry>,
    containers: HashSet<FourCC>,
}

struct CodecEntry {
    inner: Box<dyn BoxCodec>,
    _name: String,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
            containers: HashSet::new(),
        }
    }

    /// Return a new registry with the given codec added.
    ///
    /// `name` is human-readable and used only for debugging.
    pub fn with_codec(mut self, key: BoxKey, name: &str, codec: Box<dyn BoxCodec>) -> Self {
        self.codecs.insert(
            key,
            CodecEntry {
                inner: codec,
                _name: name.to_string(),
            },
        );
        self
    }

    /// Mark a tag as a pure container (its content is a sequence of
    /// sibling boxes with no leading fields).
    pub fn with_container(mut self, typ: FourCC) -> Self {
        self.containers.insert(typ);
        self
    }

    /// Resolve a tag to its implementation: parent-scoped codec first,
    /// then exact tag, then the container set, then the verbatim-raw
    /// fallback, which never fails.
    pub fn resolve(&self, typ: FourCC, parent: Option<FourCC>) -> Resolved<'_> {
        if let Some(parent) = parent {
            if let Some(e) = self.codecs.get(&BoxKey::Within { parent, typ }) {
                return Resolved::Codec(e.inner.as_ref());
            }
        }
        if let Some(e) = self.codecs.get(&BoxKey::Any(typ)) {
            return Resolved::Codec(e.inner.as_ref());
        }
        if self.containers.contains(&typ) {
            return Resolved::Container;
        }
        Resolved::Unknown
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------- Codecs ----------

pub struct AvcConfigCodec;

impl BoxCodec for AvcConfigCodec {
    fn parse(&self, _typ: FourCC, content: &[u8]) -> anyhow::Result<Payload> {
        Ok(Payload::AvcConfig(AvcConfigurationBox::parse(content)?))
    }
}

// ---------- Default registry ----------

/// The stock table: the `avcC` codec plus the plain ISOBMFF containers.
/// FullBox containers (`meta`, `stsd`, ...) carry fields before their
/// children and are deliberately left to the verbatim-raw fallback.
pub fn default_registry() -> Registry {
    let mut reg = Registry::new().with_codec(
        BoxKey::Any(FourCC(*b"avcC")),
        "avcC",
        Box::new(AvcConfigCodec),
    );
    for tag in [
        b"moov", b"trak", b"mdia", b"minf", b"stbl", b"edts",
        b"udta", b"dinf", b"mvex", b"moof", b"traf", b"mfra",
        b"tref", b"sinf", b"schi", b"ipro", b"meco", b"iprp",
        b"ipco",
    ] {
        reg = reg.with_container(FourCC(*tag));
    }
    reg
}
