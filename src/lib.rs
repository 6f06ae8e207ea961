pub mod avcc;
pub mod bits;
pub mod boxes;
pub mod codec;
pub mod parser;
pub mod registry;
pub mod summary;
pub mod writer;

pub use avcc::{AvcConfigError, AvcConfigurationBox};
pub use boxes::{BoxHeader, CustomPayload, FourCC, Mp4Box, Payload};
pub use parser::{BoxChain, ParseError, parse_children, parse_tree, read_box_header};
pub use registry::{BoxCodec, BoxKey, Registry, default_registry};
pub use summary::{BoxSummary, summarize, to_json};
pub use writer::{WriteError, write_tree};
