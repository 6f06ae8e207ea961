use serde::Serialize;

use crate::boxes::{Mp4Box, Payload};

const PREVIEW_BYTES: usize = 16;

/// A JSON-serializable view of one box in an owned tree.
///
/// Sizes are the on-wire sizes the writer would emit. Raw payloads get a
/// short hex preview instead of the full byte dump.
#[derive(Serialize, Debug)]
pub struct BoxSummary {
    pub typ: String,
    pub size: u64,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<BoxSummary>>,
}

pub fn summarize(boxes: &[Mp4Box]) -> Vec<BoxSummary> {
    boxes.iter().map(summarize_box).collect()
}

pub fn to_json(boxes: &[Mp4Box]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&summarize(boxes))
}

fn summarize_box(b: &Mp4Box) -> BoxSummary {
    let (kind, preview, children) = match &b.payload {
        Payload::Container(kids) => (
            "container",
            None,
            Some(kids.iter().map(summarize_box).collect()),
        ),
        Payload::AvcConfig(_) | Payload::Custom(_) => ("leaf", None, None),
        Payload::Raw(bytes) => {
            let n = bytes.len().min(PREVIEW_BYTES);
            let mut preview = hex::encode(&bytes[..n]);
            if bytes.len() > PREVIEW_BYTES {
                preview.push_str("..");
            }
            ("unknown", Some(preview), None)
        }
    };

    BoxSummary {
        typ: b.typ.to_string(),
        size: b.total_size(),
        kind: kind.to_string(),
        preview,
        children,
    }
}
