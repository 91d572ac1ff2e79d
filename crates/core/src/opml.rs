//! OPML subscription list import.
//!
//! Every `<outline>` carrying an `xmlUrl` becomes a [`FeedSource`]. Outlines
//! without one are folders; a feed takes the name of its nearest enclosing
//! folder.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::Serialize;

use crate::feed::FeedSource;
use crate::{QuireError, Result};

/// A feed from an OPML file and the folder it was filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpmlOutline {
    pub folder: Option<String>,
    pub source: FeedSource,
}

enum Frame {
    Folder(String),
    Other,
}

/// Parses an OPML document into its feeds, in document order.
pub fn parse_opml(text: &str) -> Result<Vec<OpmlOutline>> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut saw_root = false;
    let mut frames: Vec<Frame> = Vec::new();
    let mut outlines = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| QuireError::OpmlError(format!("at byte {}: {}", reader.error_position(), e)))?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = e.name();

                if !saw_root {
                    if !name.as_ref().eq_ignore_ascii_case(b"opml") {
                        return Err(QuireError::OpmlError(format!(
                            "unexpected root element <{}>",
                            String::from_utf8_lossy(name.as_ref())
                        )));
                    }
                    saw_root = true;
                }

                let frame = if name.as_ref() == b"outline" {
                    let folder = current_folder(&frames);
                    match outline(e, folder) {
                        Some(feed) => {
                            outlines.push(feed);
                            Frame::Other
                        }
                        None => Frame::Folder(label(e).unwrap_or_default()),
                    }
                } else {
                    Frame::Other
                };

                if !is_empty {
                    frames.push(frame);
                }
            }
            Event::End(_) => {
                frames.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(QuireError::OpmlError("document has no <opml> element".to_string()));
    }
    Ok(outlines)
}

fn current_folder(frames: &[Frame]) -> Option<String> {
    frames.iter().rev().find_map(|frame| match frame {
        Frame::Folder(name) if !name.is_empty() => Some(name.clone()),
        _ => None,
    })
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn label(e: &BytesStart<'_>) -> Option<String> {
    attribute(e, b"title").or_else(|| attribute(e, b"text"))
}

fn outline(e: &BytesStart<'_>, folder: Option<String>) -> Option<OpmlOutline> {
    let url = attribute(e, b"xmlUrl")?;
    Some(OpmlOutline {
        folder,
        source: FeedSource { title: label(e).unwrap_or_else(|| url.clone()), site_url: attribute(e, b"htmlUrl"), url },
    })
}
