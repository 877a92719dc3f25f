//! Streaming reader for DU performance-management measurement files.
//!
//! Elements are matched on their local name only, so documents that bind the
//! measData schema to a prefix, to a default namespace, or to nothing at all
//! are read the same way. Both the 3GPP TS 28.550 layout (`measTypes` text,
//! `measResults` text) and the TS 32.435 layout (`measType p=`, `r p=`) are
//! understood.

use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::errors::ParseError;
use crate::models::{MeasResults, MeasurementBlock, MeasurementDocument, ValueEntry};
use crate::utils::split_tokens;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parses one PM XML document held in memory.
///
/// The result depends only on `bytes`; `filename` is carried through for
/// provenance and error messages.
pub fn parse_document(filename: &str, bytes: &[u8]) -> Result<MeasurementDocument, ParseError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = Reader::from_reader(bytes);
    // Text is kept untrimmed so fragments split by comments or CDATA keep
    // their separating whitespace; captures trim once when they close.
    reader.config_mut().trim_text(false);

    let mut builder = DocumentBuilder::default();
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut saw_root = false;

    loop {
        let position = reader.buffer_position() as u64;
        let malformed = |source: quick_xml::Error| ParseError::Malformed {
            filename: filename.to_string(),
            position,
            source,
        };

        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if depth == 0 && saw_root {
                    return Err(structure(filename, "content after the document element"));
                }
                saw_root = true;
                depth += 1;
                builder.open(&e).map_err(malformed)?;
            }
            Ok(Event::Empty(e)) => {
                if depth == 0 && saw_root {
                    return Err(structure(filename, "content after the document element"));
                }
                saw_root = true;
                builder.open(&e).map_err(malformed)?;
                builder.close(e.local_name().as_ref());
            }
            Ok(Event::End(e)) => {
                if depth == 0 {
                    return Err(structure(filename, "closing tag without an open element"));
                }
                depth -= 1;
                builder.close(e.local_name().as_ref());
            }
            Ok(Event::Text(t)) => {
                if builder.capturing() {
                    let text = t.unescape().map_err(malformed)?;
                    builder.push_text(&text);
                }
            }
            Ok(Event::CData(c)) => {
                if builder.capturing() {
                    builder.push_text(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(malformed(e)),
        }
        buf.clear();
    }

    if !saw_root {
        return Err(structure(filename, "no document element found"));
    }
    if depth != 0 {
        return Err(structure(filename, "document ended with unclosed elements"));
    }

    let document = builder.finish(filename);
    debug!(
        "Parsed {}: source '{}', {} measurement blocks",
        filename,
        document.source_name,
        document.blocks.len()
    );
    Ok(document)
}

fn structure(filename: &str, message: &str) -> ParseError {
    ParseError::Structure {
        filename: filename.to_string(),
        message: message.to_string(),
    }
}

/// Reads an attribute by local name.
fn attribute(e: &BytesStart, name: &[u8]) -> quick_xml::Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Leaf element whose text is being collected.
#[derive(Debug)]
enum Capture {
    SenderName,
    MeasTypes,
    MeasType { p: String },
    Duration,
    EndTime,
    MeasResults,
    R { p: String },
}

impl Capture {
    fn element(&self) -> &'static [u8] {
        match self {
            Capture::SenderName => b"senderName",
            Capture::MeasTypes => b"measTypes",
            Capture::MeasType { .. } => b"measType",
            Capture::Duration => b"duration",
            Capture::EndTime => b"endTime",
            Capture::MeasResults => b"measResults",
            Capture::R { .. } => b"r",
        }
    }
}

#[derive(Debug, Default)]
struct BlockBuilder {
    meas_types_text: Option<String>,
    keyed_types: Vec<(String, String)>,
    duration: Option<String>,
    end_time: Option<String>,
    entries: Vec<ValueEntry>,
}

impl BlockBuilder {
    fn finish(self) -> Option<MeasurementBlock> {
        let names = self.meas_types_text.as_deref().map(split_tokens).unwrap_or_default();
        let (counter_names, counter_positions) = if !names.is_empty() {
            (names, Vec::new())
        } else if !self.keyed_types.is_empty() {
            let (positions, names): (Vec<String>, Vec<String>) =
                self.keyed_types.into_iter().unzip();
            (names, positions)
        } else {
            debug!("Skipping measInfo without counter names");
            return None;
        };

        let mut block = MeasurementBlock {
            counter_names,
            counter_positions,
            value_entries: self.entries,
            ..Default::default()
        };
        if let Some(duration) = self.duration {
            block.granularity_duration = duration;
        }
        if let Some(end_time) = self.end_time {
            block.granularity_end_time = end_time;
        }
        Some(block)
    }
}

#[derive(Debug, Default)]
struct EntryBuilder {
    object_dn: String,
    results_text: Option<String>,
    keyed: Vec<(String, String)>,
}

impl EntryBuilder {
    fn finish(self) -> Option<ValueEntry> {
        let values = self.results_text.as_deref().map(split_tokens).unwrap_or_default();
        let results = if !values.is_empty() {
            MeasResults::Positional(values)
        } else if !self.keyed.is_empty() {
            MeasResults::Keyed(self.keyed)
        } else {
            debug!("Skipping measValue '{}' without results", self.object_dn);
            return None;
        };
        Some(ValueEntry {
            object_dn: self.object_dn,
            results,
        })
    }
}

#[derive(Debug, Default)]
struct DocumentBuilder {
    source_name: Option<String>,
    blocks: Vec<MeasurementBlock>,
    block: Option<BlockBuilder>,
    entry: Option<EntryBuilder>,
    in_header: bool,
    in_gran_period: bool,
    capture: Option<Capture>,
    text: String,
}

impl DocumentBuilder {
    fn capturing(&self) -> bool {
        self.capture.is_some()
    }

    fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn start_capture(&mut self, capture: Capture) {
        self.text.clear();
        self.capture = Some(capture);
    }

    fn open(&mut self, e: &BytesStart) -> quick_xml::Result<()> {
        match e.local_name().as_ref() {
            b"fileHeader" => self.in_header = true,
            b"senderName" if self.in_header => self.start_capture(Capture::SenderName),
            b"fileSender" => {
                if let Some(name) = attribute(e, b"senderName")? {
                    self.source_name.get_or_insert(name);
                }
            }
            b"measInfo" => {
                self.block = Some(BlockBuilder::default());
                self.entry = None;
            }
            b"measTypes" if self.block.is_some() => self.start_capture(Capture::MeasTypes),
            b"measType" => {
                if let Some(block) = &self.block {
                    let p = match attribute(e, b"p")? {
                        Some(p) => p,
                        None => (block.keyed_types.len() + 1).to_string(),
                    };
                    self.start_capture(Capture::MeasType { p });
                }
            }
            b"granPeriod" => {
                if let Some(block) = self.block.as_mut() {
                    self.in_gran_period = true;
                    if let Some(duration) = attribute(e, b"duration")? {
                        block.duration = non_empty(&duration);
                    }
                    if let Some(end_time) = attribute(e, b"endTime")? {
                        block.end_time = non_empty(&end_time);
                    }
                }
            }
            b"duration" if self.in_gran_period => self.start_capture(Capture::Duration),
            b"endTime" if self.in_gran_period => self.start_capture(Capture::EndTime),
            b"measValue" if self.block.is_some() => {
                let object_dn = attribute(e, b"measObjLdn")?.unwrap_or_default();
                self.entry = Some(EntryBuilder {
                    object_dn,
                    ..Default::default()
                });
            }
            b"measResults" if self.entry.is_some() => self.start_capture(Capture::MeasResults),
            b"r" => {
                if let Some(entry) = &self.entry {
                    let p = match attribute(e, b"p")? {
                        Some(p) => p,
                        None => (entry.keyed.len() + 1).to_string(),
                    };
                    self.start_capture(Capture::R { p });
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        if self.capture.as_ref().map_or(false, |c| c.element() == name) {
            if let Some(capture) = self.capture.take() {
                let text = std::mem::take(&mut self.text);
                self.finish_capture(capture, text);
            }
            return;
        }

        match name {
            b"fileHeader" => self.in_header = false,
            b"granPeriod" => self.in_gran_period = false,
            b"measValue" => {
                if let Some(entry) = self.entry.take().and_then(EntryBuilder::finish) {
                    if let Some(block) = self.block.as_mut() {
                        block.entries.push(entry);
                    }
                }
            }
            b"measInfo" => {
                self.entry = None;
                self.in_gran_period = false;
                if let Some(block) = self.block.take().and_then(BlockBuilder::finish) {
                    self.blocks.push(block);
                }
            }
            _ => {}
        }
    }

    fn finish_capture(&mut self, capture: Capture, text: String) {
        match capture {
            Capture::SenderName => {
                if let Some(name) = non_empty(&text) {
                    self.source_name.get_or_insert(name);
                }
            }
            Capture::MeasTypes => {
                if let Some(block) = self.block.as_mut() {
                    block.meas_types_text = Some(text);
                }
            }
            Capture::MeasType { p } => {
                if let (Some(block), Some(name)) = (self.block.as_mut(), non_empty(&text)) {
                    block.keyed_types.push((p, name));
                }
            }
            Capture::Duration => {
                if let Some(block) = self.block.as_mut() {
                    block.duration = non_empty(&text).or(block.duration.take());
                }
            }
            Capture::EndTime => {
                if let Some(block) = self.block.as_mut() {
                    block.end_time = non_empty(&text).or(block.end_time.take());
                }
            }
            Capture::MeasResults => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.results_text = Some(text);
                }
            }
            Capture::R { p } => {
                if let (Some(entry), Some(value)) = (self.entry.as_mut(), non_empty(&text)) {
                    entry.keyed.push((p, value));
                }
            }
        }
    }

    fn finish(self, filename: &str) -> MeasurementDocument {
        MeasurementDocument {
            filename: filename.to_string(),
            source_name: self.source_name.unwrap_or_default(),
            blocks: self.blocks,
        }
    }
}
