//! Streaming device record parser
//!
//! Reads one XML file with a namespace-aware pull parser and evaluates the
//! selected profile's field-path table against every `<device>` element.
//! Only the first element matching a path is used, and only its direct text
//! before any child element, so an empty first match yields null even when a
//! later sibling carries text.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::reader::NsReader;
use tracing::debug;

use super::profile::ParseProfile;
use crate::app::models::{DeviceField, DeviceRecord};
use crate::{Error, Result};

/// Parser for GUDID device export files
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceParser {
    profile: ParseProfile,
}

/// Text capture for the field element currently open
#[derive(Debug)]
struct Capture {
    field: DeviceField,
    depth: usize,
    text: String,
    /// Cleared once a child element starts
    open: bool,
}

/// A `<device>` element being assembled
#[derive(Debug)]
struct OpenDevice {
    depth: usize,
    /// Local names below the device, `None` for elements outside the profile namespace
    path: Vec<Option<String>>,
    matched: [bool; 9],
    capture: Option<Capture>,
    record: DeviceRecord,
}

impl OpenDevice {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            path: Vec::new(),
            matched: [false; 9],
            capture: None,
            record: DeviceRecord::new(),
        }
    }
}

/// Document walk state
#[derive(Debug, Default)]
struct WalkState {
    depth: usize,
    saw_root: bool,
    device: Option<OpenDevice>,
    records: Vec<DeviceRecord>,
}

impl DeviceParser {
    /// Create a parser for the given profile
    pub fn new(profile: ParseProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> ParseProfile {
        self.profile
    }

    /// Parse an XML file and return its device records in document order
    pub fn parse_file(&self, file_path: &Path) -> Result<Vec<DeviceRecord>> {
        let file = File::open(file_path).map_err(|e| {
            Error::parse(file_path, format!("Failed to open file: {}", e), None)
        })?;

        let records = self.parse_reader(BufReader::new(file), file_path)?;
        debug!(
            "Found {} devices in: {}",
            records.len(),
            file_path.display()
        );
        Ok(records)
    }

    /// Parse XML from any buffered reader; `source` labels errors
    pub fn parse_reader<R: BufRead>(&self, input: R, source: &Path) -> Result<Vec<DeviceRecord>> {
        let mut reader = NsReader::from_reader(input);
        let mut buf = Vec::new();
        let mut state = WalkState::default();

        loop {
            let (in_namespace, event) = match reader.read_resolved_event_into(&mut buf) {
                Ok((resolved, event)) => (self.profile.matches_namespace(&resolved), event),
                Err(e) => {
                    return Err(Error::parse(
                        source,
                        format!("Malformed XML: {}", e),
                        Some(e),
                    ));
                }
            };

            match event {
                Event::Start(ref e) => {
                    Self::reject_after_root(&state, source)?;
                    let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    self.open_element(&mut state, local, in_namespace);
                }
                Event::Empty(ref e) => {
                    Self::reject_after_root(&state, source)?;
                    let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    self.open_element(&mut state, local, in_namespace);
                    self.close_element(&mut state);
                }
                Event::End(_) => {
                    self.close_element(&mut state);
                }
                Event::Text(ref e) => {
                    if state.depth == 0 && !e.iter().all(u8::is_ascii_whitespace) {
                        return Err(Error::parse(
                            source,
                            "Text content outside the root element",
                            None,
                        ));
                    }
                    if Self::capturing(&state) {
                        let text = e.unescape().map_err(|err| {
                            Error::parse(source, format!("Invalid text content: {}", err), None)
                        })?;
                        Self::append_text(&mut state, &text);
                    }
                }
                Event::CData(e) => {
                    if state.depth == 0 {
                        return Err(Error::parse(
                            source,
                            "CDATA section outside the root element",
                            None,
                        ));
                    }
                    if Self::capturing(&state) {
                        let raw = e.into_inner();
                        Self::append_text(&mut state, &String::from_utf8_lossy(&raw));
                    }
                }
                Event::Eof => break,
                _ => {}
            }

            buf.clear();
        }

        if !state.saw_root {
            return Err(Error::parse(source, "Document has no root element", None));
        }

        if state.depth != 0 {
            return Err(Error::parse(
                source,
                format!(
                    "Unexpected end of document with {} unclosed elements",
                    state.depth
                ),
                None,
            ));
        }

        Ok(state.records)
    }

    /// A second top-level element makes the document not well-formed
    fn reject_after_root(state: &WalkState, source: &Path) -> Result<()> {
        if state.saw_root && state.depth == 0 {
            return Err(Error::parse(source, "Extra content after root element", None));
        }
        Ok(())
    }

    fn open_element(&self, state: &mut WalkState, local: String, in_namespace: bool) {
        state.depth += 1;
        state.saw_root = true;

        match state.device.as_mut() {
            Some(device) => {
                if let Some(capture) = device.capture.as_mut() {
                    capture.open = false;
                }

                device.path.push(in_namespace.then_some(local));

                if device.capture.is_none() {
                    let hit = self.profile.field_paths().iter().find(|entry| {
                        !device.matched[entry.field.index()] && path_matches(&device.path, entry.path)
                    });

                    if let Some(entry) = hit {
                        device.matched[entry.field.index()] = true;
                        device.capture = Some(Capture {
                            field: entry.field,
                            depth: state.depth,
                            text: String::new(),
                            open: true,
                        });
                    }
                }
            }
            None => {
                if in_namespace && local == self.profile.device_element() {
                    state.device = Some(OpenDevice::new(state.depth));
                }
            }
        }
    }

    fn close_element(&self, state: &mut WalkState) {
        let depth = state.depth;
        state.depth = state.depth.saturating_sub(1);

        let Some(device) = state.device.as_mut() else {
            return;
        };

        if depth == device.depth {
            if let Some(finished) = state.device.take() {
                state.records.push(finished.record);
            }
            return;
        }

        if device
            .capture
            .as_ref()
            .is_some_and(|capture| capture.depth == depth)
        {
            if let Some(capture) = device.capture.take() {
                device.record.set_text(capture.field, &capture.text);
            }
        }

        device.path.pop();
    }

    fn capturing(state: &WalkState) -> bool {
        state
            .device
            .as_ref()
            .and_then(|device| device.capture.as_ref())
            .is_some_and(|capture| capture.open && capture.depth == state.depth)
    }

    fn append_text(state: &mut WalkState, text: &str) {
        if let Some(capture) = state
            .device
            .as_mut()
            .and_then(|device| device.capture.as_mut())
        {
            capture.text.push_str(text);
        }
    }
}

/// Whether the element path below a device equals a table path
fn path_matches(current: &[Option<String>], expected: &[&str]) -> bool {
    current.len() == expected.len()
        && current
            .iter()
            .zip(expected)
            .all(|(segment, name)| segment.as_deref() == Some(*name))
}

/// Parse a single file with the given profile
pub fn parse_device_file(file_path: &Path, profile: ParseProfile) -> Result<Vec<DeviceRecord>> {
    DeviceParser::new(profile).parse_file(file_path)
}
