//! Ground-truth records (PreparedText.xml).
//!
//! ```xml
//! <preparedText>
//!   <area><number>3</number><start>10,20</start><stop>30,40</stop></area>
//! </preparedText>
//! ```
//!
//! Each area `n` needs `Text{n}_normal.html` and `Text{n}_highlighted.html`
//! next to the record; areas without them are skipped.

use std::collections::HashSet;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::models::geometry::Point2D;

const ROOT_TAG: &[u8] = b"preparedText";
const AREA_TAG: &[u8] = b"area";

/// One prepared target area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundTruthPoint {
    pub index: u32,
    pub start: Point2D,
    pub stop: Point2D,
}

impl GroundTruthPoint {
    /// Point the user was asked to reach.
    pub fn target(&self) -> Point2D {
        self.stop
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Number,
    Start,
    Stop,
}

const FIELD_ORDER: [Field; 3] = [Field::Number, Field::Start, Field::Stop];

impl Field {
    fn from_tag(name: &[u8]) -> Option<Field> {
        match name {
            b"number" => Some(Field::Number),
            b"start" => Some(Field::Start),
            b"stop" => Some(Field::Stop),
            _ => None,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Field::Number => "number",
            Field::Start => "start",
            Field::Stop => "stop",
        }
    }
}

/// What the reader needs next.
#[derive(Debug, Clone, Copy)]
enum Expect {
    Index,
    Start { index: u32 },
    Stop { index: u32, start: Point2D },
}

/// Reads all complete areas; any malformed token empties the result.
pub fn read(path: &Path) -> Vec<GroundTruthPoint> {
    match try_read(path) {
        Ok(points) => points,
        Err(e) => {
            log::warn!("ground_truth read: path={} aborted: {e}", path.display());
            Vec::new()
        }
    }
}

/// Like [`read`] but reports why a record was rejected.
pub fn try_read(path: &Path) -> Result<Vec<GroundTruthPoint>> {
    let xml = std::fs::read_to_string(path)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let points = parse_points(&xml, &path.display().to_string(), |index| {
        companions_present(dir, index)
    })?;
    log::info!(
        "ground_truth read: path={} points={}",
        path.display(),
        points.len()
    );
    Ok(points)
}

fn companions_present(dir: &Path, index: u32) -> bool {
    let normal = dir.join(format!("Text{index}_normal.html"));
    let highlighted = dir.join(format!("Text{index}_highlighted.html"));
    let present = normal.is_file() && highlighted.is_file();
    if !present {
        log::warn!(
            "ground_truth read: skipping area {index}, missing {} or {}",
            normal.display(),
            highlighted.display()
        );
    }
    present
}

fn parse_points(
    xml: &str,
    source: &str,
    has_companions: impl Fn(u32) -> bool,
) -> Result<Vec<GroundTruthPoint>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut points = Vec::new();
    let mut seen = HashSet::new();
    let mut expect = Expect::Index;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => field = Field::from_tag(e.name().as_ref()),
            Event::Empty(e) => {
                if let Some(empty) = Field::from_tag(e.name().as_ref()) {
                    return Err(malformed(source, format!("empty <{}>", empty.tag())));
                }
            }
            Event::End(_) => field = None,
            Event::Text(text) => {
                let text = text.unescape()?;
                let value = text.trim();
                if value.is_empty() {
                    continue;
                }
                expect = match (expect, field) {
                    (Expect::Index, Some(Field::Number)) => Expect::Start {
                        index: parse_index(value).map_err(|reason| malformed(source, reason))?,
                    },
                    (Expect::Start { index }, Some(Field::Start)) => Expect::Stop {
                        index,
                        start: parse_point(value)
                            .ok_or_else(|| malformed(source, format!("bad start {value:?}")))?,
                    },
                    (Expect::Stop { index, start }, Some(Field::Stop)) => {
                        let stop = parse_point(value)
                            .ok_or_else(|| malformed(source, format!("bad stop {value:?}")))?;
                        if !seen.insert(index) {
                            return Err(malformed(source, format!("duplicate index {index}")));
                        }
                        if has_companions(index) {
                            points.push(GroundTruthPoint { index, start, stop });
                        }
                        Expect::Index
                    }
                    (state, _) => {
                        return Err(malformed(
                            source,
                            format!("unexpected value {value:?} while waiting for {state:?}"),
                        ));
                    }
                };
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !matches!(expect, Expect::Index) {
        return Err(malformed(source, format!("record ends inside an area ({expect:?})")));
    }
    Ok(points)
}

fn parse_index(value: &str) -> std::result::Result<u32, String> {
    let index: i64 = value
        .parse()
        .map_err(|_| format!("bad number {value:?}"))?;
    if index < 0 {
        return Err(format!("negative index {index}"));
    }
    u32::try_from(index).map_err(|_| format!("index {index} out of range"))
}

/// `x,y` with comma and/or whitespace separators.
fn parse_point(value: &str) -> Option<Point2D> {
    let mut parts = value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty());
    let x = parts.next()?.parse::<f64>().ok()?;
    let y = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let point = Point2D::new(x, y);
    point.is_finite().then_some(point)
}

fn malformed(source: &str, reason: String) -> Error {
    Error::MalformedRecord {
        path: source.to_string(),
        reason,
    }
}

/// Structural check of a record; no companion files are consulted.
pub fn is_valid(path: &Path) -> bool {
    match validate(path) {
        Ok(()) => true,
        Err(e) => {
            log::debug!("ground_truth validate: path={} invalid: {e}", path.display());
            false
        }
    }
}

/// Like [`is_valid`] but reports the first violation.
pub fn validate(path: &Path) -> Result<()> {
    let xml = std::fs::read_to_string(path)?;
    check_structure(&xml, &path.display().to_string())
}

enum Level {
    Prolog,
    Root,
    Area { next: usize },
    Leaf { position: usize, text: String },
    Epilog,
}

fn check_structure(xml: &str, source: &str) -> Result<()> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut level = Level::Prolog;
    let mut indices = HashSet::new();
    let fail = |reason: String| malformed(source, reason);

    loop {
        let event = reader.read_event()?;
        level = match (level, event) {
            (Level::Epilog, Event::Eof) => return Ok(()),
            (_, Event::Eof) => return Err(fail("unexpected end of record".to_string())),

            (Level::Prolog, Event::Start(e)) if e.name().as_ref() == ROOT_TAG => Level::Root,
            (Level::Prolog, Event::Empty(e)) if e.name().as_ref() == ROOT_TAG => Level::Epilog,
            (Level::Root, Event::Start(e)) if e.name().as_ref() == AREA_TAG => {
                Level::Area { next: 0 }
            }
            (Level::Area { next }, Event::Start(e))
                if next < FIELD_ORDER.len()
                    && Field::from_tag(e.name().as_ref()) == Some(FIELD_ORDER[next]) =>
            {
                Level::Leaf {
                    position: next,
                    text: String::new(),
                }
            }
            (Level::Leaf { position, mut text }, Event::Text(t)) => {
                text.push_str(&t.unescape()?);
                Level::Leaf { position, text }
            }
            (Level::Leaf { position, text }, Event::End(_)) => {
                let value = text.trim();
                match FIELD_ORDER[position] {
                    Field::Number => {
                        let index = parse_index(value).map_err(fail)?;
                        if !indices.insert(index) {
                            return Err(fail(format!("duplicate index {index}")));
                        }
                    }
                    field => {
                        if parse_point(value).is_none() {
                            return Err(fail(format!("bad <{}> {value:?}", field.tag())));
                        }
                    }
                }
                Level::Area { next: position + 1 }
            }
            (Level::Area { next }, Event::End(_)) if next == FIELD_ORDER.len() => Level::Root,
            (Level::Root, Event::End(_)) => Level::Epilog,

            (level, Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_)) => level,
            (level, Event::Text(t)) if t.unescape()?.trim().is_empty() => level,

            (Level::Prolog, _) => return Err(fail("root must be <preparedText>".to_string())),
            (Level::Root, _) => return Err(fail("only <area> children are allowed".to_string())),
            (Level::Area { next }, _) => {
                let wanted = FIELD_ORDER.get(next).map_or("</area>", |field| field.tag());
                return Err(fail(format!("area expects {wanted} next")));
            }
            (Level::Leaf { position, .. }, _) => {
                return Err(fail(format!("<{}> holds only text", FIELD_ORDER[position].tag())));
            }
            (Level::Epilog, _) => return Err(fail("content after the root element".to_string())),
        };
    }
}
