//! Export records for detections and tracks.
//!
//! Two surfaces: a delimited text listing (one line per detection/track row)
//! for spreadsheet consumers, and a JSON container grouped by frame key that
//! round-trips back into [`Detection`] objects, sufficient to resume
//! visualization and re-run secondary tracking.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read, Write};

use serde::{Deserialize, Serialize};

use crate::config::TrackerParameters;
use crate::detector::{CoordinateMapper, Detection};
use crate::error::Error;
use crate::pipeline::FrameResult;

const DELIMITER: char = ';';

/// Net horizontal (column) movement below this many pixels counts as no
/// crossing direction.
const DIRECTION_DEADBAND: f64 = 1.0;

/// One exported detection row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub frame: usize,
    pub length: f64,
    pub distance: f64,
    pub angle: f64,
    pub aspect: f64,
    /// Oriented box corners as `(x, y)` = `(col, row)` pairs.
    pub corners: [(f64, f64); 4],
}

impl DetectionRecord {
    pub fn new(frame: usize, detection: &Detection, mapper: &dyn CoordinateMapper) -> Self {
        let metrics = detection.metrics(mapper);
        Self {
            frame,
            length: metrics.length,
            distance: metrics.distance,
            angle: metrics.angle,
            aspect: metrics.aspect,
            corners: corners_xy(detection.corners()),
        }
    }

    /// Reconstruct the detection geometry carried by this record.
    pub fn to_detection(&self) -> Detection {
        Detection::from_corners(corners_rc(self.corners))
    }
}

/// Which estimate an exported track row was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    /// The matched detection of that frame.
    Detection,
    /// The Kalman prediction, on frames without a match.
    Track,
}

/// Swimming direction over a track's lifetime, from net column displacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    None,
}

/// One exported track row: one identity in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: u64,
    pub frame: usize,
    pub length: f64,
    pub distance: f64,
    pub angle: f64,
    pub direction: Direction,
    pub corners: [(f64, f64); 4],
    pub source: RecordSource,
}

fn corners_xy(corners: [[f64; 2]; 4]) -> [(f64, f64); 4] {
    corners.map(|[row, col]| (col, row))
}

fn corners_rc(corners: [(f64, f64); 4]) -> [[f64; 2]; 4] {
    corners.map(|(x, y)| [y, x])
}

/// Build detection records for every frame of a run.
pub fn detection_records(
    frames: &[FrameResult],
    mapper: &dyn CoordinateMapper,
) -> Vec<DetectionRecord> {
    frames
        .iter()
        .flat_map(|frame| {
            frame
                .detections
                .iter()
                .map(|d| DetectionRecord::new(frame.frame, d, mapper))
        })
        .collect()
}

/// Build track records for every observation of a run.
///
/// Matched frames use the detection's box (`source = detection`); unmatched
/// frames translate the last matched box to the predicted position
/// (`source = track`). Tracks that never matched and tracks still Tentative
/// at their last observation are reported as-is; filtering by status is the
/// consumer's concern. With `trim_tails` set, trailing unmatched rows of
/// each track are dropped.
pub fn track_records(
    frames: &[FrameResult],
    mapper: &dyn CoordinateMapper,
    params: &TrackerParameters,
) -> Vec<TrackRecord> {
    // Group rows per track id first so direction and tail trimming see whole
    // trajectories.
    let mut per_track: BTreeMap<u64, Vec<(usize, [f64; 2], Option<Detection>)>> = BTreeMap::new();
    for frame in frames {
        for obs in &frame.observations {
            per_track.entry(obs.track_id).or_default().push((
                obs.frame,
                obs.position,
                obs.detection.clone(),
            ));
        }
    }

    let mut records = Vec::new();
    for (id, mut rows) in per_track {
        if params.trim_tails {
            let last_hit = rows.iter().rposition(|(_, _, det)| det.is_some());
            match last_hit {
                Some(last) => rows.truncate(last + 1),
                None => continue,
            }
        }

        let direction = direction_of(&rows);
        let mut last_box: Option<Detection> = None;
        for (frame, position, detection) in rows {
            let (boxed, source) = match detection {
                Some(det) => {
                    last_box = Some(det.clone());
                    (det, RecordSource::Detection)
                }
                None => {
                    let Some(reference) = &last_box else {
                        // Never matched yet; nothing to draw a box from.
                        continue;
                    };
                    (translate_to(reference, position), RecordSource::Track)
                }
            };
            let metrics = boxed.metrics(mapper);
            records.push(TrackRecord {
                id,
                frame,
                length: metrics.length,
                distance: metrics.distance,
                angle: metrics.angle,
                direction,
                corners: corners_xy(boxed.corners()),
                source,
            });
        }
    }
    records
}

fn direction_of(rows: &[(usize, [f64; 2], Option<Detection>)]) -> Direction {
    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return Direction::None;
    };
    let delta = last.1[1] - first.1[1];
    if delta > DIRECTION_DEADBAND {
        Direction::Right
    } else if delta < -DIRECTION_DEADBAND {
        Direction::Left
    } else {
        Direction::None
    }
}

/// Shift a detection's box so its centroid lands on `position`.
fn translate_to(detection: &Detection, position: [f64; 2]) -> Detection {
    let centroid = detection.centroid();
    let dr = position[0] - centroid[0];
    let dc = position[1] - centroid[1];
    let corners = detection
        .corners()
        .map(|[row, col]| [row + dr, col + dc]);
    Detection::from_corners(corners)
}

/// Write detection records as delimited text, one line per detection.
pub fn write_detections_delimited(
    writer: &mut dyn Write,
    records: &[DetectionRecord],
) -> Result<(), Error> {
    writeln!(
        writer,
        "frame{d}length{d}distance{d}angle{d}aspect{d}corners",
        d = DELIMITER
    )?;
    for r in records {
        let corners = r
            .corners
            .iter()
            .map(|(x, y)| format!("{x:.3} {y:.3}"))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(
            writer,
            "{frame}{d}{length:.6}{d}{distance:.6}{d}{angle:.6}{d}{aspect:.6}{d}{corners}",
            frame = r.frame,
            length = r.length,
            distance = r.distance,
            angle = r.angle,
            aspect = r.aspect,
            d = DELIMITER,
        )?;
    }
    Ok(())
}

/// Write track records as delimited text, one line per identity per frame.
pub fn write_tracks_delimited(
    writer: &mut dyn Write,
    records: &[TrackRecord],
) -> Result<(), Error> {
    writeln!(
        writer,
        "id{d}frame{d}length{d}distance{d}angle{d}direction{d}source",
        d = DELIMITER
    )?;
    for r in records {
        writeln!(
            writer,
            "{id}{d}{frame}{d}{length:.6}{d}{distance:.6}{d}{angle:.6}{d}{direction:?}{d}{source:?}",
            id = r.id,
            frame = r.frame,
            length = r.length,
            distance = r.distance,
            angle = r.angle,
            direction = r.direction,
            source = r.source,
            d = DELIMITER,
        )?;
    }
    Ok(())
}

/// JSON container with detections grouped under frame keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionContainer {
    pub detections: BTreeMap<usize, Vec<DetectionRecord>>,
}

impl DetectionContainer {
    pub fn from_records(records: &[DetectionRecord]) -> Self {
        let mut detections: BTreeMap<usize, Vec<DetectionRecord>> = BTreeMap::new();
        for r in records {
            detections.entry(r.frame).or_default().push(r.clone());
        }
        Self { detections }
    }

    pub fn save(&self, writer: &mut dyn Write) -> Result<(), Error> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    pub fn load(reader: &mut dyn Read) -> Result<Self, Error> {
        Ok(serde_json::from_reader(BufReader::new(reader))?)
    }

    /// Per-frame detection lists up to the highest stored frame, suitable
    /// for a secondary tracking pass. Frames without detections are empty.
    pub fn detections_by_frame(&self) -> Vec<Vec<Detection>> {
        let frame_count = self
            .detections
            .keys()
            .next_back()
            .map_or(0, |last| last + 1);
        let mut frames = vec![Vec::new(); frame_count];
        for (&frame, records) in &self.detections {
            frames[frame] = records.iter().map(DetectionRecord::to_detection).collect();
        }
        frames
    }
}

/// JSON container for track rows grouped under track ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackContainer {
    pub tracks: BTreeMap<u64, Vec<TrackRecord>>,
}

impl TrackContainer {
    pub fn from_records(records: &[TrackRecord]) -> Self {
        let mut tracks: BTreeMap<u64, Vec<TrackRecord>> = BTreeMap::new();
        for r in records {
            tracks.entry(r.id).or_default().push(r.clone());
        }
        Self { tracks }
    }

    pub fn save(&self, writer: &mut dyn Write) -> Result<(), Error> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    pub fn load(reader: &mut dyn Read) -> Result<Self, Error> {
        Ok(serde_json::from_reader(BufReader::new(reader))?)
    }
}

/// Parse a delimited detection listing produced by
/// [`write_detections_delimited`].
pub fn read_detections_delimited(reader: &mut dyn Read) -> Result<Vec<DetectionRecord>, Error> {
    let reader = BufReader::new(reader);
    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line_no == 0 || line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(DELIMITER).collect();
        let parse_err = |reason: &str| Error::MalformedRecord {
            line: line_no + 1,
            reason: reason.into(),
        };
        if fields.len() != 6 {
            return Err(parse_err("expected 6 fields"));
        }
        let numbers: Vec<f64> = fields[5]
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| parse_err("bad corner value"))?;
        if numbers.len() != 8 {
            return Err(parse_err("expected 4 corner pairs"));
        }
        let mut corners = [(0.0, 0.0); 4];
        for (i, corner) in corners.iter_mut().enumerate() {
            *corner = (numbers[2 * i], numbers[2 * i + 1]);
        }
        records.push(DetectionRecord {
            frame: fields[0].parse().map_err(|_| parse_err("bad frame"))?,
            length: fields[1].parse().map_err(|_| parse_err("bad length"))?,
            distance: fields[2].parse().map_err(|_| parse_err("bad distance"))?,
            angle: fields[3].parse().map_err(|_| parse_err("bad angle"))?,
            aspect: fields[4].parse().map_err(|_| parse_err("bad aspect"))?,
            corners,
        });
    }
    Ok(records)
}
