//! Chart model and loader
//!
//! Charts are JSON documents with the note map in camelCase. Entries are
//! sorted by timestamp on load (stable, so equal timestamps keep file
//! order) and validated before the encounter ever sees them.

use crate::error::{GameError, Result};
use crate::components::Position;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub audio_path: String,
    pub bpm: f64,
    pub note_map: Vec<ChartNote>,
    #[serde(default)]
    pub lyrics: Vec<Lyric>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartNote {
    /// Seconds from chart start.
    pub timestamp: f64,
    pub position: Position,
    /// Seconds the note stays hittable.
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lyric {
    pub timestamp: f64,
    pub text: String,
}

impl Chart {
    /// Build a chart from raw note entries, sorting and validating them.
    pub fn new(id: impl Into<String>, bpm: f64, notes: Vec<ChartNote>) -> Result<Self> {
        Self {
            id: id.into(),
            title: String::new(),
            artist: String::new(),
            audio_path: String::new(),
            bpm,
            note_map: notes,
            lyrics: Vec::new(),
        }
        .normalized()
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let chart: Chart = serde_json::from_str(text)?;
        chart.normalized()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| GameError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let chart = Self::from_json(&text)?;
        info!(
            id = %chart.id,
            notes = chart.note_map.len(),
            bpm = chart.bpm,
            path = %path.display(),
            "chart loaded"
        );
        Ok(chart)
    }

    pub fn len(&self) -> usize {
        self.note_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.note_map.is_empty()
    }

    /// Time of the last note's expiry, or 0 for an empty chart.
    pub fn end_time(&self) -> f64 {
        self.note_map
            .iter()
            .map(|n| n.timestamp + n.duration)
            .fold(0.0, f64::max)
    }

    fn normalized(mut self) -> Result<Self> {
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(GameError::InvalidChart(format!("bpm must be positive, got {}", self.bpm)));
        }
        for (i, note) in self.note_map.iter().enumerate() {
            if !(note.timestamp.is_finite() && note.timestamp >= 0.0) {
                return Err(GameError::InvalidChart(format!(
                    "note {i}: timestamp must be >= 0, got {}",
                    note.timestamp
                )));
            }
            if !(note.duration.is_finite() && note.duration > 0.0) {
                return Err(GameError::InvalidChart(format!(
                    "note {i}: duration must be positive, got {}",
                    note.duration
                )));
            }
        }
        self.note_map
            .sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        self.lyrics.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Ok(self)
    }
}

/// Charts known to the encounter, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ChartLibrary {
    charts: Vec<Rc<Chart>>,
}

impl ChartLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chart, replacing any chart with the same id in place.
    pub fn insert(&mut self, chart: Rc<Chart>) {
        match self.charts.iter_mut().find(|c| c.id == chart.id) {
            Some(slot) => {
                debug!(id = %chart.id, "chart replaced in library");
                *slot = chart;
            }
            None => self.charts.push(chart),
        }
    }

    pub fn get(&self, id: &str) -> Option<Rc<Chart>> {
        self.charts.iter().find(|c| c.id == id).cloned()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.charts.iter().map(|c| c.id.as_str()).collect()
    }

    /// The chart registered after `id`, if any.
    pub fn next_after(&self, id: &str) -> Option<Rc<Chart>> {
        let index = self.charts.iter().position(|c| c.id == id)?;
        self.charts.get(index + 1).cloned()
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "id": "overture",
        "title": "Overture",
        "artist": "The Conductor",
        "audioPath": "audio/overture.ogg",
        "bpm": 120,
        "noteMap": [
            { "timestamp": 2.0, "position": { "x": 10, "y": 0 }, "duration": 0.5 },
            { "timestamp": 1.0, "position": { "x": 0, "y": 0 }, "duration": 0.5 },
            { "timestamp": 1.0, "position": { "x": 5, "y": 5 }, "duration": 1.0 }
        ],
        "lyrics": [ { "timestamp": 0.5, "text": "la" } ]
    }"#;

    #[test]
    fn parses_and_sorts_stably() {
        let chart = Chart::from_json(SAMPLE).unwrap();
        assert_eq!(chart.audio_path, "audio/overture.ogg");
        let times: Vec<f64> = chart.note_map.iter().map(|n| n.timestamp).collect();
        assert_eq!(times, vec![1.0, 1.0, 2.0]);
        assert_eq!(chart.note_map[0].position, Position::new(0.0, 0.0));
        assert_eq!(chart.note_map[1].position, Position::new(5.0, 5.0));
        assert_eq!(chart.end_time(), 2.5);
    }

    #[test]
    fn rejects_bad_entries() {
        let bad_bpm = SAMPLE.replace("\"bpm\": 120", "\"bpm\": 0");
        assert!(matches!(Chart::from_json(&bad_bpm), Err(GameError::InvalidChart(_))));

        let bad_duration = SAMPLE.replace("\"duration\": 1.0", "\"duration\": -1.0");
        assert!(matches!(Chart::from_json(&bad_duration), Err(GameError::InvalidChart(_))));

        assert!(matches!(Chart::from_json("{"), Err(GameError::Parse(_))));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Chart::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, GameError::Io { .. }));

        let path = dir.path().join("chart.json");
        std::fs::File::create(&path)
            .and_then(|mut f| f.write_all(SAMPLE.as_bytes()))
            .unwrap();
        assert_eq!(Chart::load(&path).unwrap().len(), 3);
    }

    #[test]
    fn library_keeps_registration_order_and_replaces_by_id() {
        let mut library = ChartLibrary::new();
        for id in ["intro", "verse", "finale"] {
            library.insert(Rc::new(Chart::new(id, 120.0, Vec::new()).unwrap()));
        }
        library.insert(Rc::new(Chart::new("verse", 90.0, Vec::new()).unwrap()));

        assert_eq!(library.ids(), vec!["intro", "verse", "finale"]);
        assert_eq!(library.get("verse").unwrap().bpm, 90.0);
        assert!(library.get("bridge").is_none());
        assert_eq!(library.next_after("intro").unwrap().id, "verse");
        assert!(library.next_after("finale").is_none());
        assert!(library.next_after("bridge").is_none());
    }
}
