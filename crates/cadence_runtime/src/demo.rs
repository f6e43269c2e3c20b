//! Built-in chart used when no chart file is given.

use cadence_game::components::Position;
use cadence_game::{Chart, ChartNote};

const BPM: f64 = 120.0;
const NOTES: usize = 48;
const RADIUS: f32 = 220.0;

/// One note per beat walking around a circle, each hittable for two beats.
pub fn chart() -> cadence_game::Result<Chart> {
    let beat = 60.0 / BPM;
    let notes = (0..NOTES)
        .map(|i| {
            let angle = i as f32 * std::f32::consts::TAU / 12.0;
            ChartNote {
                timestamp: 1.0 + i as f64 * beat,
                position: Position::new(RADIUS * angle.cos(), RADIUS * angle.sin()),
                duration: beat * 2.0,
            }
        })
        .collect();
    let mut chart = Chart::new("demo", BPM, notes)?;
    chart.title = "Metronome Etude".to_string();
    Ok(chart)
}

#[cfg(test)]
mod tests {
    #[test]
    fn demo_chart_is_valid() {
        let chart = super::chart().unwrap();
        assert_eq!(chart.len(), 48);
        assert!(chart.end_time() > 24.0);
    }
}
