//! Bubble Replay
//!
//! Replays recorded CSV sensor readings through a [`BubbleMonitor`] and
//! writes each bubble event as a JSON line.

use anyhow::Context;
use bubble_detector::{BubbleEvent, BubbleMonitor};
use serde::Serialize;
use std::io::{BufRead, Write};
use thiserror::Error;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Input parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Column is not an unsigned 16-bit reading
    #[error("line {line}: invalid reading '{value}'")]
    InvalidReading { line: usize, value: String },
}

/// Event as written to the output, tagged with the channel name
#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    pub name: &'a str,
    #[serde(flatten)]
    pub event: &'a BubbleEvent,
}

/// Totals for a replay run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaySummary {
    /// Data lines processed
    pub frames: u64,
    /// Events written
    pub events: u64,
}

/// Initialize logging on stderr so stdout carries only events
pub fn init_logging(level: Level, json: bool) -> anyhow::Result<()> {
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.context("Failed to set tracing subscriber")
}

/// Parse one CSV line into readings
///
/// Blank lines and `#` comments yield `None`.
pub fn parse_line(line_number: usize, line: &str) -> Result<Option<Vec<u16>>, ParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    line.split(',')
        .map(str::trim)
        .map(|value| {
            value.parse::<u16>().map_err(|_| ParseError::InvalidReading {
                line: line_number,
                value: value.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Feed every data line of `input` to the monitor, writing events to `output`
pub fn replay<R: BufRead, W: Write>(
    monitor: &mut BubbleMonitor,
    input: R,
    mut output: W,
) -> anyhow::Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for (i, line) in input.lines().enumerate() {
        let line_number = i + 1;
        let line = line.with_context(|| format!("Failed to read line {line_number}"))?;
        let Some(readings) = parse_line(line_number, &line)? else {
            continue;
        };

        let events = monitor
            .process_frame(summary.frames, &readings)
            .with_context(|| format!("Failed to process line {line_number}"))?;

        for event in &events {
            let record = EventRecord {
                name: monitor.channel_name(event.channel()).unwrap_or("unknown"),
                event,
            };
            serde_json::to_writer(&mut output, &record)?;
            writeln!(output)?;
        }

        summary.frames += 1;
        summary.events += events.len() as u64;
    }

    output.flush()?;
    Ok(summary)
}

/// Log final per-channel statistics
pub fn log_summary(monitor: &BubbleMonitor, summary: &ReplaySummary) {
    info!(
        "Replayed {} frames, {} events",
        summary.frames, summary.events
    );

    for detector in monitor.detectors() {
        let background = detector.background();
        info!(
            "{}: {} bubble(s), background avg {} [{}..{}], state {:?}",
            detector.name(),
            detector.bubble_count(),
            background.average(),
            background.min_value(),
            background.max_value(),
            detector.state()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bubble_detector::DetectorConfig;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line(1, "100, 200,300"), Ok(Some(vec![100, 200, 300])));
        assert_eq!(parse_line(2, "   "), Ok(None));
        assert_eq!(parse_line(3, "# inlet,outlet"), Ok(None));
    }

    #[test]
    fn test_parse_line_rejects_bad_values() {
        assert_eq!(
            parse_line(7, "100,abc"),
            Err(ParseError::InvalidReading {
                line: 7,
                value: "abc".to_string()
            })
        );
        assert!(parse_line(8, "70000").is_err());
        assert!(parse_line(9, "-1").is_err());
    }

    #[test]
    fn test_replay_writes_json_lines() {
        let mut monitor = BubbleMonitor::new(DetectorConfig::default()).unwrap();
        let mut input = String::from("# sensor0\n");
        for _ in 0..8 {
            input.push_str("100\n");
        }
        input.push_str("170\n\n180\n110\n");

        let mut output = Vec::new();
        let summary = replay(&mut monitor, input.as_bytes(), &mut output).unwrap();
        assert_eq!(summary, ReplaySummary { frames: 11, events: 2 });

        let lines: Vec<serde_json::Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);

        assert_eq!(lines[0]["name"], "sensor0");
        assert_eq!(lines[0]["event"], "start");
        assert_eq!(lines[0]["sample_index"], 8);
        assert_eq!(lines[0]["baseline"], 100);

        assert_eq!(lines[1]["event"], "end");
        assert_eq!(lines[1]["sample_index"], 10);
        assert_eq!(lines[1]["peak"], 180);
        assert_eq!(lines[1]["duration_samples"], 2);
    }

    #[test]
    fn test_replay_reports_line_on_width_error() {
        let mut monitor = BubbleMonitor::new(DetectorConfig::default()).unwrap();
        let err = replay(&mut monitor, "100\n100,200\n".as_bytes(), Vec::new()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
