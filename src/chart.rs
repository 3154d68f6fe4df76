//! Render-ready control chart payload.
//!
//! The drawing side gets one trace (downsampled for large logs), three
//! horizontal reference lines and the full sets of violating points, which
//! are never thinned out.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{Result, SpcError};
use crate::processing::control_chart::{classify, Category, ControlChartStats};
use crate::processing::downsampling::lttb;
use crate::processing::parameters::{infer_unit, Parameter};
use crate::state::series::{EventLabel, Sample, TimeSeries};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceLines {
    pub mean: f64,
    pub ucl: f64,
    pub lcl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub timestamp: NaiveDateTime,
    pub value: f64,
    pub text: String,
    /// Vertical offset of the label above the point.
    pub offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub title: String,
    pub parameter: String,
    pub unit: &'static str,
    pub trace: Vec<Sample>,
    pub lines: ReferenceLines,
    pub above: Vec<Sample>,
    pub below: Vec<Sample>,
    pub annotation: Option<Annotation>,
}

impl ChartData {
    /// Build the payload for `stats`. A label whose timestamp has no sample in
    /// the analyzed window is dropped with a warning.
    pub fn build(
        parameter: &Parameter,
        series: &TimeSeries,
        stats: &ControlChartStats,
        label: Option<&EventLabel>,
        max_points: usize,
    ) -> Self {
        let mut above = Vec::new();
        let mut below = Vec::new();
        for point in classify(series, stats) {
            let sample = Sample::new(point.timestamp, point.value);
            match point.category {
                Category::AboveUcl => above.push(sample),
                Category::BelowLcl => below.push(sample),
                Category::Normal => {}
            }
        }

        let annotation = match label.map(|l| annotate(series, stats, l)) {
            Some(Ok(annotation)) => annotation,
            Some(Err(e)) => {
                tracing::warn!("{e}; label skipped");
                None
            }
            None => None,
        };

        ChartData {
            title: format!("Control Chart for {}", parameter.display),
            parameter: parameter.display.clone(),
            unit: infer_unit(&parameter.column),
            trace: lttb(series.within(&stats.window), max_points),
            lines: ReferenceLines {
                mean: stats.mean,
                ucl: stats.ucl,
                lcl: stats.lcl,
            },
            above,
            below,
            annotation,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Place `label` on the sample with exactly its timestamp.
/// Blank text means no annotation was requested.
pub fn annotate(
    series: &TimeSeries,
    stats: &ControlChartStats,
    label: &EventLabel,
) -> Result<Option<Annotation>> {
    if label.text.trim().is_empty() {
        return Ok(None);
    }
    let value = stats
        .window
        .contains(label.timestamp)
        .then(|| series.value_at(label.timestamp))
        .flatten()
        .ok_or(SpcError::AnnotationNotFound(label.timestamp))?;

    Ok(Some(Annotation {
        timestamp: label.timestamp,
        value,
        text: label.text.clone(),
        offset: 0.05 * (stats.ucl - stats.lcl),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::control_chart::compute;
    use chrono::NaiveDate;

    fn at(min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(9, min, 0).unwrap()
    }

    fn torque() -> Parameter {
        Parameter {
            display: "Torque".into(),
            column: "Extruder 1: Screw torque".into(),
        }
    }

    fn fixture() -> (TimeSeries, ControlChartStats) {
        let s: TimeSeries = [5.0, 0.0, 5.0, 5.0]
            .iter()
            .enumerate()
            .map(|(i, &v)| Sample::new(at(i as u32), v))
            .collect();
        let stats = compute(&s, &s.full_range().unwrap()).unwrap();
        (s, stats)
    }

    #[test]
    fn payload_splits_violations() {
        let (s, stats) = fixture();
        let chart = ChartData::build(&torque(), &s, &stats, None, 100);
        assert_eq!(chart.title, "Control Chart for Torque");
        assert_eq!(chart.unit, "%");
        assert_eq!(chart.trace.len(), 4);
        assert!(chart.above.is_empty());
        assert_eq!(chart.below, vec![Sample::new(at(1), 0.0)]);
        assert_eq!(chart.lines.lcl, 5.0);
    }

    #[test]
    fn label_on_existing_sample() {
        let (s, stats) = fixture();
        let label = EventLabel::new(at(2), "Screen change");
        let annotation = annotate(&s, &stats, &label).unwrap().unwrap();
        assert_eq!(annotation.value, 5.0);
        assert!((annotation.offset - 0.05 * (stats.ucl - stats.lcl)).abs() < 1e-12);
    }

    #[test]
    fn label_without_sample_is_not_found_but_chart_still_builds() {
        let (s, stats) = fixture();
        let label = EventLabel::new(at(30), "Restart");
        assert!(matches!(
            annotate(&s, &stats, &label),
            Err(SpcError::AnnotationNotFound(_))
        ));
        let chart = ChartData::build(&torque(), &s, &stats, Some(&label), 100);
        assert!(chart.annotation.is_none());
    }

    #[test]
    fn blank_label_is_ignored() {
        let (s, stats) = fixture();
        let label = EventLabel::new(at(1), "   ");
        assert_eq!(annotate(&s, &stats, &label).unwrap(), None);
    }

    #[test]
    fn serializes_categories_and_timestamps() {
        let (s, stats) = fixture();
        let json = ChartData::build(&torque(), &s, &stats, None, 100).to_json().unwrap();
        assert!(json.contains("\"title\": \"Control Chart for Torque\""));
        assert!(json.contains("2024-05-01T09:01:00"));
    }
}
