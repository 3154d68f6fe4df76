use std::io::Write;

use crate::data::datetime::format_timestamp;
use crate::error::Result;
use crate::processing::control_chart::ControlChartStats;
use crate::state::dataset::Dataset;

/// The statistics table as (Statistic, Value) rows, in display order.
pub fn stats_rows(stats: &ControlChartStats) -> Vec<(&'static str, String)> {
    vec![
        ("Mean", format!("{:.2}", stats.mean)),
        ("Std Dev", format!("{:.2}", stats.stddev)),
        ("UCL", format!("{:.2}", stats.ucl)),
        ("LCL", format!("{:.2}", stats.lcl)),
        ("Points Above UCL", stats.above_count.to_string()),
        ("Points Below LCL", stats.below_count.to_string()),
        ("Total Points", stats.total_count.to_string()),
        ("Out of Control %", format!("{:.2}%", stats.pct_out_of_control)),
    ]
}

pub fn write_stats<W: Write>(stats: &ControlChartStats, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["Statistic", "Value"])?;
    for (name, value) in stats_rows(stats) {
        writer.write_record([name, value.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Default export name, e.g. "Heating Zone 3" -> "Heating_Zone_3_stats.csv".
/// Anything that is not a letter, digit, `-` or `.` becomes `_`.
pub fn stats_file_name(parameter_display: &str) -> String {
    let stem: String = parameter_display
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect();
    format!("{stem}_stats.csv")
}

/// Write a cleaned dataset with its timestamp column first.
pub fn write_dataset<W: Write>(dataset: &Dataset, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);

    let header: Vec<&str> = std::iter::once(dataset.date_column.as_str())
        .chain(dataset.column_names())
        .collect();
    writer.write_record(&header)?;

    for (row, &timestamp) in dataset.index.iter().enumerate() {
        let record: Vec<String> = std::iter::once(format_timestamp(timestamp))
            .chain(dataset.columns.iter().map(|c| c.data.cell(row)))
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    tracing::debug!("Wrote {} cleaned rows", dataset.len());
    Ok(())
}
