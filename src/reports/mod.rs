use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use spiralscore::error::SpiralResult;
use spiralscore::scorer::types::{Classification, ScoreWarning};
use spiralscore::scorer::{Metric, ScoreResult};
use std::path::Path;
use strum::IntoEnumIterator;

fn classification_color(c: Classification) -> Color {
    match c {
        Classification::Normal => Color::Green,
        Classification::Mild => Color::Yellow,
        Classification::Moderate => Color::DarkYellow,
        Classification::Severe => Color::Red,
    }
}

fn describe_warning(w: &ScoreWarning) -> String {
    match w {
        ScoreWarning::Clamped { raw, clamped } => {
            format!("score {:.4} clamped to {:.4}", raw, clamped)
        }
        ScoreWarning::ReferenceRefit { a, b } => {
            format!("reference refit to a={:.3}, b={:.3}", a, b)
        }
        ScoreWarning::DemoJitter { delta } => format!("demo jitter {:+.4} applied", delta),
    }
}

pub fn print_score_report(name: &str, result: &ScoreResult) {
    println!("\n🌀 Trace: {}", name);

    let mut summary = Table::new();
    summary
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    summary.add_row(vec![
        Cell::new("Severity").add_attribute(Attribute::Bold),
        Cell::new(format!("{:.4}", result.severity_score)).fg(Color::Cyan),
    ]);
    summary.add_row(vec![
        Cell::new("Raw Score"),
        Cell::new(format!("{:.4}", result.raw_score)),
    ]);
    summary.add_row(vec![
        Cell::new("Classification").add_attribute(Attribute::Bold),
        Cell::new(result.classification.to_string())
            .fg(classification_color(result.classification)),
    ]);
    println!("{}", summary);

    print_feature_table(result);
    print_contributor_table(result);

    for w in &result.warnings {
        println!("⚠️  {}", describe_warning(w));
    }
}

pub fn print_feature_table(result: &ScoreResult) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec![
        Cell::new("Metric").add_attribute(Attribute::Bold),
        Cell::new("Value"),
        Cell::new("Z"),
    ]);
    for i in 1..=2 {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }

    for metric in Metric::iter() {
        let Some(value) = result.features.get(metric) else {
            continue;
        };
        let z = match result.z_scores.get(&metric) {
            Some(z) => {
                let cell = Cell::new(format!("{:+.3}", z));
                if *z >= 2.0 {
                    cell.fg(Color::Red)
                } else {
                    cell
                }
            }
            None => Cell::new("-"),
        };
        table.add_row(vec![
            Cell::new(metric.as_ref()),
            Cell::new(format!("{:.4}", value)),
            z,
        ]);
    }
    println!("{}", table);
}

pub fn print_contributor_table(result: &ScoreResult) {
    if result.top_contributors.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.load_preset(ASCII_FULL);
    table.add_row(vec![
        Cell::new("#"),
        Cell::new("Top Contributor").add_attribute(Attribute::Bold),
        Cell::new("w·z"),
    ]);

    for (rank, c) in result.top_contributors.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(c.metric.as_ref()),
            Cell::new(format!("{:+.4}", c.contribution)).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{}", table);
}

/// One row per trace; failures keep their row with the error text.
pub fn print_batch_summary(rows: &[(String, Result<ScoreResult, String>)]) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec![
        Cell::new("Trace").add_attribute(Attribute::Bold),
        Cell::new("Severity").fg(Color::Cyan),
        Cell::new("Class"),
        Cell::new("Top Contributor"),
    ]);

    for (name, outcome) in rows {
        match outcome {
            Ok(r) => table.add_row(vec![
                Cell::new(name),
                Cell::new(format!("{:.4}", r.severity_score)).set_alignment(CellAlignment::Right),
                Cell::new(r.classification.to_string()).fg(classification_color(r.classification)),
                Cell::new(
                    r.top_contributors
                        .first()
                        .map(|c| c.metric.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ),
            ]),
            Err(e) => table.add_row(vec![
                Cell::new(name),
                Cell::new("ERR").fg(Color::Red),
                Cell::new("-"),
                Cell::new(e),
            ]),
        };
    }
    println!("{}", table);
}

/// Flat CSV: identity, score columns, then one column per metric value.
pub fn write_batch_csv<P: AsRef<Path>>(
    path: P,
    rows: &[(String, Result<ScoreResult, String>)],
) -> SpiralResult<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec![
        "trace".to_string(),
        "severity_score".to_string(),
        "raw_score".to_string(),
        "classification".to_string(),
        "error".to_string(),
    ];
    header.extend(Metric::iter().map(|m| m.to_string()));
    writer.write_record(&header)?;

    for (name, outcome) in rows {
        let mut record = vec![name.clone()];
        match outcome {
            Ok(r) => {
                record.push(format!("{:.6}", r.severity_score));
                record.push(format!("{:.6}", r.raw_score));
                record.push(r.classification.to_string());
                record.push(String::new());
                record.extend(Metric::iter().map(|m| {
                    r.features
                        .get(m)
                        .map(|v| format!("{:.6}", v))
                        .unwrap_or_default()
                }));
            }
            Err(e) => {
                record.extend([String::new(), String::new(), String::new(), e.clone()]);
                record.extend(Metric::iter().map(|_| String::new()));
            }
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
