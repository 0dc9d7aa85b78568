use log::{info, warn};

use snafu::{prelude::*, Snafu};

use std::fs;
use std::io::Write;

use serde_json::Value as JSValue;
use text_diff::print_diff;

use election_results::{flatten_document, Record, ResultsErrors, RESULT_FIELDS};

use crate::args::Args;

#[derive(Debug, Snafu)]
pub enum ResError {
    #[snafu(display("Error opening file {path}"))]
    OpeningData {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(""))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Invalid results document"))]
    Flattening { source: ResultsErrors },
    #[snafu(display(""))]
    WritingCsv { source: csv::Error },
    #[snafu(display("Error writing output to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ResResult<T> = Result<T, ResError>;

/// Loads the feed, flattens it and writes the records in the requested
/// format. The optional race filter is applied to the raw document before the
/// engine sees it; the optional reference check runs after the output is
/// written.
pub fn run_flatten(args: &Args) -> ResResult<()> {
    let data_path = match &args.data {
        Some(p) => p.clone(),
        None => whatever!("Please specify a data file with --data '/path/to/file.json'"),
    };

    let contents = fs::read_to_string(&data_path).context(OpeningDataSnafu {
        path: data_path.clone(),
    })?;
    let mut doc: JSValue = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;

    if let Some(selector) = &args.races {
        let keep: Vec<String> = selector
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        filter_races(&mut doc, &keep);
    }

    let records = flatten_document(&doc).context(FlatteningSnafu {})?;
    info!("run_flatten: {} flattened records", records.len());

    let rendered = match args.format.as_deref().unwrap_or("csv") {
        "json" => render_json(&records)?,
        "csv" => render_delimited(&records, b',')?,
        "tsv" => render_delimited(&records, b'\t')?,
        other => whatever!("Unknown output format {:?}", other),
    };

    match args.out.as_deref() {
        None | Some("stdout") => std::io::stdout()
            .write_all(rendered.as_bytes())
            .context(WritingOutputSnafu { path: "stdout" })?,
        Some(path) => fs::write(path, &rendered).context(WritingOutputSnafu { path })?,
    }

    if let Some(reference_path) = &args.reference {
        check_reference(reference_path, &records)?;
    }
    Ok(())
}

/// Keeps only the races whose raceID is in the list. A document without a
/// races array is left untouched; the engine reports the structural error.
fn filter_races(doc: &mut JSValue, keep: &[String]) {
    let races = match doc.get_mut("races").and_then(JSValue::as_array_mut) {
        Some(r) => r,
        None => return,
    };
    races.retain(|race| match race.get("raceID").and_then(JSValue::as_str) {
        Some(id) => keep.iter().any(|k| k == id),
        None => false,
    });
}

fn render_json(records: &[Record]) -> ResResult<String> {
    serde_json::to_string(records).context(ParsingJsonSnafu {})
}

fn render_delimited(records: &[Record], delimiter: u8) -> ResResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    writer.write_record(RESULT_FIELDS).context(WritingCsvSnafu {})?;
    for rec in records {
        let row: Vec<String> = RESULT_FIELDS
            .iter()
            .map(|field| cell(rec.get(*field)))
            .collect();
        writer.write_record(&row).context(WritingCsvSnafu {})?;
    }
    let bytes = match writer.into_inner() {
        Ok(b) => b,
        Err(e) => whatever!("Failed to flush the output buffer: {}", e),
    };
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => whatever!("Output is not valid UTF-8: {}", e),
    }
}

/// One tabular cell. Nulls become empty cells, strings are written verbatim
/// and everything else keeps its JSON form.
fn cell(value: Option<&JSValue>) -> String {
    match value {
        None | Some(JSValue::Null) => String::new(),
        Some(JSValue::String(s)) => s.clone(),
        Some(v) => v.to_string(),
    }
}

/// Compares the flattened records against a reference file, printing a diff
/// and failing on any difference.
fn check_reference(path: &str, records: &[Record]) -> ResResult<()> {
    let contents = fs::read_to_string(path).context(OpeningDataSnafu { path })?;
    let reference: JSValue = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    let pretty_reference = serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu {})?;
    let pretty_records = serde_json::to_string_pretty(&records).context(ParsingJsonSnafu {})?;
    if pretty_reference != pretty_records {
        warn!("Found differences with the reference records");
        print_diff(pretty_reference.as_str(), pretty_records.as_str(), "\n");
        whatever!("Difference detected between flattened records and the reference");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cells_render_like_a_dict_writer() {
        assert_eq!(cell(None), "");
        assert_eq!(cell(Some(&JSValue::Null)), "");
        assert_eq!(cell(Some(&json!("Conway"))), "Conway");
        assert_eq!(cell(Some(&json!(504))), "504");
        assert_eq!(cell(Some(&json!(true))), "true");
        assert_eq!(cell(Some(&json!(0.45))), "0.45");
    }

    #[test]
    fn race_filtering_is_by_race_id() {
        let mut doc = json!({
            "electionDate": "2016-02-01",
            "races": [
                {"raceID": "16957"},
                {"raceID": "16958"},
                {"noid": true}
            ]
        });
        filter_races(&mut doc, &["16957".to_string()]);
        let races = doc.get("races").unwrap().as_array().unwrap();
        assert_eq!(races.len(), 1);
        assert_eq!(races[0].get("raceID"), Some(&json!("16957")));
    }

    #[test]
    fn delimited_output_uses_the_fixed_column_order() {
        let mut rec = election_results::new_record();
        rec.insert("id".to_string(), json!("1-polid-2-KY-1"));
        rec.insert("last".to_string(), json!("Conway"));
        let out = render_delimited(&[rec], b'\t').unwrap();
        let mut lines = out.lines();
        let header = lines.next().unwrap();
        assert_eq!(header.split('\t').count(), RESULT_FIELDS.len());
        assert!(header.starts_with("id\traceid\t"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("1-polid-2-KY-1\t"));
        assert_eq!(lines.next(), None);
    }
}
