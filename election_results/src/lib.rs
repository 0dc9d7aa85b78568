mod normalize;
mod record;
mod reference;
mod rollup;

use std::collections::HashMap;

use log::{debug, info, warn};
use serde_json::{Map, Value};

pub use crate::record::{new_record, Record, ResultsErrors, RESULT_FIELDS};
pub use crate::reference::{counties_for_state, state_name};

use crate::record::{coerce_count, field_str};

/// Transient vote totals for one flattening pass, keyed by
/// (raceid, derived reportingunitid). Built while records are produced,
/// consumed by the percentage pass, then dropped.
struct VoteTotals(HashMap<(String, String), i64>);

impl VoteTotals {
    fn new() -> VoteTotals {
        VoteTotals(HashMap::new())
    }

    fn add(&mut self, raceid: &str, unit_id: &str, count: i64) {
        *self
            .0
            .entry((raceid.to_string(), unit_id.to_string()))
            .or_insert(0) += count;
    }

    fn get(&self, raceid: &str, unit_id: &str) -> i64 {
        self.0
            .get(&(raceid.to_string(), unit_id.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

/// Flattens a full results document.
///
/// The document must carry a top-level `electionDate` string and a `races`
/// array; anything else is structurally invalid and is the only condition
/// this engine raises for. Per-record anomalies inside the races are handled
/// by default substitution or per-contribution skips, never by failing the
/// run.
pub fn flatten_document(doc: &Value) -> Result<Vec<Record>, ResultsErrors> {
    let electiondate = doc
        .get("electionDate")
        .and_then(Value::as_str)
        .ok_or(ResultsErrors::MissingElectionDate)?;
    let races = doc
        .get("races")
        .and_then(Value::as_array)
        .ok_or(ResultsErrors::MissingRaces)?;
    flatten_races(electiondate, races)
}

/// Flattens a list of races into one record per candidate per reporting
/// unit.
///
/// Two passes are required: totals for a reporting unit are only known after
/// every candidate in it has been visited, so percentages are annotated over
/// the finished record list rather than during the traversal. Output order
/// reproduces source insertion order, with synthesized county units after
/// their race's source units.
pub fn flatten_races(electiondate: &str, races: &[Value]) -> Result<Vec<Record>, ResultsErrors> {
    info!("flatten_races: processing {} races", races.len());
    let mut records: Vec<Record> = Vec::new();
    let mut totals = VoteTotals::new();

    for race in races {
        let race_map = match race.as_object() {
            Some(m) => m,
            None => {
                warn!("flatten_races: skipping non-object race entry");
                continue;
            }
        };
        // Races without reporting units carry no results to flatten.
        let units_src = match race_map.get("reportingUnits").and_then(Value::as_array) {
            Some(u) if !u.is_empty() => u,
            _ => continue,
        };

        let mut race_fields = normalize::lower_keys(race_map);
        // Neither nested collection belongs on a flat record.
        race_fields.remove("reportingunits");
        race_fields.remove("candidates");
        debug!(
            "flatten_races: race {:?} with {} reporting units",
            race_fields.get("raceid"),
            units_src.len()
        );

        let mut units: Vec<Record> = units_src
            .iter()
            .filter_map(Value::as_object)
            .map(prepare_unit)
            .collect();
        // Synthetic counties are appended exactly once here; from this point
        // on they flatten like any source-provided unit.
        let counties = rollup::synthesize_counties(&race_fields, &units);
        units.extend(counties);

        for unit in &units {
            let candidates = match unit.get("candidates").and_then(Value::as_array) {
                Some(c) => c,
                None => continue,
            };
            for cand in candidates {
                let cmap = match cand.as_object() {
                    Some(m) => m,
                    None => continue,
                };
                if let Some(rec) = build_record(electiondate, &race_fields, unit, cmap, &mut totals)
                {
                    records.push(rec);
                }
            }
        }
    }

    annotate_percentages(&mut records, &totals);
    info!("flatten_races: produced {} records", records.len());
    Ok(records)
}

/// One reporting unit with all keys (including its candidates') folded to
/// lower case.
fn prepare_unit(map: &Map<String, Value>) -> Record {
    let mut unit = normalize::lower_keys(map);
    if let Some(Value::Array(cands)) = unit.get("candidates").cloned() {
        let lowered: Vec<Value> = cands
            .iter()
            .map(|c| match c.as_object() {
                Some(m) => Value::Object(normalize::lower_keys(m)),
                None => c.clone(),
            })
            .collect();
        unit.insert("candidates".to_string(), Value::Array(lowered));
    }
    unit
}

/// Builds one flat record from a (race, unit, candidate) triple and folds its
/// vote count into the totals table.
///
/// Merge precedence is race < reporting unit < candidate: the narrowest
/// scope wins on key collision. Returns `None` only for a non-numeric vote
/// count, which drops that single candidate's record.
fn build_record(
    electiondate: &str,
    race_fields: &Record,
    unit: &Record,
    cand: &Map<String, Value>,
    totals: &mut VoteTotals,
) -> Option<Record> {
    let mut rec = new_record();
    for (k, v) in race_fields {
        rec.insert(k.clone(), v.clone());
    }
    for (k, v) in unit {
        if k != "candidates" {
            rec.insert(k.clone(), v.clone());
        }
    }
    for (k, v) in cand {
        rec.insert(k.clone(), v.clone());
    }
    rec.insert("electiondate".to_string(), Value::from(electiondate));

    let rec = normalize::normalize_fields(rec);
    let rec = normalize::classify_geography(rec);
    let mut rec = normalize::assign_identifiers(rec);

    let count = match rec.get("votecount") {
        // A missing counter takes the schema default.
        None | Some(Value::Null) => 0,
        Some(v) => match coerce_count(v) {
            Some(n) => n,
            None => {
                warn!(
                    "dropping candidate record {:?}: vote count {:?} is not numeric",
                    rec.get("id"),
                    v
                );
                return None;
            }
        },
    };
    rec.insert("votecount".to_string(), Value::from(count));
    totals.add(
        &field_str(&rec, "raceid"),
        &field_str(&rec, "reportingunitid"),
        count,
    );
    Some(rec)
}

/// Second pass: writes `totalvotes` and `votepct` onto every record.
///
/// A zero-vote reporting unit keeps the default percentage; no division is
/// attempted for it.
fn annotate_percentages(records: &mut [Record], totals: &VoteTotals) {
    for rec in records.iter_mut() {
        let raceid = field_str(rec, "raceid");
        let unit_id = field_str(rec, "reportingunitid");
        let total = totals.get(&raceid, &unit_id);
        rec.insert("totalvotes".to_string(), Value::from(total));
        if total > 0 {
            let count = rec.get("votecount").and_then(coerce_count).unwrap_or(0);
            rec.insert(
                "votepct".to_string(),
                Value::from(count as f64 / total as f64),
            );
        }
    }
}
