// ********* Output record schema ***********

use std::error::Error;
use std::fmt::Display;

use serde_json::{Map, Value};

/// One flat candidate-reporting-unit record.
///
/// The feed is deliberately ragged (mixed-case keys, optional fields), so the
/// record stays a JSON field map rather than a typed struct. Every record
/// produced by the engine carries at least the fields in [RESULT_FIELDS].
pub type Record = Map<String, Value>;

/// The fixed field schema, in export column order.
///
/// Consumers that write tabular output should iterate this list so that every
/// file shares one column layout regardless of which fields the source
/// happened to populate.
pub const RESULT_FIELDS: [&str; 41] = [
    "id",
    "raceid",
    "racetype",
    "racetypeid",
    "ballotorder",
    "candidateid",
    "delegatecount",
    "description",
    "electiondate",
    "electtotal",
    "electwon",
    "fipscode",
    "first",
    "incumbent",
    "initialization_data",
    "is_ballot_measure",
    "last",
    "lastupdated",
    "level",
    "national",
    "officeid",
    "officename",
    "party",
    "polid",
    "polnum",
    "precinctsreporting",
    "precinctsreportingpct",
    "precinctstotal",
    "reportingunitid",
    "reportingunitname",
    "runoff",
    "seatname",
    "seatnum",
    "statename",
    "statepostal",
    "test",
    "totalvotes",
    "uncontested",
    "votecount",
    "votepct",
    "winner",
];

/// A fresh record with every schema field at its default.
///
/// Booleans default to `false`, counters to `0`, ratios to `0.0` and
/// everything else to `null`. Source fields overwrite these during the merge;
/// fields the source never mentions keep the default.
pub fn new_record() -> Record {
    let mut rec = Record::new();
    for field in RESULT_FIELDS {
        rec.insert(field.to_string(), default_for(field));
    }
    rec
}

fn default_for(field: &str) -> Value {
    match field {
        "incumbent" | "initialization_data" | "is_ballot_measure" | "national" | "runoff"
        | "test" | "uncontested" | "winner" => Value::Bool(false),
        "ballotorder" | "delegatecount" | "electtotal" | "electwon" | "precinctsreporting"
        | "precinctstotal" | "totalvotes" | "votecount" => Value::from(0),
        "precinctsreportingpct" | "votepct" => Value::from(0.0),
        _ => Value::Null,
    }
}

/// Renders a field the way identifier formatting needs it: strings verbatim,
/// numbers and booleans in their JSON form, and both absent keys and JSON
/// nulls as the literal `null` marker. The marker surfacing inside an id is
/// accepted source behavior, not something to correct here.
pub(crate) fn field_str(rec: &Record, key: &str) -> String {
    match rec.get(key) {
        None | Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
    }
}

/// Coerces a vote or precinct counter to an integer.
///
/// The feed mixes integers, floats and numeric strings for the same field.
/// Returns `None` for anything that is not numeric; callers decide whether
/// that means a default or a skipped contribution.
pub(crate) fn coerce_count(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Errors for structurally invalid input documents.
///
/// Per-record anomalies (missing cosmetic fields, malformed counters) never
/// surface here; the engine substitutes defaults or skips the one
/// contribution instead.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ResultsErrors {
    /// The document has no usable top-level `electionDate` string.
    MissingElectionDate,
    /// The document has no top-level `races` array.
    MissingRaces,
}

impl Error for ResultsErrors {}

impl Display for ResultsErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultsErrors::MissingElectionDate => {
                write!(f, "document is missing the electionDate field")
            }
            ResultsErrors::MissingRaces => write!(f, "document is missing the races field"),
        }
    }
}
