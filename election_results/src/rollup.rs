// ********* County rollup synthesis ***********
//
// The feeds for the New England states report townships and no county tier,
// while the official geography is the county. For those states one synthetic
// county unit is manufactured per county code by summing the matching
// townships. The synthesized units are appended to the race by the driver and
// flatten exactly like source-provided units afterwards.

use std::collections::HashMap;

use log::warn;
use serde_json::Value;

use crate::normalize::{padded_fips, poll_key};
use crate::record::{coerce_count, Record};
use crate::reference;

/// Reporting units carrying this marker are a feed artifact, not townships,
/// and must never be counted into a county.
const MAIL_BALLOT_ARTIFACT: &str = "Mail Ballots C.D.";

/// Builds the synthetic county units for one race.
///
/// Returns an empty list when the race's state is not in the county table or
/// when no township-level unit is present. Counties with no matching
/// township are omitted outright; primaries where a county reports zero
/// townships are a known feed shape and must not produce empty units.
///
/// The function is pure over its inputs so the driver can append the result
/// exactly once per race.
pub(crate) fn synthesize_counties(race: &Record, units: &[Record]) -> Vec<Record> {
    let statepostal = race
        .get("statepostal")
        .and_then(Value::as_str)
        .or_else(|| {
            units
                .iter()
                .find_map(|u| u.get("statepostal").and_then(Value::as_str))
        });
    let statepostal = match statepostal {
        Some(s) => s,
        None => return Vec::new(),
    };
    let counties = match reference::counties_for_state(statepostal) {
        Some(c) => c,
        None => return Vec::new(),
    };

    let townships: Vec<&Record> = units
        .iter()
        .filter(|u| u.get("level").and_then(Value::as_str) == Some("subunit"))
        .filter(|u| !unit_name(u).contains(MAIL_BALLOT_ARTIFACT))
        .collect();
    if townships.is_empty() {
        return Vec::new();
    }

    let mut synthesized = Vec::new();
    for &county_fips in counties {
        let matched: Vec<&Record> = townships
            .iter()
            .copied()
            .filter(|u| u.get("fipscode").and_then(padded_fips).as_deref() == Some(county_fips))
            .collect();
        if matched.is_empty() {
            continue;
        }
        synthesized.push(build_county(county_fips, statepostal, &matched));
    }
    synthesized
}

fn unit_name(unit: &Record) -> &str {
    unit.get("reportingunitname")
        .and_then(Value::as_str)
        .unwrap_or("")
}

fn reporting_pct(reporting: i64, total: i64) -> f64 {
    if total > 0 {
        reporting as f64 / total as f64
    } else {
        0.0
    }
}

fn add_to(rec: &mut Record, key: &str, amount: i64) {
    let current = rec.get(key).and_then(coerce_count).unwrap_or(0);
    rec.insert(key.to_string(), Value::from(current + amount));
}

fn build_county(county_fips: &str, statepostal: &str, townships: &[&Record]) -> Record {
    let mut precincts_total: i64 = 0;
    let mut precincts_reporting: i64 = 0;
    for t in townships {
        // A township with unusable counters contributes nothing; the rollup
        // keeps going with the rest.
        let total = match t.get("precinctstotal").and_then(coerce_count) {
            Some(n) => n,
            None => {
                warn!(
                    "county {}: no usable precinct total on township {:?}, skipping it",
                    county_fips,
                    unit_name(t)
                );
                continue;
            }
        };
        precincts_total += total;
        precincts_reporting += t
            .get("precinctsreporting")
            .and_then(coerce_count)
            .unwrap_or(0);
    }

    // Candidate rollups, keyed by the same poll identity the record ids use.
    // Source order of first appearance is kept.
    let mut order: Vec<String> = Vec::new();
    let mut rollups: HashMap<String, Record> = HashMap::new();
    for t in townships {
        let unit_total = t.get("precinctstotal").and_then(coerce_count);
        let unit_reporting = t.get("precinctsreporting").and_then(coerce_count);
        let candidates = match t.get("candidates").and_then(Value::as_array) {
            Some(c) => c,
            None => continue,
        };
        for cand in candidates {
            let cmap = match cand.as_object() {
                Some(m) => m,
                None => continue,
            };
            let key = poll_key(cmap);
            let entry = rollups.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                let mut seed = cmap.clone();
                seed.insert("votecount".to_string(), Value::from(0));
                seed.insert("precinctstotal".to_string(), Value::from(0));
                seed.insert("precinctsreporting".to_string(), Value::from(0));
                seed
            });
            match cmap.get("votecount") {
                // Missing counters count for zero.
                None | Some(Value::Null) => {}
                Some(v) => match coerce_count(v) {
                    Some(n) => add_to(entry, "votecount", n),
                    None => warn!(
                        "county {}: unusable vote count {:?} in township {:?}, skipping that contribution",
                        county_fips,
                        v,
                        unit_name(t)
                    ),
                },
            }
            // Candidates carry no precinct counters of their own in the feed;
            // the enclosing township's counters stand in for them.
            if let Some(n) = unit_total {
                add_to(entry, "precinctstotal", n);
            }
            if let Some(n) = unit_reporting {
                add_to(entry, "precinctsreporting", n);
            }
        }
    }

    let candidates: Vec<Value> = order
        .iter()
        .filter_map(|key| rollups.remove(key))
        .map(|mut cand| {
            let total = cand.get("precinctstotal").and_then(coerce_count).unwrap_or(0);
            let reporting = cand
                .get("precinctsreporting")
                .and_then(coerce_count)
                .unwrap_or(0);
            cand.insert(
                "precinctsreportingpct".to_string(),
                Value::from(reporting_pct(reporting, total)),
            );
            Value::Object(cand)
        })
        .collect();

    let mut county = Record::new();
    county.insert("level".to_string(), Value::from("county"));
    county.insert("fipscode".to_string(), Value::from(county_fips));
    county.insert("statepostal".to_string(), Value::from(statepostal));
    // The county code doubles as the raw unit id; identifier assignment
    // prefixes the level during flattening.
    county.insert("reportingunitid".to_string(), Value::from(county_fips));
    county.insert("precinctstotal".to_string(), Value::from(precincts_total));
    county.insert(
        "precinctsreporting".to_string(),
        Value::from(precincts_reporting),
    );
    county.insert(
        "precinctsreportingpct".to_string(),
        Value::from(reporting_pct(precincts_reporting, precincts_total)),
    );
    county.insert("candidates".to_string(), Value::Array(candidates));
    county
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(fields: Value) -> Record {
        fields.as_object().unwrap().clone()
    }

    fn township(fips: &str, name: &str, total: i64, reporting: i64, votes: &[(&str, i64)]) -> Record {
        let candidates: Vec<Value> = votes
            .iter()
            .map(|(polid, count)| json!({"polid": polid, "last": polid, "votecount": count}))
            .collect();
        record(json!({
            "level": "subunit",
            "statepostal": "RI",
            "fipscode": fips,
            "reportingunitname": name,
            "precinctstotal": total,
            "precinctsreporting": reporting,
            "candidates": candidates,
        }))
    }

    fn ri_race() -> Record {
        record(json!({"raceid": "1", "statepostal": "RI"}))
    }

    #[test]
    fn no_rollup_outside_the_county_table() {
        let race = record(json!({"raceid": "1", "statepostal": "MD"}));
        let units = vec![township("24001", "Cumberland", 3, 1, &[("100", 5)])];
        assert!(synthesize_counties(&race, &units).is_empty());
    }

    #[test]
    fn one_county_per_covered_code() {
        let units = vec![
            township("44001", "Barrington", 4, 2, &[("100", 10), ("200", 4)]),
            township("44003", "Coventry", 6, 6, &[("100", 7), ("200", 9)]),
            township("44005", "Newport", 2, 0, &[("100", 1)]),
            township("44007", "Cranston", 9, 3, &[("100", 0)]),
            township("44009", "Westerly", 5, 5, &[("200", 12)]),
        ];
        let counties = synthesize_counties(&ri_race(), &units);
        assert_eq!(counties.len(), 5);
        for county in &counties {
            assert_eq!(county.get("level"), Some(&json!("county")));
            assert_eq!(county.get("statepostal"), Some(&json!("RI")));
        }
    }

    #[test]
    fn counties_without_townships_are_omitted() {
        let units = vec![
            township("44001", "Barrington", 4, 2, &[("100", 10)]),
            township("44009", "Westerly", 5, 5, &[("100", 3)]),
        ];
        let counties = synthesize_counties(&ri_race(), &units);
        let codes: Vec<&Value> = counties.iter().filter_map(|c| c.get("fipscode")).collect();
        assert_eq!(codes, vec![&json!("44001"), &json!("44009")]);
    }

    #[test]
    fn townships_sum_into_their_county() {
        let units = vec![
            township("44001", "Barrington", 4, 2, &[("100", 10), ("200", 4)]),
            township("44001", "Warren", 6, 5, &[("100", 7), ("200", 9)]),
        ];
        let counties = synthesize_counties(&ri_race(), &units);
        assert_eq!(counties.len(), 1);
        let county = &counties[0];
        assert_eq!(county.get("precinctstotal"), Some(&json!(10)));
        assert_eq!(county.get("precinctsreporting"), Some(&json!(7)));
        assert_eq!(county.get("precinctsreportingpct"), Some(&json!(0.7)));
        assert_eq!(county.get("reportingunitid"), Some(&json!("44001")));

        let cands = county.get("candidates").unwrap().as_array().unwrap();
        assert_eq!(cands.len(), 2);
        let first = cands[0].as_object().unwrap();
        assert_eq!(first.get("polid"), Some(&json!("100")));
        assert_eq!(first.get("votecount"), Some(&json!(17)));
        assert_eq!(first.get("precinctstotal"), Some(&json!(10)));
        assert_eq!(first.get("precinctsreporting"), Some(&json!(7)));
        assert_eq!(first.get("precinctsreportingpct"), Some(&json!(0.7)));
        let second = cands[1].as_object().unwrap();
        assert_eq!(second.get("votecount"), Some(&json!(13)));
    }

    #[test]
    fn mail_ballot_units_are_never_counted() {
        let units = vec![
            township("44001", "Barrington", 4, 2, &[("100", 10)]),
            township("44001", "Mail Ballots C.D. 1", 99, 99, &[("100", 1000)]),
        ];
        let counties = synthesize_counties(&ri_race(), &units);
        assert_eq!(counties.len(), 1);
        assert_eq!(counties[0].get("precinctstotal"), Some(&json!(4)));
        let cands = counties[0].get("candidates").unwrap().as_array().unwrap();
        assert_eq!(cands[0].get("votecount"), Some(&json!(10)));
    }

    #[test]
    fn ragged_townships_are_skipped_not_fatal() {
        let mut broken = township("44001", "Warren", 0, 0, &[("100", 7)]);
        broken.remove("precinctstotal");
        broken.remove("precinctsreporting");
        let units = vec![
            township("44001", "Barrington", 4, 2, &[("100", 10)]),
            broken,
        ];
        let counties = synthesize_counties(&ri_race(), &units);
        assert_eq!(counties.len(), 1);
        let county = &counties[0];
        // The broken unit contributes no precincts but its votes still count.
        assert_eq!(county.get("precinctstotal"), Some(&json!(4)));
        assert_eq!(county.get("precinctsreporting"), Some(&json!(2)));
        let cands = county.get("candidates").unwrap().as_array().unwrap();
        assert_eq!(cands[0].get("votecount"), Some(&json!(17)));
        assert_eq!(cands[0].get("precinctstotal"), Some(&json!(4)));
    }

    #[test]
    fn zero_precinct_counties_divide_to_zero() {
        let units = vec![township("44001", "Barrington", 0, 0, &[("100", 0)])];
        let counties = synthesize_counties(&ri_race(), &units);
        assert_eq!(counties[0].get("precinctsreportingpct"), Some(&json!(0.0)));
    }

    #[test]
    fn unpadded_township_fips_still_matches() {
        let mut unit = township("9001", "Greenwich", 3, 1, &[("100", 2)]);
        unit.insert("statepostal".to_string(), json!("CT"));
        let race = record(json!({"raceid": "1", "statepostal": "CT"}));
        let counties = synthesize_counties(&race, &[unit]);
        assert_eq!(counties.len(), 1);
        assert_eq!(counties[0].get("fipscode"), Some(&json!("09001")));
    }
}
