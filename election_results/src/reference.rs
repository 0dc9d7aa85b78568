// ********* Static geographic reference tables ***********

/// County FIPS codes for the states whose feeds report townships instead of
/// counties. The engine rolls township results up into one synthetic unit per
/// county listed here.
///
/// A state absent from this table reports counties directly, so its raw
/// `subunit` level resolves to `county` and no rollup runs. Adding or
/// removing a special-cased state is a change to this table, not to the
/// classification or rollup code.
pub fn counties_for_state(statepostal: &str) -> Option<&'static [&'static str]> {
    match statepostal {
        "CT" => Some(&[
            "09001", "09003", "09005", "09007", "09009", "09011", "09013", "09015",
        ]),
        "MA" => Some(&[
            "25001", "25003", "25005", "25007", "25009", "25011", "25013", "25015", "25017",
            "25019", "25021", "25023", "25025", "25027",
        ]),
        "ME" => Some(&[
            "23001", "23003", "23005", "23007", "23009", "23011", "23013", "23015", "23017",
            "23019", "23021", "23023", "23025", "23027", "23029", "23031",
        ]),
        "NH" => Some(&[
            "33001", "33003", "33005", "33007", "33009", "33011", "33013", "33015", "33017",
            "33019",
        ]),
        "RI" => Some(&["44001", "44003", "44005", "44007", "44009"]),
        "VT" => Some(&[
            "50001", "50003", "50005", "50007", "50009", "50011", "50013", "50015", "50017",
            "50019", "50021", "50023", "50025", "50027",
        ]),
        _ => None,
    }
}

/// Full state name for a postal abbreviation, covering the 50 states, the
/// District of Columbia and the territories the feed can carry.
pub fn state_name(statepostal: &str) -> Option<&'static str> {
    let name = match statepostal {
        "AK" => "Alaska",
        "AL" => "Alabama",
        "AR" => "Arkansas",
        "AS" => "American Samoa",
        "AZ" => "Arizona",
        "CA" => "California",
        "CO" => "Colorado",
        "CT" => "Connecticut",
        "DC" => "District of Columbia",
        "DE" => "Delaware",
        "FL" => "Florida",
        "GA" => "Georgia",
        "GU" => "Guam",
        "HI" => "Hawaii",
        "IA" => "Iowa",
        "ID" => "Idaho",
        "IL" => "Illinois",
        "IN" => "Indiana",
        "KS" => "Kansas",
        "KY" => "Kentucky",
        "LA" => "Louisiana",
        "MA" => "Massachusetts",
        "MD" => "Maryland",
        "ME" => "Maine",
        "MI" => "Michigan",
        "MN" => "Minnesota",
        "MO" => "Missouri",
        "MP" => "Northern Mariana Islands",
        "MS" => "Mississippi",
        "MT" => "Montana",
        "NC" => "North Carolina",
        "ND" => "North Dakota",
        "NE" => "Nebraska",
        "NH" => "New Hampshire",
        "NJ" => "New Jersey",
        "NM" => "New Mexico",
        "NV" => "Nevada",
        "NY" => "New York",
        "OH" => "Ohio",
        "OK" => "Oklahoma",
        "OR" => "Oregon",
        "PA" => "Pennsylvania",
        "PR" => "Puerto Rico",
        "RI" => "Rhode Island",
        "SC" => "South Carolina",
        "SD" => "South Dakota",
        "TN" => "Tennessee",
        "TX" => "Texas",
        "UT" => "Utah",
        "VA" => "Virginia",
        "VI" => "U.S. Virgin Islands",
        "VT" => "Vermont",
        "WA" => "Washington",
        "WI" => "Wisconsin",
        "WV" => "West Virginia",
        "WY" => "Wyoming",
        _ => return None,
    };
    Some(name)
}
