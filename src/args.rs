use clap::Parser;

/// This program flattens an AP election results feed into tabular records.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The JSON results feed to flatten: a document with a top-level
    /// electionDate and a races array.
    #[clap(short, long, value_parser)]
    pub data: Option<String>,

    /// (comma-separated race identifiers or not specified) If specified, only the
    /// listed races are flattened. Filtering happens before the engine runs.
    #[clap(long, value_parser)]
    pub races: Option<String>,

    /// (file path, 'stdout' or empty) Where to write the flattened records.
    /// Defaults to the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (default csv) The output format. One of csv, tsv or json. Tabular output
    /// uses the engine's fixed column order.
    #[clap(long, value_parser)]
    pub format: Option<String>,

    /// (file path or empty) A reference file containing the expected records in
    /// JSON format. If provided, apres will check that the flattened output
    /// matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
