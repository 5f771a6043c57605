use clap::Parser;

/// This is a tabulation program for survey exports.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the report: data sources, questions and rules.
    /// For more information about the file format, read the documentation of the survey_crosstab crate.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, surveytab will check that the
    /// summary of the report matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the report will be written in
    /// JSON format to the given location.
    #[clap(short, long, value_parser)]
    pub summary: Option<String>,

    /// (file path or empty) The survey export to read. Setting this option overrides the data
    /// sources that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (csv or xlsx) The type of the input. By default, it is guessed from the file extension.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (column name) The question to tabulate when no configuration file is given. For
    /// multi-select questions, the text shared by all the columns of the question.
    #[clap(short, long, value_parser)]
    pub question: Option<String>,

    /// (default single) The type of the question: single, multi, matrix, rank or slider.
    #[clap(short, long, value_parser)]
    pub kind: Option<String>,

    /// (file path or 'stdout', default stdout) Where to write the report of the question given
    /// with --question.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (year) The year used to compute the year of birth from the age. Defaults to the
    /// current year.
    #[clap(long, value_parser)]
    pub reference_year: Option<i32>,

    /// (gender, generation, age, region or education, repeatable) The dimensions of the report.
    /// The overall table is always included. Defaults to gender, generation and region.
    #[clap(long, value_parser)]
    pub dimension: Option<Vec<String>>,

    /// If passed as an argument, a malformed grid cell rejects the whole answer of the respondent.
    #[clap(long, takes_value = false)]
    pub strict: bool,

    /// If passed as an argument, questions that are not in the data are skipped instead of
    /// stopping the program.
    #[clap(long, takes_value = false)]
    pub skip_unknown: bool,

    /// If passed as an argument, every record of a segment counts in its denominator, answered
    /// or not. Only useful to reproduce older reports.
    #[clap(long, takes_value = false)]
    pub legacy_denominators: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard error.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
