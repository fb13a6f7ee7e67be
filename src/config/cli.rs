use crate::domain::model::RunParameters;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "bubble-etl")]
#[command(about = "Process postal codes and generate bubble plot.")]
pub struct CliConfig {
    #[arg(long, help = "Input CSV file path")]
    pub input: String,

    #[arg(long = "output_csv", help = "Output CSV file path")]
    pub output_csv: String,

    #[arg(long = "output_html", help = "Output HTML file path")]
    pub output_html: String,

    #[arg(long, help = "Prefix selected by user")]
    pub prefix: String,

    #[arg(long, help = "Month selected by user")]
    pub month: String,

    #[arg(long, help = "Year selected by user")]
    pub year: String,

    #[arg(
        long = "min_count",
        allow_negative_numbers = true,
        help = "Minimum count of cases to be included"
    )]
    pub min_count: i64,

    #[arg(long, help = "Optional TOML configuration file")]
    pub config: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    pub fn run_parameters(&self) -> RunParameters {
        RunParameters {
            input: self.input.clone(),
            output_csv: self.output_csv.clone(),
            output_html: self.output_html.clone(),
            prefix: self.prefix.clone(),
            month: self.month.clone(),
            year: self.year.clone(),
            min_count: self.min_count,
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("input", &self.input)?;
        validation::validate_path("output_csv", &self.output_csv)?;
        validation::validate_path("output_html", &self.output_html)?;
        Ok(())
    }
}
