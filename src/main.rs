use clap::Parser;
use entratel_receipt::{
    configuration::{ReportConfiguration, DEFAULT_CONFIGURATION_FILE},
    error::ContextError,
};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(version, long_about = None)]
struct CliArguments {
    /// The receipt file, the PDF is written next to it.
    #[arg(value_name = "receipt_file")]
    input_path: PathBuf,
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = fallible_main() {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

fn fallible_main() -> Result<(), ContextError> {
    let arguments = CliArguments::parse();
    log::debug!("{:?}", arguments);

    let configuration = ReportConfiguration::load_or_default(Path::new(DEFAULT_CONFIGURATION_FILE))?;
    log::debug!("{:?}", configuration);

    let output_path = entratel_receipt::output_path_for(&arguments.input_path);
    entratel_receipt::convert_file(&arguments.input_path, &output_path, &configuration)
}
