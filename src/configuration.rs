use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ContextError, ErrorKind};

/// The name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIGURATION_FILE: &str = "entratel.json";
/// The logo drawn in the header of every page.
pub const DEFAULT_LOGO_PATH: &str = "logo.png";

/// What to do with a line that cannot be decoded.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum MalformedLinePolicy {
    /// Stop the conversion at the first malformed line.
    #[default]
    Abort,
    /// Log the line and continue with the next one.
    Skip,
}

/// How numeric and date fields that cannot be decoded are treated.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum FieldPolicy {
    /// The field is left at zero (or without a date) and a warning is logged.
    #[default]
    Lenient,
    /// The whole line is considered malformed.
    Strict,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportConfiguration {
    pub logo_path: PathBuf,
    pub malformed_lines: MalformedLinePolicy,
    pub field_policy: FieldPolicy,
    /// Whether the streams of the produced PDF are compressed.
    pub compress: bool,
}

impl Default for ReportConfiguration {
    fn default() -> Self {
        ReportConfiguration {
            logo_path: PathBuf::from(DEFAULT_LOGO_PATH),
            malformed_lines: MalformedLinePolicy::default(),
            field_policy: FieldPolicy::default(),
            compress: true,
        }
    }
}

impl ReportConfiguration {
    pub fn from_path(configuration_file_path: &Path) -> Result<Self, ContextError> {
        let configuration_file_contents = std::fs::read_to_string(configuration_file_path)
            .map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Configuration,
                    format!(
                        "Failed to read the configuration file {:?}",
                        configuration_file_path
                    ),
                    &error,
                )
            })?;
        let configuration: ReportConfiguration =
            serde_json::from_str(&configuration_file_contents).map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Configuration,
                    format!(
                        "Failed to parse the configuration file {:?}",
                        configuration_file_path
                    ),
                    &error,
                )
            })?;

        Ok(configuration)
    }

    /// Loads the configuration from the given path if the file exists, otherwise returns the defaults.
    pub fn load_or_default(configuration_file_path: &Path) -> Result<Self, ContextError> {
        if configuration_file_path.exists() {
            log::debug!(
                "Loading the configuration from {:?}",
                configuration_file_path
            );
            Self::from_path(configuration_file_path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_the_defaults() {
        let configuration: ReportConfiguration =
            serde_json::from_str(r#"{ "malformedLines": "skip" }"#).unwrap();

        assert_eq!(configuration.malformed_lines, MalformedLinePolicy::Skip);
        assert_eq!(configuration.field_policy, FieldPolicy::Lenient);
        assert_eq!(configuration.logo_path, PathBuf::from("logo.png"));
        assert!(configuration.compress);
    }

    #[test]
    fn load_or_default_reads_an_existing_file() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join(DEFAULT_CONFIGURATION_FILE);
        std::fs::write(
            &path,
            r#"{ "fieldPolicy": "strict", "logoPath": "assets/logo.png", "compress": false }"#,
        )
        .unwrap();

        let configuration = ReportConfiguration::load_or_default(&path).unwrap();
        assert_eq!(configuration.field_policy, FieldPolicy::Strict);
        assert_eq!(configuration.logo_path, PathBuf::from("assets/logo.png"));
        assert!(!configuration.compress);

        let missing = directory.path().join("missing.json");
        assert_eq!(
            ReportConfiguration::load_or_default(&missing).unwrap(),
            ReportConfiguration::default()
        );
    }

    #[test]
    fn invalid_files_are_configuration_errors() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join(DEFAULT_CONFIGURATION_FILE);
        std::fs::write(&path, r#"{ "fieldPolicy": "sometimes" }"#).unwrap();

        let error = ReportConfiguration::from_path(&path).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Configuration);
    }
}
