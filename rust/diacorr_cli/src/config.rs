use serde::{
    Deserialize,
    Serialize,
};
use std::path::{
    Path,
    PathBuf,
};

use diacorr::DiaCorrParameters;

use crate::cli::RunArgs;
use crate::errors::CliError;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub analysis: DiaCorrParameters,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct InputConfig {
    pub raw_file: Option<PathBuf>,
    pub feature_list: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

/// Fully specified run: every path is known and the parameters are valid.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub raw_file: PathBuf,
    pub feature_list: PathBuf,
    pub analysis: DiaCorrParameters,
    pub output: OutputConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, CliError> {
        let file = std::fs::File::open(path).map_err(|e| CliError::io(e, path))?;
        serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| CliError::ParseError {
            msg: format!("{}: {}", path.display(), e),
        })
    }

    /// Command line values take precedence over the file.
    pub fn with_cli_args(mut self, args: &RunArgs) -> Self {
        if let Some(raw_file) = &args.raw_file {
            self.input.raw_file = Some(raw_file.clone());
        }
        if let Some(feature_list) = &args.feature_list {
            self.input.feature_list = Some(feature_list.clone());
        }
        if let Some(output_dir) = &args.output_dir {
            self.output = Some(OutputConfig {
                directory: output_dir.clone(),
            });
        }
        self
    }

    pub fn resolve(self) -> Result<ResolvedConfig, CliError> {
        let raw_file = self.input.raw_file.ok_or_else(|| CliError::Config {
            source: "No raw file provided, please provide one in either the config file or with the --raw-file flag".to_string(),
        })?;
        let feature_list = self.input.feature_list.ok_or_else(|| CliError::Config {
            source: "No feature list provided, please provide one in either the config file or with the --feature-list flag".to_string(),
        })?;
        let output = self.output.ok_or_else(|| CliError::Config {
            source: "No output directory provided, please provide one in either the config file or with the --output-dir flag".to_string(),
        })?;
        self.analysis.validate()?;
        Ok(ResolvedConfig {
            raw_file,
            feature_list,
            analysis: self.analysis,
            output,
        })
    }

    pub fn template() -> Self {
        Self {
            input: InputConfig {
                raw_file: Some(PathBuf::from("raw_file.json")),
                feature_list: Some(PathBuf::from("feature_list.json")),
            },
            analysis: DiaCorrParameters::default(),
            output: Some(OutputConfig {
                directory: PathBuf::from("diacorr_output"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> RunArgs {
        RunArgs {
            config: PathBuf::from("config.json"),
            raw_file: None,
            feature_list: Some(PathBuf::from("cli_features.json")),
            output_dir: Some(PathBuf::from("out")),
        }
    }

    #[test]
    fn test_cli_args_override_file() {
        let config: Config = serde_json::from_str(
            r#"{
                "input": {"raw_file": "run.json", "feature_list": "features.json"},
                "analysis": {"min_pearson": 0.9}
            }"#,
        )
        .unwrap();
        let resolved = config.with_cli_args(&args()).resolve().unwrap();
        assert_eq!(resolved.raw_file, PathBuf::from("run.json"));
        assert_eq!(resolved.feature_list, PathBuf::from("cli_features.json"));
        assert_eq!(resolved.output.directory, PathBuf::from("out"));
        assert_eq!(resolved.analysis.min_pearson, 0.9);
        assert_eq!(resolved.analysis.min_corr_points, 5);
    }

    #[test]
    fn test_missing_inputs_are_reported() {
        let res = Config::default().with_cli_args(&args()).resolve();
        assert!(matches!(res, Err(CliError::Config { .. })));
    }

    #[test]
    fn test_invalid_analysis_is_reported() {
        let mut config = Config::template();
        config.analysis.min_pearson = 2.0;
        assert!(matches!(config.resolve(), Err(CliError::Config { .. })));
    }

    #[test]
    fn test_template_round_trips() {
        let json = serde_json::to_string_pretty(&Config::template()).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert!(back.resolve().is_ok());
    }
}
