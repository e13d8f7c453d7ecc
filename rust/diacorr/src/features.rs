//! Feature list model: MS1 features, their rows and the pseudo spectra attached to them.

use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};

use diaquery::{
    DataProcessingError,
    IonTimeSeries,
    Polarity,
    TupleRange,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureStatus {
    Detected,
    Estimated,
    Manual,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PseudoSpectrumType {
    #[default]
    LcDia,
}

/// Synthetic MS2 spectrum assembled from fragments attributed to one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PseudoSpectrum {
    pub ms_level: u8,
    pub precursor_rt: f32,
    pub precursor_mz: f64,
    pub mzs: Vec<f64>,
    pub intensities: Vec<f64>,
    pub polarity: Polarity,
    pub description: String,
    pub kind: PseudoSpectrumType,
}

impl PseudoSpectrum {
    pub fn num_peaks(&self) -> usize {
        self.mzs.len()
    }
}

/// An MS1 feature detected upstream in one raw file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub raw_file: String,
    pub mz: f64,
    pub rt: f32,
    pub height: f64,
    pub status: FeatureStatus,
    pub eic: IonTimeSeries,
    /// `Scan::index` of the most intense point.
    pub apex_scan: Option<u32>,
    #[serde(default)]
    pub mobility: Option<f32>,
    /// Mobility extent of the feature, typically its FWHM.
    #[serde(default)]
    pub mobility_range: Option<TupleRange<f32>>,
    #[serde(default)]
    pub polarity: Polarity,
    #[serde(default)]
    pub ms2: Option<PseudoSpectrum>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureListRow {
    pub id: u32,
    pub features: Vec<Feature>,
}

impl FeatureListRow {
    pub fn feature(&self, raw_file: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.raw_file == raw_file)
    }

    pub fn feature_mut(&mut self, raw_file: &str) -> Option<&mut Feature> {
        self.features.iter_mut().find(|f| f.raw_file == raw_file)
    }
}

/// Provenance entry describing one processing step applied to a feature list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedMethod {
    pub module: String,
    pub parameters: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureList {
    pub name: String,
    pub raw_data_files: Vec<String>,
    pub rows: Vec<FeatureListRow>,
    #[serde(default)]
    pub applied_methods: Vec<AppliedMethod>,
}

impl FeatureList {
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn has_mobility(&self) -> bool {
        self.rows
            .iter()
            .flat_map(|r| r.features.iter())
            .any(|f| f.mobility.is_some())
    }

    /// Checks the chromatogram of every feature.
    pub fn validate(&self) -> Result<(), DataProcessingError> {
        for row in &self.rows {
            for feature in &row.features {
                feature.eic.validate()?;
            }
        }
        Ok(())
    }

    pub fn num_pseudo_spectra(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|r| r.features.iter())
            .filter(|f| f.ms2.is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_upper_case() {
        let json = serde_json::to_string(&FeatureStatus::Detected).unwrap();
        assert_eq!(json, "\"DETECTED\"");
        let kind = serde_json::to_string(&PseudoSpectrumType::LcDia).unwrap();
        assert_eq!(kind, "\"LC_DIA\"");
    }

    #[test]
    fn test_row_lookup_by_file() {
        let eic = IonTimeSeries::try_new(vec![100.0], vec![1.0], vec![10.0], vec![0]).unwrap();
        let feature = Feature {
            raw_file: "a.mzML".into(),
            mz: 100.0,
            rt: 1.0,
            height: 10.0,
            status: FeatureStatus::Detected,
            eic,
            apex_scan: Some(0),
            mobility: None,
            mobility_range: None,
            polarity: Polarity::Positive,
            ms2: None,
        };
        let row = FeatureListRow {
            id: 1,
            features: vec![feature],
        };
        assert!(row.feature("a.mzML").is_some());
        assert!(row.feature("b.mzML").is_none());
    }

    #[test]
    fn test_feature_list_with_broken_chromatogram_does_not_load() {
        let json = r#"{
            "name": "features",
            "raw_data_files": ["a.mzML"],
            "rows": [{"id": 1, "features": [{
                "raw_file": "a.mzML",
                "mz": 100.0,
                "rt": 2.0,
                "height": 10.0,
                "status": "DETECTED",
                "eic": {"mzs": [100.0, 100.0, 100.0], "rts": [1.0, 2.0, 3.0], "intensities": [10.0], "scan_indices": [0, 1, 2]},
                "apex_scan": 1,
                "mobility": null,
                "mobility_range": null,
                "polarity": "positive",
                "ms2": null
            }]}]
        }"#;
        let res: Result<FeatureList, _> = serde_json::from_str(json);
        let err = res.unwrap_err().to_string();
        assert!(err.contains("same length"), "{}", err);

        let valid = json.replace(r#""intensities": [10.0]"#, r#""intensities": [5.0, 10.0, 5.0]"#);
        let flist: FeatureList = serde_json::from_str(&valid).unwrap();
        assert!(flist.validate().is_ok());
    }
}
