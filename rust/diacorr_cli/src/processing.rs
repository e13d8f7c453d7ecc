use indicatif::{
    ProgressBar,
    ProgressStyle,
};
use serde::Serialize;
use std::fs::File;
use std::io::{
    BufReader,
    BufWriter,
};
use std::path::Path;
use std::time::{
    Duration,
    Instant,
};
use tracing::{
    debug,
    info,
};

use diacorr::{
    DiaMs2CorrTask,
    FeatureList,
    TaskOutcome,
    TaskProgress,
};
use diaquery::RawDataFile;

use crate::config::ResolvedConfig;
use crate::errors::CliError;

const PROGRESS_TICKS: u64 = 1000;

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let file = File::open(path).map_err(|e| CliError::io(e, path))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| CliError::ParseError {
        msg: format!("{}: {}", path.display(), e),
    })
}

fn write_json<T: Serialize>(data: &T, path: &Path) -> Result<(), CliError> {
    let file = File::create(path).map_err(|e| CliError::io(e, path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), data).map_err(|e| CliError::io(e, path))
}

#[derive(Debug, Serialize)]
struct PseudoSpectrumRecord<'a> {
    row_id: u32,
    feature_mz: f64,
    feature_rt: f32,
    num_fragments: usize,
    base_peak_mz: Option<f64>,
    description: &'a str,
}

/// One line per feature carrying a pseudo spectrum.
pub fn write_pseudo_spectra_csv(flist: &FeatureList, path: &Path) -> Result<usize, CliError> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut written = 0;
    for row in &flist.rows {
        for feature in &row.features {
            let Some(spectrum) = &feature.ms2 else {
                continue;
            };
            let base_peak_mz = spectrum
                .mzs
                .iter()
                .zip(spectrum.intensities.iter())
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(mz, _)| *mz);
            writer.serialize(PseudoSpectrumRecord {
                row_id: row.id,
                feature_mz: feature.mz,
                feature_rt: feature.rt,
                num_fragments: spectrum.num_peaks(),
                base_peak_mz,
                description: &spectrum.description,
            })?;
            written += 1;
        }
    }
    writer.flush().map_err(|e| CliError::io(e, path))?;
    Ok(written)
}

/// Mirrors the task progress on a progress bar until the task reaches a terminal state.
fn report_progress(progress: &TaskProgress) {
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {percent}% ({eta}) {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    let bar = ProgressBar::new(PROGRESS_TICKS).with_style(style);
    loop {
        bar.set_position((progress.finished_fraction() * PROGRESS_TICKS as f64) as u64);
        bar.set_message(progress.description());
        if progress.status().is_terminal() {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    bar.finish_with_message(format!("{:?}", progress.status()));
}

pub fn process(config: ResolvedConfig) -> Result<TaskOutcome, CliError> {
    let st = Instant::now();
    let raw: RawDataFile = read_json(&config.raw_file)?;
    let mut flist: FeatureList = read_json(&config.feature_list)?;
    info!(
        "Loaded raw file {} ({} scans) and feature list {} ({} rows) in {:?}",
        raw.name,
        raw.scans.len(),
        flist.name,
        flist.num_rows(),
        st.elapsed()
    );

    let task = DiaMs2CorrTask::new(config.analysis)?;
    let progress = task.progress();
    let outcome = std::thread::scope(|s| {
        s.spawn(|| report_progress(&progress));
        task.run(&mut flist, &raw)
    })?;
    debug!("Task outcome: {:?}", outcome);

    std::fs::create_dir_all(&config.output.directory)
        .map_err(|e| CliError::io(e, &config.output.directory))?;
    let flist_path = config.output.directory.join("feature_list.json");
    write_json(&flist, &flist_path)?;
    let csv_path = config.output.directory.join("pseudo_spectra.csv");
    let written = write_pseudo_spectra_csv(&flist, &csv_path)?;
    let summary_path = config.output.directory.join("run_summary.json");
    write_json(&outcome, &summary_path)?;

    info!(
        "Wrote {} pseudo spectra to {} and the feature list to {}",
        written,
        csv_path.display(),
        flist_path.display()
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use diacorr::{
        Feature,
        FeatureListRow,
        FeatureStatus,
        PseudoSpectrum,
        PseudoSpectrumType,
    };
    use diaquery::{
        IonTimeSeries,
        Polarity,
    };

    fn feature(ms2: Option<PseudoSpectrum>) -> Feature {
        Feature {
            raw_file: "run".into(),
            mz: 412.2,
            rt: 10.0,
            height: 1e6,
            status: FeatureStatus::Detected,
            eic: IonTimeSeries::try_new(vec![412.2], vec![10.0], vec![1e6], vec![0]).unwrap(),
            apex_scan: Some(0),
            mobility: None,
            mobility_range: None,
            polarity: Polarity::Positive,
            ms2,
        }
    }

    #[test]
    fn test_csv_lists_features_with_spectra() {
        let spectrum = PseudoSpectrum {
            ms_level: 2,
            precursor_rt: 10.0,
            precursor_mz: 412.2,
            mzs: vec![150.05, 250.1],
            intensities: vec![10.0, 30.0],
            polarity: Polarity::Positive,
            description: "Pseudo MS2 (R >= 0.80)".into(),
            kind: PseudoSpectrumType::LcDia,
        };
        let flist = FeatureList {
            name: "features".into(),
            raw_data_files: vec!["run".into()],
            rows: vec![
                FeatureListRow {
                    id: 7,
                    features: vec![feature(Some(spectrum))],
                },
                FeatureListRow {
                    id: 8,
                    features: vec![feature(None)],
                },
            ],
            applied_methods: Vec::new(),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pseudo_spectra.csv");
        assert_eq!(write_pseudo_spectra_csv(&flist, &path).unwrap(), 1);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "row_id,feature_mz,feature_rt,num_fragments,base_peak_mz,description"
        );
        assert_eq!(lines[1], "7,412.2,10.0,2,250.1,Pseudo MS2 (R >= 0.80)");
        assert_eq!(lines.len(), 2);
    }
}
