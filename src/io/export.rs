//! Export stored samples to CSV.
//!
//! The layout matches what `ingest` reads back (`flow_rate,pressure`), so an
//! exported table can be edited in a spreadsheet and re-imported.

use std::io::Write;
use std::path::Path;

use crate::domain::Sample;
use crate::error::AppError;

pub fn write_samples_csv(path: &Path, samples: &[Sample]) -> Result<(), AppError> {
    let file = std::fs::File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_samples(file, samples)
}

pub fn write_samples<W: Write>(out: W, samples: &[Sample]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    for s in samples {
        writer
            .serialize(s)
            .map_err(|e| AppError::new(4, format!("Failed to write export CSV row: {e}")))?;
    }
    // An empty table still gets its header row.
    if samples.is_empty() {
        writer
            .write_record(["flow_rate", "pressure"])
            .map_err(|e| AppError::new(4, format!("Failed to write export CSV header: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to write export CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::parse_samples_csv;
    use crate::session::SampleRow;

    #[test]
    fn export_has_header_and_reimports() {
        let samples = vec![Sample::new(0.5, 310.0), Sample::new(1.25, 240.5)];
        let mut buf = Vec::new();
        write_samples(&mut buf, &samples).unwrap();

        let text = String::from_utf8(buf.clone()).unwrap();
        assert_eq!(text, "flow_rate,pressure\n0.5,310.0\n1.25,240.5\n");

        let back = parse_samples_csv(buf.as_slice()).unwrap();
        let rows: Vec<SampleRow> = samples.into_iter().map(SampleRow::from).collect();
        assert_eq!(back.rows, rows);
    }

    #[test]
    fn empty_export_still_has_header() {
        let mut buf = Vec::new();
        write_samples(&mut buf, &[]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "flow_rate,pressure\n");
    }
}
