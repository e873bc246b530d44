use std::io::Write;

use super::{ReportRow, HEADERS};
use crate::error::ReportError;

/// Writes the header and one record per row as they are produced.
pub(super) fn write<W: Write>(rows: &[ReportRow], sink: W) -> Result<(), ReportError> {
    let mut writer = ::csv::Writer::from_writer(sink);
    writer.write_record(HEADERS)?;
    for row in rows {
        writer.write_record(row.text_fields())?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_rows;

    fn render(rows: &[ReportRow]) -> Result<Vec<u8>, ReportError> {
        let mut bytes = Vec::new();
        write(rows, &mut bytes)?;
        Ok(bytes)
    }

    #[test]
    fn quotes_values_and_keeps_header_order() {
        let bytes = render(&sample_rows()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "Student ID,Name,Gender,Email,Phone,Faculty,Department,Class,Batch,Year,Job,Employment Status,Created At"
        );
        assert!(lines.next().unwrap().starts_with("7,Ada Lovelace,Female,ada@example.com,"));
        assert_eq!(
            lines.next().unwrap(),
            "8,\"Grace, \"\"Amazing\"\" Hopper\",Female,,,,,,,,,Unemployed,2026-01-01T00:00:00.000Z"
        );
    }

    #[test]
    fn parses_back_with_csv_reader() {
        let bytes = render(&sample_rows()).unwrap();
        let mut reader = ::csv::Reader::from_reader(bytes.as_slice());
        let records: Vec<::csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[1][1], "Grace, \"Amazing\" Hopper");
    }
}
