//! CSV export for spreadsheets
//!
//! Files start with a UTF-8 byte-order mark so spreadsheet applications pick
//! the right encoding for CJK labels.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Write `headers` and `records` to `path`, replacing any existing file
pub fn write_csv_with_bom<I, R>(path: &Path, headers: &[&str], records: I) -> io::Result<()>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(UTF8_BOM)?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(headers)?;
    for record in records {
        writer.write_record(record)?;
    }
    writer.flush()?;
    Ok(())
}
