//! Row-per-entry CSV writer for live sessions.

use crate::core::entry::{DATE_FORMAT, TIME_FORMAT};
use crate::core::view::EntrySink;
use crate::core::Entry;
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Suffix shared by every session log.
pub const LOG_FILE_SUFFIX: &str = ".slp.csv";

const LINE_ENDING: &str = "\r\n";

/// Numbered names tried before giving up on a crowded second.
const MAX_NAME_ATTEMPTS: u32 = 1_000;

/// Name for a log started now, e.g. `03-06-2015-18-22-09.slp.csv`.
pub fn log_file_name() -> String {
    let now = Local::now();
    format!(
        "{}-{}{}",
        now.format(DATE_FORMAT),
        now.format(TIME_FORMAT),
        LOG_FILE_SUFFIX
    )
}

/// Writes entries to a session log as they are recorded.
pub struct LogWriter<W: Write> {
    writer: W,
    path: Option<PathBuf>,
    rows_written: u64,
}

impl LogWriter<BufWriter<File>> {
    /// Create a new timestamped log inside `dir`.
    ///
    /// Never reuses an existing file: a session started within the same
    /// second as another gets a numbered name instead.
    pub fn create_in(dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let name = log_file_name();
        let stem = name.trim_end_matches(LOG_FILE_SUFFIX);

        let mut attempt = 0u32;
        loop {
            let path = if attempt == 0 {
                dir.join(&name)
            } else {
                dir.join(format!("{stem}-{attempt}{LOG_FILE_SUFFIX}"))
            };
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Self::start(file, &path, true),
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt < MAX_NAME_ATTEMPTS => {
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Create (or append to) the log at `path`.
    ///
    /// The header row is only written to an empty file.
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let empty = file.metadata()?.len() == 0;
        Self::start(file, path, empty)
    }

    fn start(file: File, path: &Path, write_header: bool) -> std::io::Result<Self> {
        tracing::info!("Logging to {}", path.display());
        let mut writer = if write_header {
            Self::from_writer(BufWriter::new(file))?
        } else {
            Self::continuing(BufWriter::new(file))
        };
        writer.path = Some(path.to_path_buf());
        Ok(writer)
    }
}

impl<W: Write> LogWriter<W> {
    /// Wrap any writer and write the header row.
    pub fn from_writer(mut writer: W) -> std::io::Result<Self> {
        write!(writer, "{}{LINE_ENDING}", Entry::header_row())?;
        Ok(Self::continuing(writer))
    }

    /// Wrap a writer that already holds a header row.
    pub fn continuing(writer: W) -> Self {
        Self {
            writer,
            path: None,
            rows_written: 0,
        }
    }

    /// Path of the underlying file, when writing to one.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush and hand back the underlying writer.
    pub fn close(mut self) -> std::io::Result<W> {
        self.writer.flush()?;
        if let Some(ref path) = self.path {
            tracing::info!("Log saved to {}", path.display());
        }
        Ok(self.writer)
    }
}

impl<W: Write> EntrySink for LogWriter<W> {
    fn write_entry(&mut self, entry: &Entry) -> std::io::Result<()> {
        write!(self.writer, "{}{LINE_ENDING}", entry.to_row())?;
        self.rows_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_writes_header_and_rows() {
        let timestamp = NaiveDate::from_ymd_opt(2015, 3, 6)
            .unwrap()
            .and_hms_opt(18, 22, 9)
            .unwrap();

        let mut writer = LogWriter::from_writer(Vec::new()).unwrap();
        writer
            .write_entry(&Entry::with_index(0, 1, timestamp))
            .unwrap();
        writer
            .write_entry(&Entry::with_index(1, 25, timestamp))
            .unwrap();
        assert_eq!(writer.rows_written(), 2);

        let bytes = writer.close().unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "Date,Time,Index,Movement Value\r\n\
             03-06-2015,18-22-09,0,1\r\n\
             03-06-2015,18-22-09,1,25\r\n"
        );
    }

    #[test]
    fn test_log_file_name_shape() {
        let name = log_file_name();
        assert!(name.ends_with(LOG_FILE_SUFFIX));
        // MM-DD-YYYY-HH-MM-SS
        assert_eq!(name.len(), 19 + LOG_FILE_SUFFIX.len());
    }

    fn test_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "sleep-analyzer-writer-{name}-{}",
            uuid::Uuid::new_v4()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_sessions_in_same_second_get_separate_logs() {
        let dir = test_dir("collide");
        let first = LogWriter::create_in(&dir).unwrap();
        let second = LogWriter::create_in(&dir).unwrap();

        let first_path = first.path().unwrap().to_path_buf();
        let second_path = second.path().unwrap().to_path_buf();
        assert_ne!(first_path, second_path);
        assert!(second_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap()
            .ends_with(LOG_FILE_SUFFIX));

        first.close().unwrap();
        second.close().unwrap();
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_reopened_log_keeps_single_header() {
        let dir = test_dir("reopen");
        let path = dir.join("night.slp.csv");
        let timestamp = NaiveDate::from_ymd_opt(2015, 3, 6)
            .unwrap()
            .and_hms_opt(18, 22, 9)
            .unwrap();

        let mut writer = LogWriter::create(&path).unwrap();
        writer.write_entry(&Entry::with_index(0, 3, timestamp)).unwrap();
        writer.close().unwrap();

        let mut writer = LogWriter::create(&path).unwrap();
        writer.write_entry(&Entry::with_index(1, 4, timestamp)).unwrap();
        writer.close().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("Date,Time,Index,Movement Value").count(), 1);
        assert_eq!(text.lines().count(), 3);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
