//! Reservation file persistence.
//!
//! Permanent reservations are kept in a human-editable text file, one per
//! line:
//!
//! ```text
//! # comments and blank lines are preserved
//! "#spam","no spam","oper!o@staff.example.net{irc.example.net}",1700000000
//! "badnick*","impersonation","oper!o@staff.example.net{irc.example.net}",1700000100
//! ```
//!
//! The first quoted field is the pattern. Removing a reservation rewrites
//! the file through a sibling `.tmp` file that is renamed over the original;
//! the rename is the only commit point and the temp file never outlives a
//! failed rewrite, except after a failed rename where it is left behind for
//! manual recovery.

use super::record::{ResvKind, ResvRecord};
use crate::casemap::irc_eq;
use crate::error::PersistError;
use crate::matcher::is_valid_nick_mask;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt, BufReader,
    BufWriter,
};
use tracing::{debug, warn};

/// Result of loading the reservation file.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Parsed reservations, in file order.
    pub records: Vec<ResvRecord>,
    /// Data lines that could not be understood.
    pub skipped: usize,
}

/// Handle on the reservation file.
#[derive(Debug, Clone)]
pub struct ResvFile {
    path: PathBuf,
    temp_path: PathBuf,
}

impl ResvFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut temp = path.clone().into_os_string();
        temp.push(".tmp");
        Self {
            path,
            temp_path: PathBuf::from(temp),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Parse every reservation in the file. A missing file is empty.
    pub async fn load(&self) -> Result<LoadReport, PersistError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No reservation file yet");
                return Ok(LoadReport::default());
            }
            Err(source) => {
                return Err(PersistError::NotOpened {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let mut report = LoadReport::default();
        for (lineno, line) in content.lines().enumerate() {
            if is_passthrough(line) {
                continue;
            }
            match parse_line(line) {
                Some(record) => report.records.push(record),
                None => {
                    warn!(
                        path = %self.path.display(),
                        line = lineno + 1,
                        "Skipping malformed reservation line"
                    );
                    report.skipped += 1;
                }
            }
        }

        Ok(report)
    }

    /// Append one permanent reservation.
    pub async fn append(&self, record: &ResvRecord) -> Result<(), PersistError> {
        if record.is_temporary() {
            return Err(PersistError::Temporary(record.pattern.clone()));
        }

        let io_err = |source| PersistError::Io {
            path: self.path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|source| PersistError::NotOpened {
                path: self.path.clone(),
                source,
            })?;

        let mut line = format_line(record);
        if !ends_with_newline(&mut file).await.map_err(io_err)? {
            line.insert(0, '\n');
        }
        file.write_all(line.as_bytes()).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        Ok(())
    }

    /// Remove every line whose pattern equals `pattern`, returning how many
    /// were dropped.
    pub async fn remove(&self, pattern: &str) -> Result<usize, PersistError> {
        let source = File::open(&self.path)
            .await
            .map_err(|source| PersistError::NotOpened {
                path: self.path.clone(),
                source,
            })?;

        let temp = open_temp(&self.temp_path)
            .await
            .map_err(|source| PersistError::TempNotOpened {
                path: self.temp_path.clone(),
                source,
            })?;
        let guard = TempGuard::new(&self.temp_path);

        let mut writer = BufWriter::new(temp);
        let dropped = filter_lines(BufReader::new(source), &mut writer, pattern).await?;
        writer.flush().await.map_err(PersistError::WriteFailed)?;
        writer
            .get_mut()
            .sync_all()
            .await
            .map_err(PersistError::WriteFailed)?;
        drop(writer);

        if dropped == 0 {
            return Err(PersistError::NotFound(pattern.to_string()));
        }

        if let Err(e) = fs::rename(&self.temp_path, &self.path).await {
            guard.keep();
            return Err(PersistError::RenameFailed(e));
        }
        guard.keep();

        debug!(pattern = %pattern, dropped, "Rewrote reservation file");
        Ok(dropped)
    }
}

/// Copy lines from `reader` to `writer` verbatim, dropping those whose
/// first field equals `pattern`.
async fn filter_lines<R, W>(mut reader: R, writer: &mut W, pattern: &str) -> Result<usize, PersistError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut dropped = 0;
    let mut buf = Vec::with_capacity(256);

    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .await
            .map_err(PersistError::ReadFailed)?;
        if n == 0 {
            break;
        }

        let line = String::from_utf8_lossy(&buf);
        let matched = !is_passthrough(&line)
            && first_field(&line).is_some_and(|field| irc_eq(field, pattern));

        if matched {
            dropped += 1;
        } else {
            writer.write_all(&buf).await.map_err(PersistError::WriteFailed)?;
        }
    }

    Ok(dropped)
}

/// Is the file empty or terminated by a newline?
async fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    if file.metadata().await?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] == b'\n')
}

async fn open_temp(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path).await
}

/// Deletes the temp file on drop unless told to keep it.
struct TempGuard {
    path: Option<PathBuf>,
}

impl TempGuard {
    fn new(path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
        }
    }

    fn keep(mut self) {
        self.path = None;
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take()
            && let Err(e) = std::fs::remove_file(&path)
            && e.kind() != io::ErrorKind::NotFound
        {
            warn!(path = %path.display(), error = %e, "Failed to remove temp reservation file");
        }
    }
}

/// Blank and `#` comment lines are copied untouched.
fn is_passthrough(line: &str) -> bool {
    let line = line.trim_end_matches(['\r', '\n']);
    line.is_empty() || line.starts_with('#')
}

/// Iterate the quoted fields of a line. A `\` skips the next character.
fn quoted_fields(line: &str) -> impl Iterator<Item = &str> {
    let mut rest = line;
    std::iter::from_fn(move || {
        let start = rest.find('"')? + 1;
        let body = &rest[start..];
        let mut escaped = false;
        for (i, c) in body.char_indices() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '\n' => return None,
                '"' => {
                    rest = &body[i + 1..];
                    return Some(&body[..i]);
                }
                _ => {}
            }
        }
        rest = "";
        None
    })
}

/// The pattern field of a data line: the first quoted field, or the text
/// before the first comma when the line is not quoted.
pub(crate) fn first_field(line: &str) -> Option<&str> {
    if line.starts_with('"') {
        return quoted_fields(line).next();
    }
    line.split(',').next().map(|field| field.trim_end_matches(['\r', '\n']))
}

/// Parse a data line into a permanent record.
fn parse_line(line: &str) -> Option<ResvRecord> {
    if !line.starts_with('"') {
        return None;
    }
    let mut fields = quoted_fields(line);
    let pattern = fields.next()?;
    let reason = fields.next()?;
    let set_by = fields.next().unwrap_or("*");
    let set_at = line
        .rsplit(',')
        .next()
        .and_then(|ts| ts.trim().parse::<i64>().ok())
        .unwrap_or(0);

    if pattern.is_empty() {
        return None;
    }
    if ResvKind::of(pattern) == ResvKind::Nick && !is_valid_nick_mask(pattern) {
        return None;
    }

    Some(ResvRecord::permanent(pattern, reason, set_by, set_at))
}

/// Serialize a record as a data line (with trailing newline).
pub(crate) fn format_line(record: &ResvRecord) -> String {
    format!(
        "\"{}\",\"{}\",\"{}\",{}\n",
        record.pattern, record.reason, record.set_by, record.set_at
    )
}
