//! File provider with daily and size-based rotation
//!
//! - `DailyRotate`: when the local date changes, the current file is moved
//!   to `<stem>_<YYYYMMDD>.<ext>` (the date the file was written on) and a
//!   fresh file is started
//! - `MaxFileSizeInMB`: when the file reaches the limit it is shifted into
//!   numbered backups `<file>.1`, `<file>.2`, ...
//!
//! In both cases `MaxRotateFiles` bounds the backups kept and
//! `CompressRotatedFiles` gzips them.

use crate::core::{keys, LineStyle, LogEvent, LoggerError, ProviderProperties, ProviderSink, Result};
use chrono::{DateTime, Local, NaiveDate};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_ROTATE_FILES: usize = 5;
const BYTES_PER_MB: u64 = 1024 * 1024;
const COPY_BUFFER: usize = 64 * 1024;

/// When and how the log file is rotated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    pub daily: bool,
    pub max_bytes: Option<u64>,
    pub max_backups: usize,
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            daily: false,
            max_bytes: None,
            max_backups: DEFAULT_MAX_ROTATE_FILES,
            compress: false,
        }
    }
}

impl RotationPolicy {
    pub fn from_properties(properties: &ProviderProperties) -> Self {
        Self {
            daily: properties.flag(keys::DAILY_ROTATE),
            max_bytes: properties
                .count(keys::MAX_FILE_SIZE_MB)
                .filter(|mb| *mb > 0)
                .map(|mb| mb.saturating_mul(BYTES_PER_MB)),
            max_backups: properties
                .count(keys::MAX_ROTATE_FILES)
                .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
                .unwrap_or(DEFAULT_MAX_ROTATE_FILES),
            compress: properties.flag(keys::COMPRESS_ROTATED),
        }
    }
}

/// Resolve the log file path from `FileName` or `AutoFileNameByProcess`
pub fn resolve_path(properties: &ProviderProperties) -> Result<PathBuf> {
    if properties.flag(keys::AUTO_FILE_NAME) {
        let exe = std::env::current_exe().map_err(|e| {
            LoggerError::io_operation(
                "resolve log file name",
                "cannot determine the running executable",
                e,
            )
        })?;
        return Ok(exe.with_extension("log"));
    }
    properties.require_text(keys::FILE_NAME).map(PathBuf::from)
}

pub struct FileSink {
    path: PathBuf,
    style: LineStyle,
    policy: RotationPolicy,
    writer: Option<BufWriter<File>>,
    current_size: u64,
    /// Local date the current file was last written on
    file_date: NaiveDate,
}

impl FileSink {
    pub fn from_properties(properties: &ProviderProperties) -> Result<Self> {
        let path = resolve_path(properties)?;
        Self::open(
            path,
            LineStyle::from_properties(properties),
            RotationPolicy::from_properties(properties),
        )
    }

    /// Open (or create) `path` for appending, creating parent directories
    pub fn open(path: impl Into<PathBuf>, style: LineStyle, policy: RotationPolicy) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation(
                    "create log directory",
                    format!("Failed to create directory '{}'", parent.display()),
                    e,
                )
            })?;
        }

        let (file, current_size, file_date) = Self::open_file(&path)?;
        Ok(Self {
            path,
            style,
            policy,
            writer: Some(BufWriter::new(file)),
            current_size,
            file_date,
        })
    }

    fn open_file(path: &Path) -> Result<(File, u64, NaiveDate)> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                LoggerError::file_provider(path.display().to_string(), format!("Failed to open: {}", e))
            })?;
        let metadata = file.metadata().map_err(|e| {
            LoggerError::file_provider(
                path.display().to_string(),
                format!("Cannot access file metadata: {}", e),
            )
        })?;
        let modified: DateTime<Local> = metadata
            .modified()
            .map(DateTime::from)
            .unwrap_or_else(|_| Local::now());
        Ok((file, metadata.len(), modified.date_naive()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    fn rotate_if_needed(&mut self) {
        let today = Local::now().date_naive();
        let result = if self.policy.daily && today != self.file_date {
            self.rotate_daily(today)
        } else if self
            .policy
            .max_bytes
            .is_some_and(|max| self.current_size >= max)
        {
            self.rotate_by_size()
        } else {
            return;
        };

        if let Err(e) = result {
            eprintln!(
                "[LOGGER WARNING] Log rotation failed: {}. Continuing with current file.",
                e
            );
        }
    }

    fn close_writer(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }
        Ok(())
    }

    fn reopen(&mut self) -> Result<()> {
        let (file, size, date) = Self::open_file(&self.path)?;
        self.writer = Some(BufWriter::new(file));
        self.current_size = size;
        self.file_date = date;
        Ok(())
    }

    /// Move the current file to its dated name and start a new one
    fn rotate_daily(&mut self, today: NaiveDate) -> Result<()> {
        self.close_writer()?;
        let has_content = self.path.metadata().is_ok_and(|m| m.len() > 0);
        let moved = if has_content {
            let dated = self.dated_path(self.file_date);
            if let Err(e) = fs::rename(&self.path, &dated) {
                self.reopen()?;
                self.file_date = today;
                return Err(LoggerError::file_rotation(
                    self.path.display().to_string(),
                    format!("Failed to move log to '{}': {}", dated.display(), e),
                ));
            }
            Some(dated)
        } else {
            None
        };

        self.reopen()?;
        self.file_date = today;

        if let Some(dated) = moved {
            if self.policy.compress {
                compress_file(&dated)?;
            }
            self.prune_dated()?;
        }
        Ok(())
    }

    fn dated_path(&self, date: NaiveDate) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "log".to_string());
        let ext = self.path.extension().map(|e| e.to_string_lossy().into_owned());
        let stamp = date.format("%Y%m%d");

        let name = |n: usize| {
            let suffix = if n == 0 { String::new() } else { format!("_{}", n) };
            match &ext {
                Some(ext) => format!("{}_{}{}.{}", stem, stamp, suffix, ext),
                None => format!("{}_{}{}", stem, stamp, suffix),
            }
        };

        let mut n = 0;
        loop {
            let candidate = self.path.with_file_name(name(n));
            if !candidate.exists() && !gz_path(&candidate).exists() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Keep only the newest `max_backups` dated files
    fn prune_dated(&self) -> Result<()> {
        let Some(dir) = self.path.parent() else {
            return Ok(());
        };
        let dir = if dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            dir
        };
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let prefix = format!("{}_", stem);

        let mut dated: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|n| n.strip_prefix(&prefix))
                    .is_some_and(|rest| {
                        rest.len() >= 8 && rest.as_bytes()[..8].iter().all(u8::is_ascii_digit)
                    })
            })
            .collect();
        if dated.len() <= self.policy.max_backups {
            return Ok(());
        }

        // Names embed the date, so lexical order is chronological
        dated.sort();
        let excess = dated.len() - self.policy.max_backups;
        for old in dated.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&old) {
                eprintln!(
                    "[LOGGER WARNING] Failed to remove old log {}: {}",
                    old.display(),
                    e
                );
            }
        }
        Ok(())
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    /// Shift numbered backups up by one and move the current file to `.1`
    fn rotate_by_size(&mut self) -> Result<()> {
        self.close_writer()?;
        let max = self.policy.max_backups;

        if max == 0 {
            fs::remove_file(&self.path).map_err(|e| {
                LoggerError::file_rotation(self.path.display().to_string(), e.to_string())
            })?;
            return self.reopen();
        }

        for oldest in [self.backup_path(max), gz_path(&self.backup_path(max))] {
            if oldest.exists() {
                if let Err(e) = fs::remove_file(&oldest) {
                    eprintln!(
                        "[LOGGER WARNING] Failed to remove oldest backup {}: {}",
                        oldest.display(),
                        e
                    );
                }
            }
        }

        for i in (1..max).rev() {
            let from = self.backup_path(i);
            let to = self.backup_path(i + 1);
            for (from, to) in [(gz_path(&from), gz_path(&to)), (from, to)] {
                if from.exists() {
                    fs::rename(&from, &to).map_err(|e| {
                        LoggerError::file_rotation(
                            from.display().to_string(),
                            format!("Failed to rotate backup files: {}", e),
                        )
                    })?;
                }
            }
        }

        let first = self.backup_path(1);
        let moved = fs::rename(&self.path, &first).map_err(|e| {
            LoggerError::file_rotation(
                self.path.display().to_string(),
                format!("Failed to rotate current log file: {}", e),
            )
        });
        let reopened = self.reopen();
        moved?;

        if self.policy.compress {
            compress_file(&first)?;
        }
        reopened
    }
}

impl ProviderSink for FileSink {
    fn emit(&mut self, event: &LogEvent) -> Result<()> {
        self.rotate_if_needed();
        if self.writer.is_none() {
            self.reopen()?;
        }

        let mut line = self.style.render(event);
        line.push('\n');

        let Some(writer) = self.writer.as_mut() else {
            return Err(LoggerError::file_provider(
                self.path.display().to_string(),
                "file is not open",
            ));
        };
        writer.write_all(line.as_bytes()).map_err(|e| {
            LoggerError::file_provider(self.path.display().to_string(), format!("write failed: {}", e))
        })?;
        self.current_size += line.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

fn gz_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".gz");
    PathBuf::from(name)
}

/// Gzip `path` into `<path>.gz` through a temporary file, removing the
/// original only once the archive is complete
pub fn compress_file(path: &Path) -> Result<PathBuf> {
    let gz = gz_path(path);
    let mut tmp_name = gz.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let result = (|| -> std::io::Result<()> {
        let mut reader = BufReader::with_capacity(COPY_BUFFER, File::open(path)?);
        let output = BufWriter::with_capacity(COPY_BUFFER, File::create(&tmp)?);
        let mut encoder = flate2::write::GzEncoder::new(output, flate2::Compression::default());

        let mut buffer = vec![0u8; COPY_BUFFER];
        loop {
            let read = reader.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            encoder.write_all(&buffer[..read])?;
        }
        encoder.finish()?.flush()?;
        fs::rename(&tmp, &gz)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(LoggerError::io_operation(
            "compress log file",
            format!("Failed to compress {}", path.display()),
            e,
        ));
    }

    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[LOGGER WARNING] Compressed {} but failed to remove the original: {}",
            path.display(),
            e
        );
    }
    Ok(gz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EventKind, ProviderType};
    use chrono::Duration;
    use tempfile::tempdir;

    fn plain() -> LineStyle {
        LineStyle {
            show_timestamp: false,
            ..LineStyle::default()
        }
    }

    #[test]
    fn test_writes_lines_verbatim() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("app.log");
        let mut sink = FileSink::open(&path, plain(), RotationPolicy::default())?;

        sink.emit(&LogEvent::new(EventKind::Info, "Info line"))?;
        sink.emit(&LogEvent::new(EventKind::Custom, "Custom line: 100% [ok]"))?;
        sink.flush()?;

        let content = fs::read_to_string(&path)?;
        assert_eq!(content, "[INFO] Info line\n[CUSTOM] Custom line: 100% [ok]\n");
        Ok(())
    }

    #[test]
    fn test_from_properties_requires_file_name() {
        let props = ProviderProperties::new("file", ProviderType::File);
        assert!(matches!(
            FileSink::from_properties(&props),
            Err(LoggerError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_auto_file_name_uses_executable() {
        let mut props = ProviderProperties::new("file", ProviderType::File);
        props.set(keys::AUTO_FILE_NAME, true).unwrap();
        let path = resolve_path(&props).unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("log"));
    }

    #[test]
    fn test_size_rotation_keeps_bounded_backups() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("size.log");
        let policy = RotationPolicy {
            max_bytes: Some(64),
            max_backups: 2,
            ..RotationPolicy::default()
        };
        let mut sink = FileSink::open(&path, plain(), policy)?;

        for i in 0..40 {
            sink.emit(&LogEvent::new(EventKind::Info, format!("message number {}", i)))?;
        }
        sink.flush()?;

        assert!(path.exists());
        assert!(dir.path().join("size.log.1").exists());
        assert!(dir.path().join("size.log.2").exists());
        assert!(!dir.path().join("size.log.3").exists());
        Ok(())
    }

    #[test]
    fn test_rotated_backups_are_compressed() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("gz.log");
        let policy = RotationPolicy {
            max_bytes: Some(32),
            compress: true,
            ..RotationPolicy::default()
        };
        let mut sink = FileSink::open(&path, plain(), policy)?;

        for i in 0..4 {
            sink.emit(&LogEvent::new(EventKind::Info, format!("compressed entry {}", i)))?;
        }
        sink.flush()?;

        let archive = dir.path().join("gz.log.1.gz");
        assert!(archive.exists());
        assert!(!dir.path().join("gz.log.1").exists());

        let mut decoded = String::new();
        flate2::read::GzDecoder::new(File::open(archive)?).read_to_string(&mut decoded)?;
        assert!(decoded.contains("compressed entry"));
        Ok(())
    }

    #[test]
    fn test_daily_rotation_moves_previous_day() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("daily.log");
        let policy = RotationPolicy {
            daily: true,
            ..RotationPolicy::default()
        };
        let mut sink = FileSink::open(&path, plain(), policy)?;
        sink.emit(&LogEvent::new(EventKind::Info, "yesterday"))?;

        let yesterday = Local::now().date_naive() - Duration::days(1);
        sink.file_date = yesterday;
        sink.emit(&LogEvent::new(EventKind::Info, "today"))?;
        sink.flush()?;

        let dated = dir
            .path()
            .join(format!("daily_{}.log", yesterday.format("%Y%m%d")));
        assert_eq!(fs::read_to_string(&dated)?, "[INFO] yesterday\n");
        assert_eq!(fs::read_to_string(&path)?, "[INFO] today\n");
        Ok(())
    }

    #[test]
    fn test_daily_rotation_prunes_old_files() -> Result<()> {
        let dir = tempdir()?;
        for day in ["20240101", "20240102", "20240103"] {
            fs::write(dir.path().join(format!("app_{}.log", day)), "old\n")?;
        }
        let path = dir.path().join("app.log");
        let policy = RotationPolicy {
            daily: true,
            max_backups: 2,
            ..RotationPolicy::default()
        };
        let mut sink = FileSink::open(&path, plain(), policy)?;
        sink.emit(&LogEvent::new(EventKind::Info, "x"))?;
        sink.file_date = Local::now().date_naive() - Duration::days(1);
        sink.emit(&LogEvent::new(EventKind::Info, "y"))?;

        assert!(!dir.path().join("app_20240101.log").exists());
        assert!(!dir.path().join("app_20240102.log").exists());
        assert!(dir.path().join("app_20240103.log").exists());
        Ok(())
    }

    #[test]
    fn test_close_releases_handle() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("close.log");
        let mut sink = FileSink::open(&path, plain(), RotationPolicy::default())?;
        sink.emit(&LogEvent::new(EventKind::Info, "before close"))?;
        sink.close()?;

        assert!(sink.writer.is_none());
        assert_eq!(fs::read_to_string(&path)?, "[INFO] before close\n");
        fs::remove_file(&path)?;

        // Emitting again reopens the file
        sink.emit(&LogEvent::new(EventKind::Info, "after close"))?;
        sink.flush()?;
        assert!(path.exists());
        Ok(())
    }
}
