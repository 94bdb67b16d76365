use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use env_logger::{Builder, Env, Target};

/// Copies every log line to stdout and, when available, the log file.
struct Tee {
    file: Option<File>,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().write_all(buf)?;
        if let Some(file) = self.file.as_mut() {
            // A full disk must not take console logging down with it
            if file.write_all(buf).is_err() {
                self.file = None;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()?;
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

pub fn init(log_file: &Path) {
    let (file, open_error) = match open_log_file(log_file) {
        Ok(file) => (Some(file), None),
        Err(e) => (None, Some(e)),
    };

    let result = Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(Tee { file })))
        .try_init();

    if let Err(e) = result {
        eprintln!("[GPTboost] Logger already initialised: {}", e);
        return;
    }

    if let Some(e) = open_error {
        log::warn!(
            "Could not open log file {} ({}); logging to console only",
            log_file.display(),
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tee_writes_through_to_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("gptboost.log");
        let mut tee = Tee {
            file: Some(open_log_file(&path).unwrap()),
        };

        tee.write_all(b"2026-01-01 10:00:00 - INFO - first\n").unwrap();
        tee.write_all(b"2026-01-01 10:00:01 - WARN - second\n").unwrap();
        tee.flush().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "2026-01-01 10:00:00 - INFO - first\n2026-01-01 10:00:01 - WARN - second\n"
        );
    }

    #[test]
    fn test_log_file_is_appended_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gptboost.log");
        fs::write(&path, "earlier run\n").unwrap();

        let mut tee = Tee {
            file: Some(open_log_file(&path).unwrap()),
        };
        tee.write_all(b"this run\n").unwrap();
        tee.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "earlier run\nthis run\n");
    }

    #[test]
    fn test_unopenable_log_file_falls_back_to_console() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("not-a-dir");
        fs::write(&plain, "x").unwrap();

        let opened = open_log_file(&plain.join("gptboost.log"));
        assert!(opened.is_err());

        let mut tee = Tee { file: opened.ok() };
        assert_eq!(tee.write(b"console only\n").unwrap(), 13);
        assert!(tee.flush().is_ok());
    }
}
