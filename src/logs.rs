use std::{
    fs::{self, File},
    io,
    path::Path,
};

use anyhow::Result;
use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    {ContentLimit, FileRotate},
};
use log::{Level, Log};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

/// Writes everything to the rotating log file, and mirrors warnings and
/// errors to stderr so they are visible without opening the log.
pub struct MainLogger {
    write_logger: Box<WriteLogger<FileRotate<AppendTimestamp>>>,
}

impl MainLogger {
    fn new(write_logger: Box<WriteLogger<FileRotate<AppendTimestamp>>>) -> Self {
        Self { write_logger }
    }
}

impl Log for MainLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.write_logger.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        self.write_logger.log(record);

        if record.level() <= Level::Warn {
            eprintln!(
                "{}:{} -- {}",
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        self.write_logger.flush();
    }
}

pub fn init(log_dir: &str) -> Result<()> {
    let path = Path::new(log_dir).join("logs/main.log");
    let log = FileRotate::new(
        path,
        AppendTimestamp::default(FileLimit::MaxFiles(3)),
        ContentLimit::Lines(1000),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    let config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let write_logger = WriteLogger::new(LevelFilter::Info, config, log);
    let main_logger = MainLogger::new(write_logger);
    log::set_boxed_logger(Box::new(main_logger))?;
    log::set_max_level(LevelFilter::Info);
    info!("[logs] initialized in {}", log_dir);
    Ok(())
}

/// Zips every file under `<log_dir>/logs/` into `target_file_path`.
pub fn export(log_dir: &str, target_file_path: &str) -> Result<()> {
    let mut zip = zip::ZipWriter::new(File::create(target_file_path)?);
    let default_options =
        zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    let log_folder = Path::new(log_dir).join("logs/");
    for entry in (fs::read_dir(&log_folder)?).flatten() {
        let path = entry.path();
        if path.is_file() {
            if let Some(name) = path.strip_prefix(log_dir)?.to_str() {
                zip.start_file(name, default_options)?;
                let mut log_file = File::open(&path)?;
                io::copy(&mut log_file, &mut zip)?;
            }
        }
    }

    zip.finish()?;
    Ok(())
}
