use crate::error::EmployeeSheetError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use std::path::PathBuf;

/// Where a spreadsheet document comes from: a file on disk or an uploaded byte buffer.
#[derive(Clone, Debug)]
pub enum SheetSource {
    Path(PathBuf),
    Bytes { name: String, bytes: Vec<u8> },
}

impl SheetSource {
    pub fn from_path<P: AsRef<Path>>(path: P) -> SheetSource {
        SheetSource::Path(path.as_ref().to_path_buf())
    }

    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> SheetSource {
        SheetSource::Bytes { name: name.to_owned(), bytes }
    }

    /// Display name used in error messages and logs
    pub fn name(&self) -> String {
        match self {
            SheetSource::Path(path) => path.to_string_lossy().to_string(),
            SheetSource::Bytes { name, .. } => name.to_owned(),
        }
    }

    pub(crate) fn open(&self) -> Result<SourceReader, EmployeeSheetError> {
        match self {
            SheetSource::Path(path) => Ok(SourceReader::Local(BufReader::new(File::open(path)?))),
            SheetSource::Bytes { bytes, .. } => Ok(SourceReader::Memory(Cursor::new(bytes.clone()))),
        }
    }
}

/// Seekable reader over either kind of source
pub(crate) enum SourceReader {
    Local(BufReader<File>),
    Memory(Cursor<Vec<u8>>),
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            SourceReader::Local(reader) => reader.read(buf),
            SourceReader::Memory(reader) => reader.read(buf),
        }
    }
}

impl Seek for SourceReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            SourceReader::Local(reader) => reader.seek(pos),
            SourceReader::Memory(reader) => reader.seek(pos),
        }
    }
}
