use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::sync::Arc;

use symphonia::core::io::MediaSource;

/// Read-only set of packaged resources (assets bundled into the binary or
/// loaded from an archive).
pub trait ResourceSet {
    /// Returns the full contents of the resource at `path`.
    fn open(&self, path: &str) -> io::Result<Arc<[u8]>>;
}

/// In-memory [`ResourceSet`].
///
/// ```ignore
/// let assets = EmbeddedAssets::new()
///     .with("audio/theme.ogg", &include_bytes!("../assets/theme.ogg")[..]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EmbeddedAssets {
    entries: HashMap<String, Arc<[u8]>>,
}

impl EmbeddedAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, path: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.insert(path, bytes);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        let path = path.into();
        self.entries.insert(normalize(&path).to_string(), bytes.into());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(normalize(path))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResourceSet for EmbeddedAssets {
    fn open(&self, path: &str) -> io::Result<Arc<[u8]>> {
        self.entries.get(normalize(path)).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no embedded resource `{path}`"),
            )
        })
    }
}

fn normalize(path: &str) -> &str {
    path.trim_start_matches("./").trim_start_matches('/')
}

/// Byte source backing a decoder: exactly one of a local file or a packaged
/// resource.
///
/// A local file keeps its own read position, so clones sharing one OS file
/// handle never disturb each other.
#[derive(Debug)]
pub enum Source {
    LocalFile { file: File, pos: u64 },
    PackagedResource(Cursor<Arc<[u8]>>),
}

impl Source {
    pub fn local(file: File) -> Self {
        Source::LocalFile { file, pos: 0 }
    }

    pub fn packaged(bytes: Arc<[u8]>) -> Self {
        Source::PackagedResource(Cursor::new(bytes))
    }

    /// Opens a second handle on the same bytes, positioned at the first byte.
    pub fn try_clone(&self) -> io::Result<Self> {
        match self {
            Source::LocalFile { file, .. } => file.try_clone().map(Source::local),
            Source::PackagedResource(c) => Ok(Source::packaged(Arc::clone(c.get_ref()))),
        }
    }
}

impl Read for Source {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Source::LocalFile { file, pos } => {
                file.seek(SeekFrom::Start(*pos))?;
                let n = file.read(buf)?;
                *pos += n as u64;
                Ok(n)
            }
            Source::PackagedResource(c) => c.read(buf),
        }
    }
}

impl Seek for Source {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Source::LocalFile { file, pos: at } => {
                file.seek(SeekFrom::Start(*at))?;
                *at = file.seek(pos)?;
                Ok(*at)
            }
            Source::PackagedResource(c) => c.seek(pos),
        }
    }
}

impl MediaSource for Source {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        match self {
            Source::LocalFile { file, .. } => file.metadata().ok().map(|m| m.len()),
            Source::PackagedResource(c) => Some(c.get_ref().len() as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn embedded_lookup_ignores_leading_dot_slash() {
        let assets = EmbeddedAssets::new().with("sfx/click.ogg", vec![1u8, 2, 3]);
        assert!(assets.contains("./sfx/click.ogg"));
        assert!(assets.contains("/sfx/click.ogg"));
        assert_eq!(&*assets.open("sfx/click.ogg").unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn missing_embedded_resource_is_not_found() {
        let assets = EmbeddedAssets::new();
        let err = assets.open("nope.ogg").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(assets.is_empty());
    }

    #[test]
    fn packaged_source_reads_and_seeks() {
        let mut src = Source::packaged(Arc::from(&b"abcdef"[..]));
        assert_eq!(src.byte_len(), Some(6));
        assert!(src.is_seekable());

        src.seek(SeekFrom::Start(4)).unwrap();
        let mut buf = [0u8; 4];
        let n = src.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"ef");
    }

    #[test]
    fn local_file_clones_keep_separate_positions() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"0123456789").unwrap();
        tmp.flush().unwrap();

        let mut a = Source::local(File::open(tmp.path()).unwrap());
        a.seek(SeekFrom::Start(6)).unwrap();
        let mut b = a.try_clone().unwrap();

        let mut buf = [0u8; 3];
        b.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"012");
        a.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"678");
        assert_eq!(b.seek(SeekFrom::Current(2)).unwrap(), 5);
        assert_eq!(a.byte_len(), Some(10));
    }

    #[test]
    fn packaged_clone_starts_at_first_byte() {
        let mut src = Source::packaged(Arc::from(&b"abcdef"[..]));
        src.seek(SeekFrom::Start(3)).unwrap();

        let mut clone = src.try_clone().unwrap();
        let mut buf = [0u8; 2];
        clone.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ab");
    }
}
