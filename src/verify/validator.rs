use super::error::VerifyError;
use crate::metainfo::{Info, PIECE_HASH_LEN};
use sha1::{Digest, Sha1};
use std::path::{Component, Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Default size of each read from disk.
pub const DEFAULT_READ_BUFFER: usize = 64 * 1024;

/// How strict a verification is and how it reads from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyOptions {
    /// Fraction of pieces that must match, in `[0, 1]`. Values of 1 or more
    /// require every piece and stop at the first mismatch. Ignored for
    /// single-file torrents, which are always checked strictly.
    pub tolerance: f64,
    pub read_buffer_size: usize,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            tolerance: 1.0,
            read_buffer_size: DEFAULT_READ_BUFFER,
        }
    }
}

impl VerifyOptions {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }
}

/// Outcome of a verification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verification {
    /// Pieces whose digest matched.
    pub matched: usize,
    /// Pieces declared by the torrent.
    pub total: usize,
    pub valid: bool,
}

impl Verification {
    /// Fraction of declared pieces that matched. A torrent without pieces
    /// counts as fully matched.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.matched as f64 / self.total as f64
        }
    }
}

/// A file the validator expects to find, in piece order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub path: PathBuf,
    pub length: u64,
}

/// The on-disk layout a torrent describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Manifest {
    /// One file; the verified path must be that file.
    Single { name: String, length: u64 },
    /// Several files under a directory called `name`. The verified path is
    /// either that directory or its parent.
    Multi {
        name: String,
        files: Vec<ManifestEntry>,
    },
}

/// Checks on-disk data against a torrent's piece digests.
///
/// # Examples
///
/// ```no_run
/// use bitcheck::metainfo::Metainfo;
/// use bitcheck::verify::{Validator, VerifyOptions};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let torrent = Metainfo::from_file("example.torrent").await?;
/// let options = VerifyOptions::default().with_tolerance(0.95);
/// let report = Validator::from_info(&torrent.info)
///     .verify(Path::new("./downloads"), &options)
///     .await?;
/// println!("{}/{} pieces match", report.matched, report.total);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Validator {
    piece_length: u64,
    pieces: Vec<[u8; PIECE_HASH_LEN]>,
    manifest: Manifest,
}

impl Validator {
    pub fn new(piece_length: u64, pieces: Vec<[u8; PIECE_HASH_LEN]>, manifest: Manifest) -> Self {
        Self {
            piece_length,
            pieces,
            manifest,
        }
    }

    pub fn from_info(info: &Info) -> Self {
        let manifest = if info.multi_file {
            Manifest::Multi {
                name: info.name.clone(),
                files: info
                    .files
                    .iter()
                    .map(|f| ManifestEntry {
                        path: f.path.clone(),
                        length: f.length,
                    })
                    .collect(),
            }
        } else {
            Manifest::Single {
                name: info.name.clone(),
                length: info.total_length,
            }
        };
        Self::new(info.piece_length, info.pieces.clone(), manifest)
    }

    /// Verifies the data at `path`.
    ///
    /// For a single-file torrent `path` must be the file. For a multi-file
    /// torrent it must be a directory; if it contains a directory named after
    /// the torrent, files are looked up there, otherwise directly under
    /// `path`.
    ///
    /// # Errors
    ///
    /// Caller mistakes (wrong kind of path, missing path, invalid tolerance,
    /// unsafe manifest paths) are reported before any data is hashed. I/O
    /// errors while reading a file that exists are passed through.
    pub async fn verify(
        &self,
        path: &Path,
        options: &VerifyOptions,
    ) -> Result<Verification, VerifyError> {
        if options.tolerance.is_nan() || options.tolerance < 0.0 {
            return Err(VerifyError::InvalidTolerance(options.tolerance));
        }
        let piece_length = usize::try_from(self.piece_length)
            .ok()
            .filter(|&len| len > 0)
            .ok_or(VerifyError::InvalidPieceLength(self.piece_length))?;

        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VerifyError::NotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        let (files, strict) = match &self.manifest {
            Manifest::Single { length, .. } => {
                if !metadata.is_file() {
                    return Err(VerifyError::ExpectedFile(path.to_path_buf()));
                }
                let file = ManifestEntry {
                    path: path.to_path_buf(),
                    length: *length,
                };
                (vec![file], true)
            }
            Manifest::Multi { name, files } => {
                if !metadata.is_dir() {
                    return Err(VerifyError::ExpectedDirectory(path.to_path_buf()));
                }
                for file in files {
                    validate_file_path(&file.path)?;
                }
                let root = resolve_root(path, name).await;
                let files = files
                    .iter()
                    .map(|f| ManifestEntry {
                        path: root.join(&f.path),
                        length: f.length,
                    })
                    .collect();
                (files, options.tolerance >= 1.0)
            }
        };

        tracing::debug!(
            "Starting verification of {} pieces across {} files",
            self.pieces.len(),
            files.len()
        );

        let mut state = ValidationState::new(&self.pieces, piece_length, strict);
        let mut buf = vec![0u8; options.read_buffer_size.max(1)];
        let file_count = files.len();

        for (i, file) in files.iter().enumerate() {
            state.last_file = i + 1 == file_count;
            feed_file(&mut state, file, &mut buf).await?;
            if state.failed {
                tracing::warn!(
                    "Strict verification stopped at piece {} in {}",
                    state.piece_index.saturating_sub(1),
                    file.path.display()
                );
                break;
            }
        }

        let tolerance = if strict { 1.0 } else { options.tolerance };
        let report = state.finish(tolerance);
        tracing::debug!(
            "Verification complete: {}/{} pieces valid",
            report.matched,
            report.total
        );
        Ok(report)
    }
}

async fn resolve_root(path: &Path, name: &str) -> PathBuf {
    let nested = path.join(name);
    match tokio::fs::metadata(&nested).await {
        Ok(metadata) if metadata.is_dir() => nested,
        _ => path.to_path_buf(),
    }
}

fn validate_file_path(file_path: &Path) -> Result<(), VerifyError> {
    for component in file_path.components() {
        match component {
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(VerifyError::PathTraversal(file_path.display().to_string()));
            }
            _ => {}
        }
    }
    Ok(())
}

async fn feed_file(
    state: &mut ValidationState<'_>,
    entry: &ManifestEntry,
    buf: &mut [u8],
) -> Result<(), VerifyError> {
    let readable = match tokio::fs::metadata(&entry.path).await {
        Ok(metadata) => metadata.is_file(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => return Err(e.into()),
    };
    if !readable {
        tracing::warn!("File {} is missing", entry.path.display());
        state.skip_unreadable(entry.length);
        state.end_file();
        return Ok(());
    }

    let mut file = File::open(&entry.path).await?;
    let mut remaining = entry.length;
    while remaining > 0 && !state.failed {
        let want = remaining.min(buf.len() as u64) as usize;
        let n = file.read(&mut buf[..want]).await?;
        if n == 0 {
            break;
        }
        state.feed(&buf[..n]);
        remaining -= n as u64;
    }

    if remaining > 0 && !state.failed {
        tracing::warn!(
            "File {} is {} bytes shorter than declared",
            entry.path.display(),
            remaining
        );
        state.skip_unreadable(remaining);
    }
    state.end_file();
    Ok(())
}

/// Accumulator threaded through the files of one verification.
///
/// Pieces straddle file boundaries, so bytes that do not complete a window
/// are carried over in `remainder` until the next file fills it.
struct ValidationState<'a> {
    pieces: &'a [[u8; PIECE_HASH_LEN]],
    piece_length: usize,
    strict: bool,
    matched: usize,
    piece_index: usize,
    remainder: Vec<u8>,
    /// Whether `remainder` holds bytes that could not be read from disk.
    tainted: bool,
    last_file: bool,
    failed: bool,
}

impl<'a> ValidationState<'a> {
    fn new(pieces: &'a [[u8; PIECE_HASH_LEN]], piece_length: usize, strict: bool) -> Self {
        Self {
            pieces,
            piece_length,
            strict,
            matched: 0,
            piece_index: 0,
            remainder: Vec::new(),
            tainted: false,
            last_file: false,
            failed: false,
        }
    }

    fn feed(&mut self, mut data: &[u8]) {
        if !self.remainder.is_empty() {
            let need = self.piece_length - self.remainder.len();
            let take = need.min(data.len());
            self.remainder.extend_from_slice(&data[..take]);
            data = &data[take..];
            if self.remainder.len() < self.piece_length {
                return;
            }
            let mut window = std::mem::take(&mut self.remainder);
            let tainted = std::mem::replace(&mut self.tainted, false);
            self.check_window(&window, tainted);
            window.clear();
            self.remainder = window;
        }

        let mut windows = data.chunks_exact(self.piece_length);
        for window in &mut windows {
            if self.failed {
                return;
            }
            self.check_window(window, false);
        }
        self.remainder.extend_from_slice(windows.remainder());
    }

    /// Accounts for `n` bytes that should exist but could not be read. Every
    /// window touching them fails, and later data stays aligned with the
    /// declared piece boundaries.
    fn skip_unreadable(&mut self, n: u64) {
        if n == 0 {
            return;
        }
        let piece_length = self.piece_length as u64;
        let need = (self.piece_length - self.remainder.len()) as u64;
        if n < need {
            self.remainder.resize(self.remainder.len() + n as usize, 0);
            self.tainted = true;
            return;
        }

        self.remainder.clear();
        self.tainted = false;
        let rest = n - need;
        self.fail_pieces(1 + (rest / piece_length) as usize);

        let tail = (rest % piece_length) as usize;
        if tail > 0 {
            self.remainder.resize(tail, 0);
            self.tainted = true;
        }
    }

    /// Checks the final short piece once the last file is done.
    fn end_file(&mut self) {
        if self.last_file && !self.remainder.is_empty() && !self.failed {
            let window = std::mem::take(&mut self.remainder);
            let tainted = std::mem::replace(&mut self.tainted, false);
            self.check_window(&window, tainted);
        }
    }

    fn check_window(&mut self, window: &[u8], tainted: bool) {
        let index = self.piece_index;
        self.piece_index += 1;

        let matched = !tainted
            && self
                .pieces
                .get(index)
                .is_some_and(|expected| Sha1::digest(window).as_slice() == expected.as_slice());

        if matched {
            self.matched += 1;
        } else {
            tracing::trace!("Piece {} does not match", index);
            if self.strict {
                self.failed = true;
            }
        }
    }

    fn fail_pieces(&mut self, count: usize) {
        tracing::trace!(
            "Pieces {}..{} cover unreadable data",
            self.piece_index,
            self.piece_index + count
        );
        self.piece_index += count;
        if self.strict {
            self.failed = true;
        }
    }

    fn finish(self, tolerance: f64) -> Verification {
        let mut report = Verification {
            matched: self.matched,
            total: self.pieces.len(),
            valid: false,
        };
        report.valid = !self.failed && report.ratio() >= tolerance;
        report
    }
}
