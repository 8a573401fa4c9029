use super::error::MetainfoError;
use super::info_hash::InfoHash;
use crate::bencode::{decode, encode, Value};
use crate::verify::{Validator, Verification, VerifyError, VerifyOptions};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Length of one SHA-1 piece digest.
pub const PIECE_HASH_LEN: usize = 20;

/// A parsed torrent file.
///
/// # Examples
///
/// ```no_run
/// use bitcheck::metainfo::Metainfo;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let data = std::fs::read("example.torrent")?;
/// let metainfo = Metainfo::from_bytes(&data)?;
///
/// println!("Torrent: {}", metainfo.info.name);
/// println!("Size: {} bytes", metainfo.info.total_length);
/// println!("Info hash: {}", metainfo.info_hash);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Metainfo {
    /// The info dictionary containing file and piece information.
    pub info: Info,
    /// SHA-1 of the canonical encoding of the info dictionary.
    pub info_hash: InfoHash,
    /// Primary tracker URL.
    pub announce: Option<String>,
    /// Multi-tier tracker list ([BEP-12](http://bittorrent.org/beps/bep_0012.html)).
    pub announce_list: Vec<Vec<String>>,
    /// Unix timestamp when the torrent was created.
    pub creation_date: Option<i64>,
    pub comment: Option<String>,
    /// Name/version of the program that created the torrent.
    pub created_by: Option<String>,
    /// Text encoding the string fields were written in, as declared by the file.
    pub encoding: Option<String>,
    info_value: Value,
    raw_info: Bytes,
}

/// The info dictionary from a torrent file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info {
    /// File name (single-file) or directory name (multi-file).
    pub name: String,
    /// Number of bytes per piece.
    pub piece_length: u64,
    /// SHA-1 digest of each piece, in order.
    pub pieces: Vec<[u8; PIECE_HASH_LEN]>,
    /// Files in declared order. Single-file torrents have exactly one entry
    /// whose path is the torrent name.
    pub files: Vec<File>,
    /// Total size of all files combined.
    pub total_length: u64,
    /// If true, clients should only use trackers in the metainfo.
    pub private: bool,
    /// Whether the torrent uses the `files` list layout.
    pub multi_file: bool,
}

/// A file within a torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    /// Path relative to the torrent's root directory (multi-file) or the
    /// file name itself (single-file).
    pub path: PathBuf,
    pub length: u64,
    /// Byte offset of the file within the concatenated piece data.
    pub offset: u64,
    pub md5sum: Option<String>,
}

impl Metainfo {
    /// Parses a torrent file from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not valid bencode, if `info` or one
    /// of its required fields is missing, or if fields are inconsistent
    /// (both `length` and `files`, a piece list that does not match the total
    /// length, ...).
    pub fn from_bytes(data: &[u8]) -> Result<Self, MetainfoError> {
        Self::from_value(&decode(data)?)
    }

    /// Builds the descriptor from an already decoded value tree.
    pub fn from_value(value: &Value) -> Result<Self, MetainfoError> {
        let dict = value.as_dict().ok_or(MetainfoError::InvalidField("root"))?;

        let info_value = dict
            .get(b"info".as_slice())
            .ok_or(MetainfoError::MissingField("info"))?;
        let info = Info::from_value(info_value)?;

        let raw_info = Bytes::from(encode(info_value));
        let info_hash = InfoHash::from_info_bytes(&raw_info);

        let announce_list = dict
            .get(b"announce-list".as_slice())
            .and_then(|v| v.as_list())
            .map(|list| {
                list.iter()
                    .filter_map(|tier| {
                        tier.as_list().map(|urls| {
                            urls.iter()
                                .filter_map(|u| u.as_str().map(String::from))
                                .collect()
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let creation_date = match dict.get(b"creation date".as_slice()) {
            Some(v) => Some(
                v.as_integer()
                    .ok_or(MetainfoError::InvalidField("creation date"))?,
            ),
            None => None,
        };

        Ok(Self {
            info,
            info_hash,
            announce: text_field(dict, b"announce"),
            announce_list,
            creation_date,
            comment: text_field(dict, b"comment"),
            created_by: text_field(dict, b"created by"),
            encoding: text_field(dict, b"encoding"),
            info_value: info_value.clone(),
            raw_info,
        })
    }

    /// Wraps a hand-built info dictionary, with no tracker or comment fields.
    pub fn from_info(info: Info) -> Self {
        let info_value = info.to_value();
        let raw_info = Bytes::from(encode(&info_value));
        let info_hash = InfoHash::from_info_bytes(&raw_info);
        Self {
            info,
            info_hash,
            announce: None,
            announce_list: Vec::new(),
            creation_date: None,
            comment: None,
            created_by: None,
            encoding: None,
            info_value,
            raw_info,
        }
    }

    /// Reads and parses a `.torrent` file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, MetainfoError> {
        let data = tokio::fs::read(path.as_ref()).await?;
        Self::from_bytes(&data)
    }

    /// The canonical encoding of the info dictionary the info hash was
    /// computed from.
    pub fn raw_info(&self) -> &Bytes {
        &self.raw_info
    }

    /// Converts the descriptor back into a value tree.
    ///
    /// The `info` entry is the exact dictionary the descriptor was read from,
    /// so keys this type does not model survive and the info hash is stable.
    pub fn to_value(&self) -> Value {
        let mut dict = BTreeMap::new();

        if let Some(ref announce) = self.announce {
            insert(&mut dict, b"announce", Value::string(announce));
        }
        if !self.announce_list.is_empty() {
            let tiers = self
                .announce_list
                .iter()
                .map(|tier| Value::List(tier.iter().map(|u| Value::string(u)).collect()))
                .collect();
            insert(&mut dict, b"announce-list", Value::List(tiers));
        }
        if let Some(ref comment) = self.comment {
            insert(&mut dict, b"comment", Value::string(comment));
        }
        if let Some(ref created_by) = self.created_by {
            insert(&mut dict, b"created by", Value::string(created_by));
        }
        if let Some(date) = self.creation_date {
            insert(&mut dict, b"creation date", Value::Integer(date));
        }
        if let Some(ref encoding) = self.encoding {
            insert(&mut dict, b"encoding", Value::string(encoding));
        }
        insert(&mut dict, b"info", self.info_value.clone());

        Value::Dict(dict)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode(&self.to_value())
    }

    /// Returns all tracker URLs from both `announce` and `announce-list`.
    ///
    /// The primary tracker comes first; duplicates are removed.
    pub fn trackers(&self) -> Vec<String> {
        let mut trackers = Vec::new();

        if let Some(ref announce) = self.announce {
            trackers.push(announce.clone());
        }

        for tier in &self.announce_list {
            for tracker in tier {
                if !trackers.contains(tracker) {
                    trackers.push(tracker.clone());
                }
            }
        }

        trackers
    }

    /// Checks the data under `path` against this torrent's piece hashes.
    ///
    /// See [`Validator::verify`] for how `path` is interpreted.
    pub async fn verify(
        &self,
        path: impl AsRef<Path>,
        options: &VerifyOptions,
    ) -> Result<Verification, VerifyError> {
        Validator::from_info(&self.info)
            .verify(path.as_ref(), options)
            .await
    }
}

impl Info {
    pub fn from_value(value: &Value) -> Result<Self, MetainfoError> {
        let dict = value.as_dict().ok_or(MetainfoError::InvalidField("info"))?;

        let name = match dict.get(b"name".as_slice()) {
            Some(v) => v.as_str().ok_or(MetainfoError::InvalidField("name"))?,
            None => return Err(MetainfoError::MissingField("name")),
        }
        .to_string();

        let piece_length = positive_integer(dict, b"piece length", "piece length")?
            .ok_or(MetainfoError::MissingField("piece length"))?;
        if piece_length == 0 {
            return Err(MetainfoError::InvalidField("piece length"));
        }

        let pieces_bytes = dict
            .get(b"pieces".as_slice())
            .ok_or(MetainfoError::MissingField("pieces"))?
            .as_bytes()
            .ok_or(MetainfoError::InvalidField("pieces"))?;

        if pieces_bytes.len() % PIECE_HASH_LEN != 0 {
            return Err(MetainfoError::InvalidField("pieces"));
        }

        let pieces: Vec<[u8; PIECE_HASH_LEN]> = pieces_bytes
            .chunks_exact(PIECE_HASH_LEN)
            .map(|chunk| {
                let mut arr = [0u8; PIECE_HASH_LEN];
                arr.copy_from_slice(chunk);
                arr
            })
            .collect();

        let private = dict
            .get(b"private".as_slice())
            .and_then(|v| v.as_integer())
            .map(|v| v == 1)
            .unwrap_or(false);

        let length = positive_integer(dict, b"length", "length")?;
        let files_list = dict.get(b"files".as_slice());

        let (files, multi_file) = match (length, files_list) {
            (Some(_), Some(_)) => return Err(MetainfoError::InvalidField("files")),
            (Some(length), None) => {
                let file = File {
                    path: PathBuf::from(&name),
                    length,
                    offset: 0,
                    md5sum: text_field(dict, b"md5sum"),
                };
                (vec![file], false)
            }
            (None, Some(files_value)) => (parse_files(files_value)?, true),
            (None, None) => return Err(MetainfoError::MissingField("length or files")),
        };

        let total_length = files.iter().map(|f| f.length).sum::<u64>();

        if total_length.div_ceil(piece_length) != pieces.len() as u64 {
            return Err(MetainfoError::InvalidField("pieces"));
        }

        Ok(Info {
            name,
            piece_length,
            pieces,
            files,
            total_length,
            private,
            multi_file,
        })
    }

    /// Builds the `info` dictionary for this descriptor.
    pub fn to_value(&self) -> Value {
        let mut dict = BTreeMap::new();
        insert(&mut dict, b"name", Value::string(&self.name));
        insert(
            &mut dict,
            b"piece length",
            Value::Integer(self.piece_length as i64),
        );
        insert(&mut dict, b"pieces", Value::from(self.pieces.concat()));
        if self.private {
            insert(&mut dict, b"private", Value::Integer(1));
        }

        if self.multi_file {
            let files = self
                .files
                .iter()
                .map(|file| {
                    let mut entry = BTreeMap::new();
                    insert(&mut entry, b"length", Value::Integer(file.length as i64));
                    let path = file
                        .path
                        .components()
                        .map(|c| Value::string(&c.as_os_str().to_string_lossy()))
                        .collect();
                    insert(&mut entry, b"path", Value::List(path));
                    if let Some(ref md5) = file.md5sum {
                        insert(&mut entry, b"md5sum", Value::string(md5));
                    }
                    Value::Dict(entry)
                })
                .collect();
            insert(&mut dict, b"files", Value::List(files));
        } else if let Some(file) = self.files.first() {
            insert(&mut dict, b"length", Value::Integer(file.length as i64));
            if let Some(ref md5) = file.md5sum {
                insert(&mut dict, b"md5sum", Value::string(md5));
            }
        }

        Value::Dict(dict)
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    /// Size of the piece at `index`; only the last piece may be short.
    pub fn piece_size(&self, index: usize) -> Option<u64> {
        if index >= self.pieces.len() {
            return None;
        }
        let start = index as u64 * self.piece_length;
        Some((self.total_length - start).min(self.piece_length))
    }
}

fn parse_files(value: &Value) -> Result<Vec<File>, MetainfoError> {
    let files_list = value
        .as_list()
        .ok_or(MetainfoError::InvalidField("files"))?;

    let mut files = Vec::with_capacity(files_list.len());
    let mut offset = 0u64;

    for file_value in files_list {
        let file_dict = file_value
            .as_dict()
            .ok_or(MetainfoError::InvalidField("files"))?;

        let length = positive_integer(file_dict, b"length", "file length")?
            .ok_or(MetainfoError::MissingField("file length"))?;

        let path_list = file_dict
            .get(b"path".as_slice())
            .ok_or(MetainfoError::MissingField("file path"))?
            .as_list()
            .ok_or(MetainfoError::InvalidField("file path"))?;

        if path_list.is_empty() {
            return Err(MetainfoError::InvalidField("file path"));
        }

        let path = path_list
            .iter()
            .map(|segment| segment.as_str().ok_or(MetainfoError::InvalidField("file path")))
            .collect::<Result<PathBuf, _>>()?;

        files.push(File {
            path,
            length,
            offset,
            md5sum: text_field(file_dict, b"md5sum"),
        });

        offset = offset
            .checked_add(length)
            .ok_or(MetainfoError::InvalidField("file length"))?;
    }

    Ok(files)
}

/// A non-negative integer field, `None` when absent.
fn positive_integer(
    dict: &BTreeMap<Bytes, Value>,
    key: &[u8],
    field: &'static str,
) -> Result<Option<u64>, MetainfoError> {
    match dict.get(key) {
        Some(v) => v
            .as_integer()
            .and_then(|i| u64::try_from(i).ok())
            .map(Some)
            .ok_or(MetainfoError::InvalidField(field)),
        None => Ok(None),
    }
}

fn text_field(dict: &BTreeMap<Bytes, Value>, key: &[u8]) -> Option<String> {
    dict.get(key).and_then(|v| v.as_str()).map(String::from)
}

fn insert(dict: &mut BTreeMap<Bytes, Value>, key: &'static [u8], value: Value) {
    dict.insert(Bytes::from_static(key), value);
}
