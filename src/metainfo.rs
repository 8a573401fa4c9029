//! Torrent descriptors ([BEP-3]).
//!
//! A torrent file (`.torrent`) is a bencoded dictionary describing the files
//! to be shared and the SHA-1 digest of every fixed-size piece of their
//! concatenated contents. [`Metainfo`] is the typed view over that
//! dictionary; [`InfoHash`] identifies a torrent.
//!
//! # Examples
//!
//! ```
//! use bitcheck::bencode::encode;
//! use bitcheck::metainfo::Metainfo;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut data = b"d8:announce19:http://tracker/annc4:infod6:lengthi3e4:name5:a.txt\
//!                  12:piece lengthi16384e6:pieces20:".to_vec();
//! data.extend_from_slice(&[0xaa; 20]);
//! data.extend_from_slice(b"ee");
//! let torrent = Metainfo::from_bytes(&data)?;
//!
//! assert_eq!(torrent.info.name, "a.txt");
//! assert_eq!(torrent.info.total_length, 3);
//! assert_eq!(torrent.info.piece_count(), 1);
//! assert_eq!(torrent.trackers(), vec!["http://tracker/annc".to_string()]);
//!
//! // The info hash covers the `info` dictionary alone.
//! assert_eq!(torrent.raw_info().as_ref(), encode(torrent.to_value().get(b"info").unwrap()));
//! # Ok(())
//! # }
//! ```
//!
//! # Torrent Structure
//!
//! - **info** - Core torrent metadata (hashed to create the info hash)
//!   - `name` - Suggested file/directory name
//!   - `piece length` - Size of each piece in bytes
//!   - `pieces` - Concatenated SHA1 hashes of each piece
//!   - `length` and optional `md5sum` (single-file) OR `files` (multi-file)
//!   - `private` - Present and set to 1 for private torrents
//! - **announce** - Primary tracker URL
//! - **announce-list** - Additional tracker tiers (BEP-12)
//! - **creation date** - Unix timestamp when created
//! - **comment** - Optional comment
//! - **created by** - Client that created the torrent
//! - **encoding** - Text encoding of the string fields
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html

mod error;
mod info_hash;
mod torrent;

pub use error::MetainfoError;
pub use info_hash::InfoHash;
pub use torrent::{File, Info, Metainfo, PIECE_HASH_LEN};

#[cfg(test)]
mod tests;
