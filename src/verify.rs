//! Piece verification of on-disk torrent data.
//!
//! A torrent splits the concatenation of its files into fixed-size pieces
//! and records the SHA-1 digest of each. [`Validator`] streams the files in
//! declared order, hashes every piece window (including windows that
//! straddle a file boundary), and compares the result with the declared
//! digests.
//!
//! # Tolerance
//!
//! Single-file torrents must match completely. Multi-file torrents can be
//! judged against a [`VerifyOptions::tolerance`]: the fraction of pieces that
//! must match for the data to count as valid. Missing or truncated files
//! lower the fraction instead of failing the verification, and the files
//! after them stay aligned with their pieces.
//!
//! # Examples
//!
//! ```no_run
//! use bitcheck::metainfo::Metainfo;
//! use bitcheck::verify::VerifyOptions;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let torrent = Metainfo::from_file("album.torrent").await?;
//! let report = torrent
//!     .verify("./downloads", &VerifyOptions::default().with_tolerance(0.9))
//!     .await?;
//!
//! if report.valid {
//!     println!("{:.1}% of pieces match", report.ratio() * 100.0);
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod validator;

pub use error::VerifyError;
pub use validator::{
    Manifest, ManifestEntry, Validator, Verification, VerifyOptions, DEFAULT_READ_BUFFER,
};
