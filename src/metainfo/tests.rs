use super::*;
use crate::bencode::{encode, Value};
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tempfile::TempDir;

fn b(s: &[u8]) -> Bytes {
    Bytes::copy_from_slice(s)
}

fn single_info(length: i64, piece_length: i64) -> BTreeMap<Bytes, Value> {
    let pieces = (length as u64).div_ceil(piece_length as u64) as usize;
    let mut info = BTreeMap::new();
    info.insert(b(b"name"), Value::string("file.bin"));
    info.insert(b(b"piece length"), Value::Integer(piece_length));
    info.insert(b(b"pieces"), Value::from(vec![0x11u8; pieces * PIECE_HASH_LEN]));
    info.insert(b(b"length"), Value::Integer(length));
    info
}

fn file_entry(path: &[&str], length: i64) -> Value {
    let mut entry = BTreeMap::new();
    entry.insert(b(b"length"), Value::Integer(length));
    entry.insert(
        b(b"path"),
        Value::List(path.iter().map(|s| Value::string(s)).collect()),
    );
    Value::Dict(entry)
}

fn multi_info() -> BTreeMap<Bytes, Value> {
    let mut info = BTreeMap::new();
    info.insert(b(b"name"), Value::string("album"));
    info.insert(b(b"piece length"), Value::Integer(32768));
    info.insert(b(b"pieces"), Value::from(vec![0x22u8; 3 * PIECE_HASH_LEN]));
    info.insert(
        b(b"files"),
        Value::List(vec![
            file_entry(&["cd1", "01.flac"], 40000),
            file_entry(&["cover.jpg"], 30000),
        ]),
    );
    info
}

fn torrent(info: BTreeMap<Bytes, Value>) -> Vec<u8> {
    let mut root = BTreeMap::new();
    root.insert(b(b"announce"), Value::string("http://tracker.example.com/announce"));
    root.insert(b(b"info"), Value::Dict(info));
    encode(&Value::Dict(root))
}

#[test]
fn test_info_hash_from_hex() {
    let hex = "0123456789abcdef0123456789abcdef01234567";
    let hash = InfoHash::from_hex(hex).unwrap();
    assert_eq!(hash.to_hex(), hex);
    assert_eq!(hash.as_bytes()[0], 0x01);
    assert_eq!(format!("{hash:?}"), format!("InfoHash({hex})"));
}

#[test]
fn test_info_hash_rejects_bad_input() {
    assert!(matches!(
        InfoHash::from_hex("0123"),
        Err(MetainfoError::InvalidInfoHashLength)
    ));
    assert!(InfoHash::from_hex("zz23456789abcdef0123456789abcdef01234567").is_err());
    assert!(InfoHash::from_bytes(&[0u8; 32]).is_err());
}

#[test]
fn test_parse_single_file() {
    let data = torrent(single_info(40000, 16384));
    let metainfo = Metainfo::from_bytes(&data).unwrap();

    assert_eq!(metainfo.info.name, "file.bin");
    assert!(!metainfo.info.multi_file);
    assert_eq!(metainfo.info.total_length, 40000);
    assert_eq!(metainfo.info.piece_count(), 3);
    assert_eq!(metainfo.info.files.len(), 1);
    assert_eq!(metainfo.info.files[0].path, PathBuf::from("file.bin"));
    assert_eq!(
        metainfo.announce.as_deref(),
        Some("http://tracker.example.com/announce")
    );
}

#[test]
fn test_parse_multi_file() {
    let metainfo = Metainfo::from_bytes(&torrent(multi_info())).unwrap();
    let info = &metainfo.info;

    assert!(info.multi_file);
    assert_eq!(info.total_length, 70000);
    assert_eq!(info.files.len(), 2);
    assert_eq!(info.files[0].path, PathBuf::from("cd1").join("01.flac"));
    assert_eq!(info.files[0].offset, 0);
    assert_eq!(info.files[1].path, PathBuf::from("cover.jpg"));
    assert_eq!(info.files[1].offset, 40000);
}

#[test]
fn test_info_hash_covers_info_dictionary() {
    let info = single_info(100, 64);
    let expected: [u8; 20] = Sha1::digest(encode(&Value::Dict(info.clone()))).into();

    let metainfo = Metainfo::from_bytes(&torrent(info)).unwrap();
    assert_eq!(metainfo.info_hash.as_bytes(), &expected);
    assert_eq!(metainfo.raw_info().len(), metainfo.to_value().get(b"info").unwrap().encoded_len());
}

#[test]
fn test_info_hash_ignores_outer_fields() {
    let plain = Metainfo::from_bytes(&torrent(single_info(100, 64))).unwrap();

    let mut root = BTreeMap::new();
    root.insert(b(b"comment"), Value::string("different"));
    root.insert(b(b"info"), Value::Dict(single_info(100, 64)));
    let commented = Metainfo::from_bytes(&encode(&Value::Dict(root))).unwrap();

    assert_eq!(plain.info_hash, commented.info_hash);
    assert_eq!(commented.comment.as_deref(), Some("different"));
}

#[test]
fn test_unknown_info_keys_survive_reencoding() {
    let mut info = single_info(100, 64);
    info.insert(b(b"source"), Value::string("private-site"));
    let metainfo = Metainfo::from_bytes(&torrent(info)).unwrap();

    let reparsed = Metainfo::from_bytes(&metainfo.to_bytes()).unwrap();
    assert_eq!(reparsed.info_hash, metainfo.info_hash);
    assert!(reparsed
        .to_value()
        .get(b"info")
        .and_then(|info| info.get(b"source"))
        .is_some());
}

#[test]
fn test_missing_info() {
    let mut root = BTreeMap::new();
    root.insert(b(b"announce"), Value::string("http://t/a"));
    let data = encode(&Value::Dict(root));

    assert!(matches!(
        Metainfo::from_bytes(&data),
        Err(MetainfoError::MissingField("info"))
    ));
}

#[test]
fn test_root_must_be_dictionary() {
    assert!(matches!(
        Metainfo::from_bytes(b"li1ee"),
        Err(MetainfoError::InvalidField("root"))
    ));
}

#[test]
fn test_invalid_bencode() {
    assert!(matches!(
        Metainfo::from_bytes(b"d4:info"),
        Err(MetainfoError::Bencode(_))
    ));
}

#[test]
fn test_length_and_files_conflict() {
    let mut info = multi_info();
    info.insert(b(b"length"), Value::Integer(70000));

    assert!(matches!(
        Metainfo::from_bytes(&torrent(info)),
        Err(MetainfoError::InvalidField("files"))
    ));
}

#[test]
fn test_length_or_files_required() {
    let mut info = single_info(100, 64);
    info.remove(b"length".as_slice());

    assert!(matches!(
        Metainfo::from_bytes(&torrent(info)),
        Err(MetainfoError::MissingField("length or files"))
    ));
}

#[test]
fn test_piece_list_must_cover_data() {
    let mut info = single_info(100, 64);
    info.insert(b(b"pieces"), Value::from(vec![0u8; 3 * PIECE_HASH_LEN]));
    assert!(matches!(
        Metainfo::from_bytes(&torrent(info)),
        Err(MetainfoError::InvalidField("pieces"))
    ));

    let mut info = single_info(100, 64);
    info.insert(b(b"pieces"), Value::from(vec![0u8; 2 * PIECE_HASH_LEN + 1]));
    assert!(matches!(
        Metainfo::from_bytes(&torrent(info)),
        Err(MetainfoError::InvalidField("pieces"))
    ));
}

#[test]
fn test_piece_length_must_be_positive() {
    let mut info = single_info(0, 64);
    info.insert(b(b"piece length"), Value::Integer(0));
    assert!(matches!(
        Metainfo::from_bytes(&torrent(info)),
        Err(MetainfoError::InvalidField("piece length"))
    ));

    let mut info = single_info(100, 64);
    info.insert(b(b"length"), Value::Integer(-5));
    assert!(matches!(
        Metainfo::from_bytes(&torrent(info)),
        Err(MetainfoError::InvalidField("length"))
    ));
}

#[test]
fn test_empty_file_path_rejected() {
    let mut info = multi_info();
    info.insert(b(b"files"), Value::List(vec![file_entry(&[], 10)]));
    info.insert(b(b"pieces"), Value::from(vec![0u8; PIECE_HASH_LEN]));

    assert!(matches!(
        Metainfo::from_bytes(&torrent(info)),
        Err(MetainfoError::InvalidField("file path"))
    ));
}

#[test]
fn test_piece_size() {
    let metainfo = Metainfo::from_bytes(&torrent(single_info(40000, 16384))).unwrap();
    let info = &metainfo.info;

    assert_eq!(info.piece_size(0), Some(16384));
    assert_eq!(info.piece_size(1), Some(16384));
    assert_eq!(info.piece_size(2), Some(40000 - 2 * 16384));
    assert_eq!(info.piece_size(3), None);
}

#[test]
fn test_trackers_deduplicated() {
    let mut root = BTreeMap::new();
    root.insert(b(b"announce"), Value::string("http://a/announce"));
    root.insert(
        b(b"announce-list"),
        Value::List(vec![
            Value::List(vec![Value::string("http://a/announce")]),
            Value::List(vec![
                Value::string("udp://b:80"),
                Value::string("udp://c:80"),
            ]),
        ]),
    );
    root.insert(b(b"info"), Value::Dict(single_info(10, 16)));

    let metainfo = Metainfo::from_bytes(&encode(&Value::Dict(root))).unwrap();
    assert_eq!(metainfo.announce_list.len(), 2);
    assert_eq!(
        metainfo.trackers(),
        vec!["http://a/announce", "udp://b:80", "udp://c:80"]
    );
}

#[test]
fn test_optional_fields_roundtrip() {
    let mut root = BTreeMap::new();
    root.insert(b(b"comment"), Value::string("hello"));
    root.insert(b(b"created by"), Value::string("bitcheck"));
    root.insert(b(b"creation date"), Value::Integer(1_700_000_000));
    root.insert(b(b"encoding"), Value::string("UTF-8"));
    root.insert(b(b"info"), Value::Dict(single_info(10, 16)));
    let data = encode(&Value::Dict(root));

    let metainfo = Metainfo::from_bytes(&data).unwrap();
    assert_eq!(metainfo.creation_date, Some(1_700_000_000));
    assert_eq!(metainfo.created_by.as_deref(), Some("bitcheck"));
    assert_eq!(metainfo.encoding.as_deref(), Some("UTF-8"));
    assert_eq!(metainfo.to_bytes(), data);
}

#[test]
fn test_from_info_matches_parsed() {
    let parsed = Metainfo::from_bytes(&torrent(multi_info())).unwrap();
    let built = Metainfo::from_info(parsed.info.clone());

    assert_eq!(built.info, parsed.info);
    assert_eq!(built.info_hash, parsed.info_hash);
    assert!(built.announce.is_none());
    assert_eq!(
        Info::from_value(&parsed.info.to_value()).unwrap(),
        parsed.info
    );
}

#[test]
fn test_private_flag() {
    let mut info = single_info(10, 16);
    info.insert(b(b"private"), Value::Integer(1));
    let metainfo = Metainfo::from_bytes(&torrent(info)).unwrap();
    assert!(metainfo.info.private);
    assert_eq!(
        Metainfo::from_info(metainfo.info.clone()).info_hash,
        metainfo.info_hash
    );
}

#[tokio::test]
async fn test_from_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("album.torrent");
    let data = torrent(multi_info());
    tokio::fs::write(&path, &data).await.unwrap();

    let metainfo = Metainfo::from_file(&path).await.unwrap();
    assert_eq!(metainfo.info.name, "album");

    let missing = Metainfo::from_file(temp.path().join("missing.torrent")).await;
    assert!(matches!(missing, Err(MetainfoError::Io(_))));
}
