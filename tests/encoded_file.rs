// Exercises `EncodedFile` against a real temporary file on disk, mirroring
// original_source/tests/test_streams.py (which ran the equivalent checks
// against `heatshrink.open()` and a file named `test.bin`).

use std::io::SeekFrom;

use shrinkstream::{Config, EncodedFile, OpenMode};

fn cfg() -> Config {
    Config::new(11, 4).unwrap()
}

/// Enables `trace!`/`debug!` output from the encoder/decoder/reader
/// under `RUST_LOG` when these tests are run with `--nocapture`.
fn init_logging() {
    let _ = env_logger::try_init();
}

#[test]
fn write_then_reopen_and_read_back() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.bin");

    let writer = EncodedFile::open_path(&path, OpenMode::Write, cfg()).unwrap();
    writer.write(b"the quick brown fox jumps over the lazy dog").unwrap();
    writer.close().unwrap();

    let reader = EncodedFile::open_path(&path, OpenMode::Read, cfg()).unwrap();
    let data = reader.read(None).unwrap();
    assert_eq!(data, b"the quick brown fox jumps over the lazy dog");
}

#[test]
fn seek_after_reopen() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.bin");

    let writer = EncodedFile::open_path(&path, OpenMode::Write, cfg()).unwrap();
    writer.write(b"0123456789").unwrap();
    writer.close().unwrap();

    let reader = EncodedFile::open_path(&path, OpenMode::Read, cfg()).unwrap();
    reader.seek(SeekFrom::Start(5)).unwrap();
    assert_eq!(reader.tell().unwrap(), 5);
    assert_eq!(reader.read(None).unwrap(), b"56789");
}

#[test]
fn close_is_idempotent_and_blocks_further_io() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.bin");

    let writer = EncodedFile::open_path(&path, OpenMode::Write, cfg()).unwrap();
    writer.write(b"data").unwrap();
    writer.close().unwrap();
    writer.close().unwrap();
    assert!(writer.write(b"more").is_err());
}

#[test]
fn writelines_concatenates_without_separators() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.bin");

    let writer = EncodedFile::open_path(&path, OpenMode::Write, cfg()).unwrap();
    let n = writer.writelines(vec![b"foo".to_vec(), b"bar".to_vec(), b"baz".to_vec()]).unwrap();
    assert_eq!(n, 9);
    writer.close().unwrap();

    let reader = EncodedFile::open_path(&path, OpenMode::Read, cfg()).unwrap();
    assert_eq!(reader.read(None).unwrap(), b"foobarbaz");
}

#[test]
fn reading_a_write_mode_file_is_unsupported() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.bin");
    let writer = EncodedFile::open_path(&path, OpenMode::Write, cfg()).unwrap();
    assert!(writer.read(Some(1)).is_err());
}
