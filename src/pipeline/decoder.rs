//! Gzip → JSON stream decoding. One file in, an ordered iterator of [`DecodedBatch`] out.
//!
//! Nothing is buffered beyond the reader buffers: the gzip stream is inflated on demand and
//! `serde_json` pulls one top-level value at a time from it. The stream cannot be resumed
//! after an error; reopen the file to start over.

use flate2::bufread::MultiGzDecoder;
use serde_json::de::IoRead;
use serde_json::{Deserializer, StreamDeserializer};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::FileError;
use crate::pipeline::sink::RecordSink;
use crate::utils::config::DecoderConsts;
use crate::{DecodedBatch, Task};

/// A top-level `null` decodes as `None` and is treated as an empty batch.
type JsonStream<R> =
    StreamDeserializer<'static, IoRead<BufReader<MultiGzDecoder<R>>>, Option<DecodedBatch>>;

/// Pull-based iterator over the batches in one compressed file. Fused after the first error.
pub struct RecordStream<R: BufRead> {
    path: PathBuf,
    inner: JsonStream<R>,
    failed: bool,
}

/// True when `buf` starts with the gzip member magic.
pub fn has_gzip_magic(buf: &[u8]) -> bool {
    buf.len() >= DecoderConsts::GZIP_MAGIC.len()
        && buf[..DecoderConsts::GZIP_MAGIC.len()] == DecoderConsts::GZIP_MAGIC
}

impl<R: BufRead> RecordStream<R> {
    /// Wrap an already-open reader. `path` is only used to label errors.
    ///
    /// The gzip magic is checked here so a file with a bad header fails before anything is
    /// decoded. An empty input has no header and fails the same way.
    pub fn new(path: &Path, mut reader: R) -> Result<Self, FileError> {
        let head = reader.fill_buf().map_err(|source| FileError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        if !has_gzip_magic(head) {
            return Err(FileError::Decompression {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidData, "invalid gzip header"),
            });
        }

        let inflated = BufReader::with_capacity(
            DecoderConsts::INFLATE_BUFFER_SIZE,
            MultiGzDecoder::new(reader),
        );
        Ok(Self {
            path: path.to_path_buf(),
            inner: Deserializer::from_reader(inflated).into_iter::<Option<DecodedBatch>>(),
            failed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Map a serde_json error onto the file error taxonomy.
    /// I/O errors come from the inflater (corrupt or truncated gzip data); everything else is
    /// malformed or truncated JSON.
    fn classify(&self, err: serde_json::Error) -> FileError {
        if err.is_io() {
            FileError::Decompression {
                path: self.path.clone(),
                source: io::Error::from(err),
            }
        } else {
            FileError::Decode {
                path: self.path.clone(),
                source: err,
            }
        }
    }
}

impl<R: BufRead> Iterator for RecordStream<R> {
    type Item = Result<DecodedBatch, FileError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.inner.next()? {
            Ok(batch) => Some(Ok(batch.unwrap_or_default())),
            Err(e) => {
                self.failed = true;
                Some(Err(self.classify(e)))
            }
        }
    }
}

/// Open `path` and start a [`RecordStream`] over it.
pub fn open_record_stream(path: &Path) -> Result<RecordStream<BufReader<File>>, FileError> {
    let file = File::open(path).map_err(|source| FileError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::with_capacity(DecoderConsts::FILE_BUFFER_SIZE, file);
    RecordStream::new(path, reader)
}

/// Push every record from an open stream into `sink`, in source order. Returns the record count.
pub fn drain_into_sink<R: BufRead>(
    stream: RecordStream<R>,
    sink: &dyn RecordSink,
) -> Result<usize, FileError> {
    let source = stream.path().to_path_buf();
    let mut count = 0_usize;
    for batch in stream {
        let batch = batch?;
        for record in &batch.items {
            sink.accept(record, &source);
            count += 1;
        }
    }
    Ok(count)
}

/// Decode one task's file end to end.
pub fn decode_file(task: &Task, sink: &dyn RecordSink) -> Result<usize, FileError> {
    let stream = open_record_stream(&task.source_path)?;
    drain_into_sink(stream, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use std::sync::Mutex;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn stream(bytes: &[u8]) -> Result<RecordStream<&[u8]>, FileError> {
        RecordStream::new(Path::new("mem.gz"), bytes)
    }

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    impl RecordSink for Collect {
        fn accept(&self, record: &Record, _source: &Path) {
            self.0.lock().unwrap().push(record.doi.clone());
        }
    }

    #[test]
    fn decodes_batches_in_order() {
        let json = br#"{"items":[{"DOI":"10.1/a"},{"DOI":"10.1/b"}]}
{"items":[{"DOI":"10.1/c"}]}"#;
        let bytes = gzip(json);
        let batches: Vec<_> = stream(&bytes).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].items[1].doi, "10.1/b");
        assert_eq!(batches[1].items[0].doi, "10.1/c");
    }

    #[test]
    fn parses_record_fields_and_ignores_unknown() {
        let json = br#"{"Items":[{"DOI":"10.1/x","title":["T"],"references-count":7,
            "author":[{"given":"Ada","family":"Lovelace","ORCID":"0000"}],"publisher":"P"}],
            "next-cursor":"abc"}"#;
        let bytes = gzip(json);
        let batch = stream(&bytes).unwrap().next().unwrap().unwrap();
        let rec = &batch.items[0];
        assert_eq!(rec.doi, "10.1/x");
        assert_eq!(rec.title, vec!["T".to_string()]);
        assert_eq!(rec.references_count, 7);
        assert_eq!(rec.author[0].family, "Lovelace");
    }

    #[test]
    fn empty_payload_ends_cleanly() {
        let bytes = gzip(b"");
        assert!(stream(&bytes).unwrap().next().is_none());
    }

    #[test]
    fn empty_items_batch_is_valid() {
        let bytes = gzip(br#"{"items":[]} {}"#);
        let sink = Collect::default();
        let n = drain_into_sink(stream(&bytes).unwrap(), &sink).unwrap();
        assert_eq!(n, 0);
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn concatenated_members_are_one_stream() {
        let mut bytes = gzip(br#"{"items":[{"DOI":"1"}]}"#);
        bytes.extend(gzip(br#"{"items":[{"DOI":"2"}]}"#));
        let sink = Collect::default();
        let n = drain_into_sink(stream(&bytes).unwrap(), &sink).unwrap();
        assert_eq!(n, 2);
        assert_eq!(*sink.0.lock().unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn bad_header_fails_on_open() {
        let err = stream(b"not gzip at all").err().unwrap();
        assert!(matches!(err, FileError::Decompression { .. }));
        let err = stream(b"").err().unwrap();
        assert!(matches!(err, FileError::Decompression { .. }));
    }

    #[test]
    fn truncated_json_is_decode_error_and_stream_fuses() {
        let bytes = gzip(br#"{"items":[{"DOI":"1"}]} {"items":[{"DOI":"#);
        let mut s = stream(&bytes).unwrap();
        assert!(s.next().unwrap().is_ok());
        let err = s.next().unwrap().unwrap_err();
        assert!(matches!(err, FileError::Decode { .. }));
        assert!(s.next().is_none());
    }

    #[test]
    fn null_values_decode_as_defaults() {
        let json = br#"{"items":[{"DOI":"x","references-count":null,"title":null,"author":null}]}
{"items":[{"DOI":null,"author":[{"given":null,"family":"F"}]}]}
{"items":null}
null
{"items":[{"DOI":"y"}]}"#;
        let bytes = gzip(json);
        let batches: Vec<_> = stream(&bytes).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(batches.len(), 5);
        assert_eq!(
            batches[0].items,
            vec![Record {
                doi: "x".to_string(),
                ..Default::default()
            }]
        );
        assert_eq!(batches[1].items[0].doi, "");
        assert_eq!(batches[1].items[0].author[0].given, "");
        assert_eq!(batches[1].items[0].author[0].family, "F");
        assert!(batches[2].items.is_empty());
        assert!(batches[3].items.is_empty());
        assert_eq!(batches[4].items[0].doi, "y");
    }

    #[test]
    fn key_case_variants_are_accepted() {
        let json = br#"{"Items":[{"doi":"lower","Title":["T"],"ReferencesCount":2,
            "Author":[{"Given":"G","Family":"F"}]}]}"#;
        let bytes = gzip(json);
        let batch = stream(&bytes).unwrap().next().unwrap().unwrap();
        let rec = &batch.items[0];
        assert_eq!(rec.doi, "lower");
        assert_eq!(rec.title, vec!["T".to_string()]);
        assert_eq!(rec.references_count, 2);
        assert_eq!(rec.author[0].given, "G");
        assert_eq!(rec.author[0].family, "F");
    }

    #[test]
    fn non_object_value_is_decode_error() {
        let bytes = gzip(b"[1, 2, 3]");
        let err = stream(&bytes).unwrap().next().unwrap().unwrap_err();
        assert!(matches!(err, FileError::Decode { .. }));
    }

    #[test]
    fn truncated_gzip_fails() {
        let records: String = (0..200)
            .map(|i| format!(r#"{{"items":[{{"DOI":"10.1/{i}","title":["t{i}"]}}]}}"#))
            .collect();
        let bytes = gzip(records.as_bytes());
        let cut = &bytes[..bytes.len() / 2];
        let sink = Collect::default();
        assert!(drain_into_sink(stream(cut).unwrap(), &sink).is_err());
    }

    #[test]
    fn errors_carry_the_file_path() {
        let err = RecordStream::new(Path::new("dir/broken.gz"), &b"xx"[..])
            .err()
            .unwrap();
        assert_eq!(err.path(), Path::new("dir/broken.gz"));
        assert!(err.to_string().contains("dir/broken.gz"));
    }
}
