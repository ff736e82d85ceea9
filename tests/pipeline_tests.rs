//! End-to-end batch tests: real .gz files in a temp dir, decoded through the worker pool.

use flate2::Compression;
use flate2::write::GzEncoder;
use gzfeed::pipeline::run_batch;
use gzfeed::{BatchError, DiscoveryError, GzfeedOpts, Opts, Record, decode_dir};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

type Seen = Arc<Mutex<Vec<(PathBuf, String)>>>;

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// One batch per record, each `{"items":[{"DOI": "<prefix>-<i>", ...}]}`.
fn records_json(prefix: &str, n: usize) -> String {
    (0..n)
        .map(|i| {
            format!(
                r#"{{"items":[{{"DOI":"{prefix}-{i}","title":["Title {i}"],"references-count":{i},"author":[{{"given":"A","family":"B"}}]}}]}}"#
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, bytes).unwrap();
    path
}

fn write_valid(dir: &Path, name: &str, n: usize) -> PathBuf {
    write_file(dir, name, &gzip(records_json(name, n).as_bytes()))
}

/// Valid gzip whose JSON stops in the middle of the second record.
fn write_truncated_json(dir: &Path, name: &str) -> PathBuf {
    let mut json = records_json(name, 1);
    json.push_str(r#" {"items":[{"DOI":"cut"#);
    write_file(dir, name, &gzip(json.as_bytes()))
}

/// Gzip bytes chopped in half.
fn write_truncated_gzip(dir: &Path, name: &str) -> PathBuf {
    let bytes = gzip(records_json(name, 200).as_bytes());
    write_file(dir, name, &bytes[..bytes.len() / 2])
}

fn collecting_sink() -> (Seen, impl Fn(&Record, &Path) + Send + Sync + 'static) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    let sink = move |r: &Record, p: &Path| {
        s.lock().unwrap().push((p.to_path_buf(), r.doi.clone()));
    };
    (seen, sink)
}

fn per_file(seen: &Seen) -> HashMap<PathBuf, Vec<String>> {
    let mut map: HashMap<PathBuf, Vec<String>> = HashMap::new();
    for (p, doi) in seen.lock().unwrap().iter() {
        map.entry(p.clone()).or_default().push(doi.clone());
    }
    map
}

fn opts(workers: usize) -> GzfeedOpts {
    GzfeedOpts {
        workers: Some(workers),
        record_failures: true,
        ..Default::default()
    }
}

#[test]
fn test_example_valid_empty_and_truncated() {
    let dir = TempDir::new().unwrap();
    let a = write_valid(dir.path(), "a.gz", 3);
    let b = write_valid(dir.path(), "b.gz", 0);
    let c = write_truncated_json(dir.path(), "c.gz");

    let (seen, sink) = collecting_sink();
    let outcome = decode_dir(dir.path(), &opts(2), sink).unwrap();

    assert_eq!(outcome.total_submitted, 3);
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].0, c);

    let by_file = per_file(&seen);
    assert_eq!(by_file.get(&a).map(Vec::len), Some(3));
    assert!(!by_file.contains_key(&b));
}

#[test]
fn test_failure_count_independent_of_pool_size() {
    let dir = TempDir::new().unwrap();
    for i in 0..4 {
        write_valid(dir.path(), &format!("ok{i}.gz"), 5);
    }
    write_truncated_gzip(dir.path(), "bad_gzip.gz");
    write_file(dir.path(), "not_gzip.gz", b"plain text, no gzip header");
    let n = 6;

    for workers in 1..=n {
        let (seen, sink) = collecting_sink();
        let outcome = decode_dir(dir.path(), &opts(workers), sink).unwrap();
        assert_eq!(outcome.total_submitted, n, "workers={workers}");
        assert_eq!(outcome.failed, 2, "workers={workers}");
        let by_file = per_file(&seen);
        for i in 0..4 {
            let p = dir.path().join(format!("ok{i}.gz"));
            assert_eq!(by_file.get(&p).map(Vec::len), Some(5), "workers={workers}");
        }
    }
}

#[test]
fn test_records_delivered_in_source_order() {
    let dir = TempDir::new().unwrap();
    let path = write_valid(dir.path(), "ordered.gz", 250);
    write_valid(dir.path(), "other.gz", 250);

    let (seen, sink) = collecting_sink();
    let outcome = decode_dir(dir.path(), &opts(4), sink).unwrap();
    assert!(outcome.is_success());

    let by_file = per_file(&seen);
    let expected: Vec<String> = (0..250).map(|i| format!("ordered.gz-{i}")).collect();
    assert_eq!(by_file[&path], expected);
}

#[test]
fn test_zero_record_file_is_success() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "empty.gz", &gzip(b""));
    write_file(dir.path(), "empty_items.gz", &gzip(br#"{"items":[]}"#));

    let (seen, sink) = collecting_sink();
    let outcome = decode_dir(dir.path(), &opts(2), sink).unwrap();
    assert_eq!(outcome.total_submitted, 2);
    assert_eq!(outcome.failed, 0);
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_truncated_file_does_not_affect_sibling() {
    let dir = TempDir::new().unwrap();
    let good = write_valid(dir.path(), "good.gz", 10);
    write_truncated_gzip(dir.path(), "truncated.gz");

    let (seen, sink) = collecting_sink();
    let outcome = decode_dir(dir.path(), &opts(2), sink).unwrap();
    assert_eq!(outcome.failed, 1);
    assert_eq!(per_file(&seen)[&good].len(), 10);
    assert!(matches!(
        outcome.into_result(),
        Err(BatchError::FilesFailed {
            failed: 1,
            total: 2
        })
    ));
}

#[test]
fn test_more_files_than_workers_completes() {
    let dir = TempDir::new().unwrap();
    for i in 0..40 {
        write_valid(dir.path(), &format!("f{i:02}.gz"), 2);
    }
    let (seen, sink) = collecting_sink();
    let outcome = decode_dir(
        dir.path(),
        &GzfeedOpts {
            workers: Some(2),
            queue_cap: Some(1),
            ..Default::default()
        },
        sink,
    )
    .unwrap();
    assert_eq!(outcome.total_submitted, 40);
    assert_eq!(outcome.failed, 0);
    assert_eq!(seen.lock().unwrap().len(), 80);
}

#[test]
fn test_rerun_gives_same_failure_count() {
    let dir = TempDir::new().unwrap();
    write_valid(dir.path(), "a.gz", 3);
    write_truncated_json(dir.path(), "b.gz");
    write_file(dir.path(), "c.gz", b"garbage");

    let first = decode_dir(dir.path(), &opts(3), |_: &Record, _: &Path| {}).unwrap();
    let second = decode_dir(dir.path(), &opts(3), |_: &Record, _: &Path| {}).unwrap();
    assert_eq!(first.failed, 2);
    assert_eq!(first.failed, second.failed);
    assert_eq!(first.failures, second.failures);
}

#[test]
fn test_nested_dirs_and_extension_filter() {
    let dir = TempDir::new().unwrap();
    write_valid(dir.path(), "top.gz", 1);
    write_valid(dir.path(), "nested/deeper/inner.gz", 1);
    write_file(dir.path(), "notes.txt", b"not an archive");
    write_file(dir.path(), "archive.tgz", b"not matched");
    write_file(dir.path(), "._top.gz", b"resource fork");

    let (seen, sink) = collecting_sink();
    let outcome = decode_dir(dir.path(), &opts(2), sink).unwrap();
    assert_eq!(outcome.total_submitted, 2);
    assert_eq!(outcome.failed, 0);
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[test]
fn test_missing_root_is_discovery_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does_not_exist");
    let err = decode_dir(&missing, &opts(2), |_: &Record, _: &Path| {}).unwrap_err();
    assert!(err.downcast_ref::<DiscoveryError>().is_some());
}

#[test]
fn test_panicking_sink_counts_as_failure() {
    let dir = TempDir::new().unwrap();
    write_valid(dir.path(), "fine.gz", 2);
    let boom = write_valid(dir.path(), "boom.gz", 2);

    let outcome = decode_dir(dir.path(), &opts(2), |r: &Record, _: &Path| {
        if r.doi.starts_with("boom.gz") {
            panic!("sink exploded");
        }
    })
    .unwrap();
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.failures[0].0, boom);
    assert!(outcome.failures[0].1.contains("sink exploded"));
}

#[test]
fn test_nonblocking_rejections_are_counted() {
    let dir = TempDir::new().unwrap();
    for i in 0..5 {
        write_valid(dir.path(), &format!("s{i}.gz"), 1);
    }
    let outcome = decode_dir(
        dir.path(),
        &GzfeedOpts {
            workers: Some(1),
            queue_cap: Some(1),
            nonblocking: true,
            record_failures: true,
            ..Default::default()
        },
        |_: &Record, _: &Path| std::thread::sleep(Duration::from_millis(300)),
    )
    .unwrap();
    assert_eq!(outcome.total_submitted, 5);
    assert!(outcome.failed >= 3, "failed={}", outcome.failed);
    assert!(outcome.failed <= outcome.total_submitted);
    for (_, msg) in &outcome.failures {
        assert!(msg.contains("saturated"), "{msg}");
    }
}

#[test]
fn test_cancel_before_start_submits_nothing() {
    let dir = TempDir::new().unwrap();
    let files = vec![
        write_valid(dir.path(), "a.gz", 1),
        write_valid(dir.path(), "b.gz", 1),
    ];
    let opts = Opts {
        workers: Some(2),
        cancel: Some(Arc::new(AtomicBool::new(true))),
        ..Default::default()
    };
    let (seen, sink) = collecting_sink();
    let outcome = run_batch(files, &opts, Arc::new(sink));
    assert!(outcome.cancelled);
    assert_eq!(outcome.total_submitted, 0);
    assert_eq!(outcome.failed, 0);
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_missing_file_in_list_is_open_failure() {
    let dir = TempDir::new().unwrap();
    let present = write_valid(dir.path(), "present.gz", 1);
    let gone = dir.path().join("gone.gz");
    let opts = Opts {
        workers: Some(2),
        record_failures: true,
        ..Default::default()
    };
    let outcome = run_batch(
        vec![present, gone.clone()],
        &opts,
        Arc::new(|_: &Record, _: &Path| {}),
    );
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.failures[0].0, gone);
    assert!(outcome.failures[0].1.starts_with("failed to open"));
}

#[test]
fn test_null_fields_do_not_fail_the_file() {
    let dir = TempDir::new().unwrap();
    let json = br#"{"items":[{"DOI":"n-0","title":null,"references-count":null,"author":null}]}
null
{"items":null}
{"items":[{"DOI":"n-1","author":[{"given":null,"family":"F"}]}]}"#;
    let nulls = write_file(dir.path(), "nulls.gz", &gzip(json));

    let (seen, sink) = collecting_sink();
    let outcome = decode_dir(dir.path(), &opts(2), sink).unwrap();

    assert_eq!(outcome.total_submitted, 1);
    assert!(outcome.is_success(), "{:?}", outcome.failures);
    assert_eq!(
        per_file(&seen).get(&nulls),
        Some(&vec!["n-0".to_string(), "n-1".to_string()])
    );
}
