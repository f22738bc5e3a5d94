// tests/normalize.rs

//! End-to-end normalization runs over real archive fixtures.

mod common;

use common::*;
use std::fs;
use unnest::{Error, ExtractionConfig, Normalizer};

fn normalizer() -> Normalizer {
    Normalizer::new(ExtractionConfig::default()).unwrap()
}

#[test]
fn test_single_stream_formats() {
    let ws = Workspace::new();
    write(&ws.source_file("logs/app.log.gz"), &gzip_bytes(b"gzip payload"));
    write(&ws.source_file("dump.sql.bz2"), &bzip2_bytes(b"bzip2 payload"));
    write(&ws.source_file("data/table.csv.xz"), &xz_bytes(b"xz payload"));
    write(&ws.source_file("old.txt.lzma"), &lzma_bytes(b"lzma payload"));

    let report = normalizer().run(&ws.source, &ws.dest).unwrap();

    assert_eq!(
        list_files(&ws.dest),
        vec!["data/table.csv", "dump.sql", "logs/app.log", "old.txt"]
    );
    assert_eq!(fs::read(ws.dest.join("logs/app.log")).unwrap(), b"gzip payload");
    assert_eq!(fs::read(ws.dest.join("dump.sql")).unwrap(), b"bzip2 payload");
    assert_eq!(fs::read(ws.dest.join("data/table.csv")).unwrap(), b"xz payload");
    assert_eq!(fs::read(ws.dest.join("old.txt")).unwrap(), b"lzma payload");
    assert_eq!(report.files_decompressed, 4);
    assert!(report.is_clean());
}

#[test]
fn test_plain_files_copied_and_source_untouched() {
    let ws = Workspace::new();
    write(&ws.source_file("README.md"), b"# readme");
    write(&ws.source_file("src/main.c"), b"int main() {}");
    let archive = ws.source_file("bundle.zip");
    let archive_bytes = zip_bytes(&[("a.txt", b"a".as_slice())]);
    write(&archive, &archive_bytes);

    let report = normalizer().run(&ws.source, &ws.dest).unwrap();

    assert_eq!(
        list_files(&ws.dest),
        vec!["README.md", "bundle/a.txt", "src/main.c"]
    );
    assert_eq!(report.files_copied, 2);
    assert_eq!(fs::read(&archive).unwrap(), archive_bytes);
    assert_eq!(
        list_files(&ws.source),
        vec!["README.md", "bundle.zip", "src/main.c"]
    );
}

#[test]
fn test_matching_top_level_directory_is_flattened() {
    let ws = Workspace::new();
    let zip = zip_bytes(&[
        ("example/", b"".as_slice()),
        ("example/a.txt", b"alpha".as_slice()),
        ("example/sub/b.txt", b"beta".as_slice()),
    ]);
    write(&ws.source_file("example.zip"), &zip);

    normalizer().run(&ws.source, &ws.dest).unwrap();

    assert_eq!(
        list_files(&ws.dest),
        vec!["example/a.txt", "example/sub/b.txt"]
    );
    assert!(!ws.dest.join("example/example").exists());
}

#[test]
fn test_tar_gz_flattened_by_compound_suffix() {
    let ws = Workspace::new();
    let tar = tar_bytes(&[
        ("release-1.0/", b"".as_slice()),
        ("release-1.0/NOTES", b"notes".as_slice()),
    ]);
    write(&ws.source_file("release-1.0.tar.gz"), &gzip_bytes(&tar));

    normalizer().run(&ws.source, &ws.dest).unwrap();

    assert_eq!(list_files(&ws.dest), vec!["release-1.0/NOTES"]);
}

#[test]
fn test_multiple_top_level_entries_not_flattened() {
    let ws = Workspace::new();
    let zip = zip_bytes(&[("a.txt", b"a".as_slice()), ("b.txt", b"b".as_slice())]);
    write(&ws.source_file("bundle.zip"), &zip);

    normalizer().run(&ws.source, &ws.dest).unwrap();

    assert_eq!(list_files(&ws.dest), vec!["bundle/a.txt", "bundle/b.txt"]);
}

#[test]
fn test_non_matching_top_level_not_flattened() {
    let ws = Workspace::new();
    let zip = zip_bytes(&[("other/", b"".as_slice()), ("other/c.txt", b"c".as_slice())]);
    write(&ws.source_file("bundle.zip"), &zip);

    normalizer().run(&ws.source, &ws.dest).unwrap();

    assert_eq!(list_files(&ws.dest), vec!["bundle/other/c.txt"]);
}

#[test]
fn test_path_traversal_aborts_run() {
    let ws = Workspace::new();
    let zip = zip_bytes(&[
        ("fine.txt", b"fine".as_slice()),
        ("../../evil.txt", b"evil".as_slice()),
    ]);
    write(&ws.source_file("bad.zip"), &zip);

    let err = normalizer().run(&ws.source, &ws.dest).unwrap_err();

    assert!(matches!(err, Error::PathTraversal { .. }));
    assert!(!ws.dest.join("bad/fine.txt").exists());
    assert!(!ws.dest.join("evil.txt").exists());
    assert!(!ws.source.join("evil.txt").exists());
    assert!(!ws.source.parent().unwrap().join("evil.txt").exists());
}

#[test]
fn test_tar_gz_inside_zip_fully_unpacked() {
    let ws = Workspace::new();
    let inner_tar = tar_bytes(&[
        ("lib/", b"".as_slice()),
        ("lib/core.py", b"print('core')".as_slice()),
    ]);
    let inner = gzip_bytes(&inner_tar);
    let outer = zip_bytes(&[
        ("outer/", b"".as_slice()),
        ("outer/lib.tar.gz", inner.as_slice()),
        ("outer/readme.txt", b"outer".as_slice()),
    ]);
    write(&ws.source_file("outer.zip"), &outer);

    let report = normalizer().run(&ws.source, &ws.dest).unwrap();

    assert_eq!(
        list_files(&ws.dest),
        vec!["outer/lib/core.py", "outer/readme.txt"]
    );
    assert_eq!(
        fs::read(ws.dest.join("outer/lib/core.py")).unwrap(),
        b"print('core')"
    );
    assert_eq!(report.archives_extracted, 2);
    assert!(report.passes >= 2);
}

#[test]
fn test_deep_nesting_mixed_formats() {
    let ws = Workspace::new();
    // zip -> tar.bz2 -> zip -> log.gz
    let log = gzip_bytes(b"deepest");
    let innermost = zip_bytes(&[("trace.log.gz", log.as_slice())]);
    let middle = bzip2_bytes(&tar_bytes(&[("inner.zip", innermost.as_slice())]));
    let outer = zip_bytes(&[("middle.tar.bz2", middle.as_slice())]);
    write(&ws.source_file("drop.zip"), &outer);

    let report = normalizer().run(&ws.source, &ws.dest).unwrap();

    assert_eq!(
        list_files(&ws.dest),
        vec!["drop/middle/inner/trace.log"]
    );
    assert_eq!(
        fs::read(ws.dest.join("drop/middle/inner/trace.log")).unwrap(),
        b"deepest"
    );
    assert!(report.is_clean());
}

#[test]
fn test_ignored_directories_excluded() {
    let ws = Workspace::new();
    write(
        &ws.source_file(".git/objects/pack.tar.gz"),
        &gzip_bytes(&tar_bytes(&[("x", b"x".as_slice())])),
    );
    write(&ws.source_file("src/lib.rs"), b"pub fn f() {}");

    normalizer().run(&ws.source, &ws.dest).unwrap();

    assert_eq!(list_files(&ws.dest), vec!["src/lib.rs"]);
    assert!(!ws.dest.join(".git").exists());
}

#[test]
fn test_ignore_patterns_from_config() {
    let ws = Workspace::new();
    write(&ws.source_file("web/node_modules/pkg/index.js"), b"js");
    write(&ws.source_file("web/app.js"), b"app");

    let config = ExtractionConfig {
        ignore_dirs: vec![".git".to_string(), "node_modules".to_string()],
        ..Default::default()
    };
    Normalizer::new(config)
        .unwrap()
        .run(&ws.source, &ws.dest)
        .unwrap();

    assert_eq!(list_files(&ws.dest), vec!["web/app.js"]);
}

#[test]
fn test_second_run_changes_nothing() {
    let ws = Workspace::new();
    let tar = tar_bytes(&[("notes.txt.gz", gzip_bytes(b"n").as_slice())]);
    write(&ws.source_file("pkg.tar"), &tar);

    normalizer().run(&ws.source, &ws.dest).unwrap();
    let first = list_files(&ws.dest);
    assert_eq!(first, vec!["pkg/notes.txt"]);

    // Normalizing the normalized tree is a plain copy
    let again = ws.dest.parent().unwrap().join("again");
    let report = normalizer().run(&ws.dest, &again).unwrap();

    assert_eq!(list_files(&again), first);
    assert_eq!(report.files_decompressed, 0);
    assert_eq!(report.archives_extracted, 0);
    assert_eq!(report.passes, 1);
}

#[test]
fn test_corrupt_file_recorded_and_run_continues() {
    let ws = Workspace::new();
    write(&ws.source_file("broken.log.gz"), &corrupt_gzip_bytes());
    write(&ws.source_file("good.log.gz"), &gzip_bytes(b"good"));

    let report = normalizer().run(&ws.source, &ws.dest).unwrap();

    assert!(!report.is_clean());
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].path.ends_with("broken.log.gz"));
    assert_eq!(fs::read(ws.dest.join("good.log")).unwrap(), b"good");
    // Left verbatim for inspection
    assert_eq!(
        fs::read(ws.dest.join("broken.log.gz")).unwrap(),
        corrupt_gzip_bytes()
    );
}

#[test]
fn test_misnamed_archive_copied_verbatim() {
    let ws = Workspace::new();
    write(&ws.source_file("notes.zip"), b"just text");

    let report = normalizer().run(&ws.source, &ws.dest).unwrap();

    assert_eq!(list_files(&ws.dest), vec!["notes.zip"]);
    assert_eq!(fs::read(ws.dest.join("notes.zip")).unwrap(), b"just text");
    assert!(report.is_clean());
}

#[test]
fn test_hash_named_layer_extracted() {
    let ws = Workspace::new();
    let layer = "a3f5".repeat(16);
    let tar = tar_bytes(&[("etc/", b"".as_slice()), ("etc/os-release", b"ID=test".as_slice())]);
    write(&ws.source_file(&format!("blobs/{layer}")), &tar);

    normalizer().run(&ws.source, &ws.dest).unwrap();

    assert_eq!(
        list_files(&ws.dest),
        vec![format!("blobs/{layer}/etc/os-release")]
    );
}

#[test]
fn test_extraction_budget_trips_bomb_guard() {
    let ws = Workspace::new();
    let big = vec![b'z'; 64 * 1024];
    write(&ws.source_file("big.txt.gz"), &gzip_bytes(&big));

    let config = ExtractionConfig {
        max_extracted_bytes: 1024,
        ..Default::default()
    };
    let err = Normalizer::new(config)
        .unwrap()
        .run(&ws.source, &ws.dest)
        .unwrap_err();

    assert!(matches!(err, Error::PossibleArchiveBomb { .. }));
    assert!(!ws.dest.join("big.txt").exists());
}

#[test]
fn test_pass_limit_trips_bomb_guard() {
    let ws = Workspace::new();
    // Three single-stream layers need three changing passes
    let layered = gzip_bytes(&gzip_bytes(&gzip_bytes(b"core")));
    write(&ws.source_file("core.txt.gz.gz.gz.gz"), &gzip_bytes(&layered));

    let config = ExtractionConfig {
        max_passes: 2,
        ..Default::default()
    };
    let err = Normalizer::new(config)
        .unwrap()
        .run(&ws.source, &ws.dest)
        .unwrap_err();

    assert!(matches!(err, Error::PossibleArchiveBomb { .. }));
}

#[test]
fn test_single_file_source() {
    let ws = Workspace::new();
    let archive = ws.source_file("project.zip");
    write(
        &archive,
        &zip_bytes(&[("project/", b"".as_slice()), ("project/main.go", b"package main".as_slice())]),
    );

    normalizer().run(&archive, &ws.dest).unwrap();

    assert_eq!(list_files(&ws.dest), vec!["project/main.go"]);
}

#[test]
fn test_missing_source_is_not_file_or_directory() {
    let ws = Workspace::new();
    let err = normalizer()
        .run(&ws.source.join("nope"), &ws.dest)
        .unwrap_err();
    assert!(matches!(err, Error::NotFileOrDirectory(_)));
}

#[test]
fn test_sibling_collision_renamed() {
    let ws = Workspace::new();
    // Both produce dest/report.txt
    write(&ws.source_file("report.txt"), b"plain");
    write(&ws.source_file("report.txt.gz"), &gzip_bytes(b"compressed"));

    normalizer().run(&ws.source, &ws.dest).unwrap();

    let files = list_files(&ws.dest);
    assert_eq!(files, vec!["report-1.txt", "report.txt"]);
    let mut contents = vec![
        fs::read(ws.dest.join("report.txt")).unwrap(),
        fs::read(ws.dest.join("report-1.txt")).unwrap(),
    ];
    contents.sort();
    assert_eq!(contents, vec![b"compressed".to_vec(), b"plain".to_vec()]);
}

#[test]
fn test_parallel_run_matches_sequential() {
    let build = |ws: &Workspace| {
        for i in 0..8 {
            write(
                &ws.source_file(&format!("d{i}/file{i}.txt.gz")),
                &gzip_bytes(format!("payload {i}").as_bytes()),
            );
            let name = format!("entry{i}.txt");
            let zip = zip_bytes(&[(name.as_str(), b"entry".as_slice())]);
            write(&ws.source_file(&format!("d{i}/pack{i}.zip")), &zip);
        }
    };

    let sequential = Workspace::new();
    build(&sequential);
    normalizer().run(&sequential.source, &sequential.dest).unwrap();

    let parallel = Workspace::new();
    build(&parallel);
    let config = ExtractionConfig {
        jobs: 4,
        ..Default::default()
    };
    let report = Normalizer::new(config)
        .unwrap()
        .run(&parallel.source, &parallel.dest)
        .unwrap();

    assert_eq!(list_files(&parallel.dest), list_files(&sequential.dest));
    assert_eq!(report.files_decompressed, 8);
    assert_eq!(report.archives_extracted, 8);
}

#[test]
fn test_entry_directory_held_by_file_is_renamed() {
    let ws = Workspace::new();
    write(&ws.source_file("pkg/lib"), b"a plain file");
    let zip = zip_bytes(&[("lib/a.txt", b"alpha".as_slice())]);
    write(&ws.source_file("pkg.zip"), &zip);

    let report = normalizer().run(&ws.source, &ws.dest).unwrap();

    assert_eq!(list_files(&ws.dest), vec!["pkg/lib", "pkg/lib-1/a.txt"]);
    assert_eq!(fs::read(ws.dest.join("pkg/lib")).unwrap(), b"a plain file");
    assert_eq!(fs::read(ws.dest.join("pkg/lib-1/a.txt")).unwrap(), b"alpha");
    assert!(report.is_clean());
}

#[test]
fn test_source_inside_destination_rejected() {
    let ws = Workspace::new();
    let source = ws.dest.join("input");
    write(&source.join("inner.txt.gz"), &gzip_bytes(b"inner"));

    let err = normalizer().run(&source, &ws.dest).unwrap_err();
    assert!(matches!(err, Error::SourceInsideDestination { .. }));
    assert_eq!(list_files(&source), vec!["inner.txt.gz"]);

    let err = normalizer().run(&source, &source).unwrap_err();
    assert!(matches!(err, Error::SourceInsideDestination { .. }));
    assert_eq!(list_files(&source), vec!["inner.txt.gz"]);
}

#[test]
fn test_zip_with_prepended_stub_extracted() {
    let ws = Workspace::new();
    let mut installer = b"#!/bin/sh\nexec unzip \"$0\"\n".to_vec();
    installer.extend(zip_bytes(&[("setup/run.sh", b"echo hi".as_slice())]));
    write(&ws.source_file("installer.zip"), &installer);

    let report = normalizer().run(&ws.source, &ws.dest).unwrap();

    assert_eq!(list_files(&ws.dest), vec!["installer/setup/run.sh"]);
    assert_eq!(report.archives_extracted, 1);
}
