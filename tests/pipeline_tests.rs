mod common;

use common::{LineDecoder, opts_for, read_table, write_file};
use metaharvest::engine::{CheckpointStore, PartialWriter, path_to_id};
use metaharvest::harvest::harvest_dir_with_opts;
use metaharvest::{DecodeError, Decoder, MergeOutcome, Opts, Record, TagMap, harvest_dir};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Deletes `victim` before its first decode, so a folder the scan found is gone by the
/// time it is processed.
struct VanishingFolderDecoder {
    inner: LineDecoder,
    victim: PathBuf,
    removed: AtomicBool,
}

impl Decoder for VanishingFolderDecoder {
    fn decode(&self, path: &Path) -> Result<TagMap, DecodeError> {
        if !self.removed.swap(true, Ordering::SeqCst) {
            std::fs::remove_dir_all(&self.victim).unwrap();
        }
        self.inner.decode(path)
    }
}

fn canonical_tempdir() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    (dir, root)
}

fn state_paths(out: &Path) -> (PathBuf, PathBuf) {
    (
        out.join("temp_processing"),
        out.join("processed_folders.json"),
    )
}

#[test]
fn test_heterogeneous_fields_union() {
    let (_g, root) = canonical_tempdir();
    let (_o, out) = canonical_tempdir();
    write_file(&root, "a/1.dcm", "A=1\nB=2\n");
    write_file(&root, "b/2.dcm", "B=3\nC=4\n");

    let decoder = LineDecoder::default();
    let summary = harvest_dir(&root, &opts_for(&out), Some(&decoder)).unwrap();
    assert_eq!(summary.units_found, 2);
    assert_eq!(summary.units_processed, 2);
    assert_eq!(summary.records, 2);

    let table = read_table(&out.join("meta.csv"));
    assert_eq!(table.header, vec!["DicomPath", "A", "B", "C"]);
    assert_eq!(table.rows.len(), 2);
    let first = table.row_for("a/1.dcm");
    assert_eq!(first["A"], "1");
    assert_eq!(first["C"], "");
    let second = table.row_for("b/2.dcm");
    assert_eq!(second["A"], "");
    assert_eq!(second["C"], "4");

    match summary.merge {
        MergeOutcome::Written { rows, columns, .. } => {
            assert_eq!(rows, 2);
            assert_eq!(columns, table.header);
        }
        MergeOutcome::NoData => panic!("expected output"),
    }
}

#[test]
fn test_all_missing_columns_dropped_and_sentinels_blank() {
    let (_g, root) = canonical_tempdir();
    let (_o, out) = canonical_tempdir();
    write_file(&root, "s/1.dcm", "Modality=CT\nEmpty=\nLabel=None\nNote=NONE\n");
    write_file(&root, "s/2.dcm", "Modality=MR\nEmpty=\nLabel=N/A\nNote=kept\n");

    let decoder = LineDecoder::default();
    harvest_dir(&root, &opts_for(&out), Some(&decoder)).unwrap();

    let table = read_table(&out.join("meta.csv"));
    assert_eq!(table.header, vec!["DicomPath", "Modality", "Note"]);
    assert_eq!(table.row_for("s/1.dcm")["Note"], "");
    assert_eq!(table.row_for("s/2.dcm")["Note"], "kept");
    assert!(table.rows.iter().all(|r| !r.values().any(|v| v == "N/A")));
}

#[test]
fn test_bad_file_degrades_only_its_own_row() {
    let (_g, root) = canonical_tempdir();
    let (_o, out) = canonical_tempdir();
    for i in 0..10 {
        let body = if i == 4 { "CORRUPT" } else { "Modality=CT\nRows=512" };
        write_file(&root, &format!("series/img{i:02}.dcm"), body);
    }

    let decoder = LineDecoder::default();
    let summary = harvest_dir(&root, &opts_for(&out), Some(&decoder)).unwrap();
    assert_eq!(summary.records, 10);
    assert_eq!(summary.degraded, 1);

    let table = read_table(&out.join("meta.csv"));
    assert_eq!(table.header, vec!["DicomPath", "Error", "Modality", "Rows"]);
    assert_eq!(table.rows.len(), 10);
    let bad = table.row_for("img04.dcm");
    assert!(bad["Error"].contains("corrupt header"), "{}", bad["Error"]);
    assert_eq!(bad["Modality"], "");
    let good: Vec<_> = table.rows.iter().filter(|r| r["Error"].is_empty()).collect();
    assert_eq!(good.len(), 9);
    assert!(good.iter().all(|r| r["Modality"] == "CT" && r["Rows"] == "512"));
}

#[test]
fn test_decoder_panic_becomes_degraded_row() {
    let (_g, root) = canonical_tempdir();
    let (_o, out) = canonical_tempdir();
    write_file(&root, "s/1.dcm", "PANIC");
    write_file(&root, "s/2.dcm", "Modality=CT");

    let decoder = LineDecoder::default();
    let summary = harvest_dir(&root, &opts_for(&out), Some(&decoder)).unwrap();
    assert_eq!(summary.degraded, 1);

    let table = read_table(&out.join("meta.csv"));
    assert!(table.row_for("s/1.dcm")["Error"].contains("decoder blew up"));
    assert_eq!(table.row_for("s/2.dcm")["Modality"], "CT");
}

#[test]
fn test_rows_keep_file_order_within_folder() {
    let (_g, root) = canonical_tempdir();
    let (_o, out) = canonical_tempdir();
    for i in 0..7 {
        write_file(&root, &format!("s/{i}.dcm"), &format!("N={i}"));
    }

    let decoder = LineDecoder::default();
    harvest_dir(&root, &opts_for(&out), Some(&decoder)).unwrap();

    let table = read_table(&out.join("meta.csv"));
    let order: Vec<&str> = table.rows.iter().map(|r| r["N"].as_str()).collect();
    assert_eq!(order, vec!["0", "1", "2", "3", "4", "5", "6"]);
}

#[test]
fn test_empty_input_writes_nothing_and_cleans_up() {
    let (_g, root) = canonical_tempdir();
    let (_o, out) = canonical_tempdir();
    write_file(&root, "docs/readme.txt", "hello");

    let decoder = LineDecoder::default();
    let summary = harvest_dir(&root, &opts_for(&out), Some(&decoder)).unwrap();
    assert_eq!(summary.merge, MergeOutcome::NoData);
    assert_eq!(summary.units_found, 0);
    assert_eq!(decoder.seen_count(), 0);

    let (temp_dir, checkpoint) = state_paths(&out);
    assert!(!out.join("meta.csv").exists());
    assert!(!temp_dir.exists());
    assert!(!checkpoint.exists());
}

#[test]
fn test_successful_run_removes_state() {
    let (_g, root) = canonical_tempdir();
    let (_o, out) = canonical_tempdir();
    write_file(&root, "a/1.dcm", "A=1");

    let decoder = LineDecoder::default();
    harvest_dir(&root, &opts_for(&out), Some(&decoder)).unwrap();

    let (temp_dir, checkpoint) = state_paths(&out);
    assert!(out.join("meta.csv").exists());
    assert!(!temp_dir.exists());
    assert!(!checkpoint.exists());
}

#[test]
fn test_resume_skips_checkpointed_folders() {
    let (_g, root) = canonical_tempdir();
    let (_o, out) = canonical_tempdir();
    write_file(&root, "a/1.dcm", "A=fresh");
    write_file(&root, "b/2.dcm", "A=b");

    // State left by an interrupted run that finished folder `a`.
    let (temp_dir, checkpoint) = state_paths(&out);
    let a_id = path_to_id(&root.join("a"));
    let mut earlier = Record::new();
    earlier.insert(
        "DicomPath".to_string(),
        root.join("a/1.dcm").to_string_lossy().into_owned(),
    );
    earlier.insert("A".to_string(), "from-previous-run".to_string());
    PartialWriter::open(&temp_dir)
        .unwrap()
        .write(&a_id, &[earlier])
        .unwrap();
    CheckpointStore::new(&checkpoint).mark_done(&a_id).unwrap();

    let decoder = LineDecoder::default();
    let summary = harvest_dir(&root, &opts_for(&out), Some(&decoder)).unwrap();
    assert_eq!(summary.units_found, 2);
    assert_eq!(summary.units_skipped, 1);
    assert_eq!(summary.units_processed, 1);
    assert!(!decoder.saw_under(&root.join("a")));
    assert_eq!(decoder.seen_count(), 1);

    let table = read_table(&out.join("meta.csv"));
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.row_for("a/1.dcm")["A"], "from-previous-run");
    assert_eq!(table.row_for("b/2.dcm")["A"], "b");
}

#[test]
fn test_unmarked_partial_is_superseded_without_duplicates() {
    let (_g, root) = canonical_tempdir();
    let (_o, out) = canonical_tempdir();
    write_file(&root, "a/1.dcm", "A=redone");

    // Crash after the partial file was written but before the checkpoint mark.
    let (temp_dir, _) = state_paths(&out);
    let mut stale = Record::new();
    stale.insert(
        "DicomPath".to_string(),
        root.join("a/1.dcm").to_string_lossy().into_owned(),
    );
    stale.insert("Stale".to_string(), "yes".to_string());
    PartialWriter::open(&temp_dir)
        .unwrap()
        .write(&path_to_id(&root.join("a")), &[stale])
        .unwrap();

    let decoder = LineDecoder::default();
    let summary = harvest_dir(&root, &opts_for(&out), Some(&decoder)).unwrap();
    assert_eq!(summary.units_processed, 1);
    assert_eq!(decoder.seen_count(), 1);

    let table = read_table(&out.join("meta.csv"));
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.header, vec!["DicomPath", "A"]);
    assert_eq!(table.rows[0]["A"], "redone");
}

#[test]
fn test_repeat_run_rebuilds_same_table() {
    let (_g, root) = canonical_tempdir();
    let (_o, out) = canonical_tempdir();
    write_file(&root, "a/1.dcm", "A=1");
    write_file(&root, "b/2.dcm", "B=2");

    let decoder = LineDecoder::default();
    harvest_dir(&root, &opts_for(&out), Some(&decoder)).unwrap();
    let first = read_table(&out.join("meta.csv"));
    harvest_dir(&root, &opts_for(&out), Some(&decoder)).unwrap();
    let second = read_table(&out.join("meta.csv"));

    // Folders finish in any order, so compare rows as a set.
    assert_eq!(first.header, second.header);
    let mut a = first.rows;
    let mut b = second.rows;
    a.sort();
    b.sort();
    assert_eq!(a, b);
    assert_eq!(decoder.seen_count(), 4);
}

#[test]
fn test_unreadable_partial_keeps_state_for_retry() {
    let (_g, root) = canonical_tempdir();
    let (_o, out) = canonical_tempdir();
    write_file(&root, "a/1.dcm", "A=1");
    let (temp_dir, checkpoint) = state_paths(&out);
    std::fs::create_dir_all(&temp_dir).unwrap();
    std::fs::write(temp_dir.join("part_0_broken.json"), "{ not json").unwrap();

    let decoder = LineDecoder::default();
    let err = harvest_dir(&root, &opts_for(&out), Some(&decoder)).unwrap_err();
    assert!(format!("{err:#}").contains("part_0_broken.json"), "{err:#}");

    assert!(!out.join("meta.csv").exists());
    assert!(temp_dir.exists());
    assert!(checkpoint.exists());
}

#[test]
fn test_cancelled_run_keeps_state_and_skips_merge() {
    let (_g, root) = canonical_tempdir();
    let (_o, out) = canonical_tempdir();
    write_file(&root, "a/1.dcm", "A=1");

    let opts = Opts {
        output: out.join("meta.csv"),
        cancel: Some(Arc::new(AtomicBool::new(true))),
        ..Default::default()
    };
    let decoder = LineDecoder::default();
    assert!(harvest_dir_with_opts(&root, &opts, &decoder).is_err());
    assert_eq!(decoder.seen_count(), 0);
    assert!(!out.join("meta.csv").exists());
    assert!(state_paths(&out).0.exists());
}

#[test]
fn test_output_inside_input_root() {
    let (_g, root) = canonical_tempdir();
    write_file(&root, "a/1.dcm", "A=1");
    let mut opts = opts_for(&root.join("results"));
    opts.suffixes = vec![".dcm".to_string(), ".json".to_string()];

    let decoder = LineDecoder::default();
    let summary = harvest_dir(&root, &opts, Some(&decoder)).unwrap();
    assert_eq!(summary.units_found, 1);
    assert_eq!(read_table(&root.join("results/meta.csv")).rows.len(), 1);
}

#[test]
fn test_missing_root_is_an_error() {
    let (_o, out) = canonical_tempdir();
    let decoder = LineDecoder::default();
    let err = harvest_dir(Path::new("/no/such/dir"), &opts_for(&out), Some(&decoder));
    assert!(err.is_err());
}

#[test]
fn test_builtin_decoder_degrades_non_dicom_file() {
    let (_g, root) = canonical_tempdir();
    let (_o, out) = canonical_tempdir();
    write_file(&root, "s/fake.dcm", "this is not a DICOM file");

    let summary = harvest_dir(&root, &opts_for(&out), None).unwrap();
    assert_eq!(summary.degraded, 1);
    let table = read_table(&out.join("meta.csv"));
    assert_eq!(table.header, vec!["DicomPath", "Error"]);
    assert!(!table.rows[0]["Error"].is_empty());
}

#[test]
fn test_unlistable_folder_keeps_state_and_is_retried() {
    let (_g, root) = canonical_tempdir();
    let (_o, out) = canonical_tempdir();
    write_file(&root, "a/1.dcm", "A=1");
    write_file(&root, "b/2.dcm", "A=2");

    // One folder worker: `a` runs first and removes `b` before `b` is listed.
    let mut opts = opts_for(&out);
    opts.workers.folder_workers = 1;
    let vanishing = VanishingFolderDecoder {
        inner: LineDecoder::default(),
        victim: root.join("b"),
        removed: AtomicBool::new(false),
    };
    let err = harvest_dir(&root, &opts, Some(&vanishing)).unwrap_err();
    assert!(format!("{err:#}").contains("could not be read"), "{err:#}");

    let (temp_dir, checkpoint) = state_paths(&out);
    assert!(!out.join("meta.csv").exists());
    assert!(temp_dir.exists());
    let done = CheckpointStore::new(&checkpoint).load().unwrap();
    assert!(done.contains(&path_to_id(&root.join("a"))));
    assert!(!done.contains(&path_to_id(&root.join("b"))));

    // The folder comes back; only it is decoded on the rerun.
    write_file(&root, "b/2.dcm", "A=2");
    let decoder = LineDecoder::default();
    let summary = harvest_dir(&root, &opts, Some(&decoder)).unwrap();
    assert_eq!(summary.units_skipped, 1);
    assert_eq!(summary.units_processed, 1);
    assert!(!decoder.saw_under(&root.join("a")));

    let table = read_table(&out.join("meta.csv"));
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.row_for("a/1.dcm")["A"], "1");
    assert_eq!(table.row_for("b/2.dcm")["A"], "2");
    assert!(!temp_dir.exists());
    assert!(!checkpoint.exists());
}

#[test]
fn test_many_folders_share_small_file_pool() {
    let (_g, root) = canonical_tempdir();
    let (_o, out) = canonical_tempdir();
    for f in 0..20 {
        for i in 0..5 {
            write_file(&root, &format!("f{f:02}/{i}.dcm"), &format!("Folder={f}\nIndex={i}"));
        }
    }
    let mut opts = opts_for(&out);
    opts.workers.folder_workers = 4;
    opts.workers.file_workers = 1;
    opts.workers.chunk_size = 2;

    let decoder = LineDecoder::default();
    let summary = harvest_dir(&root, &opts, Some(&decoder)).unwrap();
    assert_eq!(summary.units_processed, 20);
    assert_eq!(summary.records, 100);

    let table = read_table(&out.join("meta.csv"));
    let mut paths: Vec<&str> = table.rows.iter().map(|r| r["DicomPath"].as_str()).collect();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), 100);
}
