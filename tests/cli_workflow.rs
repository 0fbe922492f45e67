//! End-to-end tests of the genoview binary.
//!
//! Each test writes small input files to a temporary directory and runs the
//! binary built by cargo for this test target.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use flate2::read::MultiGzDecoder;
use tempfile::{tempdir, TempDir};

const FASTA: &str = ">chr1 first\nACGTACGTACGTACGTACGT\nACGTACGTACGTACGTACGT\n>chr2\nACGTACGTAC\n";

const SAM: &str = "@HD\tVN:1.6\tSO:unsorted\n\
@SQ\tSN:chr1\tLN:40\n\
@SQ\tSN:chr2\tLN:10\n\
r1\t0\tchr1\t1\t60\t10M\t*\t0\t0\tACGTACGTAC\tIIIIIIIIII\n\
r2\t0\tchr1\t1\t60\t10M\t*\t0\t0\tACGTACGTAC\tIIIIIIIIII\n\
r3\t0\tchr1\t6\t60\t10M\t*\t0\t0\tACGTACGTAC\tIIIIIIIIII\n\
r4\t16\tchr1\t21\t60\t5M\t*\t0\t0\tACGTA\tIIIII\n\
r5\t16\tchr1\t21\t60\t5M\t*\t0\t0\tACGTA\tIIIII\n\
r6\t4\t*\t0\t0\t*\t*\t0\t0\tACGTA\tIIIII\n";

const GFF3: &str = "##gff-version 3\n\
chr1\tsrc\tgene\t1\t20\t.\t+\t.\tID=geneA;Name=a\n\
chr1\tsrc\tgene\t5\t30\t.\t+\t.\tID=geneB\n\
chr1\tsrc\tgene\t10\t25\t.\t-\t.\tID=geneC\n\
chr1\tsrc\texon\t1\t8\t.\t+\t.\tID=exonA1;Parent=geneA\n";

fn genoview(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_genoview"))
        .args(args)
        .output()
        .expect("Failed to run genoview")
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

fn setup() -> (TempDir, PathBuf, PathBuf, PathBuf) {
    let dir = tempdir().unwrap();
    let fasta = write(dir.path(), "genome.fa", FASTA);
    let sam = write(dir.path(), "reads.sam", SAM);
    let gff = write(dir.path(), "genes.gff3", GFF3);
    (dir, fasta, sam, gff)
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "genoview failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_index_writes_default_path() {
    let (dir, fasta, _, _) = setup();

    let output = genoview(&["index", "-r", fasta.to_str().unwrap()]);
    stdout(&output);

    let index = fs::read_to_string(dir.path().join("genome.tsv")).unwrap();
    assert_eq!(index, "chr1\t40\nchr2\t10\n");
}

#[test]
fn test_convert_then_coverage() {
    let (dir, fasta, sam, _) = setup();

    let output = genoview(&[
        "convert",
        "-i",
        sam.to_str().unwrap(),
        "--min-coverage",
        "2",
    ]);
    stdout(&output);

    let bed = dir.path().join("reads.bed.gz");
    let mut text = String::new();
    MultiGzDecoder::new(File::open(&bed).unwrap())
        .read_to_string(&mut text)
        .unwrap();
    let lines: Vec<&str> = text.lines().collect();
    // chr2 has no read
    assert_eq!(lines[0], "#chr1\t40");
    // r1 + r2 cover 0..10 twice, r3 adds 5..15
    assert_eq!(lines[1], "chr1\t0\t0\tpos1\t2\t+");
    assert_eq!(lines[6], "chr1\t5\t5\tpos6\t3\t+");
    assert_eq!(lines.last().unwrap(), &"chr1\t24\t24\tpos15\t2\t-");

    let output = genoview(&[
        "coverage",
        "-r",
        fasta.to_str().unwrap(),
        "-a",
        bed.to_str().unwrap(),
        "--refid",
        "chr1",
        "--start",
        "0",
        "--end",
        "40",
        "--bins",
        "4",
        "--min-coverage",
        "1",
    ]);
    let text = stdout(&output);
    assert_eq!(
        text,
        "track\tbin_start\tplus\tminus\n\
reads\t0\t3\t0\n\
reads\t10\t0\t0\n\
reads\t20\t0\t2\n\
reads\t30\t0\t0\n"
    );
}

#[test]
fn test_coverage_from_sam_with_sum_reducer() {
    let (_dir, fasta, sam, _) = setup();

    let output = genoview(&[
        "coverage",
        "-r",
        fasta.to_str().unwrap(),
        "-a",
        sam.to_str().unwrap(),
        "--refid",
        "chr1",
        "--start",
        "0",
        "--end",
        "20",
        "--bins",
        "2",
        "--reducer",
        "sum",
        "--min-coverage",
        "1",
    ]);
    let text = stdout(&output);
    // [0,10): 2*10 + 5 from r3, [10,20): 5 from r3
    assert_eq!(
        text,
        "track\tbin_start\tplus\tminus\nreads\t0\t25\t0\nreads\t10\t5\t0\n"
    );
}

#[test]
fn test_layout_levels() {
    let (_dir, fasta, _, gff) = setup();

    let output = genoview(&[
        "layout",
        "-r",
        fasta.to_str().unwrap(),
        "-f",
        gff.to_str().unwrap(),
        "--refid",
        "chr1",
        "--start",
        "0",
        "--end",
        "40",
        "--offset",
        "0",
    ]);
    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "track\ttype\tid\tstart\tend\tlevel\tarrow_style");
    assert_eq!(lines[1], "genes\texon\texonA1\t1\t8\t1\t-|>,head_width=1,head_length=2");
    assert_eq!(lines[2], "genes\tgene\tgeneA\t1\t20\t1\t-|>,head_width=1,head_length=2");
    assert_eq!(lines[3], "genes\tgene\tgeneB\t5\t30\t2\t-|>,head_width=1,head_length=2");
    assert_eq!(lines[4], "genes\tgene\tgeneC\t10\t25\t-1\t<|-,head_width=1,head_length=2");
    assert_eq!(lines.len(), 5);
}

#[test]
fn test_layout_one_based_and_filters() {
    let (_dir, fasta, _, gff) = setup();

    let output = genoview(&[
        "--one-based",
        "layout",
        "-r",
        fasta.to_str().unwrap(),
        "-f",
        gff.to_str().unwrap(),
        "--refid",
        "chr1",
        "--types",
        "gene",
        "--filter-negative",
    ]);
    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("genes\tgene\tgeneA\t0\t20\t1\t"));
    assert!(lines[2].starts_with("genes\tgene\tgeneB\t4\t30\t2\t"));
}

#[test]
fn test_summary_tables() {
    let (_dir, fasta, sam, gff) = setup();

    let output = genoview(&[
        "summary",
        "-r",
        fasta.to_str().unwrap(),
        "-a",
        sam.to_str().unwrap(),
        "-f",
        gff.to_str().unwrap(),
        "--min-coverage",
        "1",
    ]);
    let text = stdout(&output);

    assert!(text.starts_with("#reference\nrefid\tlength\nchr1\t40\nchr2\t10\n"));
    // 2*10 + 10 on + and 2*5 on -, nothing on chr2
    assert!(text.contains("#alignments\ntrack\trefid_count\tnbases\nreads\t1\t40\n"));
    assert!(text.contains("#annotations\ntrack\tfeature_count\trefid_count\ttype_count\ngenes\t4\t1\t2\n"));
    assert!(text.contains("#annotations_per_type\ntype\tgenes\nexon\t1\ngene\t3\n"));
}

#[test]
fn test_errors_exit_with_status_1() {
    let (_dir, fasta, sam, _) = setup();

    let bad_reducer = genoview(&[
        "coverage",
        "-r",
        fasta.to_str().unwrap(),
        "-a",
        sam.to_str().unwrap(),
        "--refid",
        "chr1",
        "--reducer",
        "median",
    ]);
    assert_eq!(bad_reducer.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&bad_reducer.stderr).starts_with("Error: "));

    let bad_interval = genoview(&[
        "coverage",
        "-r",
        fasta.to_str().unwrap(),
        "-a",
        sam.to_str().unwrap(),
        "--refid",
        "chr1",
        "--start",
        "30",
        "--end",
        "10",
    ]);
    assert_eq!(bad_interval.status.code(), Some(1));

    let bad_format = genoview(&[
        "convert",
        "-i",
        fasta.to_str().unwrap(),
    ]);
    assert_eq!(bad_format.status.code(), Some(1));
}

#[test]
fn test_layout_rejects_non_positive_max_depth() {
    let (_dir, fasta, _, gff) = setup();

    for depth in ["0", "-3", "3000000000"] {
        let output = genoview(&[
            "layout",
            "-r",
            fasta.to_str().unwrap(),
            "-f",
            gff.to_str().unwrap(),
            "--refid",
            "chr1",
            "--max-depth",
            depth,
        ]);
        assert!(!output.status.success(), "--max-depth {} accepted", depth);
        assert!(output.stdout.is_empty());
    }
}
