use std::fs;

use epitok_core::corpus::process_corpus;
use epitok_core::Tokenizer;

#[test]
fn test_batch_writes_results_and_isolates_failures() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    fs::create_dir(src.path().join("rome")).unwrap();
    fs::write(
        src.path().join("a.xml"),
        "<div type=\"edition\"><ab>dis manibus</ab></div>",
    )
    .unwrap();
    fs::write(src.path().join("rome/b.xml"), "<ab>D·M</ab>").unwrap();
    fs::write(src.path().join("broken.xml"), "<ab>dis <lb></ab>").unwrap();
    fs::write(src.path().join("readme.txt"), "not xml").unwrap();

    let report = process_corpus(&Tokenizer::new(), src.path(), dst.path(), "xml").unwrap();

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.totals.dividers, 1);

    let a = fs::read_to_string(dst.path().join("a.xml")).unwrap();
    assert_eq!(a, "<div type=\"edition\"><ab><w>dis</w> <w>manibus</w></ab></div>");
    let b = fs::read_to_string(dst.path().join("rome/b.xml")).unwrap();
    assert_eq!(b, "<ab><w>D</w><g ref=\"#interpunct\">·</g><w>M</w></ab>");
    assert!(!dst.path().join("broken.xml").exists());
    assert!(!dst.path().join("readme.txt").exists());

    let failed = report.files.iter().find(|f| !f.is_ok()).unwrap();
    assert!(failed.file.ends_with("broken.xml"));
    assert!(failed.error.as_deref().unwrap().contains("broken.xml"));
}

#[test]
fn test_report_is_written_as_json() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    fs::write(src.path().join("a.xml"), "<ab>a b</ab>").unwrap();

    let report = process_corpus(&Tokenizer::new(), src.path(), dst.path(), "xml").unwrap();
    let path = dst.path().join("report.json");
    report.write_json(&path).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["succeeded"], 1);
    assert_eq!(json["totals"]["words"], 2);
}
