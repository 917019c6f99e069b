use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn ldsync_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ldsync"))
}

fn tmp_dir(name: &str) -> PathBuf {
    let mut base = std::env::temp_dir();
    base.push(format!("ldsync-cli-{}-{}", name, std::process::id()));
    if base.exists() {
        let _ = fs::remove_dir_all(&base);
    }
    fs::create_dir_all(&base).unwrap();
    base
}

const CARD: &str = r#"@prefix foaf: <http://xmlns.com/foaf/0.1/> .
<#me> a foaf:Person ;
    foaf:name "Max" ;
    foaf:knows <http://ex.com/other#you> .
"#;

#[test]
fn prints_resource_served_from_file() {
    let root = tmp_dir("file");
    let card = root.join("card.ttl");
    fs::write(&card, CARD).unwrap();

    let out = Command::new(ldsync_bin())
        .arg("--file")
        .arg(&card)
        .arg("--offline")
        .arg("http://ex.com/card#me")
        .output()
        .expect("run ldsync");
    assert!(
        out.status.success(),
        "ldsync failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("<http://ex.com/card#me> *authoritative*"), "{}", stdout);
    assert!(stdout.contains("foaf_name: \"Max\""), "{}", stdout);
}

#[test]
fn only_print_uris_lists_all_resources() {
    let root = tmp_dir("uris");
    let card = root.join("card.ttl");
    fs::write(&card, CARD).unwrap();

    let out = Command::new(ldsync_bin())
        .arg("--file")
        .arg(&card)
        .arg("--offline")
        .arg("--print-all-resources")
        .arg("--only-print-uris")
        .arg("http://ex.com/card")
        .output()
        .expect("run ldsync");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3, "{}", stdout);
    assert!(lines.contains(&"<http://ex.com/other#you> [http://ex.com/card]"));
}

#[test]
fn offline_crawl_reports_failures() {
    let root = tmp_dir("offline");
    let card = root.join("card.ttl");
    fs::write(&card, CARD).unwrap();

    let out = Command::new(ldsync_bin())
        .arg("--file")
        .arg(&card)
        .arg("--offline")
        .arg("--follow-all")
        .arg("--depth")
        .arg("1")
        .arg("http://ex.com/card")
        .output()
        .expect("run ldsync");
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Recorded errors"), "{}", stderr);
}

#[test]
fn rejects_invalid_url() {
    let out = Command::new(ldsync_bin())
        .arg("not a url")
        .output()
        .expect("run ldsync");
    assert!(!out.status.success(), "expected failure for invalid url");
}

#[test]
fn only_negotiate_prints_format_without_crawling() {
    let root = tmp_dir("negotiate");
    let card = root.join("card.ttl");
    fs::write(&card, CARD).unwrap();

    let out = Command::new(ldsync_bin())
        .arg("--file")
        .arg(&card)
        .arg("--offline")
        .arg("-o")
        .arg("http://ex.com/card")
        .output()
        .expect("run ldsync");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Content-Type: text/turtle"), "{}", stdout);
    assert!(stdout.contains("Format: Turtle"), "{}", stdout);
    assert!(stdout.contains(&format!("Length: {} bytes", CARD.len())), "{}", stdout);
    assert!(!stdout.contains("*authoritative*"), "{}", stdout);
}

#[test]
fn only_print_uri_content_prints_raw_document() {
    let root = tmp_dir("content");
    let card = root.join("card.ttl");
    fs::write(&card, CARD).unwrap();

    let out = Command::new(ldsync_bin())
        .arg("--file")
        .arg(&card)
        .arg("--offline")
        .arg("--only-print-uri-content")
        .arg("http://ex.com/card#me")
        .output()
        .expect("run ldsync");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("foaf:knows <http://ex.com/other#you>"), "{}", stdout);
    assert!(!stdout.contains("foaf_name"), "{}", stdout);
}

#[test]
fn only_negotiate_reports_fetch_errors_and_continues() {
    let out = Command::new(ldsync_bin())
        .arg("--offline")
        .arg("--only-negotiate")
        .arg("http://ex.com/a")
        .arg("http://ex.com/b")
        .output()
        .expect("run ldsync");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(stdout.matches("offline mode").count(), 2, "{}", stdout);
}
