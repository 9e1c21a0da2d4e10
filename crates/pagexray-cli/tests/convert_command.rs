use assert_cmd::Command;
use pagexray_cli::OutputFormat;
use pagexray_core::asset::{ConnectionType, ContentType, HttpVersion};
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to get path to test fixtures
fn fixture_path(filename: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(filename)
}

/// Test that pages are summarized in order of first appearance
#[test]
fn test_convert_har_returns_pages() {
    let result = pagexray_cli::commands::convert::convert_har(&fixture_path("sample.har"), false, None);

    assert!(result.is_ok(), "Should successfully convert HAR file");
    let pages = result.unwrap();

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].url, "http://www.example.com/");
    assert_eq!(pages[1].url, "https://www.example.com/about");
}

/// Test totals, tables and statistics of the main page
#[test]
fn test_convert_har_page_totals() {
    let pages =
        pagexray_cli::commands::convert::convert_har(&fixture_path("sample.har"), false, None)
            .unwrap();
    let page = &pages[0];

    assert_eq!(page.totals.requests, 6);
    assert_eq!(page.totals.transfer_size, 11543);
    assert_eq!(page.totals.content_size, 32243);
    // The tracker pixel reports headersSize -1 which counts as zero
    assert_eq!(page.totals.header_size, 1080);

    assert_eq!(page.total_domains, 3);
    assert_eq!(page.domains["www.example.com"].requests, 4);
    assert_eq!(page.domains["cdn.example.com"].requests, 1);
    assert_eq!(page.domains["analytics.tracker.net"].requests, 1);

    assert_eq!(page.response_codes.get(&200), Some(&4));
    assert_eq!(page.response_codes.get(&301), Some(&1));
    assert_eq!(page.response_codes.get(&404), Some(&1));

    assert_eq!(page.content_types[&ContentType::Html].requests, 1);
    assert_eq!(page.content_types[&ContentType::Html].transfer_size, 6000);
    assert_eq!(page.content_types[&ContentType::Css].requests, 1);
    assert_eq!(page.content_types[&ContentType::Javascript].requests, 1);
    assert_eq!(page.content_types[&ContentType::Image].requests, 1);
    assert_eq!(page.content_types[&ContentType::Image].content_size, 43);
    assert_eq!(page.content_types[&ContentType::Font].requests, 0);

    // Only the stylesheet is a large uncompressed text response
    assert_eq!(page.missing_compression, 1);

    let expires = page.expire_stats.unwrap();
    assert_eq!(expires.min, 0);
    assert_eq!(expires.median, 0);
    assert_eq!(expires.max, 31536000);

    let cookies = page.cookie_stats.unwrap();
    assert_eq!(cookies.max, 2);
    assert!(page.last_modified_stats.is_none());

    assert!(page.assets.is_empty());
    assert!(page.first_party.is_none());
}

/// Test the redirect from http to https is resolved
#[test]
fn test_convert_har_resolves_redirects() {
    let pages =
        pagexray_cli::commands::convert::convert_har(&fixture_path("sample.har"), false, None)
            .unwrap();
    let page = &pages[0];

    assert_eq!(page.final_url, "https://www.example.com/");
    assert_eq!(page.base_domain, "www.example.com");
    assert_eq!(page.document_redirects, 1);
    assert_eq!(
        page.redirect_chain,
        vec!["http://www.example.com/", "https://www.example.com/"]
    );
    // Protocol comes from the redirect target, not the first request
    assert_eq!(page.http_version, HttpVersion::Http2);
    assert_eq!(page.http_type, ConnectionType::H2);
}

/// Test first/third-party split and asset retention
#[test]
fn test_convert_har_with_first_party_and_assets() {
    let pages = pagexray_cli::commands::convert::convert_har(
        &fixture_path("sample.har"),
        true,
        Some(r"example\.com"),
    )
    .unwrap();
    let page = &pages[0];

    assert_eq!(page.assets.len(), 6);
    let pixel = page
        .assets
        .iter()
        .find(|asset| asset.url.ends_with("pixel.gif"))
        .unwrap();
    assert_eq!(pixel.content_size, 43);
    assert_eq!(pixel.header_size, -1);

    let first = page.first_party.as_ref().unwrap();
    let third = page.third_party.as_ref().unwrap();
    assert_eq!(first.totals.requests, 5);
    assert_eq!(third.totals.requests, 1);
    assert_eq!(third.totals.transfer_size, 43);
    assert_eq!(first.cookie_stats.unwrap().max, 2);
}

/// Test an invalid first-party regex is reported
#[test]
fn test_convert_har_invalid_first_party() {
    let result = pagexray_cli::commands::convert::convert_har(
        &fixture_path("sample.har"),
        false,
        Some("(unclosed"),
    );
    assert!(result.is_err());
}

/// Test WebPageTest metrics are attached
#[test]
fn test_convert_webpagetest_har() {
    let pages =
        pagexray_cli::commands::convert::convert_har(&fixture_path("webpagetest.har"), false, None)
            .unwrap();
    assert_eq!(pages.len(), 1);

    let visual = pages[0].visual_metrics.as_ref().unwrap();
    assert_eq!(visual["SpeedIndex"], 1120);
    assert_eq!(visual["FirstVisualChange"], 700);
    assert_eq!(visual["VisualComplete85"], 1300);
    assert_eq!(visual["LastVisualChange"], 2400);

    let cpu = pages[0].cpu.as_ref().unwrap();
    assert_eq!(cpu["EvaluateScript"], 310);
    assert_eq!(cpu.len(), 3);
    assert_eq!(pages[0].missing_compression, 1);
}

/// Test JSON output written to a file
#[test]
fn test_execute_writes_json_file() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("pages.json");

    let result = pagexray_cli::commands::convert::execute(
        &fixture_path("sample.har"),
        false,
        None,
        Some(output.clone()),
        OutputFormat::Json,
    );
    assert!(result.is_ok(), "Should write output file");

    let content = std::fs::read_to_string(&output).unwrap();
    let json: serde_json::Value = serde_json::from_str(&content).unwrap();
    let pages = json.as_array().unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0]["finalUrl"], "https://www.example.com/");
    assert_eq!(pages[0]["documentRedirects"], 1);
    assert_eq!(pages[0]["requests"], 6);
    assert_eq!(pages[0]["contentTypes"]["css"]["requests"], 1);
    assert_eq!(pages[0]["responseCodes"]["404"], 1);
}

/// Test the binary prints JSON to stdout
#[test]
fn test_binary_json_output() {
    let mut cmd = Command::cargo_bin("pagexray").unwrap();
    cmd.arg("convert").arg(fixture_path("sample.har"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"finalUrl\": \"https://www.example.com/\""))
        .stdout(predicate::str::contains("\"totalDomains\": 3"));
}

/// Test the pretty report
#[test]
fn test_binary_pretty_output() {
    let mut cmd = Command::cargo_bin("pagexray").unwrap();
    cmd.arg("--format")
        .arg("pretty")
        .arg("convert")
        .arg(fixture_path("sample.har"))
        .arg("--first-party")
        .arg(r"example\.com");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("http://www.example.com/"))
        .stdout(predicate::str::contains("First Party:"))
        .stdout(predicate::str::contains("min 0 / median 0 / max 31536000"));
}

/// Test progress from the library is logged at the default level
#[test]
fn test_binary_logs_conversion_summary() {
    let mut cmd = Command::cargo_bin("pagexray").unwrap();
    cmd.arg("convert").arg(fixture_path("sample.har"));

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Converted 7 entries into 2 pages"));
}

/// Test a missing file fails with a non-zero exit code
#[test]
fn test_binary_missing_file() {
    let mut cmd = Command::cargo_bin("pagexray").unwrap();
    cmd.arg("convert").arg(fixture_path("does-not-exist.har"));

    cmd.assert().failure();
}
