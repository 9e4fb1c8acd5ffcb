//! Command-line behaviour of the blogconv binary
//!
//! Runs the built binary against the fixtures and checks exit codes, what
//! lands on stdout and what lands on stderr.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use tempfile::tempdir;

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
        .display()
        .to_string()
}

fn run_blogconv(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_blogconv"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute blogconv")
}

fn run_blogconv_with_stdin(args: &[&str], stdin_data: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_blogconv"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn blogconv");

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(stdin_data.as_bytes())
            .expect("Failed to write to stdin");
    }

    child.wait_with_output().expect("Failed to wait on child")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

mod discovery {
    use super::*;

    #[test]
    fn test_list_platforms() {
        let output = run_blogconv(&["--list-platforms"]);
        assert!(output.status.success());

        let listing = stdout(&output);
        for name in ["wordpress", "ghost", "jekyll"] {
            assert!(listing.contains(name), "missing {} in: {}", name, listing);
        }
    }

    #[test]
    fn test_show_template_is_a_loadable_document() {
        let output = run_blogconv(&["--show-template", "ghost"]);
        assert!(output.status.success());

        let document: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
        assert_eq!(document["name"], "Ghost");
        assert_eq!(document["item_tag"], "post");
        assert_eq!(document["field_mappings"]["content"], "html");

        // The printed document works as a custom template
        let dir = tempdir().unwrap();
        let path = dir.path().join("ghost.json");
        fs::write(&path, stdout(&output)).unwrap();
        let output = run_blogconv(&[
            &fixture("sample_ghost.xml"),
            "--template",
            path.to_str().unwrap(),
            "--stats",
        ]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
    }

    #[test]
    fn test_show_unknown_template() {
        let output = run_blogconv(&["--show-template", "medium"]);
        assert!(!output.status.success());
        assert!(stderr(&output).contains("medium"));
    }
}

mod conversion {
    use super::*;

    #[test]
    fn test_convert_to_file_with_report() {
        let dir = tempdir().unwrap();
        let csv = dir.path().join("out/posts.csv");
        let report = dir.path().join("report.json");

        let output = run_blogconv(&[
            &fixture("sample_wordpress.xml"),
            "-o",
            csv.to_str().unwrap(),
            "--report",
            report.to_str().unwrap(),
        ]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert!(stdout(&output).is_empty());

        let written = fs::read_to_string(&csv).unwrap();
        assert!(written.starts_with("Title,Slug,Content,Excerpt,Author,Published Date,"));
        assert_eq!(written.matches("\r\n").count(), 4);

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
        assert_eq!(json["platform"], "WordPress");
        assert_eq!(json["state"], "completed");
        assert_eq!(json["converted"], 3);
    }

    #[test]
    fn test_convert_to_stdout() {
        let output = run_blogconv(&[&fixture("sample_jekyll.xml"), "--platform", "jekyll", "-q"]);
        assert!(output.status.success());

        let csv = stdout(&output);
        assert!(csv.contains("Static Sites Are Back"));
        assert!(csv.contains("notes-on-liquid"));
    }

    #[test]
    fn test_convert_from_stdin() {
        let export = fs::read_to_string(fixture("sample_ghost.xml")).unwrap();
        let output = run_blogconv_with_stdin(&["-", "--delimiter", "tab", "-q"], &export);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let csv = stdout(&output);
        assert!(csv.starts_with("Title\tSlug\tContent"));
        assert!(csv.contains("https://cdn.example.com/theme.png"));
    }

    #[test]
    fn test_truncated_export_fails_with_partial_output() {
        let dir = tempdir().unwrap();
        let export = fs::read_to_string(fixture("sample_wordpress.xml")).unwrap();
        let cut = export.rfind("<item>").unwrap();
        let input = dir.path().join("truncated.xml");
        fs::write(&input, &export[..cut + 20]).unwrap();
        let csv = dir.path().join("posts.csv");

        let output = run_blogconv(&[input.to_str().unwrap(), "-o", csv.to_str().unwrap()]);
        assert_eq!(output.status.code(), Some(1));
        assert!(stderr(&output).contains("XML parse error"));

        // The two complete posts were written before the failure
        let written = fs::read_to_string(&csv).unwrap();
        assert_eq!(written.matches("\r\n").count(), 3);
    }
}

mod inspection {
    use super::*;

    #[test]
    fn test_preview_limits_records() {
        let output = run_blogconv(&[&fixture("sample_wordpress.xml"), "--preview", "2"]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let text = stdout(&output);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("#1 hello-world [Published] 2024-01-15 alice"));
        assert!(lines[1].starts_with("#2 hello-world-2 [Draft]"));
    }

    #[test]
    fn test_stats_writes_no_csv() {
        let output = run_blogconv(&[&fixture("sample_ghost.xml"), "--stats"]);
        assert!(output.status.success());

        let text = stdout(&output);
        assert!(text.contains("Ghost"));
        assert!(text.contains("1 published, 1 draft"));
        assert!(!text.contains("Title,Slug"));
    }
}

mod errors {
    use super::*;

    #[test]
    fn test_unknown_platform() {
        let output = run_blogconv(&[&fixture("sample_wordpress.xml"), "--platform", "medium"]);
        assert_eq!(output.status.code(), Some(1));

        let message = stderr(&output);
        assert!(message.contains("Unknown platform 'medium'"));
        assert!(message.contains("--list-platforms"));
    }

    #[test]
    fn test_missing_input_file() {
        let output = run_blogconv(&["does/not/exist.xml"]);
        assert_eq!(output.status.code(), Some(1));
        assert!(stderr(&output).contains("exist.xml"));
    }

    #[test]
    fn test_undetectable_document() {
        let output = run_blogconv(&[&fixture("sample_atom.xml")]);
        assert_eq!(output.status.code(), Some(1));
        assert!(stderr(&output).contains("--platform or --template"));
    }

    #[test]
    fn test_failed_detection_still_writes_report() {
        let dir = tempdir().unwrap();
        let report = dir.path().join("report.json");

        let output = run_blogconv(&[
            &fixture("sample_atom.xml"),
            "--stats",
            "--report",
            report.to_str().unwrap(),
        ]);
        assert_eq!(output.status.code(), Some(1));

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["mode"], "stats");
        assert_eq!(json["total_items"], 0);
        assert!(json["failure"].as_str().unwrap().contains("Could not detect platform"));
    }

    #[test]
    fn test_no_input() {
        let output = run_blogconv(&[]);
        assert!(!output.status.success());
        assert!(stderr(&output).contains("No input provided"));
    }
}
