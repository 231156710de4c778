//! Integration tests for the `downpour` binary.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn downpour_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_downpour"))
}

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("downpour/tests/fixtures")
}

fn temp_out(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("downpour-cli-test").join(name);
    // Clean up from previous runs
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn run_in(dir: &PathBuf, args: &[&str]) -> Output {
    Command::new(downpour_bin())
        .current_dir(dir)
        .args(args)
        .output()
        .expect("failed to run downpour")
}

fn run_with_stdin(dir: &PathBuf, args: &[&str], input: &str) -> Output {
    let mut child = Command::new(downpour_bin())
        .current_dir(dir)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn downpour");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().expect("failed to wait for downpour")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn render_file_to_stdout() {
    let dir = temp_out("render-file");
    fs::write(dir.join("doc.md"), "# Hello\n\nSome *text*.\n").unwrap();

    let output = run_in(&dir, &["render", "doc.md"]);
    assert!(output.status.success(), "render should succeed");
    assert_eq!(stdout(&output), "<h1>Hello</h1>\n\n<p>Some <em>text</em>.</p>\n");
}

#[test]
fn render_stdin_with_extension_and_output_file() {
    let dir = temp_out("render-stdin");
    let output = run_with_stdin(
        &dir,
        &["render", "-", "--ext", "strikethrough", "--output", "out.html"],
        "~~old~~ new\n",
    );
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert_eq!(
        fs::read_to_string(dir.join("out.html")).unwrap(),
        "<p><del>old</del> new</p>\n"
    );
}

#[test]
fn render_flags_from_config_file() {
    let dir = temp_out("render-config");
    fs::write(
        dir.join("downpour.json"),
        r#"{ "extensions": ["autolink"], "render": ["smartypants"] }"#,
    )
    .unwrap();

    let output = run_with_stdin(&dir, &["render", "-"], "It's at http://axr.vg/\n");
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "<p>It&rsquo;s at <a href=\"http://axr.vg/\">http://axr.vg/</a></p>\n"
    );
}

#[test]
fn render_tree_prints_json() {
    let dir = temp_out("render-tree");
    let output = run_with_stdin(&dir, &["render", "-", "--format", "tree"], "# Title\n");
    assert!(output.status.success());

    let tree: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(tree["blocks"][0]["kind"], "Header");
    assert_eq!(tree["blocks"][0]["level"], 1);
}

#[test]
fn unknown_extension_fails() {
    let dir = temp_out("render-unknown");
    let output = run_with_stdin(&dir, &["render", "-", "--ext", "frobnicate"], "x\n");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("frobnicate"), "stderr: {stderr}");
}

#[test]
fn invalid_utf8_input_fails() {
    let dir = temp_out("render-utf8");
    fs::write(dir.join("bad.md"), b"ok \xff\n").unwrap();
    let output = run_in(&dir, &["render", "bad.md"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not valid UTF-8"), "stderr: {stderr}");
}

#[test]
fn build_mirrors_directory_tree() {
    let dir = temp_out("build-tree");
    let src = dir.join("src");
    fs::create_dir_all(src.join("guide")).unwrap();
    fs::write(src.join("index.md"), "# Home\n").unwrap();
    fs::write(src.join("guide/intro.markdown"), "Intro\n").unwrap();
    fs::write(src.join("notes.txt"), "skip me\n").unwrap();

    let out = dir.join("site");
    let status = Command::new(downpour_bin())
        .current_dir(&dir)
        .args(["build", src.to_str().unwrap(), "--out", out.to_str().unwrap(), "--quiet"])
        .status()
        .expect("failed to run downpour build");
    assert!(status.success(), "downpour build should succeed");

    assert_eq!(
        fs::read_to_string(out.join("index.html")).unwrap(),
        "<h1>Home</h1>\n"
    );
    assert_eq!(
        fs::read_to_string(out.join("guide/intro.html")).unwrap(),
        "<p>Intro</p>\n"
    );
    assert!(!out.join("notes.html").exists());

    let second = run_in(
        &dir,
        &["build", src.to_str().unwrap(), "--out", out.to_str().unwrap()],
    );
    assert!(second.status.success());
    assert!(stdout(&second).contains("2 unchanged"), "got {}", stdout(&second));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn conform_passes_on_library_fixtures() {
    let dir = temp_out("conform-pass");
    let output = run_in(&dir, &["conform", fixtures().to_str().unwrap()]);
    assert!(output.status.success(), "stdout: {}", stdout(&output));
    assert!(stdout(&output).contains("OK"));
}

#[test]
fn conform_fails_on_mismatch() {
    let dir = temp_out("conform-fail");
    fs::write(dir.join("case.text"), "*a*\n").unwrap();
    fs::write(dir.join("case.html"), "<p><strong>a</strong></p>\n").unwrap();

    let output = run_in(&dir, &["conform", "."]);
    assert!(!output.status.success());
    assert!(stdout(&output).contains("FAIL"));
}

#[test]
fn smartypants_command() {
    let dir = temp_out("smartypants");
    let output = run_with_stdin(
        &dir,
        &["smartypants", "-"],
        "<p>\"Wait...\" -- she didn't.</p>\n",
    );
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "<p>&ldquo;Wait&hellip;&rdquo; &ndash; she didn&rsquo;t.</p>\n"
    );
}
