//! Runs the compiled demo binary and checks its exit behavior.

use std::ffi::OsStr;
use std::process::{Command, Output};

fn command(dir: &tempfile::TempDir) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_keystone-demo"));
    command
        .current_dir(dir.path())
        .env_remove("PORT")
        .env_remove("DOCS")
        .env_remove("LOG_LEVEL");
    command
}

fn demo<S: AsRef<OsStr>>(args: &[S]) -> Output {
    let dir = tempfile::tempdir().unwrap();
    command(&dir).args(args).output().unwrap()
}

#[test]
fn test_unrecognized_flag_exits_one() {
    let output = demo(&["--bogus=1"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unrecognized command line argument: --bogus=1"));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_docs_to_stdout() {
    let output = demo(&["--docs=-", "--rootpath=/demo"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("# API `/demo`"));
    assert!(stdout.contains("## GET /demo/count/:first/:last"));
    assert!(stdout.contains("## GET /demo/die/:code"));
    assert!(stdout.contains("## GET /demo/passthrough/:first/:last"));
}

#[test]
fn test_docs_to_file_creates_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("api.md");
    let flag = format!("--docs={}", target.display());

    let output = demo(&[flag.as_str()]);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "");
}

#[test]
fn test_docs_to_unwritable_file_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("missing").join("api.md");
    let flag = format!("--docs={}", target.display());

    let output = demo(&[flag.as_str()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("could not write docs"));
}

#[test]
fn test_bad_port_exits_one() {
    let output = demo(&["--port=70000"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("port 70000 is out of range"));
}

#[cfg(unix)]
#[test]
fn test_non_utf8_positional_argument_is_ignored() {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;

    let output = demo(&[
        OsString::from("--docs=-"),
        OsString::from_vec(b"positional\xff".to_vec()),
    ]);

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("# API `/`"));
}

#[cfg(unix)]
#[test]
fn test_sigterm_exits_zero() {
    use std::io::{BufRead, BufReader};
    use std::process::Stdio;
    use std::time::{Duration, Instant};

    let dir = tempfile::tempdir().unwrap();
    let mut child = command(&dir)
        .args(["--port=0", "--log-json=true"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let mut lines = BufReader::new(child.stdout.take().unwrap()).lines();
    let started = lines
        .by_ref()
        .map_while(Result::ok)
        .any(|line| line.contains("starting keystone demo"));
    assert!(started, "demo did not start");
    let drain = std::thread::spawn(move || lines.for_each(drop));

    let status = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() > deadline {
            child.kill().unwrap();
            panic!("demo still running after SIGTERM");
        }
        std::thread::sleep(Duration::from_millis(50));
    };
    assert_eq!(status.code(), Some(0));
    drain.join().unwrap();
}
