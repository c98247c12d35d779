use std::io::Write;
use std::process::Command;

fn wrapper() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ravellobmc-wrap"))
}

#[test]
fn missing_token_prints_usage() {
    let output = wrapper().output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Please specify a ephemeral token."),
        "stdout was: {stdout}"
    );
}

#[test]
fn unreadable_identity_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = wrapper()
        .arg("eph-token")
        .arg("--vm-json")
        .arg(dir.path().join("vm.json"))
        .env("RUST_LOG", "off")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("vm.json"), "stderr was: {stderr}");
}

#[test]
fn unknown_application_prints_warning() {
    let server = httpmock::MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(httpmock::Method::GET).path("/applications/7");
        then.status(404);
    });
    let mut vm_json = tempfile::NamedTempFile::new().unwrap();
    write!(vm_json, r#"{{"appId": 7}}"#).unwrap();

    let output = wrapper()
        .arg("eph-token")
        .arg("--vm-json")
        .arg(vm_json.path())
        .arg("--api-url")
        .arg(server.base_url())
        .arg("--pkill-path")
        .arg("true")
        .env("RUST_LOG", "off")
        .output()
        .unwrap();

    mock.assert_hits(1);
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, "Warning, application ID 7 is not in Ravello.\n");
}
