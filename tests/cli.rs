use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

fn write_config(dir: &Path, github_block: &str) -> PathBuf {
    let path = dir.join("ghaudit.yaml");
    let contents = format!(
        "github:\n{github_block}queue:\n  path: {queue}\n  max_eps: 50\nstate:\n  dir: {state}\n",
        queue = dir.join("queue").display(),
        state = dir.join("state").display(),
    );
    fs::write(&path, contents).expect("failed to write config");
    path
}

const ENABLED: &str = r#"  enabled: "yes"
  run_on_start: "yes"
  interval: 10m
  time_delay: 1s
  only_future_events: "no"
  api_auth:
    - org_name: test_org
      api_token: test_token
  api_parameters:
    event_type: git
"#;

fn ghaudit() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ghaudit"));
    cmd.env_remove("GHAUDIT_CONFIG")
        .env_remove("GHAUDIT_API_URL")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn dump_prints_module_configuration() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let config_path = write_config(temp.path(), ENABLED);

    ghaudit()
        .arg("dump")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#"{"github":{"enabled":"yes","run_on_start":"yes","only_future_events":"no","interval":600,"time_delay":1,"api_auth":[{"org_name":"test_org","api_token":"test_token"}],"event_type":"git"}}"#,
        ));

    Ok(())
}

#[test]
fn check_accepts_valid_configuration() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let config_path = write_config(temp.path(), ENABLED);

    ghaudit()
        .arg("check")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration OK"))
        .stdout(predicate::str::contains("test_org"));

    Ok(())
}

#[test]
fn check_rejects_missing_credentials() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let config_path = write_config(temp.path(), "  enabled: \"yes\"\n");

    ghaudit()
        .arg("check")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Empty content for tag 'api_auth'"));

    Ok(())
}

#[test]
fn check_rejects_unknown_tag() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let block = format!("{ENABLED}  fake_tag: \"yes\"\n");
    let config_path = write_config(temp.path(), &block);

    ghaudit()
        .arg("check")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No such tag 'fake_tag'"));

    Ok(())
}

/// Test that missing config file shows an actionable error message.
#[test]
fn missing_config_shows_helpful_error() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let nonexistent_config = temp.path().join("does-not-exist.yaml");

    ghaudit()
        .arg("check")
        .arg("--config")
        .arg(&nonexistent_config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));

    Ok(())
}

#[test]
fn config_path_from_environment() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let config_path = write_config(temp.path(), ENABLED);

    ghaudit()
        .arg("dump")
        .env("GHAUDIT_CONFIG", &config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""event_type":"git""#));

    Ok(())
}

#[test]
fn run_disabled_module_exits_cleanly() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let block = ENABLED.replace(r#"enabled: "yes""#, r#"enabled: "no""#);
    let config_path = write_config(temp.path(), &block);

    ghaudit()
        .arg("run")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("Module GitHub disabled."));

    Ok(())
}

#[test]
fn run_without_queue_is_fatal() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let config_path = write_config(temp.path(), ENABLED);

    let assert = ghaudit()
        .arg("run")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .failure();

    let stderr = String::from_utf8_lossy(&assert.get_output().stderr);
    let started = stderr.find("Module GitHub started.").expect("started line");
    let closing = stderr
        .find("Can't connect to queue. Closing module.")
        .expect("closing line");
    assert!(started < closing);

    Ok(())
}

#[cfg(unix)]
mod bus {
    use super::*;
    use std::os::unix::net::UnixDatagram;
    use std::time::Duration;

    fn bind_queue(dir: &Path) -> UnixDatagram {
        let socket = UnixDatagram::bind(dir.join("queue")).expect("failed to bind queue");
        socket
            .set_read_timeout(Some(Duration::from_millis(500)))
            .expect("failed to set timeout");
        socket
    }

    fn stored_cursor(dir: &Path) -> Option<i64> {
        let conn = rusqlite::Connection::open(dir.join("state").join("state.db")).ok()?;
        conn.query_row(
            "SELECT last_window_end FROM cursors WHERE state_key = 'github-test_org'",
            [],
            |row| row.get(0),
        )
        .ok()
    }

    #[test]
    fn scan_forwards_events_and_stores_cursor() -> Result<(), Box<dyn std::error::Error>> {
        let mut server = mockito::Server::new();
        let audit = server
            .mock("GET", "/orgs/test_org/audit-log")
            .match_header("authorization", "token test_token")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("include".into(), "git".into()),
                mockito::Matcher::UrlEncoded("order".into(), "asc".into()),
            ]))
            .with_status(200)
            .with_body(r#"[{"action":"git.clone","actor":"octocat"}]"#)
            .create();

        let temp = tempdir()?;
        let queue = bind_queue(temp.path());
        let config_path = write_config(temp.path(), ENABLED);

        ghaudit()
            .arg("scan")
            .arg("--config")
            .arg(&config_path)
            .env("GHAUDIT_API_URL", server.url())
            .assert()
            .success();

        audit.assert();

        let mut buf = vec![0u8; 65536];
        let n = queue.recv(&mut buf)?;
        let frame = String::from_utf8_lossy(&buf[..n]).to_string();
        let message = frame
            .strip_prefix("1:github:")
            .expect("frame should carry the bus header");

        let parsed: serde_json::Value = serde_json::from_str(message)?;
        assert_eq!(parsed["github"]["source"], "github");
        assert_eq!(parsed["github"]["organization"], "test_org");
        assert_eq!(parsed["github"]["action"], "git.clone");
        assert_eq!(parsed["github"]["actor"], "octocat");

        // Exactly one event
        assert!(queue.recv(&mut buf).is_err());
        assert!(stored_cursor(temp.path()).is_some());

        Ok(())
    }

    #[test]
    fn scan_initial_only_sets_baseline() -> Result<(), Box<dyn std::error::Error>> {
        let mut server = mockito::Server::new();
        let audit = server
            .mock("GET", "/orgs/test_org/audit-log")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .expect(0)
            .create();

        let temp = tempdir()?;
        let _queue = bind_queue(temp.path());
        let config_path = write_config(temp.path(), ENABLED);

        ghaudit()
            .arg("scan")
            .arg("--initial")
            .arg("--config")
            .arg(&config_path)
            .env("GHAUDIT_API_URL", server.url())
            .assert()
            .success();

        audit.assert();
        assert!(stored_cursor(temp.path()).is_some());

        Ok(())
    }

    #[test]
    fn scan_error_status_sends_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let mut server = mockito::Server::new();
        let _audit = server
            .mock("GET", "/orgs/test_org/audit-log")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .with_body(r#"{"message":"Bad credentials"}"#)
            .create();

        let temp = tempdir()?;
        let queue = bind_queue(temp.path());
        let config_path = write_config(temp.path(), ENABLED);

        ghaudit()
            .arg("scan")
            .arg("--config")
            .arg(&config_path)
            .env("GHAUDIT_API_URL", server.url())
            .assert()
            .success();

        let mut buf = vec![0u8; 4096];
        assert!(queue.recv(&mut buf).is_err());
        // Baseline was written before the fetch
        assert!(stored_cursor(temp.path()).is_some());

        Ok(())
    }

    #[test]
    fn scan_follows_next_links() -> Result<(), Box<dyn std::error::Error>> {
        let mut server = mockito::Server::new();
        let next = format!("{}/next-page", server.url());
        let _first = server
            .mock("GET", "/orgs/test_org/audit-log")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("link", &format!(r#"<{next}>; rel="next""#))
            .with_body(r#"[{"n":1}]"#)
            .create();
        let second = server
            .mock("GET", "/next-page")
            .with_status(200)
            .with_body(r#"[{"n":2}]"#)
            .create();

        let temp = tempdir()?;
        let queue = bind_queue(temp.path());
        let config_path = write_config(temp.path(), ENABLED);

        ghaudit()
            .arg("scan")
            .arg("--config")
            .arg(&config_path)
            .env("GHAUDIT_API_URL", server.url())
            .assert()
            .success();

        second.assert();

        let mut buf = vec![0u8; 4096];
        let mut order = Vec::new();
        for _ in 0..2 {
            let n = queue.recv(&mut buf)?;
            let frame = String::from_utf8_lossy(&buf[..n]).to_string();
            let parsed: serde_json::Value =
                serde_json::from_str(frame.trim_start_matches("1:github:"))?;
            order.push(parsed["github"]["n"].as_i64());
        }
        assert_eq!(order, vec![Some(1), Some(2)]);

        Ok(())
    }
}
