use assert_cmd::Command;
use assert_cmd::cargo;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

const LOCAL_MANIFEST: &str = r#"{
    "name": "local",
    "module": "Demo",
    "priority": 10,
    "packages": [
        {"name": "zlib", "version": "1.2", "source": "main", "installed": true},
        {"name": "zlib", "version": "1.3", "source": "main"},
        {"name": "zlib", "version": "2.0.0-rc.1", "source": "main"},
        {"name": "openssl", "version": "3.0.1", "source": "edge"}
    ],
    "sources": [
        {"name": "main", "location": "https://main.example.com", "trusted": true},
        {"name": "edge", "location": "https://edge.example.com"}
    ]
}"#;

const REMOTE_MANIFEST: &str = r#"{
    "name": "remote",
    "packages": [
        {"name": "curl", "version": "8.5.0", "source": "mirror"}
    ],
    "sources": [
        {"name": "mirror", "location": "https://mirror.example.com", "trusted": true}
    ]
}"#;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "{}").unwrap();
        std::fs::write(dir.path().join("local.json"), LOCAL_MANIFEST).unwrap();
        std::fs::write(dir.path().join("remote.json"), REMOTE_MANIFEST).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Command with an isolated config and both manifests registered.
    fn cmd(&self) -> Command {
        let mut cmd = self.bare_cmd(&self.path("config.json"));
        cmd.arg("--manifest")
            .arg(self.path("local.json"))
            .arg("--manifest")
            .arg(self.path("remote.json"));
        cmd
    }

    fn bare_cmd(&self, config: &Path) -> Command {
        let mut cmd = Command::new(cargo::cargo_bin!("pkgprov"));
        cmd.env("PKGPROV_CONFIG", config)
            .env_remove("PKGPROV_INCLUDE_PRERELEASE");
        cmd
    }
}

#[test]
fn test_find_across_providers() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["find", "zlib", "curl"])
        .assert()
        .success()
        .stdout(predicates::str::contains("zlib 1.2 main Demo\\local"))
        .stdout(predicates::str::contains("zlib 1.3 main Demo\\local"))
        .stdout(predicates::str::contains("curl 8.5.0 mirror remote"))
        .stdout(predicates::str::contains("2.0.0-rc.1").not());
}

#[test]
fn test_find_with_prerelease_and_range() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["find", "zlib", "--prerelease", "--version", "[1.3,)"])
        .assert()
        .success()
        .stdout(predicates::str::contains("zlib 1.3"))
        .stdout(predicates::str::contains("zlib 2.0.0-rc.1"))
        .stdout(predicates::str::contains("zlib 1.2").not());
}

#[test]
fn test_find_missing_package_reports_not_found() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["find", "left-pad"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("No match was found for package 'left-pad'"));
}

#[test]
fn test_find_wildcard_without_matches_succeeds() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["find", "left-*"])
        .assert()
        .success()
        .stdout(predicates::str::is_empty());
}

#[test]
fn test_find_json_output() {
    let fixture = Fixture::new();
    let output = fixture
        .cmd()
        .args(["--json", "find", "curl"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let line: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(line["kind"], "package");
    assert_eq!(line["name"], "curl");
    assert_eq!(line["version"], "8.5.0");
    assert_eq!(line["provider"], "remote");
}

#[test]
fn test_providers_listing() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .arg("providers")
        .assert()
        .success()
        .stdout(predicates::str::contains("Demo\\local 10 find, get, install, get-source"))
        .stdout(predicates::str::contains("remote 100"));

    fixture
        .cmd()
        .args(["providers", "demo\\*"])
        .assert()
        .success()
        .stdout(predicates::str::contains("remote").not());

    fixture
        .cmd()
        .args(["providers", "--operation", "uninstall"])
        .assert()
        .success()
        .stdout(predicates::str::is_empty());
}

#[test]
fn test_install_from_trusted_source() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["install", "zlib"])
        .assert()
        .success()
        .stdout(predicates::str::contains("zlib 1.3 main Demo\\local"));
}

#[test]
fn test_install_from_untrusted_source_confirmed() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["install", "openssl"])
        .write_stdin("y\n")
        .assert()
        .success()
        .stderr(predicates::str::contains("untrusted source 'edge'"))
        .stdout(predicates::str::contains("openssl 3.0.1 edge Demo\\local"));
}

#[test]
fn test_install_from_untrusted_source_declined() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["install", "openssl"])
        .write_stdin("n\n")
        .assert()
        .failure()
        .stderr(predicates::str::contains("is not trusted"))
        .stderr(predicates::str::contains("No match was found for package 'openssl'"));
}

#[test]
fn test_install_with_trust_flag_skips_prompt() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["install", "openssl", "--trust"])
        .assert()
        .success()
        .stderr(predicates::str::contains("untrusted source").not())
        .stdout(predicates::str::contains("openssl 3.0.1"));
}

#[test]
fn test_install_unknown_provider() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["install", "zlib", "--provider", "nuget"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("No provider named 'nuget'"));
}

#[test]
fn test_trusted_sources_from_config() {
    let fixture = Fixture::new();
    let config = fixture.path("trusting.json");
    std::fs::write(&config, r#"{"trusted_sources": {"local": ["edge"]}}"#).unwrap();

    fixture
        .bare_cmd(&config)
        .arg("--manifest")
        .arg(fixture.path("local.json"))
        .args(["install", "openssl"])
        .assert()
        .success()
        .stderr(predicates::str::contains("untrusted source").not());
}

#[test]
fn test_sources_listing() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .arg("sources")
        .assert()
        .success()
        .stdout(predicates::str::contains("main https://main.example.com trusted Demo\\local"))
        .stdout(predicates::str::contains("edge https://edge.example.com untrusted Demo\\local"))
        .stdout(predicates::str::contains("mirror https://mirror.example.com trusted remote"));

    fixture
        .cmd()
        .args(["sources", "nowhere"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("Unable to find package source 'nowhere'"));
}

#[test]
fn test_version_compare() {
    let fixture = Fixture::new();
    let cases = [
        ("1.0", "1.0.0", "1.0 = 1.0.0"),
        ("1.0.0.1", "1.0.0", "1.0.0.1 > 1.0.0"),
        ("1.0-alpha", "1.0", "1.0-alpha < 1.0"),
        ("1.0a", "1.0", "1.0a > 1.0"),
        ("beta", "99.0", "beta > 99.0"),
    ];
    for (left, right, expected) in cases {
        fixture
            .bare_cmd(&fixture.path("config.json"))
            .args(["version", "compare", left, right])
            .assert()
            .success()
            .stdout(predicates::str::contains(expected));
    }
}

#[test]
fn test_version_range() {
    let fixture = Fixture::new();
    fixture
        .bare_cmd(&fixture.path("config.json"))
        .args(["version", "range", "[1.0,2.0)", "1.9", "2.0"])
        .assert()
        .success()
        .stdout(predicates::str::contains("1.9 [1.0,2.0) true"))
        .stdout(predicates::str::contains("2.0 [1.0,2.0) false"));

    fixture
        .bare_cmd(&fixture.path("config.json"))
        .args(["version", "range", "1.0", "1.0", "1.0.1"])
        .assert()
        .success()
        .stdout(predicates::str::contains("1.0.1 [1.0] false"));

    fixture
        .bare_cmd(&fixture.path("config.json"))
        .args(["--legacy-range", "version", "range", "1.0", "1.0.1"])
        .assert()
        .success()
        .stdout(predicates::str::contains("1.0.1 [1.0,) true"));
}

#[test]
fn test_version_range_rejects_inverted() {
    let fixture = Fixture::new();
    fixture
        .bare_cmd(&fixture.path("config.json"))
        .args(["version", "range", "[2.0,1.0]", "1.5"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("Inverted version range"));
}
