//! Tests for the registry manifest schema.

use super::*;
use rstest::{fixture, rstest};
use serde_json::Value;
use tempfile::TempDir;

const BINARY_URL: &str = "https://bin.example.test/acme/terraform-provider-kubernetes/";

#[fixture]
fn name() -> ArtefactName {
    "terraform-provider-kubernetes_1.2.3_linux_amd64.zip"
        .parse()
        .expect("valid archive name")
}

#[fixture]
fn key() -> GpgPublicKey {
    GpgPublicKey::new(
        "370CC41578FC61A73584F324A03728FC9B4B6B85",
        "-----BEGIN PGP PUBLIC KEY BLOCK-----\n\nmQ\n-----END PGP PUBLIC KEY BLOCK-----\n",
        "Acme Releases <releases@example.test>",
        "https://www.hashicorp.com/security.html",
    )
}

#[fixture]
fn manifest(name: ArtefactName, key: GpgPublicKey) -> Manifest {
    Manifest::new(&name, &Sha256Digest::of_bytes(b"archive"), BINARY_URL, key)
}

#[rstest]
fn urls_are_derived_from_binary_host(manifest: Manifest) {
    assert_eq!(
        manifest.download_url,
        format!("{BINARY_URL}1.2.3/terraform-provider-kubernetes_1.2.3_linux_amd64.zip")
    );
    assert_eq!(
        manifest.shasums_url,
        format!("{BINARY_URL}1.2.3/terraform-provider-kubernetes_1.2.3_SHA256SUMS")
    );
    assert_eq!(
        manifest.shasums_signature_url,
        format!("{BINARY_URL}1.2.3/terraform-provider-kubernetes_1.2.3_SHA256SUMS.sig")
    );
    assert_eq!(
        manifest.filename,
        "terraform-provider-kubernetes_1.2.3_linux_amd64.zip"
    );
}

#[rstest]
fn protocols_and_platform_fields(manifest: Manifest) {
    assert_eq!(manifest.protocols, ["4.0", "5.0"]);
    assert_eq!(manifest.os, "linux");
    assert_eq!(manifest.arch, "amd64");
}

#[rstest]
fn key_entry_has_empty_trust_signature(manifest: Manifest) {
    let keys = &manifest.signing_keys.gpg_public_keys;
    assert_eq!(keys.len(), 1);
    assert!(keys.iter().all(|k| k.trust_signature.is_empty()));
}

#[rstest]
fn json_keys_follow_registry_order(manifest: Manifest) {
    let json = manifest.to_json().expect("serialize");
    let expected = [
        "\"protocols\"",
        "\"os\"",
        "\"arch\"",
        "\"filename\"",
        "\"download_url\"",
        "\"shasums_url\"",
        "\"shasums_signature_url\"",
        "\"shasum\"",
        "\"signing_keys\"",
        "\"gpg_public_keys\"",
        "\"key_id\"",
        "\"ascii_armor\"",
        "\"trust_signature\"",
        "\"source\"",
        "\"source_url\"",
    ];
    let positions: Vec<usize> = expected
        .iter()
        .map(|key| json.find(key).unwrap_or_else(|| panic!("missing {key}")))
        .collect();
    assert!(
        positions.windows(2).all(|w| w.first() < w.last()),
        "keys out of order: {json}"
    );
}

#[rstest]
fn json_uses_four_space_indent_without_trailing_newline(manifest: Manifest) {
    let json = manifest.to_json().expect("serialize");
    assert!(json.starts_with("{\n    \"protocols\": [\n        \"4.0\",\n        \"5.0\"\n    ],"));
    assert!(json.ends_with('}'));
}

#[rstest]
fn json_round_trips_structurally(manifest: Manifest) {
    let json = manifest.to_json().expect("serialize");
    let parsed: Value = serde_json::from_str(&json).expect("valid JSON");
    assert_eq!(parsed["shasum"], Value::from(Sha256Digest::of_bytes(b"archive").as_str()));
    assert_eq!(
        parsed["signing_keys"]["gpg_public_keys"][0]["key_id"],
        "370CC41578FC61A73584F324A03728FC9B4B6B85"
    );

    let back: Manifest = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, manifest);
}

#[rstest]
fn rendering_is_deterministic(name: ArtefactName, key: GpgPublicKey) {
    let digest = Sha256Digest::of_bytes(b"archive");
    let first = Manifest::new(&name, &digest, BINARY_URL, key.clone())
        .to_json()
        .expect("first");
    let second = Manifest::new(&name, &digest, BINARY_URL, key)
        .to_json()
        .expect("second");
    assert_eq!(first, second);
}

#[rstest]
fn index_url_uses_version_os_and_arch(name: ArtefactName) {
    assert_eq!(
        index_url("https://index.example.test/v1/acme/kubernetes/", &name),
        "https://index.example.test/v1/acme/kubernetes/1.2.3/download/linux/amd64"
    );
}

#[rstest]
fn write_manifest_overwrites_existing_file(name: ArtefactName) {
    let dir = TempDir::new().expect("temp dir");
    let dir_path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8");
    let target = dir_path.join("terraform-provider-kubernetes_1.2.3_linux_amd64.json");
    fs::write(&target, "stale").expect("seed");

    let written = write_manifest(&dir_path, &name, "{}").expect("write");

    assert_eq!(written, target);
    assert_eq!(fs::read_to_string(&target).expect("read"), "{}");
}
