use super::*;

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::anyhow;

const HELLO_SHA256: &str = "a948904f2f0f479b8f8197694b30184b0d2ed1c1cd2a1ec0fb85d299a192a447";
const HELLO_MD5: &str = "6f5902ac237024bdd0c176cb93063dc4";
const ARTIFACT: &str = "suiup-Linux-musl-x86_64.tar.gz";
const CHECKSUM_URL: &str =
    "https://github.com/MystenLabs/suiup/releases/download/v1.2.3/suiup-Linux-musl-x86_64.tar.gz.sha256";

fn test_dir(label: &str) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "suiup-init-security-{label}-{}-{nanos}-{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    std::fs::create_dir_all(&dir).expect("must create test dir");
    dir
}

fn hello_file(label: &str) -> (PathBuf, PathBuf) {
    let dir = test_dir(label);
    let path = dir.join(ARTIFACT);
    std::fs::write(&path, b"hello world\n").expect("must write artifact");
    (dir, path)
}

fn builtin_only() -> Vec<Box<dyn HashProvider>> {
    vec![Box::new(BuiltinHasher)]
}

struct FakeHasher {
    name: &'static str,
    available: bool,
    result: Result<String, String>,
    calls: Cell<u32>,
}

impl FakeHasher {
    fn new(name: &'static str, available: bool, result: Result<&str, &str>) -> Self {
        Self {
            name,
            available,
            result: result.map(str::to_string).map_err(str::to_string),
            calls: Cell::new(0),
        }
    }
}

impl HashProvider for FakeHasher {
    fn name(&self) -> &'static str {
        self.name
    }

    fn supports(&self, algorithm: ChecksumAlgorithm) -> bool {
        algorithm == ChecksumAlgorithm::Sha256
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn hash_file(&self, _path: &Path, _algorithm: ChecksumAlgorithm) -> anyhow::Result<String> {
        self.calls.set(self.calls.get() + 1);
        self.result.clone().map_err(|err| anyhow!(err))
    }
}

fn request<'a>(path: &'a Path, checksum_url: Option<&'a str>) -> VerificationRequest<'a> {
    VerificationRequest {
        artifact_path: path,
        artifact_name: ARTIFACT,
        checksum_url,
        skip_all: false,
    }
}

#[test]
fn parse_hash_then_name() {
    let content = format!("{HELLO_SHA256}  {ARTIFACT}\n");
    let record = parse_checksum(&content, Some(ARTIFACT), ChecksumAlgorithm::Sha256)
        .expect("must parse");
    assert_eq!(record.expected_hex, HELLO_SHA256);
    assert_eq!(record.algorithm, ChecksumAlgorithm::Sha256);
}

#[test]
fn parse_is_layout_independent_and_lowercases() {
    let upper = HELLO_SHA256.to_ascii_uppercase();
    let layouts = [
        format!("{upper} {ARTIFACT}"),
        format!("{ARTIFACT} {upper}"),
        upper.clone(),
        format!("{upper} *{ARTIFACT}\n"),
        format!("SHA256 ({ARTIFACT}) = {upper}\n"),
    ];
    for content in layouts {
        let record = parse_checksum(&content, Some(ARTIFACT), ChecksumAlgorithm::Sha256)
            .unwrap_or_else(|err| panic!("{content:?}: {err}"));
        assert_eq!(record.expected_hex, HELLO_SHA256, "{content:?}");
    }
}

#[test]
fn parse_is_idempotent() {
    let content = format!("{HELLO_SHA256}  {ARTIFACT}\n");
    let first = parse_checksum(&content, Some(ARTIFACT), ChecksumAlgorithm::Sha256)
        .expect("must parse");
    let second = parse_checksum(&content, Some(ARTIFACT), ChecksumAlgorithm::Sha256)
        .expect("must parse");
    assert_eq!(first, second);
}

#[test]
fn parse_prefers_line_naming_the_target() {
    let other = "1".repeat(64);
    let content = format!(
        "{other}  suiup-macOS-arm64.tar.gz\n{HELLO_SHA256}  {}\n",
        ARTIFACT.to_ascii_uppercase()
    );
    let record = parse_checksum(&content, Some(ARTIFACT), ChecksumAlgorithm::Sha256)
        .expect("must parse");
    assert_eq!(record.expected_hex, HELLO_SHA256);
}

#[test]
fn parse_uses_basename_of_target_path() {
    let other = "2".repeat(64);
    let content = format!("{other}  other.tar.gz\n{ARTIFACT}: {HELLO_SHA256}\n");
    let record = parse_checksum(
        &content,
        Some("/tmp/scratch/suiup-Linux-musl-x86_64.tar.gz"),
        ChecksumAlgorithm::Sha256,
    )
    .expect("must parse");
    assert_eq!(record.expected_hex, HELLO_SHA256);
}

#[test]
fn parse_falls_back_to_first_leading_token_without_name_match() {
    let other = "3".repeat(64);
    let content = format!("# checksums\n{HELLO_SHA256}  renamed.tar.gz\n{other}  x\n");
    let record = parse_checksum(&content, Some(ARTIFACT), ChecksumAlgorithm::Sha256)
        .expect("must parse");
    assert_eq!(record.expected_hex, HELLO_SHA256);
}

#[test]
fn parse_finds_token_anywhere_as_last_resort() {
    let content = format!("{{\"sha256\": \"{HELLO_SHA256}\"}}");
    let record = parse_checksum(&content, None, ChecksumAlgorithm::Sha256).expect("must parse");
    assert_eq!(record.expected_hex, HELLO_SHA256);
}

#[test]
fn parse_finds_hash_next_to_punctuation() {
    let layouts = [
        format!("sha256:{HELLO_SHA256}"),
        format!("SHA256={HELLO_SHA256}"),
        format!("{{\"sha256\":\"{HELLO_SHA256}\"}}"),
        format!("digest {HELLO_SHA256}."),
    ];
    for content in layouts {
        let record = parse_checksum(&content, Some("other-file"), ChecksumAlgorithm::Sha256)
            .unwrap_or_else(|err| panic!("{content:?}: {err}"));
        assert_eq!(record.expected_hex, HELLO_SHA256, "{content:?}");
    }
}

#[test]
fn parse_named_line_accepts_prefixed_hash() {
    let other = "4".repeat(64);
    let content = format!("{other}  other.tar.gz\n{ARTIFACT} sha256:{HELLO_SHA256};\n");
    let record = parse_checksum(&content, Some(ARTIFACT), ChecksumAlgorithm::Sha256)
        .expect("must parse");
    assert_eq!(record.expected_hex, HELLO_SHA256);
}

#[test]
fn parse_ignores_hex_runs_glued_to_alphanumerics() {
    let content = format!("x{HELLO_SHA256} {HELLO_SHA256}0");
    assert!(parse_checksum(&content, None, ChecksumAlgorithm::Sha256).is_err());
}

#[test]
fn parse_recognizes_unspaced_binary_marker() {
    let content = format!("{HELLO_SHA256}*{ARTIFACT}\n");
    let record = parse_checksum(&content, None, ChecksumAlgorithm::Sha256).expect("must parse");
    assert_eq!(record.expected_hex, HELLO_SHA256);
}

#[test]
fn parse_rejects_wrong_length_and_non_hex() {
    let cases: [&str; 6] = [
        "",
        "not a checksum",
        &"a".repeat(63),
        &"a".repeat(65),
        &format!("{}g", &HELLO_SHA256[..63]),
        HELLO_MD5,
    ];
    for content in cases {
        let err = parse_checksum(content, Some(ARTIFACT), ChecksumAlgorithm::Sha256)
            .expect_err(content);
        assert_eq!(err.len, 64);
    }
}

#[test]
fn parse_md5_uses_32_hex_characters() {
    let content = format!("{}  {ARTIFACT}\n", HELLO_MD5.to_ascii_uppercase());
    let record =
        parse_checksum(&content, Some(ARTIFACT), ChecksumAlgorithm::Md5).expect("must parse");
    assert_eq!(record.expected_hex, HELLO_MD5);
    assert!(parse_checksum(HELLO_SHA256, None, ChecksumAlgorithm::Md5).is_err());
}

#[test]
fn algorithm_follows_checksum_extension() {
    assert_eq!(
        ChecksumAlgorithm::from_checksum_url(CHECKSUM_URL),
        ChecksumAlgorithm::Sha256
    );
    assert_eq!(
        ChecksumAlgorithm::from_checksum_url("https://x/y.tar.gz.MD5?download=1"),
        ChecksumAlgorithm::Md5
    );
    assert_eq!(
        ChecksumAlgorithm::from_checksum_url("https://x/y.tar.gz.sum"),
        ChecksumAlgorithm::Sha256
    );
}

#[test]
fn builtin_hasher_computes_sha256_and_md5() {
    let (dir, path) = hello_file("builtin");
    assert_eq!(
        BuiltinHasher
            .hash_file(&path, ChecksumAlgorithm::Sha256)
            .expect("sha256"),
        HELLO_SHA256
    );
    assert_eq!(
        BuiltinHasher
            .hash_file(&path, ChecksumAlgorithm::Md5)
            .expect("md5"),
        HELLO_MD5
    );
    assert_eq!(sha256_hex(b"hello world\n"), HELLO_SHA256);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn builtin_hasher_errors_for_missing_file() {
    assert!(BuiltinHasher
        .hash_file(Path::new("/nonexistent/suiup.tar.gz"), ChecksumAlgorithm::Sha256)
        .is_err());
}

#[test]
fn external_hashers_are_ranked_before_builtin() {
    let providers = default_hash_providers();
    let names: Vec<_> = providers.iter().map(|p| p.name()).collect();
    assert_eq!(names.first(), Some(&"sha256sum"));
    assert_eq!(names.last(), Some(&"builtin"));
    assert!(!ExternalHasher::certutil().is_available() || cfg!(windows));
}

#[test]
fn verify_matching_hash_is_verified_case_insensitively() {
    let (dir, path) = hello_file("verified");
    let hashers = builtin_only();
    let verifier = IntegrityVerifier::new(&hashers);
    let outcome = verifier.verify(request(&path, Some(CHECKSUM_URL)), |_| {
        Some(format!("{}  {ARTIFACT}\n", HELLO_SHA256.to_ascii_uppercase()))
    });
    assert_eq!(
        outcome,
        VerificationOutcome::Verified {
            algorithm: ChecksumAlgorithm::Sha256,
            hash: HELLO_SHA256.to_string(),
            provider: "builtin",
        }
    );
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn verify_single_character_mutation_fails() {
    let (dir, path) = hello_file("mutation");
    let hashers = builtin_only();
    let verifier = IntegrityVerifier::new(&hashers);
    for index in [0, 31, 63] {
        let mut mutated = HELLO_SHA256.as_bytes().to_vec();
        mutated[index] = if mutated[index] == b'0' { b'1' } else { b'0' };
        let mutated = String::from_utf8(mutated).expect("ascii");
        let content = format!("{mutated}  {ARTIFACT}\n");

        let outcome = verifier.verify(request(&path, Some(CHECKSUM_URL)), |_| {
            Some(content.clone())
        });
        match outcome {
            VerificationOutcome::Failed {
                expected,
                actual,
                checksum_content,
            } => {
                assert_eq!(expected, mutated);
                assert_eq!(actual, HELLO_SHA256);
                assert_eq!(checksum_content, content);
            }
            other => panic!("expected failure for index {index}, got {other:?}"),
        }
    }
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn verify_skip_all_short_circuits_before_fetch_and_hash() {
    let (dir, path) = hello_file("skip-all");
    let hasher = FakeHasher::new("fake", true, Ok(HELLO_SHA256));
    let hashers: Vec<Box<dyn HashProvider>> = vec![Box::new(hasher)];
    let verifier = IntegrityVerifier::new(&hashers);
    let fetched = Cell::new(false);

    let outcome = verifier.verify(
        VerificationRequest {
            skip_all: true,
            ..request(&path, Some(CHECKSUM_URL))
        },
        |_| {
            fetched.set(true);
            Some(format!("{HELLO_SHA256}  {ARTIFACT}"))
        },
    );

    assert_eq!(
        outcome,
        VerificationOutcome::Skipped(SkipReason::ExplicitlyDisabled)
    );
    assert!(SkipReason::ExplicitlyDisabled
        .to_string()
        .starts_with("Explicitly skipped"));
    assert!(!fetched.get(), "checksum must not be fetched");
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn verify_without_checksum_url_is_skipped() {
    let (dir, path) = hello_file("no-url");
    let hashers = builtin_only();
    let outcome = IntegrityVerifier::new(&hashers).verify(request(&path, None), |_| {
        panic!("must not fetch without a URL")
    });
    assert_eq!(
        outcome,
        VerificationOutcome::Skipped(SkipReason::NoChecksumPublished)
    );
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn verify_missing_checksum_file_is_skipped() {
    let (dir, path) = hello_file("missing");
    let hashers = builtin_only();
    let outcome =
        IntegrityVerifier::new(&hashers).verify(request(&path, Some(CHECKSUM_URL)), |_| None);
    assert_eq!(
        outcome,
        VerificationOutcome::Skipped(SkipReason::ChecksumUnavailable {
            url: CHECKSUM_URL.to_string()
        })
    );
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn verify_unparsable_checksum_is_skipped_never_failed_or_verified() {
    let (dir, path) = hello_file("unparsable");
    let hashers = builtin_only();
    let outcome = IntegrityVerifier::new(&hashers).verify(request(&path, Some(CHECKSUM_URL)), |_| {
        Some("<html>Not Found</html>".to_string())
    });
    match outcome {
        VerificationOutcome::Skipped(SkipReason::UnparsableChecksum { content, .. }) => {
            assert_eq!(content, "<html>Not Found</html>");
        }
        other => panic!("expected unparsable skip, got {other:?}"),
    }
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn verify_without_hash_tools_is_skipped() {
    let (dir, path) = hello_file("no-tools");
    let unavailable = FakeHasher::new("absent", false, Ok(HELLO_SHA256));
    let hashers: Vec<Box<dyn HashProvider>> = vec![Box::new(unavailable)];
    let outcome = IntegrityVerifier::new(&hashers).verify(request(&path, Some(CHECKSUM_URL)), |_| {
        Some(format!("{HELLO_SHA256}  {ARTIFACT}"))
    });
    assert_eq!(
        outcome,
        VerificationOutcome::Skipped(SkipReason::NoHashTool {
            algorithm: ChecksumAlgorithm::Sha256
        })
    );

    let md5_url = CHECKSUM_URL.replace(".sha256", ".md5");
    let outcome = IntegrityVerifier::new(&hashers).verify(request(&path, Some(&md5_url)), |_| {
        Some(format!("{HELLO_MD5}  {ARTIFACT}"))
    });
    assert_eq!(
        outcome,
        VerificationOutcome::Skipped(SkipReason::NoHashTool {
            algorithm: ChecksumAlgorithm::Md5
        })
    );
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn verify_falls_through_failing_provider_to_next() {
    let (dir, path) = hello_file("fallthrough");
    let hashers: Vec<Box<dyn HashProvider>> = vec![
        Box::new(FakeHasher::new("broken", true, Err("exit status 2"))),
        Box::new(FakeHasher::new("skipped", false, Ok("ignored"))),
        Box::new(BuiltinHasher),
    ];
    let outcome = IntegrityVerifier::new(&hashers).verify(request(&path, Some(CHECKSUM_URL)), |_| {
        Some(format!("{HELLO_SHA256}  {ARTIFACT}"))
    });
    assert!(matches!(
        outcome,
        VerificationOutcome::Verified {
            provider: "builtin",
            ..
        }
    ));
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn verify_reports_when_every_provider_fails() {
    let (dir, path) = hello_file("all-fail");
    let hashers: Vec<Box<dyn HashProvider>> =
        vec![Box::new(FakeHasher::new("broken", true, Err("exit status 2")))];
    let outcome = IntegrityVerifier::new(&hashers).verify(request(&path, Some(CHECKSUM_URL)), |_| {
        Some(format!("{HELLO_SHA256}  {ARTIFACT}"))
    });
    match outcome {
        VerificationOutcome::Skipped(SkipReason::HashToolFailed { errors, .. }) => {
            assert_eq!(errors, vec!["exit status 2".to_string()]);
        }
        other => panic!("expected hash tool failure skip, got {other:?}"),
    }
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn verify_uses_first_available_provider_only() {
    let (dir, path) = hello_file("first-match");
    let first = FakeHasher::new("first", true, Ok(HELLO_SHA256));
    let hashers: Vec<Box<dyn HashProvider>> = vec![Box::new(first), Box::new(BuiltinHasher)];
    let outcome = IntegrityVerifier::new(&hashers).verify(request(&path, Some(CHECKSUM_URL)), |_| {
        Some(format!("{HELLO_SHA256}  {ARTIFACT}"))
    });
    assert!(matches!(
        outcome,
        VerificationOutcome::Verified {
            provider: "first",
            ..
        }
    ));
    let _ = std::fs::remove_dir_all(dir);
}
