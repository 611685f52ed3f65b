use std::path::{Path, PathBuf};

use super::*;

fn engine(mode: ContainmentMode) -> (tempfile::TempDir, PolicyEngine) {
    let temp = tempfile::tempdir().expect("tempdir");
    let policy = PolicyEngine::with_containment(temp.path().to_path_buf(), mode);
    (temp, policy)
}

#[test]
fn dot_and_empty_resolve_to_root() {
    let (_temp, policy) = engine(ContainmentMode::Substitute);
    let root = policy.workspace_root().to_path_buf();
    assert_eq!(policy.evaluate_path("."), PolicyDecision::Allow(root.clone()));
    assert_eq!(policy.evaluate_path("  "), PolicyDecision::Allow(root));
}

#[test]
fn relative_paths_join_the_root() {
    let (_temp, policy) = engine(ContainmentMode::Substitute);
    let decision = policy.evaluate_path("src/./lib.rs");
    assert_eq!(
        decision.path(),
        Some(policy.workspace_root().join("src/lib.rs").as_path())
    );
}

#[test]
fn escaping_path_is_replaced_by_root() {
    let (_temp, policy) = engine(ContainmentMode::Substitute);
    let decision = policy.evaluate_path("../../etc/passwd");
    match decision {
        PolicyDecision::Contained { resolved, .. } => {
            assert_eq!(resolved, policy.workspace_root());
        }
        other => panic!("expected containment, got {other:?}"),
    }
}

#[test]
fn absolute_path_inside_root_is_allowed() {
    let (_temp, policy) = engine(ContainmentMode::Substitute);
    let inside = policy.workspace_root().join("notes.md");
    let decision = policy.evaluate_path(inside.to_str().expect("utf8"));
    assert_eq!(decision, PolicyDecision::Allow(inside));
}

#[test]
fn reject_mode_denies_escape() {
    let (_temp, policy) = engine(ContainmentMode::Reject);
    let decision = policy.evaluate_path("/definitely/elsewhere");
    assert!(matches!(decision, PolicyDecision::Deny { .. }));
    assert!(decision.path().is_none());
}

#[test]
fn display_relative_uses_forward_slashes() {
    let (_temp, policy) = engine(ContainmentMode::Substitute);
    let nested = policy.workspace_root().join("a").join("b.txt");
    assert_eq!(policy.display_relative(&nested), "a/b.txt");
    assert_eq!(policy.display_relative(policy.workspace_root()), ".");
}

#[test]
fn normalize_lexically_drops_parent_at_root() {
    assert_eq!(
        normalize_lexically(Path::new("/a/../../b")),
        PathBuf::from("/b")
    );
    assert_eq!(normalize_lexically(Path::new("a/./b/../c")), PathBuf::from("a/c"));
}

#[cfg(unix)]
#[test]
fn symlink_out_of_root_is_contained() {
    let (_temp, policy) = engine(ContainmentMode::Substitute);
    let outside = tempfile::tempdir().expect("outside");
    std::os::unix::fs::symlink(outside.path(), policy.workspace_root().join("link"))
        .expect("symlink");

    let decision = policy.evaluate_path("link");
    assert!(matches!(decision, PolicyDecision::Contained { .. }));
}
