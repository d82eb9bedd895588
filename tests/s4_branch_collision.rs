mod common;

use common::{installer_command, TestRepo, EXPECTED_BRANCH};

#[test]
fn existing_branch_with_the_planned_name_blocks_installation() {
    let repo = TestRepo::with_remote();
    repo.git(&["branch", EXPECTED_BRANCH]);

    let output = installer_command(&repo).output().expect("run installer");
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains(EXPECTED_BRANCH),
        "stderr should name the colliding branch: {stderr}"
    );

    assert_eq!(repo.current_branch(), "main");
    assert!(repo.is_clean());
}

#[test]
fn branch_existing_only_on_remote_blocks_installation() {
    let repo = TestRepo::with_remote();
    repo.push_branch_from_second_clone(EXPECTED_BRANCH);
    assert!(
        !repo.branch_exists(EXPECTED_BRANCH),
        "branch must not exist locally before the installer runs"
    );

    let output = installer_command(&repo).output().expect("run installer");
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains(EXPECTED_BRANCH),
        "stderr should name the colliding branch: {stderr}"
    );

    assert_eq!(repo.current_branch(), "main");
    assert!(repo.is_clean());
}
