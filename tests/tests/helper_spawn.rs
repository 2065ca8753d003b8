use common::{common_test_setup, isolated_home, spawn_shim};
use std::fs;

/// Full cold-start round trip: no helper is listening, so the shim must
/// double-fork one (`kart_cli helper --socket <path>`), connect to it,
/// pass the invocation over, and exit with the code the helper reports.
#[test]
fn shim_spawns_a_helper_and_relays_its_exit_code() {
    common_test_setup();
    let home = isolated_home();
    let workdir = home.path().join("repo");
    fs::create_dir(&workdir).unwrap();

    let child = spawn_shim(&home, Some("1"), &["5"], Some(&workdir));
    let output = child.wait_with_output().expect("shim did not exit");
    let stdout = String::from_utf8_lossy(&output.stdout);

    // The stub helper writes through the caller's passed-in stdout after
    // restoring its working directory from the cwd descriptor
    assert!(
        stdout.contains("KART_HELPER_OK argv=[\"5\"]"),
        "helper never handled the invocation, stdout: {} stderr: {}",
        stdout,
        String::from_utf8_lossy(&output.stderr)
    );
    let canonical_workdir = fs::canonicalize(&workdir).unwrap();
    assert!(
        stdout.contains(&format!("cwd={}", canonical_workdir.display())),
        "helper did not run in the caller's working directory, stdout: {}",
        stdout
    );
    assert_eq!(output.status.code(), Some(5));
}
