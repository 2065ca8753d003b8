use common::{common_test_setup, isolated_home, spawn_shim};

#[test]
fn disabled_helper_execs_the_worker_in_place() {
    common_test_setup();
    let home = isolated_home();
    let child = spawn_shim(&home, Some("0"), &["7", "--flag"], None);
    let output = child.wait_with_output().expect("shim did not run");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("KART_CLI_DIRECT 7 --flag"),
        "worker did not run directly, stdout: {}",
        stdout
    );
    assert_eq!(output.status.code(), Some(7));
}

#[test]
fn any_leading_zero_value_disables_the_helper() {
    common_test_setup();
    let home = isolated_home();
    let child = spawn_shim(&home, Some("0no-really"), &["0"], None);
    let output = child.wait_with_output().expect("shim did not run");
    assert!(String::from_utf8_lossy(&output.stdout).contains("KART_CLI_DIRECT"));
    assert_eq!(output.status.code(), Some(0));
}
