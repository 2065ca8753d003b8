use common::{
    common_test_setup, current_session_id, isolated_home, send_signal, spawn_shim, store_exit_code,
};
use kart_ipc::{helper_socket_path, HelperStream, InvocationPayload, IPC_MESSAGE_MAX_SIZE};
use std::os::unix::net::UnixListener;
use std::time::Duration;

/// Waits for the shim to connect and hands back its parsed payload, so a
/// test can act as the helper end of the protocol.
fn accept_invocation(listener: &UnixListener) -> InvocationPayload {
    let (stream, _) = listener.accept().expect("shim never connected");
    let mut stream = HelperStream::from_stream(stream);
    let mut buffer = vec![0u8; IPC_MESSAGE_MAX_SIZE];
    let (bytes, _handles) = stream
        .recv_with_fds(&mut buffer)
        .expect("no invocation message");
    InvocationPayload::from_json(bytes).expect("malformed payload")
}

#[test]
fn interrupt_writes_newline_and_exits_130() {
    common_test_setup();
    let home = isolated_home();
    let socket_path = helper_socket_path(home.path(), current_session_id());
    let listener = UnixListener::bind(&socket_path).expect("unable to bind fake helper socket");

    let child = spawn_shim(&home, Some("1"), &["diff"], None);
    let _payload = accept_invocation(&listener);

    // The shim is now blocked waiting for the helper; interrupt it
    send_signal(child.id(), libc::SIGINT);
    let output = child.wait_with_output().expect("shim did not exit");
    assert_eq!(output.status.code(), Some(128 + libc::SIGINT));
    assert_eq!(output.stdout, b"\n");
}

#[test]
fn sigusr1_inhibits_interrupt_handling() {
    common_test_setup();
    let home = isolated_home();
    let socket_path = helper_socket_path(home.path(), current_session_id());
    let listener = UnixListener::bind(&socket_path).expect("unable to bind fake helper socket");

    let child = spawn_shim(&home, Some("1"), &["checkout"], None);
    let payload = accept_invocation(&listener);

    // Worker signals it is taking over the terminal; a subsequent Ctrl-C
    // must not kill the shim
    send_signal(child.id(), libc::SIGUSR1);
    std::thread::sleep(Duration::from_millis(200));
    send_signal(child.id(), libc::SIGINT);
    std::thread::sleep(Duration::from_millis(200));

    // The completion handshake still works afterwards
    store_exit_code(payload.semid, 3);
    send_signal(child.id(), libc::SIGALRM);
    let output = child.wait_with_output().expect("shim did not exit");
    assert_eq!(output.status.code(), Some(3));
    assert_eq!(output.stdout, b"", "inhibited SIGINT still ran its handler");
}
