use common::{
    common_test_setup, current_session_id, isolated_home, send_signal, spawn_shim, store_exit_code,
};
use kart_ipc::{helper_socket_path, HelperStream, InvocationPayload, IPC_MESSAGE_MAX_SIZE};
use std::os::unix::net::UnixListener;

/// The shim must relay the helper-reported exit code: an external driver
/// stores `1000 + k` in the semaphore named by the payload and raises
/// SIGALRM, and the shim exits with `k`.
#[test]
fn semaphore_value_becomes_the_exit_code() {
    common_test_setup();
    let home = isolated_home();
    let socket_path = helper_socket_path(home.path(), current_session_id());
    let listener = UnixListener::bind(&socket_path).expect("unable to bind fake helper socket");

    let child = spawn_shim(&home, Some("1"), &["status", "--json"], None);
    let (stream, _) = listener.accept().expect("shim never connected");
    let mut stream = HelperStream::from_stream(stream);
    let mut buffer = vec![0u8; IPC_MESSAGE_MAX_SIZE];
    let (bytes, handles) = stream
        .recv_with_fds(&mut buffer)
        .expect("no invocation message");
    let payload = InvocationPayload::from_json(bytes).expect("malformed payload");

    // One message carries the whole invocation context plus the four
    // descriptors
    assert_eq!(payload.pid as u32, child.id());
    assert_eq!(handles.len(), 4);
    let argv_tail: Vec<_> = payload.argv.iter().skip(1).cloned().collect();
    assert_eq!(argv_tail, vec!["status".to_owned(), "--json".to_owned()]);
    assert!(
        !payload.environ.contains_key("KART_USE_HELPER"),
        "helper-enable variable leaked into the payload"
    );
    assert_eq!(
        payload.environ.get("HOME").map(String::as_str),
        home.path().to_str()
    );

    store_exit_code(payload.semid, 7);
    send_signal(child.id(), libc::SIGALRM);

    let output = child.wait_with_output().expect("shim did not exit");
    assert_eq!(output.status.code(), Some(7));
}

#[test]
fn exit_code_zero_round_trips_too() {
    common_test_setup();
    let home = isolated_home();
    let socket_path = helper_socket_path(home.path(), current_session_id());
    let listener = UnixListener::bind(&socket_path).expect("unable to bind fake helper socket");

    let child = spawn_shim(&home, None, &["log"], None);
    let (stream, _) = listener.accept().expect("shim never connected");
    let mut stream = HelperStream::from_stream(stream);
    let mut buffer = vec![0u8; IPC_MESSAGE_MAX_SIZE];
    let (bytes, _handles) = stream
        .recv_with_fds(&mut buffer)
        .expect("no invocation message");
    let payload = InvocationPayload::from_json(bytes).expect("malformed payload");

    store_exit_code(payload.semid, 0);
    send_signal(child.id(), libc::SIGALRM);
    let output = child.wait_with_output().expect("shim did not exit");
    assert_eq!(output.status.code(), Some(0));
}
