// Stand-in for the full kart_cli used by the shim integration tests.
//
// Invoked directly it just echoes its arguments and exits with the code
// given as its first argument. Invoked as `kart_cli helper --socket
// <path>` it plays one round of the helper protocol: bind, accept one
// invocation, restore the caller's cwd from the passed directory
// descriptor, write a marker to the caller's stdout, store the exit code
// in the caller's semaphore and wake it with SIGALRM.

use kart_ipc::{HelperStream, InvocationPayload, IPC_FD_COUNT, IPC_MESSAGE_MAX_SIZE};
use std::fs::File;
use std::io::Write;
use std::os::unix::io::FromRawFd;
use std::os::unix::net::UnixListener;
use std::path::Path;
use std::time::{Duration, Instant};

const ACCEPT_DEADLINE: Duration = Duration::from_secs(30);

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(String::as_str) == Some("helper") {
        let socket_path = args
            .iter()
            .position(|arg| arg == "--socket")
            .and_then(|i| args.get(i + 1))
            .expect("helper mode requires --socket <path>");
        std::process::exit(run_helper(Path::new(socket_path)));
    }

    // Direct worker mode: the shim exec'd us in place of itself
    println!("KART_CLI_DIRECT {}", args[1..].join(" "));
    let exit_code = args.get(1).and_then(|arg| arg.parse().ok()).unwrap_or(0);
    std::process::exit(exit_code);
}

fn run_helper(socket_path: &Path) -> i32 {
    // A stale socket file from an earlier helper would make bind() fail
    let _ = std::fs::remove_file(socket_path);
    let listener = UnixListener::bind(socket_path).expect("unable to bind helper socket");
    listener
        .set_nonblocking(true)
        .expect("unable to configure helper socket");

    let deadline = Instant::now() + ACCEPT_DEADLINE;
    let stream = loop {
        match listener.accept() {
            Ok((stream, _)) => break stream,
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                if Instant::now() > deadline {
                    eprintln!("helper stub: no connection before deadline");
                    return 1;
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(err) => panic!("accept() failed: {}", err),
        }
    };
    stream
        .set_nonblocking(false)
        .expect("unable to configure helper connection");

    let mut stream = HelperStream::from_stream(stream);
    let mut buffer = vec![0u8; IPC_MESSAGE_MAX_SIZE];
    let (bytes, mut handles) = stream
        .recv_with_fds(&mut buffer)
        .expect("unable to receive invocation");
    let payload = InvocationPayload::from_json(bytes).expect("malformed invocation payload");
    assert_eq!(handles.len(), IPC_FD_COUNT, "expected stdio + cwd descriptors");

    // Restore the caller's working directory from the passed handle
    let cwd = handles.pop().unwrap();
    let res = unsafe { libc::fchdir(cwd.as_raw()) };
    assert_eq!(res, 0, "fchdir() into caller cwd failed");

    // Report back over the caller's own stdout
    let mut caller_stdout = unsafe { File::from_raw_fd(handles.remove(1).into_raw()) };
    let cwd_now = std::env::current_dir().expect("getcwd failed");
    writeln!(
        caller_stdout,
        "KART_HELPER_OK argv={:?} cwd={}",
        &payload.argv[1..],
        cwd_now.display()
    )
    .expect("unable to write to caller stdout");
    drop(caller_stdout);

    // Completion handshake: offset exit code into the semaphore, then wake
    // the shim
    let exit_code: i32 = payload
        .argv
        .get(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(0);
    let res = unsafe { libc::semctl(payload.semid, 0, libc::SETVAL, 1000 + exit_code) };
    assert_eq!(res, 0, "semctl(SETVAL) failed on semaphore {}", payload.semid);
    let res = unsafe { libc::kill(payload.pid, libc::SIGALRM) };
    assert_eq!(res, 0, "kill(SIGALRM) failed for pid {}", payload.pid);

    let _ = std::fs::remove_file(socket_path);
    0
}
