//! Allocation-free stderr writers for `pre_exec` hooks.
//!
//! Only `libc::write` and stack buffers are used, so these are safe between `fork()` and
//! `execve()`.

pub fn pre_exec_log(msg: &[u8]) {
    // SAFETY: writes a valid, live buffer to an always-open descriptor.
    unsafe {
        libc::write(
            libc::STDERR_FILENO,
            msg.as_ptr() as *const libc::c_void,
            msg.len(),
        );
    }
}

/// Writes `errno=<n>\n`.
pub fn pre_exec_log_errno(errno: i32) {
    let mut buf = [0u8; 24];
    let mut idx = buf.len();

    idx -= 1;
    buf[idx] = b'\n';

    let mut n = errno.unsigned_abs();
    loop {
        idx -= 1;
        buf[idx] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    if errno < 0 {
        idx -= 1;
        buf[idx] = b'-';
    }

    pre_exec_log(b"errno=");
    pre_exec_log(&buf[idx..]);
}
