//! Host identification.

use std::ffi::OsString;

use serde::Serialize;

/// The machine a benchmark ran on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HostInfo {
    /// The host name, or `unknown`.
    pub hostname: String,
    /// The operating system.
    pub os: &'static str,
    /// The CPU architecture.
    pub arch: &'static str,
    /// The available parallelism, or 1 if it cannot be determined.
    pub parallelism: usize,
}

impl HostInfo {
    /// Identify this host.
    #[must_use]
    pub fn detect() -> Self {
        let hostname = match hostname() {
            Ok(hostname) => hostname.to_string_lossy().into_owned(),
            Err(err) => {
                log::warn!("failed to read the host name: {err}");
                "unknown".to_string()
            }
        };
        Self {
            hostname,
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            parallelism: std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get),
        }
    }
}

#[cfg(unix)]
fn hostname() -> std::io::Result<OsString> {
    use std::os::unix::ffi::OsStringExt;

    let mut buf = vec![0u8; 256];
    // SAFETY: the buffer is valid for `buf.len()` bytes
    let result = unsafe { libc::gethostname(buf.as_mut_ptr().cast::<libc::c_char>(), buf.len()) };
    if result != 0 {
        return Err(std::io::Error::last_os_error());
    }
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    buf.truncate(len);
    Ok(OsString::from_vec(buf))
}

#[cfg(not(unix))]
fn hostname() -> std::io::Result<OsString> {
    std::env::var_os("COMPUTERNAME").ok_or_else(|| std::io::Error::other("COMPUTERNAME is not set"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_info_detect() {
        let host = HostInfo::detect();
        assert_eq!(host.os, std::env::consts::OS);
        assert!(host.parallelism >= 1);
    }
}
