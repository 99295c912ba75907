use std::ffi::OsStr;
use std::process::Command;

/// Hands a URL or path to the desktop's default opener. Failure is silent;
/// callers always log the target as well.
pub fn open_url<S: AsRef<OsStr>>(target: S) {
    let target = target.as_ref();
    if target.is_empty() || std::env::var_os("SHORTS_NO_BROWSER").is_some() {
        return;
    }
    let _ = opener(target).spawn();
}

/// The target always travels as a single argument. On Windows it skips
/// `cmd`, which would split a query string at every `&`.
fn opener(target: &OsStr) -> Command {
    #[cfg(target_os = "windows")]
    let mut cmd = {
        let mut cmd = Command::new("rundll32");
        cmd.arg("url.dll,FileProtocolHandler");
        cmd
    };

    #[cfg(target_os = "macos")]
    let mut cmd = Command::new("open");

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let mut cmd = Command::new("xdg-open");

    cmd.arg(target);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONSENT: &str = "https://accounts.example/auth?response_type=code&client_id=cid&state=s1";

    #[test]
    fn url_with_query_is_passed_whole() {
        let cmd = opener(OsStr::new(CONSENT));
        let args: Vec<&OsStr> = cmd.get_args().collect();
        assert_eq!(args.last().copied(), Some(OsStr::new(CONSENT)));
    }

    #[cfg(target_os = "windows")]
    #[test]
    fn windows_uses_protocol_handler_instead_of_cmd() {
        let cmd = opener(OsStr::new(CONSENT));
        assert_eq!(cmd.get_program(), "rundll32");
        let args: Vec<&OsStr> = cmd.get_args().collect();
        assert_eq!(args, [OsStr::new("url.dll,FileProtocolHandler"), OsStr::new(CONSENT)]);
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn linux_uses_xdg_open() {
        assert_eq!(opener(OsStr::new(CONSENT)).get_program(), "xdg-open");
    }
}
