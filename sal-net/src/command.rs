// sal-net/src/command.rs
//! Structured remote commands.
//!
//! Commands are assembled from typed arguments and rendered into a single shell line for the
//! device. Every argument that is not made of plain characters is single-quoted, so names and
//! paths can never break out of their argument position.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use sal_common::error::{Result, SalError};

lazy_static! {
    static ref VALID_NAME_RE: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._+-]*$").unwrap();
    static ref PLAIN_TOKEN_RE: Regex = Regex::new(r"^[A-Za-z0-9_./=,:@%+-]+$").unwrap();
    static ref VALID_PATTERN_RE: Regex = Regex::new(r"^[A-Za-z0-9_.*?+-]+$").unwrap();
}

/// Checks that a plugin name is safe to use as a remote file name component.
pub fn validate_name(name: &str) -> Result<()> {
    if name.len() <= 128 && VALID_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(SalError::InvalidName(format!(
            "'{name}' may only contain letters, digits, '.', '_', '+' and '-'"
        )))
    }
}

pub fn is_valid_name(name: &str) -> bool {
    validate_name(name).is_ok()
}

/// POSIX single-quote escaping: `it's` -> `'it'\''s'`.
pub fn shell_quote(raw: &str) -> String {
    if !raw.is_empty() && PLAIN_TOKEN_RE.is_match(raw) {
        return raw.to_string();
    }
    format!("'{}'", raw.replace('\'', r"'\''"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Arg {
    Plain(String),
    /// Directory is quoted, the pattern is emitted raw so the remote shell expands it.
    Glob { dir: String, pattern: String },
    /// Output of another command, as one double-quoted word.
    Output(Box<RemoteCommand>),
}

impl Arg {
    fn raw(&self) -> String {
        match self {
            Arg::Plain(value) => value.clone(),
            Arg::Glob { dir, pattern } => format!("{dir}/{pattern}"),
            Arg::Output(command) => format!("$({})", command.render()),
        }
    }

    fn render(&self) -> String {
        match self {
            Arg::Plain(value) => shell_quote(value),
            Arg::Glob { dir, pattern } => format!("{}/{}", shell_quote(dir), pattern),
            Arg::Output(command) => format!("\"$({})\"", command.render()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    program: String,
    args: Vec<Arg>,
    stdout_to: Option<String>,
    quiet: bool,
    and_then: Option<Box<RemoteCommand>>,
}

impl RemoteCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdout_to: None,
            quiet: false,
            and_then: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Plain(arg.into()));
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args
            .extend(args.into_iter().map(|a| Arg::Plain(a.into())));
        self
    }

    /// `<dir>/<pattern>` with shell expansion of the pattern only.
    pub fn glob(mut self, dir: &str, pattern: &str) -> Result<Self> {
        if !VALID_PATTERN_RE.is_match(pattern) {
            return Err(SalError::InvalidName(format!(
                "glob pattern '{pattern}' contains unsupported characters"
            )));
        }
        self.args.push(Arg::Glob {
            dir: dir.trim_end_matches('/').to_string(),
            pattern: pattern.to_string(),
        });
        Ok(self)
    }

    /// Substitutes the output of `command` as a single argument.
    pub fn output_of(mut self, command: RemoteCommand) -> Self {
        self.args.push(Arg::Output(Box::new(command)));
        self
    }

    /// Redirect stdout into a remote file.
    pub fn stdout_to(mut self, path: impl Into<String>) -> Self {
        self.stdout_to = Some(path.into());
        self
    }

    /// Discard stderr on the device.
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Run `next` only if this command succeeds.
    pub fn and_then(mut self, next: RemoteCommand) -> Self {
        let tail = match self.and_then.take() {
            Some(tail) => (*tail).and_then(next),
            None => next,
        };
        self.and_then = Some(Box::new(tail));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Unquoted argument values, for inspection and logging.
    pub fn arg_values(&self) -> Vec<String> {
        self.args.iter().map(Arg::raw).collect()
    }

    pub fn next(&self) -> Option<&RemoteCommand> {
        self.and_then.as_deref()
    }

    pub fn redirect_target(&self) -> Option<&str> {
        self.stdout_to.as_deref()
    }

    /// The shell line sent to the device.
    pub fn render(&self) -> String {
        let mut line = shell_quote(&self.program);
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.render());
        }
        if let Some(path) = &self.stdout_to {
            line.push_str(" > ");
            line.push_str(&shell_quote(path));
        }
        if self.quiet {
            line.push_str(" 2>/dev/null");
        }
        if let Some(next) = &self.and_then {
            line.push_str(" && ");
            line.push_str(&next.render());
        }
        line
    }

    // --- Commands the deployment steps use ---

    /// Round-trip probe; the device answers `ok`.
    pub fn probe() -> Self {
        Self::new("echo").arg(PROBE_TOKEN)
    }

    /// Root is mounted read-only on the device by default.
    pub fn remount_rw() -> Self {
        Self::new("mount").args(["-o", "remount,rw", "/"])
    }

    pub fn mkdir_p(dir: &str) -> Self {
        Self::new("mkdir").arg("-p").arg(dir)
    }

    pub fn sync() -> Self {
        Self::new("sync")
    }

    pub fn remove_file(path: &str) -> Self {
        Self::new("rm").arg("-f").arg(path)
    }

    pub fn remove_tree(path: &str) -> Self {
        Self::new("rm").arg("-rf").arg(path)
    }

    pub fn stat_size(path: &str) -> Self {
        Self::new("stat").args(["-c", "%s"]).arg(path).quiet()
    }

    pub fn test_file(path: &str) -> Self {
        Self::new("test").arg("-f").arg(path)
    }

    pub fn list(dir: &str, extension: &str) -> Result<Self> {
        Self::new("ls")
            .arg("-1")
            .glob(dir, &format!("*.{extension}"))
            .map(Self::quiet)
    }

    pub fn service_stop(service: &str) -> Self {
        Self::new("systemctl").arg("stop").arg(service)
    }

    pub fn service_start(service: &str) -> Self {
        Self::new("systemctl").arg("start").arg(service)
    }

    pub fn kill_all(process: &str) -> Self {
        Self::new("killall").arg(process)
    }

    /// Writes stdin to `<path>.part` and renames it into place once it holds exactly `size`
    /// bytes.
    pub fn receive_file(path: &str, size: u64) -> Self {
        let partial = format!("{path}.part");
        Self::new("cat")
            .stdout_to(partial.clone())
            .and_then(
                Self::new("test")
                    .output_of(Self::stat_size(&partial))
                    .arg("=")
                    .arg(size.to_string()),
            )
            .and_then(Self::new("mv").arg("-f").arg(partial).arg(path))
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

pub const PROBE_TOKEN: &str = "ok";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_tokens_stay_bare() {
        assert_eq!(RemoteCommand::mkdir_p("/tmp/plugins").render(), "mkdir -p /tmp/plugins");
        assert_eq!(
            RemoteCommand::remount_rw().render(),
            "mount -o remount,rw /"
        );
    }

    #[test]
    fn hostile_paths_are_quoted() {
        let cmd = RemoteCommand::remove_file("/tmp/plugins/x'; reboot; echo '.so");
        assert_eq!(
            cmd.render(),
            r"rm -f '/tmp/plugins/x'\''; reboot; echo '\''.so'"
        );

        let spaced = RemoteCommand::remove_tree("/var/local/my dir");
        assert_eq!(spaced.render(), "rm -rf '/var/local/my dir'");
    }

    #[test]
    fn empty_argument_is_quoted() {
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn glob_keeps_pattern_unquoted() {
        let cmd = RemoteCommand::list("/tmp/my plugins/", "so").unwrap();
        assert_eq!(cmd.render(), "ls -1 '/tmp/my plugins'/*.so 2>/dev/null");
        assert_eq!(cmd.arg_values(), vec!["-1", "/tmp/my plugins/*.so"]);
    }

    #[test]
    fn glob_rejects_shell_syntax() {
        assert!(RemoteCommand::list("/tmp/plugins", "so;reboot").is_err());
        assert!(RemoteCommand::new("ls").glob("/tmp", "$(id)").is_err());
    }

    #[test]
    fn receive_file_chains_rename() {
        let cmd = RemoteCommand::receive_file("/tmp/plugins/wifi.so", 1024);
        assert_eq!(
            cmd.render(),
            "cat > /tmp/plugins/wifi.so.part \
             && test \"$(stat -c %s /tmp/plugins/wifi.so.part 2>/dev/null)\" = 1024 \
             && mv -f /tmp/plugins/wifi.so.part /tmp/plugins/wifi.so"
        );
        assert_eq!(cmd.redirect_target(), Some("/tmp/plugins/wifi.so.part"));
        let check = cmd.next().unwrap();
        assert_eq!(check.program(), "test");
        assert_eq!(
            check.arg_values(),
            vec!["$(stat -c %s /tmp/plugins/wifi.so.part 2>/dev/null)", "=", "1024"]
        );
        assert_eq!(check.next().map(|n| n.program()), Some("mv"));
    }

    #[test]
    fn and_then_appends_to_tail() {
        let cmd = RemoteCommand::new("a")
            .and_then(RemoteCommand::new("b"))
            .and_then(RemoteCommand::new("c"));
        assert_eq!(cmd.render(), "a && b && c");
    }

    #[test]
    fn name_validation() {
        assert!(is_valid_name("now_playing"));
        assert!(is_valid_name("wifi-2.0"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("-rf"));
        assert!(!is_valid_name("../etc"));
        assert!(!is_valid_name("a b"));
        assert!(!is_valid_name("x;reboot"));
        assert!(matches!(
            validate_name("a/b"),
            Err(SalError::InvalidName(_))
        ));
    }
}
