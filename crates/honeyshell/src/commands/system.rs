//! System information commands (hostname, uname, whoami)
//!
//! Values come from the session [`Config`](crate::Config) so every
//! fingerprinting command tells the same story about the emulated machine.

use async_trait::async_trait;

use super::{Command, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// Kernel release reported by `uname -r`.
pub const KERNEL_RELEASE: &str = "3.2.0-4-amd64";

/// Kernel version reported by `uname -v`.
pub const KERNEL_VERSION: &str = "#1 SMP Debian 3.2.68-1+deb7u1";

/// The hostname command.
pub struct Hostname;

#[async_trait]
impl Command for Hostname {
    async fn start(&mut self, ctx: Context<'_>) -> Result<ExecResult> {
        if !ctx.args.is_empty() {
            if !ctx.config.is_root() {
                return Ok(ExecResult::err(
                    "hostname: you must be root to change the host name\n",
                    1,
                ));
            }
            // Accepted but not applied
            return Ok(ExecResult::ok(""));
        }
        Ok(ExecResult::ok(format!("{}\n", ctx.config.hostname)))
    }
}

/// The whoami command.
pub struct Whoami;

#[async_trait]
impl Command for Whoami {
    async fn start(&mut self, ctx: Context<'_>) -> Result<ExecResult> {
        Ok(ExecResult::ok(format!("{}\n", ctx.config.username)))
    }
}

/// The uname command.
pub struct Uname;

#[async_trait]
impl Command for Uname {
    async fn start(&mut self, ctx: Context<'_>) -> Result<ExecResult> {
        let mut show_all = false;
        let mut show_kernel = false;
        let mut show_nodename = false;
        let mut show_release = false;
        let mut show_version = false;
        let mut show_machine = false;
        let mut show_os = false;

        for arg in ctx.args {
            match arg.as_str() {
                "-a" | "--all" => show_all = true,
                "-s" | "--kernel-name" => show_kernel = true,
                "-n" | "--nodename" => show_nodename = true,
                "-r" | "--kernel-release" => show_release = true,
                "-v" | "--kernel-version" => show_version = true,
                "-m" | "--machine" => show_machine = true,
                "-o" | "--operating-system" => show_os = true,
                s if s.starts_with('-') && s.len() > 1 && !s.starts_with("--") => {
                    for c in s[1..].chars() {
                        match c {
                            'a' => show_all = true,
                            's' => show_kernel = true,
                            'n' => show_nodename = true,
                            'r' => show_release = true,
                            'v' => show_version = true,
                            'm' => show_machine = true,
                            'o' => show_os = true,
                            _ => {
                                return Ok(ExecResult::err(
                                    format!(
                                        "uname: invalid option -- '{}'\nTry 'uname --help' for more information.\n",
                                        c
                                    ),
                                    1,
                                ));
                            }
                        }
                    }
                }
                other => {
                    return Ok(ExecResult::err(
                        format!(
                            "uname: extra operand '{}'\nTry 'uname --help' for more information.\n",
                            other
                        ),
                        1,
                    ));
                }
            }
        }

        if !(show_all
            || show_nodename
            || show_release
            || show_version
            || show_machine
            || show_os)
        {
            show_kernel = true;
        }

        let mut parts = Vec::new();
        if show_all || show_kernel {
            parts.push("Linux");
        }
        if show_all || show_nodename {
            parts.push(ctx.config.hostname.as_str());
        }
        if show_all || show_release {
            parts.push(KERNEL_RELEASE);
        }
        if show_all || show_version {
            parts.push(KERNEL_VERSION);
        }
        if show_all || show_machine {
            parts.push("x86_64");
        }
        if show_all || show_os {
            parts.push("GNU/Linux");
        }

        Ok(ExecResult::ok(format!("{}\n", parts.join(" "))))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::commands::testing::TestEnv;

    #[tokio::test]
    async fn test_uname_default_and_all() {
        let mut env = TestEnv::new(&[]);
        let result = Uname.start(env.ctx("uname", None)).await.unwrap();
        assert_eq!(result.stdout, "Linux\n");

        let mut env = TestEnv::new(&["-a"]);
        let result = Uname.start(env.ctx("uname", None)).await.unwrap();
        assert_eq!(
            result.stdout,
            format!(
                "Linux svr04 {} {} x86_64 GNU/Linux\n",
                KERNEL_RELEASE, KERNEL_VERSION
            )
        );
    }

    #[tokio::test]
    async fn test_uname_combined_flags() {
        let mut env = TestEnv::new(&["-nm"]);
        let result = Uname.start(env.ctx("uname", None)).await.unwrap();
        assert_eq!(result.stdout, "svr04 x86_64\n");

        let mut env = TestEnv::new(&["-q"]);
        let result = Uname.start(env.ctx("uname", None)).await.unwrap();
        assert!(result.stderr.starts_with("uname: invalid option -- 'q'"));
    }

    #[tokio::test]
    async fn test_whoami_and_hostname() {
        let mut env = TestEnv::new(&[]);
        assert_eq!(
            Whoami.start(env.ctx("whoami", None)).await.unwrap().stdout,
            "root\n"
        );
        assert_eq!(
            Hostname.start(env.ctx("hostname", None)).await.unwrap().stdout,
            "svr04\n"
        );
    }
}
