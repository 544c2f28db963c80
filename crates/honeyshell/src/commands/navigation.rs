//! Navigation commands (cd, pwd)

use async_trait::async_trait;

use super::{Command, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// The cd command - change directory.
pub struct Cd;

#[async_trait]
impl Command for Cd {
    async fn start(&mut self, ctx: Context<'_>) -> Result<ExecResult> {
        if ctx.args.len() > 1 {
            return Ok(ExecResult::err("-bash: cd: too many arguments\n", 1));
        }

        let home = ctx.config.home_dir();
        let (target, print) = match ctx.args.first().map(String::as_str) {
            None | Some("~") => (home.clone(), false),
            Some("-") => match ctx.env.get("OLDPWD") {
                Some(old) => (old.clone(), true),
                None => return Ok(ExecResult::err("-bash: cd: OLDPWD not set\n", 1)),
            },
            Some(dir) => match dir.strip_prefix("~/") {
                Some(rest) => (format!("{}/{}", home, rest), false),
                None => (dir.to_string(), false),
            },
        };

        let new_path = ctx.resolve(&target);
        match ctx.fs.stat(&new_path).await {
            Ok(meta) if meta.file_type.is_dir() => {
                let old = ctx.cwd.to_string_lossy().to_string();
                ctx.env.insert("OLDPWD".to_string(), old);
                ctx.env
                    .insert("PWD".to_string(), new_path.to_string_lossy().to_string());
                *ctx.cwd = new_path;
                if print {
                    Ok(ExecResult::ok(format!("{}\n", ctx.cwd.display())))
                } else {
                    Ok(ExecResult::ok(""))
                }
            }
            Ok(_) => Ok(ExecResult::err(
                format!("-bash: cd: {}: Not a directory\n", target),
                1,
            )),
            Err(_) => Ok(ExecResult::err(
                format!("-bash: cd: {}: No such file or directory\n", target),
                1,
            )),
        }
    }
}

/// The pwd command - print working directory.
pub struct Pwd;

#[async_trait]
impl Command for Pwd {
    async fn start(&mut self, ctx: Context<'_>) -> Result<ExecResult> {
        Ok(ExecResult::ok(format!("{}\n", ctx.cwd.display())))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::commands::testing::TestEnv;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_cd_and_pwd() {
        let mut env = TestEnv::new(&["/tmp"]);
        let result = Cd.start(env.ctx("cd", None)).await.unwrap();
        assert!(result.is_success());
        assert_eq!(env.cwd, PathBuf::from("/tmp"));
        assert_eq!(env.env.get("OLDPWD").unwrap(), "/root");

        let pwd = Pwd.start(env.ctx("pwd", None)).await.unwrap();
        assert_eq!(pwd.stdout, "/tmp\n");
    }

    #[tokio::test]
    async fn test_cd_home_and_dash() {
        let mut env = TestEnv::new(&[]);
        env.cwd = PathBuf::from("/etc");
        Cd.start(env.ctx("cd", None)).await.unwrap();
        assert_eq!(env.cwd, PathBuf::from("/root"));

        env.args = vec!["-".to_string()];
        let back = Cd.start(env.ctx("cd", None)).await.unwrap();
        assert_eq!(back.stdout, "/etc\n");
        assert_eq!(env.cwd, PathBuf::from("/etc"));
    }

    #[tokio::test]
    async fn test_cd_errors() {
        let mut env = TestEnv::new(&["/nonexistent"]);
        let result = Cd.start(env.ctx("cd", None)).await.unwrap();
        assert_eq!(
            result.stderr,
            "-bash: cd: /nonexistent: No such file or directory\n"
        );
        assert_eq!(env.cwd, PathBuf::from("/root"));

        let mut env = TestEnv::new(&["/etc/passwd"]);
        let result = Cd.start(env.ctx("cd", None)).await.unwrap();
        assert_eq!(result.stderr, "-bash: cd: /etc/passwd: Not a directory\n");
    }
}
