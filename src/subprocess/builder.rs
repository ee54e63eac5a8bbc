use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::subprocess::LaunchSpec;

pub struct LaunchSpecBuilder {
    spec: LaunchSpec,
}

impl LaunchSpecBuilder {
    /// Start a spec whose output is captured to `<artifacts_dir>/<stem>-stdout.log`
    /// and `<artifacts_dir>/<stem>-stderr.log`
    pub fn new(executable: impl Into<PathBuf>, artifacts_dir: &Path, stem: &str) -> Self {
        Self {
            spec: LaunchSpec {
                executable: executable.into(),
                args: Vec::new(),
                working_dir: None,
                env: BTreeMap::new(),
                stdout_path: artifacts_dir.join(format!("{}-stdout.log", stem)),
                stderr_path: artifacts_dir.join(format!("{}-stderr.log", stem)),
            },
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.spec.args.push(arg.to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.spec
            .args
            .extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.spec.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            self.spec
                .env
                .insert(key.as_ref().to_string(), value.as_ref().to_string());
        }
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.spec.working_dir = Some(dir.to_path_buf());
        self
    }

    pub fn stdout_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.spec.stdout_path = path.into();
        self
    }

    pub fn stderr_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.spec.stderr_path = path.into();
        self
    }

    pub fn build(self) -> LaunchSpec {
        self.spec
    }
}
