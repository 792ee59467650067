use crate::error::{ErrorKind, Result};
use crate::{Converter, Descriptor};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Arguments used when none are configured: `dnglab convert <input> <output>`.
pub const DEFAULT_ARGS: [&str; 3] = ["convert", "{input}", "{output}"];

const INPUT_PLACEHOLDER: &str = "{input}";
const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Runs an external converter program, one process per file.
///
/// Each argument may contain `{input}` and `{output}` placeholders which are
/// substituted with the file paths for that conversion. An argument that is
/// exactly a placeholder is passed through as a raw [`OsString`], so
/// non-UTF-8 paths survive untouched.
#[derive(Clone, Debug)]
pub struct CommandConverter {
    program: PathBuf,
    args: Vec<String>,
}
impl CommandConverter {
    pub fn new(program: impl Into<PathBuf>, args: impl IntoIterator<Item = impl Into<String>>) -> Result<Self> {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let mentions = |needle: &str| args.iter().any(|arg| arg.contains(needle));
        if !mentions(INPUT_PLACEHOLDER) || !mentions(OUTPUT_PLACEHOLDER) {
            exn::bail!(ErrorKind::InvalidArguments);
        }
        Ok(Self { program: program.into(), args })
    }

    /// Searches `PATH` for a known converter and pairs it with [`DEFAULT_ARGS`].
    pub fn discover() -> Result<Self> {
        // TODO: Adobe DNG Converter takes `-d <dir> <input>` rather than an
        //       output file; needs its own argument template before it can be listed.
        let executables = ["dnglab"];
        for exe in executables {
            if let Ok(path) = which::which(exe) {
                tracing::debug!(converter = %path.display(), "Discovered converter on PATH");
                return Self::new(path, DEFAULT_ARGS);
            }
        }
        tracing::info!("No converter executable found in PATH");
        exn::bail!(ErrorKind::ConverterNotFound);
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn arguments(&self, input: &Path, output: &Path) -> Vec<OsString> {
        self.args
            .iter()
            .map(|arg| match arg.as_str() {
                INPUT_PLACEHOLDER => input.as_os_str().to_os_string(),
                OUTPUT_PLACEHOLDER => output.as_os_str().to_os_string(),
                _ => arg
                    .replace(INPUT_PLACEHOLDER, &input.to_string_lossy())
                    .replace(OUTPUT_PLACEHOLDER, &output.to_string_lossy())
                    .into(),
            })
            .collect()
    }

    /// Turn a finished process into a descriptor. Prefers the last thing the
    /// program complained about on stderr, since that's usually the reason.
    fn describe(output: &Output) -> Descriptor {
        if output.status.success() {
            return Descriptor::success();
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if let Some(line) = stderr.lines().map(str::trim).filter(|l| !l.is_empty()).last() {
            return Descriptor::failure(line);
        }
        match output.status.code() {
            Some(code) => Descriptor::failure(format!("converter exited with code {code}")),
            None => Descriptor::failure("converter terminated by signal"),
        }
    }
}

impl Converter for CommandConverter {
    fn convert(&self, input: &Path, output: &Path) -> Descriptor {
        let result = Command::new(&self.program).args(self.arguments(input, output)).output();
        match result {
            Ok(finished) => {
                let descriptor = Self::describe(&finished);
                tracing::trace!(
                    program = %self.program.display(),
                    status = %finished.status,
                    success = descriptor.is_success(),
                    "Converter process finished"
                );
                descriptor
            },
            Err(e) => Descriptor::failure(format!("failed to launch {}: {e}", self.program.display())),
        }
    }
}
