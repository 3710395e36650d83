// process.rs - ink compiler running as a child process
//
// The child gets the entry file's name as the last argument and reads
// `{ "source": "...", "files": { "<include name>": "...", ... } }` on stdin.
// `files` holds every file reachable through `INCLUDE` lines, served by the
// file handler, and is the only place the child may read includes from.
// It answers on stdout with
// `{ "messages": ["ERROR: 'main.ink' line 3: ...", ...], "story": <tree> | null }`.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::{CompilerFactory, CompilerOptions, ErrorType, InkCompiler};
use crate::file_handler::FileAccessError;
use crate::syntax::SyntaxTree;

#[derive(Debug, Clone)]
pub struct ProcessCompilerFactory {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessCompilerFactory {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a command line such as `inklecate --ast-json` on whitespace.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program, parts.map(String::from).collect()))
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }
}

impl CompilerFactory for ProcessCompilerFactory {
    fn create(&self, source: String, options: CompilerOptions) -> Box<dyn InkCompiler> {
        Box::new(ProcessCompiler {
            program: self.program.clone(),
            args: self.args.clone(),
            source,
            options,
        })
    }
}

pub struct ProcessCompiler {
    program: PathBuf,
    args: Vec<String>,
    source: String,
    options: CompilerOptions,
}

#[derive(Debug, Serialize)]
struct CompilerInput<'a> {
    source: &'a str,
    files: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CompilerOutput {
    #[serde(default)]
    messages: Vec<String>,
    #[serde(default)]
    story: Option<serde_json::Value>,
}

impl ProcessCompiler {
    fn run(&mut self) -> Result<CompilerOutput> {
        let source = std::mem::take(&mut self.source);
        let files = self.collect_includes(&source);
        let input = serde_json::to_vec(&CompilerInput {
            source: &source,
            files,
        })
        .context("failed to encode compiler input")?;

        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if self.options.count_all_visits {
            command.arg("--count-all-visits");
        }
        let mut child = command
            .arg(&self.options.source_filename)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start {}", self.program.display()))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("compiler stdin is unavailable"))?;
        let writer = std::thread::spawn(move || stdin.write_all(&input));

        let output = child
            .wait_with_output()
            .context("compiler did not finish")?;
        match writer.join() {
            Ok(Err(err)) => log::debug!("Compiler closed stdin early: {}", err),
            Err(_) => bail!("stdin writer thread panicked"),
            Ok(Ok(())) => {}
        }

        if output.stdout.is_empty() {
            bail!(
                "compiler exited with {} and no output: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        serde_json::from_slice(&output.stdout).context("compiler produced invalid JSON")
    }

    /// Text of every file reachable from `source` through `INCLUDE` lines,
    /// keyed by the name as written.
    ///
    /// Files the handler refuses are reported through the error handler.
    /// Missing files are left for the child to report.
    fn collect_includes(&mut self, source: &str) -> BTreeMap<String, String> {
        let mut files = BTreeMap::new();
        let mut pending: Vec<(Option<String>, u32, String)> = include_directives(source)
            .map(|(line, name)| (None, line, name.to_string()))
            .collect();
        pending.reverse();

        while let Some((including, line, name)) = pending.pop() {
            if files.contains_key(&name) {
                continue;
            }
            let full_name = self.options.file_handler.resolve_ink_filename(&name);
            match self.options.file_handler.load_ink_file_contents(&full_name) {
                Ok(text) => {
                    let nested: Vec<_> = include_directives(&text)
                        .map(|(nested_line, nested_name)| {
                            (Some(name.clone()), nested_line, nested_name.to_string())
                        })
                        .collect();
                    pending.extend(nested.into_iter().rev());
                    files.insert(name, text);
                }
                Err(FileAccessError::NotFound(path)) => {
                    log::debug!("Include {} not found at {}", name, path.display());
                }
                Err(err) => {
                    let location = match &including {
                        Some(file) => format!("'{}' line {}", file, line),
                        None => format!("line {}", line),
                    };
                    let message = format!("ERROR: {}: Failed to load '{}': {}", location, name, err);
                    (self.options.error_handler)(&message, ErrorType::Error);
                }
            }
        }
        files
    }
}

/// `(one-based line, include name)` for each `INCLUDE` line in `text`.
fn include_directives(text: &str) -> impl Iterator<Item = (u32, &str)> {
    text.lines().enumerate().filter_map(|(index, line)| {
        let rest = line.trim_start().strip_prefix("INCLUDE")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let name = rest.split("//").next().unwrap_or(rest).trim();
        (!name.is_empty()).then_some((index as u32 + 1, name))
    })
}

/// Message kind implied by the leading severity tag.
fn message_error_type(message: &str) -> ErrorType {
    if message.starts_with("TODO") {
        ErrorType::Author
    } else if message.starts_with("WARNING") || message.starts_with("RUNTIME WARNING") {
        ErrorType::Warning
    } else {
        ErrorType::Error
    }
}

impl InkCompiler for ProcessCompiler {
    fn parse(&mut self) -> Option<SyntaxTree> {
        let output = match self.run() {
            Ok(output) => output,
            Err(err) => {
                log::error!("Compiler process failed: {:#}", err);
                let message = format!("ERROR: line 1: compiler process failed: {:#}", err);
                (self.options.error_handler)(&message, ErrorType::Error);
                return None;
            }
        };

        for message in &output.messages {
            (self.options.error_handler)(message, message_error_type(message));
        }

        let story = output.story?;
        match serde_json::from_value::<SyntaxTree>(story) {
            Ok(tree) => Some(tree),
            Err(err) => {
                log::warn!("Discarding malformed syntax tree from compiler: {}", err);
                None
            }
        }
    }

    fn generate(&mut self) {
        // The child process already generated code during `parse`.
        log::trace!("Code generation handled by {}", self.program.display());
    }
}
