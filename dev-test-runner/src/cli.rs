//! Fixture runner CLI: glob → decode → prepare/check → validate cases.
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use colored::Colorize;
use rayon::prelude::*;

use crate::fixture::{Fixture, Outcome, from_str_with_path};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// run schema/data fixtures against the sjot validator
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    /// fixture files; literal paths or quoted glob patterns
    #[arg(num_args = 1.., default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/*.json"))]
    input: Vec<String>,

    /// only run cases whose name contains this
    #[arg(long)]
    filter: Option<String>,

    /// leave paths out of validation errors
    #[arg(long, default_value_t = false)]
    no_diagnostics: bool,

    /// print every case, not only failures
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

#[derive(Debug, Default)]
struct Report {
    file: PathBuf,
    passed: usize,
    lines: Vec<String>,
    failures: Vec<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        let files = resolve_file_path_patterns(&self.input)?;
        tracing::debug!(files = files.len(), "fixtures resolved");

        let reports: Vec<Report> = files
            .par_iter()
            .map(|path| self.run_file(path).unwrap_or_else(|e| Report::broken(path, format!("{e:#}"))))
            .collect();

        let mut passed = 0;
        let mut failed = 0;
        for r in &reports {
            passed += r.passed;
            failed += r.failures.len();
            let status = if r.failures.is_empty() { "PASS".green() } else { "FAIL".red() };
            println!("{status} {}", r.file.display());
            let shown = if self.verbose { &r.lines } else { &r.failures };
            for line in shown {
                println!("    {line}");
            }
        }
        println!("{} passed, {} failed", passed.to_string().green(), failed.to_string().red());
        if failed > 0 {
            bail!("{failed} fixture case(s) failed");
        }
        Ok(())
    }

    fn run_file(&self, path: &Path) -> anyhow::Result<Report> {
        let src = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let fixture: Fixture =
            from_str_with_path(&src).map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
        let mut report = Report { file: path.to_path_buf(), ..Report::default() };
        if let Some(note) = &fixture.note {
            tracing::trace!(file = %path.display(), note, "running fixture");
        }

        let root = path.parent().unwrap_or(Path::new("."));
        let options = sjot::Options { diagnostics: !self.no_diagnostics, ..sjot::Options::default() };
        let mut sjot = sjot::Sjot::new()
            .with_loader(sjot::FileLoader::new(root))
            .with_options(options);

        let prepared = sjot.add_schema(&fixture.schema).and_then(|_| sjot.check());
        let got = Outcome::of(&prepared);
        report.record("check", fixture.check, got, prepared.err().map(|e| e.to_string()));
        if got != Outcome::Ok {
            return Ok(report);
        }

        for case in &fixture.cases {
            if self.filter.as_deref().is_some_and(|f| !case.name.contains(f)) {
                continue;
            }
            let result = sjot.validate(&case.data, case.type_ref.as_deref());
            let got = Outcome::of(&result);
            match (&result, &case.output) {
                (Ok(out), Some(want)) if got == case.expect && out != want => {
                    report.fail(&case.name, format!("output {out}, expected {want}"));
                }
                _ => report.record(&case.name, case.expect, got, result.err().map(|e| e.to_string())),
            }
        }
        Ok(report)
    }
}

impl Report {
    fn broken(path: &Path, why: String) -> Self {
        Report { file: path.to_path_buf(), failures: vec![why.clone()], lines: vec![why], ..Report::default() }
    }

    fn record(&mut self, name: &str, want: Outcome, got: Outcome, detail: Option<String>) {
        if want == got {
            self.passed += 1;
            self.lines.push(format!("{} {name}", "ok".green()));
        } else {
            let detail = detail.unwrap_or_default();
            self.fail(name, format!("expected {want:?}, got {got:?} {detail}"));
        }
    }

    fn fail(&mut self, name: &str, why: String) {
        let line = format!("{} {name}: {why}", "FAILED".red());
        self.lines.push(line.clone());
        self.failures.push(line);
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();
    for raw in patterns {
        let pattern = raw.as_ref();
        if has_glob_chars(pattern) {
            let before = out.len();
            for entry in glob::glob(pattern)? {
                out.push(entry?);
            }
            if out.len() == before {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }
    out.sort();
    Ok(out)
}
