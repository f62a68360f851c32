use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use itertools::Itertools;
use serde::Deserialize;

use crate::error::ErrorKind;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TestOutput {
    Boolean(bool),
    Number(f64),
    Text(String),
}

// On-disk shape: {"ok": true, "output": ..., "stdout": ...} or {"ok": false, "type": "..."}
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawExpectation {
    ok: bool,
    output: Option<TestOutput>,
    #[serde(rename = "type")]
    error: Option<String>,
    stdout: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(try_from = "RawExpectation")]
pub struct Expectation {
    /// `Ok(None)` means any successful value is accepted
    pub result: Result<Option<TestOutput>, ErrorKind>,
    pub stdout: Option<String>,
}

impl TryFrom<RawExpectation> for Expectation {
    type Error = String;

    fn try_from(raw: RawExpectation) -> Result<Self, Self::Error> {
        let result = match (raw.ok, raw.output, raw.error) {
            (true, output, None) => Ok(output),
            (false, None, Some(error)) => Err(error.parse()?),
            (true, _, Some(_)) => return Err("A successful testcase cannot name an error 'type'".to_owned()),
            (false, _, _) => return Err("A failing testcase needs exactly the key 'type'".to_owned()),
        };

        Ok(Self { result, stdout: raw.stdout })
    }
}

pub struct TestCase {
    pub name: String,
    pub source: String,
    pub expected: Expectation,
}

fn base_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn load_output_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Expectation> {
    let source = std::fs::read(path.as_ref())
        .with_context(|| format!("Reading {}", path.as_ref().display()))?;
    Ok(serde_json::from_slice(&source)?)
}

pub fn load_testcase(name: &str) -> anyhow::Result<TestCase> {
    let input = base_path().join("test_inputs").join(format!("{}.lamb", name));
    let output = base_path().join("test_outputs").join(format!("{}.json", name));

    let source = std::fs::read_to_string(&input)
        .with_context(|| format!("Reading {}", input.display()))?;
    let expected = load_output_file(&output)?;

    Ok(TestCase { name: name.to_owned(), source, expected })
}

/// Names of every program under `test_inputs/`, sorted
pub fn all_testcases() -> anyhow::Result<Vec<String>> {
    let mut names = vec![];
    for entry in std::fs::read_dir(base_path().join("test_inputs"))? {
        let path = entry?.path();
        if path.extension().is_some_and(|extension| extension == "lamb") {
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_owned());
            }
        }
    }

    if names.is_empty() { bail!("No testcases found"); }
    Ok(names.into_iter().sorted().collect_vec())
}
