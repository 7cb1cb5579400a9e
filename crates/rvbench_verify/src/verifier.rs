//! Result verification after completion.

use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

use crate::completion::Completion;
use crate::error::VerifyError;
use crate::golden::GoldenRecord;
use crate::probe::Probe;
use crate::signature::{compare_signature, write_signature, SignaturePointers};

/// What a successful verification established.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Verdict {
    /// One-line description.
    pub summary: String,
    /// Registers compared, in order.
    pub checked: Vec<u8>,
    /// Artifact written during verification.
    pub artifact: Option<PathBuf>,
}

/// Compares live registers with a golden record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoldenRegisterFileVerifier {
    /// Expected values.
    pub record: GoldenRecord,
}

impl GoldenRegisterFileVerifier {
    fn verify(&self, probe: &Probe<'_>) -> Result<Verdict, VerifyError> {
        let mut checked = Vec::with_capacity(self.record.len());
        for entry in self.record.entries() {
            let actual = probe.register_value(entry.index)?;
            if actual != entry.value {
                return Err(VerifyError::Mismatch {
                    index: entry.index,
                    name: entry.name.clone(),
                    expected: entry.value,
                    actual,
                });
            }
            debug!(register = entry.index, value = actual, "register matches");
            checked.push(entry.index);
        }
        Ok(Verdict {
            summary: format!("{} registers match golden values", checked.len()),
            checked,
            artifact: None,
        })
    }
}

/// Dumps the signature region and compares it with a reference file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureFileVerifier {
    /// Pointer locations.
    pub pointers: SignaturePointers,
    /// Where the signature artifact is written.
    pub artifact: PathBuf,
    /// Reference signature.
    pub reference: PathBuf,
}

impl SignatureFileVerifier {
    fn verify(&self, probe: &Probe<'_>) -> Result<Verdict, VerifyError> {
        let memory = probe.memory()?;
        let region = self.pointers.read(memory)?;
        let actual = write_signature(memory, region, &self.artifact)?;
        let expected = fs::read(&self.reference).map_err(|source| VerifyError::Open {
            path: self.reference.clone(),
            source,
        })?;
        compare_signature(actual.as_bytes(), &expected, region.begin)?;
        info!(reference = %self.reference.display(), "signature matches reference");
        Ok(Verdict {
            summary: format!(
                "signature [{:#x}, {:#x}) matches reference",
                region.begin, region.end
            ),
            checked: Vec::new(),
            artifact: Some(self.artifact.clone()),
        })
    }
}

/// How a completed test is judged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultVerifier {
    /// Registers must equal a golden record.
    GoldenRegisters(GoldenRegisterFileVerifier),
    /// The signature must equal a reference file.
    SignatureFile(SignatureFileVerifier),
    /// The completion marker's pass indication decides.
    PassFail,
    /// Nothing to check; completing is passing.
    None,
}

impl ResultVerifier {
    /// Short name for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GoldenRegisters(_) => "golden-registers",
            Self::SignatureFile(_) => "signature-file",
            Self::PassFail => "pass-fail",
            Self::None => "none",
        }
    }

    /// Verifies the state of a completed test.
    pub fn verify(&self, probe: &Probe<'_>, completion: &Completion) -> Result<Verdict, VerifyError> {
        match self {
            Self::GoldenRegisters(v) => v.verify(probe),
            Self::SignatureFile(v) => v.verify(probe),
            Self::PassFail => match completion.passed {
                Some(true) => Ok(Verdict {
                    summary: "pass pattern observed".into(),
                    ..Verdict::default()
                }),
                _ => Err(VerifyError::NotPassed),
            },
            Self::None => Ok(Verdict {
                summary: "ran to completion".into(),
                ..Verdict::default()
            }),
        }
    }
}
