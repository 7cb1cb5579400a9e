//! Completion detection and result verification for rvbench.
//!
//! Test families differ only in how they signal that they are done and in
//! how their outcome is judged. Both axes are closed sets of variants:
//! [`CompletionStrategy`] and [`ResultVerifier`]. Each reads design state
//! through a [`Probe`], which also fixes the policy for undefined registers.

#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod golden;
pub mod probe;
pub mod signature;
pub mod verifier;

pub use completion::{Completion, CompletionStrategy, FixedQuiescence, RegisterPattern, SignatureWatch};
pub use error::VerifyError;
pub use golden::{GoldenEntry, GoldenRecord};
pub use probe::{Probe, UndefinedPolicy};
pub use signature::{
    compare_signature, compare_signature_files, dump_signature, write_signature,
    SignaturePointers, SignatureRegion, DEFAULT_BEGIN_PTR, DEFAULT_END_PTR,
};
pub use verifier::{GoldenRegisterFileVerifier, ResultVerifier, SignatureFileVerifier, Verdict};
