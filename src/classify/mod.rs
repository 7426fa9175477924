//! Rule-based classification of failing overloads.
//!
//! Given the failure message and one overload of the method that raised it, the
//! classifier picks a replacement or declares the failure unrecognized. Rules only ever
//! see names: message text, type names and the declaring class's interface set.
//!
//! # Standard Rules
//!
//! | Order | Rule | Matches | Verdict |
//! |-------|------|---------|---------|
//! | 1 | `okhttp-pinning` | message starts with the pinning prefix, `(String, _)` | no-op |
//! | 2 | `chain-pass-through` | exact transparency message, one argument | chain pass-through, or unrecognized shape |
//! | 3 | `trust-manager-base` | `checkServerTrusted(X509Certificate[], String): void` | delegate |
//! | 4 | `trust-manager-extended` | `checkServerTrusted(X509Certificate[], String, String): List` | delegate and return chain |
//! | 5 | `trust-manager-unrecognized` | other `checkServerTrusted` on a trust manager | unrecognized signature |
//! | 6 | `default` | anything | unrecognized TLS error |

mod rules;
mod ruleset;
mod verdict;

pub use rules::{ClassResolver, PatchRule, RuleFn, RuleInput};
pub use ruleset::RuleSet;
pub use verdict::{Classification, PatchAction, UnrecognizedReason, Verdict};
