//! Version command - expose the version algebra

use clap::ValueEnum;

use wharf_core::version;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VersionOp {
    /// Normalize and validate a version
    Validate,
    /// Next development version (`1.2.4-git`)
    Next,
    /// Next release in the same stability line
    NextPear,
    /// Next minor version
    NextMinor,
    /// Stability implied by the version suffix
    Stability,
    /// Label used when registering the version with a tracker
    Ticket,
    /// Convert a composer-style constraint to a legacy one
    Convert,
}

/// Apply `op` to `value`
pub fn evaluate(op: VersionOp, value: &str) -> Result<String> {
    Ok(match op {
        VersionOp::Validate => version::validate(value)?,
        VersionOp::Next => version::next_version(value)?,
        VersionOp::NextPear => version::next_pear_style_version(value)?,
        VersionOp::NextMinor => version::next_minor_version(value)?,
        VersionOp::Stability => version::implied_stability(value)?.to_string(),
        VersionOp::Ticket => version::ticket_description(value)?.to_string(),
        VersionOp::Convert => version::composer_style_to_legacy_constraint(value)?.to_string(),
    })
}

pub fn run(op: VersionOp, value: &str) -> Result<()> {
    println!("{}", evaluate(op, value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate() {
        assert_eq!(evaluate(VersionOp::Validate, "1.2RC1").unwrap(), "1.2.0RC1");
        assert_eq!(evaluate(VersionOp::Next, "1.2.3").unwrap(), "1.2.4-git");
        assert_eq!(evaluate(VersionOp::NextPear, "1.2.3alpha1").unwrap(), "1.2.3alpha2");
        assert_eq!(evaluate(VersionOp::Stability, "1.2.3beta2").unwrap(), "beta");
        assert_eq!(evaluate(VersionOp::Ticket, "2.0.0RC1").unwrap(), "2.0.0 Release Candidate 1");
        assert_eq!(evaluate(VersionOp::Convert, "*").unwrap(), "*");
        assert_eq!(
            evaluate(VersionOp::Convert, "^1.2.3").unwrap(),
            ">= 1.2.3, <= 2.0.0alpha1, != 2.0.0alpha1"
        );
        assert!(evaluate(VersionOp::Validate, "1.x").is_err());
    }
}
