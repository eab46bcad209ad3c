//! Version algebra for component release and API versions
//!
//! Versions follow the grammar `MAJOR.MINOR.PATCH[stability][N]` where the
//! stability marker is one of `alpha`, `beta`, `RC` or `dev`. A version
//! without a marker is a final (stable) release.
//!
//! All functions here are pure. Malformed input is a hard error: a bad
//! version string would corrupt every computation downstream.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CoreError, Result};

static CANONICAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+\.\d+\.\d+(alpha\d*|beta\d*|RC\d+|dev)?$").expect("valid regex")
});

static PARTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.(\d+)\.(\d+)(?:(alpha|beta|RC|dev)(\d*))?$").expect("valid regex")
});

static TWO_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.(\d+)([^.\d].*)?$").expect("valid regex"));

static LOOSE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+\.\d+\.\d+)[-.]?(?i:(alpha|beta|rc|dev))(\d*)$").expect("valid regex")
});

/// Coarse maturity tag of a release or API version
///
/// Ordered most mature first, so `Stable < Devel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    Stable,
    Beta,
    Alpha,
    Devel,
}

impl Stability {
    /// All stabilities, most mature first
    pub const ALL: [Stability; 4] = [
        Stability::Stable,
        Stability::Beta,
        Stability::Alpha,
        Stability::Devel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stability::Stable => "stable",
            Stability::Beta => "beta",
            Stability::Alpha => "alpha",
            Stability::Devel => "devel",
        }
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stability {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stable" => Ok(Stability::Stable),
            "beta" => Ok(Stability::Beta),
            "alpha" => Ok(Stability::Alpha),
            "devel" | "dev" => Ok(Stability::Devel),
            _ => Err(CoreError::UnknownStability {
                value: s.to_string(),
            }),
        }
    }
}

/// Stability marker embedded in a version string
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Suffix {
    Dev,
    Alpha,
    Beta,
    Rc,
}

impl Suffix {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "dev" => Some(Suffix::Dev),
            "alpha" => Some(Suffix::Alpha),
            "beta" => Some(Suffix::Beta),
            "RC" => Some(Suffix::Rc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Suffix::Dev => "dev",
            Suffix::Alpha => "alpha",
            Suffix::Beta => "beta",
            Suffix::Rc => "RC",
        }
    }

    /// The stability tag a version carrying this marker must declare
    pub fn required_stability(&self) -> Stability {
        match self {
            Suffix::Dev => Stability::Devel,
            Suffix::Alpha => Stability::Alpha,
            Suffix::Beta | Suffix::Rc => Stability::Beta,
        }
    }
}

/// A version split into its components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub suffix: Option<Suffix>,
    pub revision: Option<u64>,
}

impl ParsedVersion {
    /// Parse an already normalized version
    pub fn parse(version: &str) -> Result<Self> {
        let invalid = || CoreError::InvalidVersion {
            version: version.to_string(),
        };
        let caps = PARTS.captures(version).ok_or_else(invalid)?;
        let number = |i: usize| caps[i].parse::<u64>().map_err(|_| invalid());

        let suffix = caps.get(4).and_then(|m| Suffix::parse(m.as_str()));
        let revision = match caps.get(5).map(|m| m.as_str()) {
            Some(n) if !n.is_empty() => Some(n.parse::<u64>().map_err(|_| invalid())?),
            _ => None,
        };

        Ok(Self {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
            suffix,
            revision,
        })
    }

    /// `MAJOR.MINOR.PATCH` without any stability marker
    pub fn base(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }

    pub fn is_final(&self) -> bool {
        self.suffix.is_none()
    }
}

/// `n + 1`, or an invalid version error when `n` is already at the limit
fn bump(n: u64, version: &str) -> Result<u64> {
    n.checked_add(1).ok_or_else(|| CoreError::InvalidVersion {
        version: version.to_string(),
    })
}

impl fmt::Display for ParsedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base())?;
        if let Some(suffix) = self.suffix {
            write!(f, "{}", suffix.as_str())?;
        }
        if let Some(revision) = self.revision {
            write!(f, "{}", revision)?;
        }
        Ok(())
    }
}

/// Normalize a version string to the canonical grammar
///
/// Accepts legacy spellings: two-part versions (`1.2`, `1.2RC1`,
/// `1.2-beta`), upper/lower-cased or hyphenated stability markers and a
/// trailing `-git` development marker (which is stripped).
pub fn validate(raw: &str) -> Result<String> {
    let mut version = raw.trim().to_string();

    if let Some(stripped) = version.strip_suffix("-git") {
        version = stripped.to_string();
    }

    if let Some(caps) = TWO_PART.captures(&version) {
        version = format!(
            "{}.{}.0{}",
            &caps[1],
            &caps[2],
            caps.get(3).map(|m| m.as_str()).unwrap_or("")
        );
    }

    if let Some(caps) = LOOSE_MARKER.captures(&version) {
        let marker = match caps[2].to_ascii_lowercase().as_str() {
            "rc" => "RC".to_string(),
            other => other.to_string(),
        };
        version = format!("{}{}{}", &caps[1], marker, &caps[3]);
    }

    if CANONICAL.is_match(&version) {
        Ok(version)
    } else {
        Err(CoreError::InvalidVersion {
            version: raw.to_string(),
        })
    }
}

/// Check that a release version agrees with its declared stability
pub fn validate_release_stability(version: &str, stability: Stability) -> Result<()> {
    check_stability("release", version, stability)
}

/// Check that an API version agrees with its declared stability
pub fn validate_api_stability(version: &str, stability: Stability) -> Result<()> {
    check_stability("api", version, stability)
}

fn check_stability(kind: &'static str, version: &str, stability: Stability) -> Result<()> {
    if implied_stability(version)? == stability {
        Ok(())
    } else {
        Err(CoreError::StabilityMismatch {
            kind,
            version: version.to_string(),
            stability: stability.to_string(),
        })
    }
}

/// The only stability `version` may legally declare
pub fn implied_stability(version: &str) -> Result<Stability> {
    let parsed = ParsedVersion::parse(&validate(version)?)?;
    Ok(parsed
        .suffix
        .map(|s| s.required_stability())
        .unwrap_or(Stability::Stable))
}

/// Development version following `version`
///
/// Final versions advance PATCH; pre-releases keep their PATCH. Both get
/// the `-git` development marker: `1.2.3` becomes `1.2.4-git`,
/// `1.2.3alpha1` becomes `1.2.3-git`.
pub fn next_version(version: &str) -> Result<String> {
    let mut parsed = ParsedVersion::parse(&validate(version)?)?;
    if parsed.is_final() {
        parsed.patch = bump(parsed.patch, version)?;
    }
    Ok(format!("{}-git", parsed.base()))
}

/// Next release in the same line
///
/// Final versions advance PATCH, pre-releases advance their sub-revision
/// (a missing sub-revision counts as 1). Never both. A `dev` snapshot
/// carries no sub-revision, so it moves on to the first alpha of the
/// same base: `1.2.3dev` becomes `1.2.3alpha1`.
pub fn next_pear_style_version(version: &str) -> Result<String> {
    let mut parsed = ParsedVersion::parse(&validate(version)?)?;
    match parsed.suffix {
        None => parsed.patch = bump(parsed.patch, version)?,
        Some(Suffix::Dev) => {
            parsed.suffix = Some(Suffix::Alpha);
            parsed.revision = Some(1);
        }
        Some(_) => parsed.revision = Some(bump(parsed.revision.unwrap_or(1), version)?),
    }
    Ok(parsed.to_string())
}

/// First final release of the next minor line
pub fn next_minor_version(version: &str) -> Result<String> {
    let parsed = ParsedVersion::parse(&validate(version)?)?;
    Ok(format!("{}.{}.0", parsed.major, bump(parsed.minor, version)?))
}

/// Compare two versions
///
/// `dev < alpha < beta < RC < final` within the same `MAJOR.MINOR.PATCH`;
/// a missing sub-revision counts as zero.
pub fn compare(a: &str, b: &str) -> Result<Ordering> {
    let a = ParsedVersion::parse(&validate(a)?)?;
    let b = ParsedVersion::parse(&validate(b)?)?;
    Ok(compare_parsed(&a, &b))
}

fn compare_parsed(a: &ParsedVersion, b: &ParsedVersion) -> Ordering {
    // Final releases sort above every pre-release of the same base
    fn rank(v: &ParsedVersion) -> u8 {
        match v.suffix {
            Some(Suffix::Dev) => 0,
            Some(Suffix::Alpha) => 1,
            Some(Suffix::Beta) => 2,
            Some(Suffix::Rc) => 3,
            None => 4,
        }
    }

    (a.major, a.minor, a.patch)
        .cmp(&(b.major, b.minor, b.patch))
        .then_with(|| rank(a).cmp(&rank(b)))
        .then_with(|| a.revision.unwrap_or(0).cmp(&b.revision.unwrap_or(0)))
}

/// A legacy `{min, max, exclude}` dependency constraint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,
}

impl LegacyConstraint {
    /// Constraint that accepts any version
    pub fn any() -> Self {
        Self::default()
    }

    pub fn is_unconstrained(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.exclude.is_none()
    }
}

impl fmt::Display for LegacyConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unconstrained() {
            return f.write_str("*");
        }
        let mut parts = Vec::new();
        if let Some(min) = &self.min {
            parts.push(format!(">= {}", min));
        }
        if let Some(max) = &self.max {
            if self.min.as_ref() == Some(max) {
                return write!(f, "= {}", max);
            }
            parts.push(format!("<= {}", max));
        }
        if let Some(exclude) = &self.exclude {
            parts.push(format!("!= {}", exclude));
        }
        f.write_str(&parts.join(", "))
    }
}

/// Convert a composer-style constraint into a legacy constraint
///
/// Supported shapes: `*`, a bare `X.Y.Z` pin, and one or more caret
/// alternatives joined by `||`. The upper bound excludes the next major
/// line through an `alpha1` tie-breaker: `^1.2.3` yields
/// `min = 1.2.3, max = exclude = 2.0.0alpha1`.
pub fn composer_style_to_legacy_constraint(expr: &str) -> Result<LegacyConstraint> {
    let unsupported = || CoreError::UnsupportedConstraintFormat {
        constraint: expr.to_string(),
    };
    let expr = expr.trim();

    if expr == "*" {
        return Ok(LegacyConstraint::any());
    }

    if !expr.contains('^') && !expr.contains("||") {
        if PARTS.is_match(expr) && !expr.chars().any(|c| c.is_ascii_alphabetic()) {
            return Ok(LegacyConstraint {
                min: Some(expr.to_string()),
                max: Some(expr.to_string()),
                exclude: None,
            });
        }
        return Err(unsupported());
    }

    let mut alternatives = Vec::new();
    for alternative in expr.split("||").map(str::trim) {
        let Some(version) = alternative.strip_prefix('^') else {
            return Err(unsupported());
        };
        let padded = pad_version(version.trim()).ok_or_else(unsupported)?;
        let parsed = ParsedVersion::parse(&padded).map_err(|_| unsupported())?;
        alternatives.push(parsed);
    }

    alternatives.sort_by(compare_parsed);
    let (Some(lowest), Some(highest)) = (alternatives.first(), alternatives.last()) else {
        return Err(unsupported());
    };

    let next_major = highest.major.checked_add(1).ok_or_else(unsupported)?;
    let upper = format!("{next_major}.0.0alpha1");
    Ok(LegacyConstraint {
        min: Some(lowest.to_string()),
        max: Some(upper.clone()),
        exclude: Some(upper),
    })
}

/// Pad the numeric head of a version to three parts (`2` becomes `2.0.0`)
///
/// `None` for an empty head, an empty part (`1..2`) or more than three parts.
fn pad_version(version: &str) -> Option<String> {
    let split = version
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(version.len());
    let (numbers, rest) = version.split_at(split);
    let mut parts: Vec<&str> = numbers.split('.').collect();
    if parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    while parts.len() < 3 {
        parts.push("0");
    }
    Some(format!("{}{}", parts.join("."), rest))
}

/// Human readable label of a version for external trackers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketDescription {
    /// `MAJOR.MINOR.PATCH`
    pub base: String,
    /// `Final`, `Release Candidate`, `Alpha` or `Beta`
    pub label: &'static str,
    pub revision: Option<u64>,
}

impl fmt::Display for TicketDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.base, self.label)?;
        if let Some(revision) = self.revision {
            write!(f, " {}", revision)?;
        }
        Ok(())
    }
}

/// Split a version into base number, stability label and sub-revision
pub fn ticket_description(version: &str) -> Result<TicketDescription> {
    let parsed = ParsedVersion::parse(&validate(version)?)?;
    let label = match parsed.suffix {
        None => "Final",
        Some(Suffix::Rc) => "Release Candidate",
        Some(Suffix::Beta) => "Beta",
        Some(Suffix::Alpha) | Some(Suffix::Dev) => "Alpha",
    };
    Ok(TicketDescription {
        base: parsed.base(),
        label,
        revision: parsed.revision,
    })
}
