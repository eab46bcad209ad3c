//! Per-component instruction overrides
//!
//! Rules pair a selector with a set of instructions. For a given component
//! every matching rule is applied from least to most specific; a more
//! specific rule first clears the mutually exclusive groups it touches and
//! then adds its own instructions.
//!
//! Selectors, least specific first:
//! - `ALL`
//! - `channel:<channel>`
//! - `<name>`
//! - `<channel>/<name>`

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::version::Stability;

/// A single instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Instruction {
    /// Always take the dependency, even if optional
    Include,
    /// Never take the dependency
    Exclude,
    /// Prefer a local source checkout
    Git,
    /// Prefer a local archive snapshot
    Snapshot,
    /// Take a remote release at this stability
    Remote(Stability),
    /// Do not descend into the dependencies of this node
    NoDeps,
}

impl Instruction {
    fn group(&self) -> Option<Group> {
        match self {
            Instruction::Include | Instruction::Exclude => Some(Group::Selection),
            Instruction::Git | Instruction::Snapshot | Instruction::Remote(_) => {
                Some(Group::Source)
            }
            Instruction::NoDeps => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Instruction::Include => "include",
            Instruction::Exclude => "exclude",
            Instruction::Git => "git",
            Instruction::Snapshot => "snapshot",
            Instruction::Remote(s) => s.as_str(),
            Instruction::NoDeps => "nodeps",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Instruction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "include" => Ok(Instruction::Include),
            "exclude" => Ok(Instruction::Exclude),
            "git" => Ok(Instruction::Git),
            "snapshot" => Ok(Instruction::Snapshot),
            "nodeps" => Ok(Instruction::NoDeps),
            other => other
                .parse::<Stability>()
                .map(Instruction::Remote)
                .map_err(|_| CoreError::InvalidInstruction {
                    message: format!("unknown instruction '{}'", other),
                }),
        }
    }
}

/// Groups whose members cancel each other out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Selection,
    Source,
}

/// Instructions applying to one component
///
/// Source instructions keep their declaration order because it doubles as
/// the resolution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionSet {
    items: Vec<Instruction>,
}

impl InstructionSet {
    pub fn new(items: impl IntoIterator<Item = Instruction>) -> Self {
        let mut set = Self::default();
        for item in items {
            set.push(item);
        }
        set
    }

    fn push(&mut self, item: Instruction) {
        if !self.items.contains(&item) {
            self.items.push(item);
        }
    }

    pub fn contains(&self, item: Instruction) -> bool {
        self.items.contains(&item)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.items.iter()
    }

    /// Source instructions in declaration order
    pub fn sources(&self) -> Vec<Instruction> {
        self.items
            .iter()
            .copied()
            .filter(|i| i.group() == Some(Group::Source))
            .collect()
    }

    /// Merge a more specific set into this one
    pub fn override_with(&mut self, other: &InstructionSet) {
        let touched: Vec<Group> = other.items.iter().filter_map(|i| i.group()).collect();
        self.items
            .retain(|i| i.group().is_none_or(|g| !touched.contains(&g)));
        for item in &other.items {
            self.push(*item);
        }
    }
}

impl FromStr for InstructionSet {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let items = s
            .split(',')
            .filter(|p| !p.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Instruction>>>()?;
        Ok(Self::new(items))
    }
}

impl fmt::Display for InstructionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.items.iter().map(|i| i.as_str()).collect();
        f.write_str(&names.join(","))
    }
}

impl Serialize for InstructionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.iter().map(|i| i.as_str()))
    }
}

impl<'de> Deserialize<'de> for InstructionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        let items = raw
            .iter()
            .map(|s| s.parse::<Instruction>())
            .collect::<Result<Vec<_>>>()
            .map_err(serde::de::Error::custom)?;
        Ok(Self::new(items))
    }
}

/// Which components a rule applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    All,
    Channel(String),
    Name(String),
    Exact { channel: String, name: String },
}

impl Selector {
    /// Higher is more specific
    pub fn specificity(&self) -> u8 {
        match self {
            Selector::All => 0,
            Selector::Channel(_) => 1,
            Selector::Name(_) => 2,
            Selector::Exact { .. } => 3,
        }
    }

    pub fn matches(&self, channel: &str, name: &str) -> bool {
        match self {
            Selector::All => true,
            Selector::Channel(c) => c == channel,
            Selector::Name(n) => n == name,
            Selector::Exact { channel: c, name: n } => c == channel && n == name,
        }
    }
}

impl FromStr for Selector {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CoreError::InvalidInstruction {
                message: "empty selector".to_string(),
            });
        }
        if s == "ALL" {
            return Ok(Selector::All);
        }
        if let Some(channel) = s.strip_prefix("channel:") {
            return Ok(Selector::Channel(channel.to_string()));
        }
        if let Some((channel, name)) = s.rsplit_once('/') {
            return Ok(Selector::Exact {
                channel: channel.to_string(),
                name: name.to_string(),
            });
        }
        Ok(Selector::Name(s.to_string()))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::All => f.write_str("ALL"),
            Selector::Channel(c) => write!(f, "channel:{}", c),
            Selector::Name(n) => f.write_str(n),
            Selector::Exact { channel, name } => write!(f, "{}/{}", channel, name),
        }
    }
}

/// One selector/instructions pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionRule {
    pub selector: Selector,
    pub instructions: InstructionSet,
}

impl FromStr for InstructionRule {
    type Err = CoreError;

    /// Parse `SELECTOR=instr,instr`
    fn from_str(s: &str) -> Result<Self> {
        let (selector, instructions) =
            s.split_once('=').ok_or_else(|| CoreError::InvalidInstruction {
                message: format!("expected SELECTOR=INSTRUCTIONS, got '{}'", s),
            })?;
        Ok(Self {
            selector: selector.parse()?,
            instructions: instructions.parse()?,
        })
    }
}

/// Ordered rule list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionRules {
    rules: Vec<InstructionRule>,
}

impl InstructionRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: InstructionRule) {
        self.rules.push(rule);
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn extend(&mut self, other: InstructionRules) {
        self.rules.extend(other.rules);
    }

    /// Effective instructions for a component
    pub fn applicable(&self, channel: &str, name: &str) -> InstructionSet {
        let mut matching: Vec<&InstructionRule> = self
            .rules
            .iter()
            .filter(|r| r.selector.matches(channel, name))
            .collect();
        // Stable sort keeps declaration order within one specificity
        matching.sort_by_key(|r| r.selector.specificity());

        let mut result = InstructionSet::default();
        for rule in matching {
            result.override_with(&rule.instructions);
        }
        result
    }
}

impl FromIterator<InstructionRule> for InstructionRules {
    fn from_iter<T: IntoIterator<Item = InstructionRule>>(iter: T) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

impl Serialize for InstructionRules {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.rules.len()))?;
        for rule in &self.rules {
            map.serialize_entry(&rule.selector.to_string(), &rule.instructions)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for InstructionRules {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = indexmap::IndexMap::<String, InstructionSet>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(selector, instructions)| {
                let selector = selector
                    .parse::<Selector>()
                    .map_err(serde::de::Error::custom)?;
                Ok::<_, D::Error>(InstructionRule {
                    selector,
                    instructions,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(specs: &[&str]) -> InstructionRules {
        specs.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[test]
    fn test_parse_selectors() {
        assert_eq!("ALL".parse::<Selector>().unwrap(), Selector::All);
        assert_eq!(
            "channel:pear.example.org".parse::<Selector>().unwrap(),
            Selector::Channel("pear.example.org".to_string())
        );
        assert_eq!(
            "pear.example.org/Util".parse::<Selector>().unwrap(),
            Selector::Exact {
                channel: "pear.example.org".to_string(),
                name: "Util".to_string()
            }
        );
        assert_eq!(
            "Util".parse::<Selector>().unwrap(),
            Selector::Name("Util".to_string())
        );
    }

    #[test]
    fn test_more_specific_wins() {
        let rules = rules(&[
            "pear.example.org/Util=exclude",
            "ALL=include,git",
            "channel:pear.example.org=stable",
        ]);

        let set = rules.applicable("pear.example.org", "Util");
        assert!(set.contains(Instruction::Exclude));
        assert!(!set.contains(Instruction::Include));
        assert_eq!(set.sources(), vec![Instruction::Remote(Stability::Stable)]);

        let other = rules.applicable("pear.example.org", "Mime");
        assert!(other.contains(Instruction::Include));
        assert!(!other.contains(Instruction::Git));

        let foreign = rules.applicable("pecl.example.org", "Mime");
        assert!(foreign.contains(Instruction::Include));
        assert_eq!(foreign.sources(), vec![Instruction::Git]);
    }

    #[test]
    fn test_unrelated_groups_survive() {
        let rules = rules(&["ALL=nodeps,snapshot", "Util=include"]);
        let set = rules.applicable("any", "Util");
        assert!(set.contains(Instruction::NoDeps));
        assert!(set.contains(Instruction::Snapshot));
        assert!(set.contains(Instruction::Include));
    }

    #[test]
    fn test_later_rule_of_same_specificity_wins() {
        let rules = rules(&["Util=include", "Util=exclude"]);
        let set = rules.applicable("any", "Util");
        assert!(set.contains(Instruction::Exclude));
        assert!(!set.contains(Instruction::Include));
    }

    #[test]
    fn test_invalid_rules() {
        assert!("Util".parse::<InstructionRule>().is_err());
        assert!("Util=sometimes".parse::<InstructionRule>().is_err());
        assert!("=include".parse::<InstructionRule>().is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let yaml = "ALL: [git, stable]\nchannel:pecl.example.org: [exclude]\n";
        let rules: InstructionRules = serde_yaml::from_str(yaml).unwrap();
        let set = rules.applicable("pecl.example.org", "x");
        assert!(set.contains(Instruction::Exclude));
        assert_eq!(
            set.sources(),
            vec![Instruction::Git, Instruction::Remote(Stability::Stable)]
        );
        assert!(serde_yaml::to_string(&rules).unwrap().contains("ALL"));
    }
}
