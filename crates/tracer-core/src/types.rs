//! Core domain types for a TRACER case.
//!
//! A case documents the network elements a threat's traffic traversed between
//! a source and a destination address. These types define the persisted
//! document shape shared by every storage backend and transport.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CoreError, Result};
use crate::path::NetworkPath;

// ── Case Identifier ───────────────────────────────────────────────

/// Identifier of a case, `CASE_<YYYYMMDD>_<HHMMSS>` with an optional
/// numeric suffix when two cases share the same second.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct CaseId(String);

impl CaseId {
    /// Derive an identifier from a creation timestamp.
    pub fn from_timestamp(at: DateTime<Utc>) -> Self {
        Self(at.format("CASE_%Y%m%d_%H%M%S").to_string())
    }

    /// The same identifier with a `_<n>` disambiguation suffix.
    pub fn with_suffix(&self, n: u32) -> Self {
        Self(format!("{}_{n}", self.0))
    }

    /// Parse an externally supplied identifier.
    ///
    /// Identifiers double as file names, so only ASCII alphanumerics,
    /// `_` and `-` are accepted.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CoreError::Validation("case id must not be empty".into()));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(CoreError::Validation(format!(
                "case id '{raw}' contains characters outside [A-Za-z0-9_-]"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CaseId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CaseId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<CaseId> for String {
    fn from(id: CaseId) -> Self {
        id.0
    }
}

// ── Element Type ──────────────────────────────────────────────────

/// The kind of appliance a hop represents.
///
/// `Other` carries the analyst's free-text label so novel appliance types
/// are accepted while the known ones stay exhaustively matchable. The text
/// form is the lower-case keyword, or `other:<label>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ElementType {
    Firewall,
    Switch,
    Router,
    Ndr,
    IdsIps,
    Wap,
    Proxy,
    Other(String),
}

impl ElementType {
    /// Keywords accepted on input, in menu order.
    pub const KEYWORDS: &'static [&'static str] = &[
        "firewall", "switch", "router", "ndr", "ids_ips", "wap", "proxy", "other",
    ];

    /// Build the free-text variant. A label naming a known type resolves to
    /// that type instead, so `Other` never shadows a known keyword.
    pub fn other(label: impl Into<String>) -> Result<Self> {
        let label = label.into().trim().to_string();
        if label.is_empty() {
            return Err(CoreError::Validation(
                "element type label must not be empty".into(),
            ));
        }
        Ok(Self::from_keyword(&label.to_lowercase()).unwrap_or(Self::Other(label)))
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "firewall" => Some(Self::Firewall),
            "switch" => Some(Self::Switch),
            "router" => Some(Self::Router),
            "ndr" => Some(Self::Ndr),
            "ids_ips" | "ids/ips" | "idsips" | "ids" | "ips" => Some(Self::IdsIps),
            "wap" | "access_point" => Some(Self::Wap),
            "proxy" => Some(Self::Proxy),
            _ => None,
        }
    }

    /// The canonical lower-case keyword.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Firewall => "firewall",
            Self::Switch => "switch",
            Self::Router => "router",
            Self::Ndr => "ndr",
            Self::IdsIps => "ids_ips",
            Self::Wap => "wap",
            Self::Proxy => "proxy",
            Self::Other(_) => "other",
        }
    }

    /// Upper-case label used in rendered diagrams.
    pub fn label(&self) -> String {
        match self {
            Self::Firewall => "FIREWALL".to_string(),
            Self::Switch => "SWITCH".to_string(),
            Self::Router => "ROUTER".to_string(),
            Self::Ndr => "NDR".to_string(),
            Self::IdsIps => "IDS/IPS".to_string(),
            Self::Wap => "WAP".to_string(),
            Self::Proxy => "PROXY".to_string(),
            Self::Other(label) => label.to_uppercase(),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(label) => write!(f, "other:{label}"),
            known => f.write_str(known.keyword()),
        }
    }
}

impl FromStr for ElementType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let lower = trimmed.to_lowercase();

        if let Some(known) = Self::from_keyword(&lower) {
            return Ok(known);
        }

        let has_other_prefix = trimmed
            .get(..6)
            .is_some_and(|p| p.eq_ignore_ascii_case("other:"));
        if has_other_prefix {
            return Self::other(&trimmed[6..]);
        }

        if lower == "other" {
            return Err(CoreError::Validation(
                "element type 'other' requires a label: other:<label>".into(),
            ));
        }

        Err(CoreError::Validation(format!(
            "unrecognized element type '{trimmed}' (expected one of: {}; use other:<label> for anything else)",
            Self::KEYWORDS[..Self::KEYWORDS.len() - 1].join(", ")
        )))
    }
}

impl TryFrom<String> for ElementType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ElementType> for String {
    fn from(t: ElementType) -> Self {
        t.to_string()
    }
}

// ── Movement Type ─────────────────────────────────────────────────

/// How the threat moved through an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    /// Traffic passed along the intended path.
    #[default]
    #[serde(alias = "direct_traversal")]
    Direct,
    /// The threat moved between segments or hosts via this element.
    #[serde(alias = "lateral_movement")]
    Lateral,
}

impl MovementType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Direct => "Direct Traversal",
            Self::Lateral => "Lateral Movement",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Lateral => f.write_str("lateral"),
        }
    }
}

impl FromStr for MovementType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "direct" | "direct_traversal" => Ok(Self::Direct),
            "lateral" | "lateral_movement" => Ok(Self::Lateral),
            other => Err(CoreError::Validation(format!(
                "unrecognized movement type '{other}' (expected direct or lateral)"
            ))),
        }
    }
}

// ── Information Entries ───────────────────────────────────────────

/// Which side of an element an information entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfoSide {
    Source,
    Destination,
}

impl fmt::Display for InfoSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Destination => f.write_str("destination"),
        }
    }
}

impl FromStr for InfoSide {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "source" | "src" => Ok(Self::Source),
            "destination" | "dest" | "dst" => Ok(Self::Destination),
            other => Err(CoreError::Validation(format!(
                "unrecognized side '{other}' (expected source or destination)"
            ))),
        }
    }
}

/// Insertion-ordered key/value entries recorded on one side of an element.
///
/// Serialized as a JSON object whose keys keep the order they were added in.
/// Entries are append-only: a key can be recorded once per side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoMap {
    entries: Vec<(String, String)>,
}

impl InfoMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from pairs, rejecting empty or repeated keys.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = Self::new();
        for (key, value) in pairs {
            map.insert(key, value)?;
        }
        Ok(map)
    }

    /// Append an entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(CoreError::Validation("entry key must not be empty".into()));
        }
        if self.get(&key).is_some() {
            return Err(CoreError::Validation(format!(
                "entry '{key}' is already recorded"
            )));
        }
        self.entries.push((key, value.into()));
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Entries in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for InfoMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for InfoMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct InfoMapVisitor;

        impl<'de> Visitor<'de> for InfoMapVisitor {
            type Value = InfoMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of string entries")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<InfoMap, A::Error> {
                let mut map = InfoMap::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    map.insert(key, value).map_err(serde::de::Error::custom)?;
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(InfoMapVisitor)
    }
}

// ── Network Element ───────────────────────────────────────────────

/// One hop the threat traffic passed through.
///
/// Elements carry no position of their own: position is a projection of
/// their place in the [`NetworkPath`] sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkElement {
    pub element_type: ElementType,
    /// Analyst-supplied identifier; need not be unique within a case.
    pub name: String,
    pub movement_type: MovementType,
    #[serde(default)]
    pub source_info: InfoMap,
    #[serde(default, skip_serializing_if = "InfoMap::is_empty")]
    pub destination_info: InfoMap,
}

impl NetworkElement {
    /// Create an element with no information entries.
    pub fn new(
        element_type: ElementType,
        name: impl Into<String>,
        movement_type: MovementType,
    ) -> Result<Self> {
        let element = Self {
            element_type,
            name: name.into().trim().to_string(),
            movement_type,
            source_info: InfoMap::new(),
            destination_info: InfoMap::new(),
        };
        element.validate()?;
        Ok(element)
    }

    /// Builder-style variant of [`NetworkElement::add_entry`].
    pub fn with_entry(
        mut self,
        side: InfoSide,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self> {
        self.add_entry(side, key, value)?;
        Ok(self)
    }

    /// Append an information entry to one side of the element.
    pub fn add_entry(
        &mut self,
        side: InfoSide,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        match side {
            InfoSide::Source => self.source_info.insert(key, value),
            InfoSide::Destination => self.destination_info.insert(key, value),
        }
    }

    pub fn info(&self, side: InfoSide) -> &InfoMap {
        match side {
            InfoSide::Source => &self.source_info,
            InfoSide::Destination => &self.destination_info,
        }
    }

    pub fn is_lateral(&self) -> bool {
        self.movement_type == MovementType::Lateral
    }

    /// Check invariants that deserialization alone cannot enforce.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::Validation(
                "element name must not be empty".into(),
            ));
        }
        Ok(())
    }
}

// ── Case ──────────────────────────────────────────────────────────

/// One documented incident investigation.
///
/// The analysis summary is deliberately absent: it is always recomputed
/// from the element sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub case_id: CaseId,
    pub threat_type: String,
    #[serde(flatten)]
    pub path: NetworkPath,
    pub created_at: DateTime<Utc>,
}

impl Case {
    pub fn new(
        case_id: CaseId,
        threat_type: impl Into<String>,
        path: NetworkPath,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            case_id,
            threat_type: threat_type.into(),
            path,
            created_at,
        }
    }

    pub fn element_count(&self) -> usize {
        self.path.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn case_id_from_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 10, 15, 14, 30, 5).unwrap();
        let id = CaseId::from_timestamp(at);
        assert_eq!(id.as_str(), "CASE_20241015_143005");
        assert_eq!(id.with_suffix(2).as_str(), "CASE_20241015_143005_2");
    }

    #[test]
    fn case_id_rejects_path_characters() {
        assert!(CaseId::parse("../etc/passwd").is_err());
        assert!(CaseId::parse("").is_err());
        assert!(CaseId::parse("CASE_20241015_143005").is_ok());
    }

    #[test]
    fn element_type_parses_keywords_and_aliases() {
        assert_eq!("Firewall".parse::<ElementType>().unwrap(), ElementType::Firewall);
        assert_eq!("IDS/IPS".parse::<ElementType>().unwrap(), ElementType::IdsIps);
        assert_eq!("ids_ips".parse::<ElementType>().unwrap(), ElementType::IdsIps);
        assert_eq!("wap".parse::<ElementType>().unwrap(), ElementType::Wap);
    }

    #[test]
    fn element_type_other_keeps_label() {
        let t: ElementType = "other:NAC Appliance".parse().unwrap();
        assert_eq!(t, ElementType::Other("NAC Appliance".to_string()));
        assert_eq!(t.label(), "NAC APPLIANCE");
        assert_eq!(t.to_string(), "other:NAC Appliance");
    }

    #[test]
    fn element_type_other_resolves_known_label() {
        assert_eq!(ElementType::other("Router").unwrap(), ElementType::Router);
    }

    #[test]
    fn element_type_rejects_unknown_and_bare_other() {
        assert!(matches!(
            "toaster".parse::<ElementType>(),
            Err(CoreError::Validation(_))
        ));
        assert!("other".parse::<ElementType>().is_err());
        assert!("other:   ".parse::<ElementType>().is_err());
    }

    #[test]
    fn element_type_serializes_as_text() {
        let json = serde_json::to_string(&ElementType::IdsIps).unwrap();
        assert_eq!(json, "\"ids_ips\"");
        let other: ElementType = serde_json::from_str("\"other:Load Balancer\"").unwrap();
        assert_eq!(other, ElementType::Other("Load Balancer".to_string()));
    }

    #[test]
    fn movement_type_accepts_long_forms() {
        let m: MovementType = serde_json::from_str("\"lateral_movement\"").unwrap();
        assert_eq!(m, MovementType::Lateral);
        assert_eq!("direct_traversal".parse::<MovementType>().unwrap(), MovementType::Direct);
        assert!("sideways".parse::<MovementType>().is_err());
    }

    #[test]
    fn info_map_preserves_insertion_order() {
        let map = InfoMap::from_pairs([("port", "Gi1/0/24"), ("CAM_entry", "0025.64FF.EE12"), ("VLAN", "100")])
            .unwrap();
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(
            json,
            r#"{"port":"Gi1/0/24","CAM_entry":"0025.64FF.EE12","VLAN":"100"}"#
        );

        let back: InfoMap = serde_json::from_str(r#"{"z":"1","a":"2","m":"3"}"#).unwrap();
        let keys: Vec<&str> = back.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn info_map_rejects_repeated_and_empty_keys() {
        let mut map = InfoMap::new();
        map.insert("interface", "Gi0/1").unwrap();
        assert!(map.insert("interface", "Gi0/2").is_err());
        assert!(map.insert("  ", "x").is_err());
        assert_eq!(map.get("interface"), Some("Gi0/1"));
    }

    #[test]
    fn element_requires_name() {
        let result = NetworkElement::new(ElementType::Router, "   ", MovementType::Direct);
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn element_without_destination_info_omits_field() {
        let element = NetworkElement::new(ElementType::Proxy, "squid-01", MovementType::Direct)
            .unwrap()
            .with_entry(InfoSide::Source, "listener", "3128")
            .unwrap();
        let json = serde_json::to_value(&element).unwrap();
        assert!(json.get("destination_info").is_none());
        assert_eq!(json["source_info"]["listener"], "3128");
        assert_eq!(json["element_type"], "proxy");
    }
}
