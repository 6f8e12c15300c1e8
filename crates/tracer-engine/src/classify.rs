//! Movement and pivot classification.
//!
//! A single pass over the path sequence counts direct traversals and lateral
//! movements, flags pivot points under the configured [`PivotRule`], and
//! infers the technique behind each lateral hop from its information entries.

use tracer_core::config::PivotRule;
use tracer_core::{InfoSide, NetworkElement, NetworkPath};

use crate::types::{AnalysisSummary, LateralHop, PivotPoint};

/// Entry keys that may name the protocol or method used at a hop.
const PROTOCOL_KEYS: &[&str] = &["protocol", "method", "service"];

/// Classify every element of `path`.
///
/// Pure: calling it twice on an unchanged path yields equal summaries. An
/// empty path yields all-zero counts.
pub fn classify(path: &NetworkPath, rule: PivotRule) -> AnalysisSummary {
    let lateral: Vec<bool> = path.sequence().map(|(_, e)| e.is_lateral()).collect();
    let lateral_total = lateral.iter().filter(|l| **l).count();

    let mut summary = AnalysisSummary::default();

    for (position, element) in path.sequence() {
        if !element.is_lateral() {
            summary.direct_traversals += 1;
            continue;
        }
        summary.lateral_movements += 1;

        if is_pivot(&lateral, position - 1, lateral_total, rule) {
            summary.pivots.push(PivotPoint {
                position,
                name: element.name.clone(),
            });
        }

        summary.lateral_hops.push(LateralHop {
            position,
            name: element.name.clone(),
            technique: detect_technique(element),
        });
    }

    summary.pivot_points = summary.pivots.len();
    summary
}

/// Whether the lateral element at `index` is a pivot.
fn is_pivot(lateral: &[bool], index: usize, lateral_total: usize, rule: PivotRule) -> bool {
    match rule {
        PivotRule::SharedLateral => lateral_total >= 2,
        PivotRule::Bridging => {
            // Endpoints are never lateral.
            let before = index
                .checked_sub(1)
                .map(|i| lateral[i])
                .unwrap_or(false);
            let after = lateral.get(index + 1).copied().unwrap_or(false);
            !before && !after
        }
    }
}

/// Infer the lateral movement technique from an element's entries.
///
/// Looks at protocol-like values and ports on either side, source side first.
pub fn detect_technique(element: &NetworkElement) -> Option<String> {
    [InfoSide::Source, InfoSide::Destination]
        .into_iter()
        .flat_map(|side| element.info(side).iter())
        .find_map(|(key, value)| technique_for(key, value))
        .map(str::to_string)
}

fn technique_for(key: &str, value: &str) -> Option<&'static str> {
    let key = key.trim().to_lowercase();
    let value = value.trim().to_lowercase();

    if PROTOCOL_KEYS.iter().any(|name| key_is(&key, name)) {
        return tokens(&value).find_map(|token| match token {
            "psexec" => Some("psexec"),
            "ssh" => Some("ssh-pivot"),
            "rdp" => Some("rdp-hop"),
            "smb" => Some("smb-lateral"),
            "winrm" => Some("winrm"),
            _ => None,
        });
    }

    if key_is(&key, "port") {
        return tokens(&value).find_map(|token| match token.parse::<u16>().ok()? {
            22 => Some("ssh-pivot"),
            3389 => Some("rdp-hop"),
            445 => Some("smb-lateral"),
            5985 | 5986 => Some("winrm"),
            _ => None,
        });
    }

    None
}

/// `key` is `name` itself or ends in a separated `name` (`dest_port`, `src-port`).
fn key_is(key: &str, name: &str) -> bool {
    match key.strip_suffix(name) {
        Some("") => true,
        Some(prefix) => prefix.ends_with(|c: char| !c.is_ascii_alphanumeric()),
        None => false,
    }
}

fn tokens(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracer_core::{ElementType, MovementType};

    fn element(name: &str, movement: MovementType) -> NetworkElement {
        NetworkElement::new(ElementType::Router, name, movement).unwrap()
    }

    fn path_of(movements: &[MovementType]) -> NetworkPath {
        let mut path = NetworkPath::new("192.168.1.100", "10.0.0.50").unwrap();
        for (i, m) in movements.iter().enumerate() {
            path.push(element(&format!("hop-{}", i + 1), *m));
        }
        path
    }

    fn pivot_positions(summary: &AnalysisSummary) -> Vec<usize> {
        summary.pivots.iter().map(|p| p.position).collect()
    }

    use MovementType::{Direct as D, Lateral as L};

    #[test]
    fn empty_path_is_all_zero() {
        let summary = classify(&path_of(&[]), PivotRule::SharedLateral);
        assert_eq!(summary, AnalysisSummary::default());
    }

    #[test]
    fn sql_injection_scenario_counts() {
        let mut path = NetworkPath::new("192.168.1.100", "10.0.0.50").unwrap();
        path.insert(
            1,
            NetworkElement::new(ElementType::Firewall, "ASA-5525", D)
                .unwrap()
                .with_entry(InfoSide::Source, "interface", "GigabitEthernet0/1")
                .unwrap(),
        )
        .unwrap();
        path.insert(
            2,
            NetworkElement::new(ElementType::Switch, "Catalyst-3850", D)
                .unwrap()
                .with_entry(InfoSide::Source, "port", "Gi1/0/24")
                .unwrap(),
        )
        .unwrap();

        let summary = classify(&path, PivotRule::SharedLateral);
        assert_eq!(summary.direct_traversals, 2);
        assert_eq!(summary.lateral_movements, 0);
        assert_eq!(summary.pivot_points, 0);
        assert!(summary.lateral_hops.is_empty());
    }

    #[test]
    fn adjacent_laterals_are_both_pivots() {
        let summary = classify(&path_of(&[D, L, L, D]), PivotRule::SharedLateral);
        assert_eq!(summary.lateral_movements, 2);
        assert_eq!(pivot_positions(&summary), vec![2, 3]);
        assert_eq!(summary.pivot_points, 2);
    }

    #[test]
    fn all_direct_has_no_pivots() {
        for rule in [PivotRule::SharedLateral, PivotRule::Bridging] {
            let summary = classify(&path_of(&[D, D, D]), rule);
            assert_eq!(summary.pivot_points, 0);
            assert_eq!(summary.direct_traversals, 3);
        }
    }

    #[test]
    fn shared_lateral_ignores_single_lateral() {
        let summary = classify(&path_of(&[D, L, D]), PivotRule::SharedLateral);
        assert_eq!(summary.lateral_movements, 1);
        assert_eq!(summary.pivot_points, 0);
    }

    #[test]
    fn shared_lateral_counts_distant_laterals() {
        let summary = classify(&path_of(&[L, D, D, L]), PivotRule::SharedLateral);
        assert_eq!(pivot_positions(&summary), vec![1, 4]);
    }

    #[test]
    fn bridging_flags_single_lateral_between_direct_segments() {
        let summary = classify(&path_of(&[D, L, D]), PivotRule::Bridging);
        assert_eq!(pivot_positions(&summary), vec![2]);
    }

    #[test]
    fn bridging_treats_endpoints_as_non_lateral() {
        let summary = classify(&path_of(&[L]), PivotRule::Bridging);
        assert_eq!(pivot_positions(&summary), vec![1]);
    }

    #[test]
    fn bridging_skips_adjacent_laterals() {
        let summary = classify(&path_of(&[D, L, L, D, L]), PivotRule::Bridging);
        assert_eq!(pivot_positions(&summary), vec![5]);
    }

    #[test]
    fn classify_is_idempotent() {
        let path = path_of(&[L, D, L, L]);
        let first = classify(&path, PivotRule::SharedLateral);
        let second = classify(&path, PivotRule::SharedLateral);
        assert_eq!(first, second);
    }

    #[test]
    fn detects_technique_from_protocol_and_port() {
        let ssh = element("jump-01", L)
            .with_entry(InfoSide::Destination, "protocol", "SSH")
            .unwrap();
        assert_eq!(detect_technique(&ssh).as_deref(), Some("ssh-pivot"));

        let rdp = element("ts-01", L)
            .with_entry(InfoSide::Source, "dest_port", "tcp/3389")
            .unwrap();
        assert_eq!(detect_technique(&rdp).as_deref(), Some("rdp-hop"));

        let smb = element("fs-01", L)
            .with_entry(InfoSide::Source, "port", "445")
            .unwrap();
        assert_eq!(detect_technique(&smb).as_deref(), Some("smb-lateral"));

        let psexec = element("dc-01", L)
            .with_entry(InfoSide::Source, "method", "PsExec service install")
            .unwrap();
        assert_eq!(detect_technique(&psexec).as_deref(), Some("psexec"));

        let plain = element("sw-01", L)
            .with_entry(InfoSide::Source, "VLAN", "100")
            .unwrap();
        assert_eq!(detect_technique(&plain), None);
    }

    #[test]
    fn technique_matches_whole_words_and_port_keys() {
        let web = element("cms-01", L)
            .with_entry(InfoSide::Source, "service", "wordpress")
            .unwrap();
        assert_eq!(detect_technique(&web), None);

        let transport = element("lb-01", L)
            .with_entry(InfoSide::Source, "transport", "22")
            .unwrap();
        assert_eq!(detect_technique(&transport), None);

        let support = element("help-01", L)
            .with_entry(InfoSide::Source, "support", "445")
            .unwrap();
        assert_eq!(detect_technique(&support), None);

        let src_port = element("jump-02", L)
            .with_entry(InfoSide::Source, "src-port", "22")
            .unwrap();
        assert_eq!(detect_technique(&src_port).as_deref(), Some("ssh-pivot"));

        let ms_rdp = element("ts-02", L)
            .with_entry(InfoSide::Destination, "remote_service", "MS-RDP")
            .unwrap();
        assert_eq!(detect_technique(&ms_rdp).as_deref(), Some("rdp-hop"));
    }

    #[test]
    fn lateral_hops_carry_techniques() {
        let mut path = path_of(&[D]);
        path.push(
            element("winrm-host", L)
                .with_entry(InfoSide::Destination, "port", "5986")
                .unwrap(),
        );
        let summary = classify(&path, PivotRule::SharedLateral);
        assert_eq!(summary.lateral_hops.len(), 1);
        assert_eq!(summary.lateral_hops[0].position, 2);
        assert_eq!(summary.lateral_hops[0].technique.as_deref(), Some("winrm"));
    }
}
