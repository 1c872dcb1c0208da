// ── Display helpers ──
//
// Pure formatting shared by every consumer: breadcrumb trails for detail
// views, duration and age rendering, NAT classification.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::model::Host;

// ── Breadcrumbs ──────────────────────────────────────────────────────

/// One step of a breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub label: String,
    /// Cumulative path up to and including this segment.
    pub path: String,
}

/// Build the breadcrumb trail for a view path.
///
/// Segments equal to a parameter value (an id or name the user supplied)
/// are shown verbatim; static segments are title-cased with `-` as spaces.
/// `/networks/my-net/hosts` with `{network_id: "my-net"}` yields
/// `Networks`, `my-net`, `Hosts`.
pub fn breadcrumbs(path: &str, params: &HashMap<&str, &str>) -> Vec<Breadcrumb> {
    let mut trail = Vec::new();
    let mut current = String::new();

    for segment in path.split('/').filter(|s| !s.is_empty()) {
        current.push('/');
        current.push_str(segment);

        let label = if params.values().any(|v| *v == segment) {
            segment.to_owned()
        } else {
            title_case(segment)
        };

        trail.push(Breadcrumb {
            label,
            path: current.clone(),
        });
    }

    trail
}

/// Join a trail into a single context line.
pub fn breadcrumb_line(trail: &[Breadcrumb]) -> String {
    trail
        .iter()
        .map(|b| b.label.as_str())
        .collect::<Vec<_>>()
        .join(" › ")
}

fn title_case(segment: &str) -> String {
    segment
        .split('-')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

// ── Durations ────────────────────────────────────────────────────────

const NANOS_PER_MINUTE: i64 = 60 * 1_000_000_000;

/// A duration split into whole hours and leftover minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoursMinutes {
    pub hours: i64,
    pub minutes: i64,
}

impl fmt::Display for HoursMinutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} h {} min", self.hours, self.minutes)
    }
}

/// Split a nanosecond duration into hours and minutes, dropping seconds.
pub fn time_min_hrs(nanos: i64) -> HoursMinutes {
    let total_minutes = nanos.max(0) / NANOS_PER_MINUTE;
    HoursMinutes {
        hours: total_minutes / 60,
        minutes: total_minutes % 60,
    }
}

/// `"3m ago"`, `"2h ago"`, `"5d ago"`, or `"never"`.
pub fn relative_age(when: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(when) = when else {
        return "never".into();
    };
    let secs = (now - when).num_seconds().max(0);
    match secs {
        0..60 => format!("{secs}s ago"),
        60..3_600 => format!("{}m ago", secs / 60),
        3_600..86_400 => format!("{}h ago", secs / 3_600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

// ── NAT ──────────────────────────────────────────────────────────────

/// Whether the host sits behind a NAT that peers must traverse.
pub fn is_host_natted(host: &Host) -> bool {
    host.nat_type.is_some_and(crate::model::NatType::is_natted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityId, NatType};
    use pretty_assertions::assert_eq;

    fn labels(trail: &[Breadcrumb]) -> Vec<&str> {
        trail.iter().map(|b| b.label.as_str()).collect()
    }

    #[test]
    fn breadcrumbs_keep_param_segments_raw() {
        let params = HashMap::from([("network_id", "my-net")]);
        let trail = breadcrumbs("/networks/my-net/hosts", &params);
        assert_eq!(labels(&trail), vec!["Networks", "my-net", "Hosts"]);
        assert_eq!(trail[1].path, "/networks/my-net");
        assert_eq!(trail[2].path, "/networks/my-net/hosts");
    }

    #[test]
    fn breadcrumbs_title_case_dashed_segments() {
        let trail = breadcrumbs("/remote-access/ext-clients", &HashMap::new());
        assert_eq!(labels(&trail), vec!["Remote Access", "Ext Clients"]);
        assert_eq!(breadcrumb_line(&trail), "Remote Access › Ext Clients");
    }

    #[test]
    fn breadcrumbs_empty_path() {
        assert!(breadcrumbs("/", &HashMap::new()).is_empty());
    }

    #[test]
    fn time_min_hrs_whole_hour() {
        let hm = time_min_hrs(3_600 * 1_000_000_000);
        assert_eq!(hm, HoursMinutes { hours: 1, minutes: 0 });
        assert_eq!(hm.to_string(), "1 h 0 min");
    }

    #[test]
    fn time_min_hrs_hours_and_minutes() {
        let hm = time_min_hrs(7_260 * 1_000_000_000);
        assert_eq!(hm, HoursMinutes { hours: 2, minutes: 1 });
    }

    #[test]
    fn time_min_hrs_negative_is_zero() {
        assert_eq!(time_min_hrs(-5), HoursMinutes { hours: 0, minutes: 0 });
    }

    #[test]
    fn relative_age_buckets() {
        let now = Utc::now();
        assert_eq!(relative_age(None, now), "never");
        assert_eq!(
            relative_age(Some(now - chrono::Duration::seconds(150)), now),
            "2m ago"
        );
        assert_eq!(
            relative_age(Some(now - chrono::Duration::hours(30)), now),
            "1d ago"
        );
    }

    fn host_with_nat(nat_type: Option<NatType>) -> Host {
        Host {
            id: EntityId::from("h1"),
            name: "edge".into(),
            version: String::new(),
            os: "linux".into(),
            endpoint_ip: None,
            endpoint_ipv6: None,
            listen_port: 51821,
            public_key: String::new(),
            mtu: 1420,
            persistent_keepalive: 20,
            nat_type,
            is_default: false,
            is_static: false,
            node_ids: Vec::new(),
            mac: None,
        }
    }

    #[test]
    fn nat_detection() {
        assert!(is_host_natted(&host_with_nat(Some(NatType::Asymmetric))));
        assert!(is_host_natted(&host_with_nat(Some(NatType::Symmetric))));
        assert!(!is_host_natted(&host_with_nat(Some(NatType::Public))));
        assert!(!is_host_natted(&host_with_nat(None)));
    }
}
