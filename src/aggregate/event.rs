use serde::{Deserialize, Deserializer};

use super::error::AggregateError;

/// Event kind that carries RTT samples. Everything else is lifecycle noise.
pub const MEASUREMENT: &str = "measurement";

// ─── Wire event ──────────────────────────────────────────────────

/// One report from a passive observer, as posted to `/data/:id`.
///
/// The RTT fields are `None` when the observer did not measure that leg.
/// On the wire "not measured" is spelled as a missing key, `null` or `0`;
/// all three decode to `None` here so nothing downstream has to know about
/// the zero sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MeasurementEvent {
    #[serde(rename = "Session", alias = "session")]
    pub session: String,

    /// e.g. "measurement", "new", "delete"
    #[serde(rename = "Event", alias = "event", default)]
    pub kind: String,

    /// Connection type reported by the observer ("QUIC", "TCP", ...).
    #[serde(rename = "Type", alias = "type", default)]
    pub session_type: String,

    /// Initiator address then responder address.
    #[serde(rename = "Addrs", alias = "addrs", default)]
    pub addrs: Vec<String>,

    #[serde(rename = "Left_rtt", alias = "left_rtt", default, deserialize_with = "measured")]
    pub left_rtt: Option<u64>,

    #[serde(rename = "Right_rtt", alias = "right_rtt", default, deserialize_with = "measured")]
    pub right_rtt: Option<u64>,

    #[serde(
        rename = "Full_rtt_initiator",
        alias = "full_rtt_initiator",
        default,
        deserialize_with = "measured"
    )]
    pub full_rtt_initiator: Option<u64>,

    #[serde(
        rename = "Full_rtt_responder",
        alias = "full_rtt_responder",
        default,
        deserialize_with = "measured"
    )]
    pub full_rtt_responder: Option<u64>,
}

impl MeasurementEvent {
    pub fn is_measurement(&self) -> bool {
        self.kind == MEASUREMENT
    }

    /// Builder used by the simulator and tests.
    pub fn measurement(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            kind: MEASUREMENT.into(),
            ..Self::default()
        }
    }

    pub fn with_left(mut self, rtt: u64) -> Self {
        self.left_rtt = Some(rtt).filter(|v| *v != 0);
        self
    }

    pub fn with_right(mut self, rtt: u64) -> Self {
        self.right_rtt = Some(rtt).filter(|v| *v != 0);
        self
    }

    pub fn with_full(mut self, rtt: u64) -> Self {
        self.full_rtt_initiator = Some(rtt).filter(|v| *v != 0);
        self
    }

    pub fn with_type(mut self, session_type: impl Into<String>) -> Self {
        self.session_type = session_type.into();
        self
    }
}

fn measured<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<u64>::deserialize(deserializer)?;
    Ok(raw.filter(|v| *v != 0))
}

// ─── Observer identity ───────────────────────────────────────────

/// Validates a sender id against the configured observer count.
///
/// Position 0 is the client-side observer, `observer_count - 1` the
/// server-side one. Only canonical decimal ids are accepted (`"0"`, `"12"`):
/// no sign, whitespace or leading zeros. Out-of-range ids are rejected,
/// never clamped.
pub fn observer_index(raw: &str, observer_count: usize) -> Result<usize, AggregateError> {
    let canonical = !raw.is_empty()
        && raw.bytes().all(|b| b.is_ascii_digit())
        && (raw == "0" || !raw.starts_with('0'));
    let index: Option<usize> = if canonical { raw.parse().ok() } else { None };
    let index = index.ok_or_else(|| AggregateError::InvalidObserver {
        id: raw.to_owned(),
        reason: "not a canonical non-negative integer".into(),
    })?;

    if index >= observer_count {
        return Err(AggregateError::InvalidObserver {
            id: raw.to_owned(),
            reason: format!("expected 0..{observer_count}"),
        });
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_observer_wire_format() {
        let json = r#"{
            "Event": "measurement", "Type": "QUIC",
            "Addrs": ["10.0.0.1:4433", "10.0.0.2:443"],
            "Session": "a1b2", "Ts": 1571405600000000, "State": "Established",
            "Left_rtt": 1200, "Right_rtt": 0, "Full_rtt_initiator": 5400
        }"#;
        let ev: MeasurementEvent = serde_json::from_str(json).unwrap();

        assert!(ev.is_measurement());
        assert_eq!(ev.session, "a1b2");
        assert_eq!(ev.session_type, "QUIC");
        assert_eq!(ev.addrs.len(), 2);
        assert_eq!(ev.left_rtt, Some(1200));
        assert_eq!(ev.right_rtt, None, "zero on the wire means not measured");
        assert_eq!(ev.full_rtt_initiator, Some(5400));
        assert_eq!(ev.full_rtt_responder, None);
    }

    #[test]
    fn accepts_snake_case_keys_and_nulls() {
        let json = r#"{"session": "s", "event": "new", "left_rtt": null}"#;
        let ev: MeasurementEvent = serde_json::from_str(json).unwrap();
        assert!(!ev.is_measurement());
        assert_eq!(ev.left_rtt, None);
        assert!(ev.addrs.is_empty());
    }

    #[test]
    fn missing_session_is_a_decode_error() {
        assert!(serde_json::from_str::<MeasurementEvent>(r#"{"Event": "measurement"}"#).is_err());
        assert!(serde_json::from_str::<MeasurementEvent>(r#"{"Session": "x", "Left_rtt": -4}"#).is_err());
    }

    #[test]
    fn observer_index_bounds() {
        assert_eq!(observer_index("0", 2), Ok(0));
        assert_eq!(observer_index("1", 2), Ok(1));
        assert!(matches!(
            observer_index("2", 2),
            Err(AggregateError::InvalidObserver { .. })
        ));
        assert!(observer_index("sd1", 2).is_err());
        assert!(observer_index("-1", 2).is_err());
        assert!(observer_index("", 2).is_err());
    }

    #[test]
    fn observer_index_rejects_non_canonical_spellings() {
        for raw in ["+1", " 1", "1\n", "01", "00", "1 ", "１"] {
            assert!(
                matches!(observer_index(raw, 4), Err(AggregateError::InvalidObserver { .. })),
                "{raw:?} should be rejected"
            );
        }
        assert_eq!(observer_index("3", 4), Ok(3));
    }
}
