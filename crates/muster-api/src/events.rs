//! Scan records handed to the core by the event source

use muster_util::MemberId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

use crate::{MemberInfo, RawSession};

/// One badge scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub member_id: MemberId,
    /// Unix timestamp, seconds
    pub timestamp: i64,
}

impl RawEvent {
    pub fn new(member_id: impl Into<MemberId>, timestamp: i64) -> Self {
        Self {
            member_id: member_id.into(),
            timestamp,
        }
    }
}

/// Records for one member, in whichever shape the event source produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRecords {
    /// Unpaired scan timestamps; go through the reconciler
    Raw(Vec<i64>),
    /// Sessions already paired by the source; bypass the reconciler
    Sessions(Vec<RawSession>),
}

impl MemberRecords {
    pub fn len(&self) -> usize {
        match self {
            MemberRecords::Raw(scans) => scans.len(),
            MemberRecords::Sessions(sessions) => sessions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-member records for one reporting run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EventSource {
    records: HashMap<MemberId, MemberRecords>,
}

/// Keys that normalize to the same member are merged; a member cannot
/// hold both raw scans and pre-paired sessions.
impl<'de> Deserialize<'de> for EventSource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = BTreeMap::<String, MemberRecords>::deserialize(deserializer)?;
        let mut source = Self::new();
        for (key, records) in raw {
            source
                .merge(MemberId::new(&key), records)
                .map_err(serde::de::Error::custom)?;
        }
        Ok(source)
    }
}

impl EventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group a flat list of scans by member
    pub fn from_raw_events(events: impl IntoIterator<Item = RawEvent>) -> Self {
        let mut source = Self::new();
        for event in events {
            source.push_scan(event.member_id, event.timestamp);
        }
        source
    }

    /// Set the records of a member, replacing any previous ones
    pub fn insert(&mut self, member_id: MemberId, records: MemberRecords) {
        self.records.insert(member_id, records);
    }

    /// Add records for a member, appending to any records of the same shape
    pub fn merge(&mut self, member_id: MemberId, records: MemberRecords) -> Result<(), String> {
        let Some(existing) = self.records.get_mut(&member_id) else {
            self.records.insert(member_id, records);
            return Ok(());
        };

        match (existing, records) {
            (MemberRecords::Raw(scans), MemberRecords::Raw(more)) => scans.extend(more),
            (MemberRecords::Sessions(sessions), MemberRecords::Sessions(more)) => {
                sessions.extend(more)
            }
            _ => {
                return Err(format!(
                    "member '{}' has both raw scans and sessions",
                    member_id
                ));
            }
        }
        warn!(member_id = %member_id, "Merged records listed under more than one key");
        Ok(())
    }

    /// Append one raw scan for a member.
    ///
    /// Returns `false` (and drops the scan) if the member already holds
    /// pre-paired sessions, since the two shapes cannot be mixed.
    pub fn push_scan(&mut self, member_id: MemberId, timestamp: i64) -> bool {
        match self
            .records
            .entry(member_id)
            .or_insert_with(|| MemberRecords::Raw(Vec::new()))
        {
            MemberRecords::Raw(scans) => {
                scans.push(timestamp);
                true
            }
            MemberRecords::Sessions(_) => false,
        }
    }

    pub fn get(&self, member_id: &MemberId) -> Option<&MemberRecords> {
        self.records.get(member_id)
    }

    pub fn member_ids(&self) -> impl Iterator<Item = &MemberId> {
        self.records.keys()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Input document for a batch run: the roster plus its records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventBatch {
    /// Members to evaluate, in report order
    #[serde(default)]
    pub members: Vec<MemberInfo>,

    /// Records keyed by member id
    #[serde(default)]
    pub records: EventSource,

    /// Additional flat scan list, merged into `records`
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

impl EventBatch {
    /// Parse a batch document from JSON
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Split into the roster and a single event source
    pub fn into_parts(self) -> (Vec<MemberInfo>, EventSource) {
        let mut source = self.records;
        for event in self.events {
            let member_id = event.member_id.clone();
            if !source.push_scan(event.member_id, event.timestamp) {
                warn!(
                    member_id = %member_id,
                    timestamp = event.timestamp,
                    "Dropping raw scan for member with pre-paired sessions"
                );
            }
        }
        (self.members, source)
    }
}
