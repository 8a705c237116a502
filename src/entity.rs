//! Content entities whose fields action links transition
use crate::account::{Account, UserId};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;

pub type EntityId = u64;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    #[n(0)]
    Boolean(#[n(0)] bool),
    #[n(1)]
    Integer(#[n(0)] i64),
    #[n(2)]
    Text(#[n(0)] String),
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    #[n(0)]
    entity_type: String,
    #[n(1)]
    id: EntityId,
    #[n(2)]
    owner: UserId,
    #[n(3)]
    fields: BTreeMap<String, FieldValue>,
    #[n(4)]
    changed: TimeStamp<Utc>,
}

impl Entity {
    pub fn new(entity_type: &str, id: EntityId, owner: UserId) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            id,
            owner,
            fields: BTreeMap::new(),
            changed: TimeStamp::new(),
        }
    }
    pub fn with_field(mut self, name: &str, value: FieldValue) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }
    pub fn id(&self) -> EntityId {
        self.id
    }
    pub fn owner(&self) -> UserId {
        self.owner
    }
    pub fn changed(&self) -> &TimeStamp<Utc> {
        &self.changed
    }
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
    pub fn set_field(&mut self, name: &str, value: FieldValue) {
        self.fields.insert(name.to_string(), value);
    }
    pub fn clear_field(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }
    /// Refresh the changed time, called by stores on save.
    pub fn touch(&mut self) {
        self.changed = TimeStamp::new();
    }
    /// Storage key, unique across entity types.
    pub fn storage_key(entity_type: &str, id: EntityId) -> String {
        format!("{entity_type}:{id}")
    }
    /// Whether `account` may update this entity.
    pub fn update_access(&self, account: &Account) -> bool {
        account.has_permission(&format!("edit any {}", self.entity_type))
            || (self.owner == account.id()
                && !account.is_anonymous()
                && account.has_permission(&format!("edit own {}", self.entity_type)))
    }
}
