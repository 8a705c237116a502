//! Storage collaborators: entities, action link definitions and counters
//!
//! All three are backed by sled trees with CBOR encoded values.
use crate::{
    definition::ActionDefinition,
    entity::{Entity, EntityId},
    error::StoreError,
};
use std::sync::Arc;

pub trait EntityStore {
    fn load(&self, entity_type: &str, id: EntityId) -> Result<Option<Entity>, StoreError>;
    /// Persist the entity, refreshing its changed time.
    fn save(&self, entity: &mut Entity) -> Result<(), StoreError>;
}

/// Integer counters grouped by collection.
pub trait KeyValueStore {
    fn get(&self, collection: &str, key: &str) -> Result<Option<i64>, StoreError>;
    fn set(&self, collection: &str, key: &str, value: i64) -> Result<(), StoreError>;
}

pub trait DefinitionStore {
    fn load_definition(&self, id: &str) -> Result<Option<ActionDefinition>, StoreError>;
    fn save_definition(&self, definition: &ActionDefinition) -> Result<(), StoreError>;
    fn delete_definition(&self, id: &str) -> Result<bool, StoreError>;
    fn definitions(&self) -> Result<Vec<ActionDefinition>, StoreError>;
}

pub struct SledStore {
    instance: Arc<sled::Db>,
    entities: sled::Tree,
    definitions: sled::Tree,
    key_value: sled::Tree,
}

impl SledStore {
    pub fn new(instance: Arc<sled::Db>) -> Result<Self, StoreError> {
        let entities = instance.open_tree("entities")?;
        let definitions = instance.open_tree("action_links")?;
        let key_value = instance.open_tree("key_value")?;

        Ok(Self {
            instance,
            entities,
            definitions,
            key_value,
        })
    }

    /// A store whose database is removed when dropped.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::new(Arc::new(db))
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.instance.flush()?;
        Ok(())
    }
}

fn encode<T: minicbor::Encode<()>>(value: &T) -> Result<Vec<u8>, StoreError> {
    minicbor::to_vec(value).map_err(|e| StoreError::Codec(e.to_string()))
}

fn decode<T: for<'b> minicbor::Decode<'b, ()>>(bytes: &[u8]) -> Result<T, StoreError> {
    minicbor::decode(bytes).map_err(|e| StoreError::Codec(e.to_string()))
}

fn counter_key(collection: &str, key: &str) -> String {
    format!("{collection}/{key}")
}

impl EntityStore for SledStore {
    fn load(&self, entity_type: &str, id: EntityId) -> Result<Option<Entity>, StoreError> {
        let key = Entity::storage_key(entity_type, id);
        match self.entities.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save(&self, entity: &mut Entity) -> Result<(), StoreError> {
        entity.touch();
        let key = Entity::storage_key(entity.entity_type(), entity.id());
        self.entities.insert(key.as_bytes(), encode(&*entity)?)?;
        Ok(())
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, collection: &str, key: &str) -> Result<Option<i64>, StoreError> {
        match self.key_value.get(counter_key(collection, key).as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn set(&self, collection: &str, key: &str, value: i64) -> Result<(), StoreError> {
        self.key_value
            .insert(counter_key(collection, key).as_bytes(), encode(&value)?)?;
        Ok(())
    }
}

impl DefinitionStore for SledStore {
    fn load_definition(&self, id: &str) -> Result<Option<ActionDefinition>, StoreError> {
        match self.definitions.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save_definition(&self, definition: &ActionDefinition) -> Result<(), StoreError> {
        self.definitions
            .insert(definition.id().as_bytes(), encode(definition)?)?;
        Ok(())
    }

    fn delete_definition(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.definitions.remove(id.as_bytes())?.is_some())
    }

    fn definitions(&self) -> Result<Vec<ActionDefinition>, StoreError> {
        self.definitions
            .iter()
            .values()
            .map(|bytes| decode(&bytes?))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::FieldValue;

    #[test]
    fn entity_save_and_load() {
        let store = SledStore::temporary().unwrap();
        let mut article = Entity::new("article", 7, 1).with_field("published", FieldValue::Boolean(true));

        store.save(&mut article).unwrap();

        let loaded = store.load("article", 7).unwrap().unwrap();
        assert_eq!(loaded, article);
        assert!(store.load("page", 7).unwrap().is_none());
    }

    #[test]
    fn saving_refreshes_the_changed_time() {
        let store = SledStore::temporary().unwrap();
        let mut article = Entity::new("article", 7, 3);
        let created = article.changed().to_datetime_utc();

        std::thread::sleep(std::time::Duration::from_millis(2));
        store.save(&mut article).unwrap();

        let loaded = store.load("article", 7).unwrap().unwrap();
        assert!(loaded.changed().to_datetime_utc() > created);
        assert_eq!(loaded.changed(), article.changed());
        assert_eq!(loaded.owner(), 3);
    }

    #[test]
    fn counters_are_scoped_by_collection() {
        let store = SledStore::temporary().unwrap();

        store.set("cart", "1:apple", 2).unwrap();

        assert_eq!(store.get("cart", "1:apple").unwrap(), Some(2));
        assert_eq!(store.get("wishlist", "1:apple").unwrap(), None);
    }

    #[test]
    fn definitions_round_trip_through_the_tree() {
        let store = SledStore::temporary().unwrap();
        let definition = ActionDefinition::new("toggle_pub", "Toggle published", "boolean_field", "nojs")
            .with_config("entity_type", "article")
            .with_config("field_name", "published");

        store.save_definition(&definition).unwrap();

        assert_eq!(store.load_definition("toggle_pub").unwrap(), Some(definition.clone()));
        assert_eq!(store.definitions().unwrap(), vec![definition]);
        assert!(store.delete_definition("toggle_pub").unwrap());
        assert!(store.load_definition("toggle_pub").unwrap().is_none());
    }
}
