//! Storage seam used by the settlement engine.
//!
//! The engine only needs get / find / save / delete on four entity tables and
//! read-after-write consistency within one call. [`MemoryStore`] keeps the
//! tables in memory; [`crate::utils::data::JsonFileStore`] wraps it and writes
//! the tables to disk after every mutation.

use crate::error::StoreError;
use crate::models::{Game, Leg, Player, Wager};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All persisted tables plus the id sequence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tables {
    next_id: u64,
    players: BTreeMap<u64, Player>,
    games: BTreeMap<u64, Game>,
    legs: BTreeMap<u64, Leg>,
    wagers: BTreeMap<u64, Wager>,
}

/// A record kept in one of the [`Tables`]
pub trait Entity: Clone {
    const KIND: &'static str;

    fn id(&self) -> u64;
    fn set_id(&mut self, id: u64);
    fn table(tables: &Tables) -> &BTreeMap<u64, Self>;
    fn table_mut(tables: &mut Tables) -> &mut BTreeMap<u64, Self>;
}

macro_rules! entity {
    ($ty:ty, $kind:literal, $field:ident) => {
        impl Entity for $ty {
            const KIND: &'static str = $kind;

            fn id(&self) -> u64 {
                self.id
            }

            fn set_id(&mut self, id: u64) {
                self.id = id;
            }

            fn table(tables: &Tables) -> &BTreeMap<u64, Self> {
                &tables.$field
            }

            fn table_mut(tables: &mut Tables) -> &mut BTreeMap<u64, Self> {
                &mut tables.$field
            }
        }
    };
}

entity!(Player, "player", players);
entity!(Game, "game", games);
entity!(Leg, "leg", legs);
entity!(Wager, "wager", wagers);

pub trait Store {
    /// Fetch one entity by id
    fn get<E: Entity>(&self, id: u64) -> Result<E, StoreError>;

    /// All entities of a type matching `predicate`, in id order
    fn find<E: Entity, P: Fn(&E) -> bool>(&self, predicate: P) -> Result<Vec<E>, StoreError>;

    /// Store a new entity, assigning it a fresh id
    fn insert<E: Entity>(&mut self, entity: E) -> Result<E, StoreError>;

    /// Overwrite an existing entity. Fails with `NotFound` if it was deleted.
    fn save<E: Entity>(&mut self, entity: &E) -> Result<(), StoreError>;

    fn delete<E: Entity>(&mut self, id: u64) -> Result<(), StoreError>;

    fn all<E: Entity>(&self) -> Result<Vec<E>, StoreError> {
        self.find(|_: &E| true)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Tables,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: Tables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }
}

fn not_found<E: Entity>(id: u64) -> StoreError {
    StoreError::NotFound { kind: E::KIND, id }
}

impl Store for MemoryStore {
    fn get<E: Entity>(&self, id: u64) -> Result<E, StoreError> {
        E::table(&self.tables)
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found::<E>(id))
    }

    fn find<E: Entity, P: Fn(&E) -> bool>(&self, predicate: P) -> Result<Vec<E>, StoreError> {
        Ok(E::table(&self.tables)
            .values()
            .filter(|e| predicate(e))
            .cloned()
            .collect())
    }

    fn insert<E: Entity>(&mut self, mut entity: E) -> Result<E, StoreError> {
        self.tables.next_id += 1;
        entity.set_id(self.tables.next_id);
        E::table_mut(&mut self.tables).insert(entity.id(), entity.clone());
        Ok(entity)
    }

    fn save<E: Entity>(&mut self, entity: &E) -> Result<(), StoreError> {
        match E::table_mut(&mut self.tables).get_mut(&entity.id()) {
            Some(slot) => {
                *slot = entity.clone();
                Ok(())
            }
            None => Err(not_found::<E>(entity.id())),
        }
    }

    fn delete<E: Entity>(&mut self, id: u64) -> Result<(), StoreError> {
        E::table_mut(&mut self.tables)
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found::<E>(id))
    }
}
