//! Per-account choice of which collectible to show for each move.

use crate::{
    collectibles::Collectible,
    error::{
        Error,
        Result,
    },
    ledger::Address,
    moves::MoveChoice,
};
use serde::{
    Deserialize,
    Serialize,
};
use tracing::warn;

pub mod in_memory;
pub mod sled_storage;

pub use in_memory::InMemorySkinRepository;
pub use sled_storage::SledSkinRepository;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkinPreferences {
    #[serde(default)]
    pub rock: Option<Collectible>,
    #[serde(default)]
    pub paper: Option<Collectible>,
    #[serde(default)]
    pub scissors: Option<Collectible>,
}

impl SkinPreferences {
    pub fn get(&self, choice: MoveChoice) -> Option<&Collectible> {
        self.slot(choice).as_ref()
    }

    fn slot(&self, choice: MoveChoice) -> &Option<Collectible> {
        match choice {
            MoveChoice::Rock => &self.rock,
            MoveChoice::Paper => &self.paper,
            MoveChoice::Scissors => &self.scissors,
        }
    }

    fn slot_mut(&mut self, choice: MoveChoice) -> &mut Option<Collectible> {
        match choice {
            MoveChoice::Rock => &mut self.rock,
            MoveChoice::Paper => &mut self.paper,
            MoveChoice::Scissors => &mut self.scissors,
        }
    }

    pub fn is_empty(&self) -> bool {
        MoveChoice::ALL.iter().all(|choice| self.get(*choice).is_none())
    }
}

/// Durable storage of one preference blob per account.
pub trait SkinRepository {
    /// `Ok(None)` when nothing was ever saved for `account`.
    fn load(&self, account: &Address) -> Result<Option<SkinPreferences>>;

    fn save(&mut self, account: &Address, preferences: &SkinPreferences) -> Result<()>;
}

pub fn encode_preferences(preferences: &SkinPreferences) -> Result<Vec<u8>> {
    serde_json::to_vec(preferences).map_err(|err| Error::Storage(err.to_string()))
}

/// Parses a stored blob. A collectible filed under the wrong move counts as
/// corruption.
pub fn decode_preferences(bytes: &[u8]) -> Result<SkinPreferences> {
    let preferences: SkinPreferences =
        serde_json::from_slice(bytes).map_err(|err| Error::StoreParse(err.to_string()))?;
    for choice in MoveChoice::ALL {
        if let Some(collectible) = preferences.get(choice)
            && collectible.move_type != choice
        {
            return Err(Error::StoreParse(format!(
                "{} stored in the {choice} slot",
                collectible.move_type
            )));
        }
    }
    Ok(preferences)
}

/// The preferences of the connected account, kept in step with the
/// repository.
pub struct SkinPreferenceStore<R> {
    repository: R,
    account: Option<Address>,
    current: SkinPreferences,
}

impl<R: SkinRepository> SkinPreferenceStore<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            account: None,
            current: SkinPreferences::default(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Loads the mapping saved for `account`, or starts empty. Nothing from
    /// the previous account survives.
    pub fn switch_account(&mut self, account: Option<&Address>) {
        self.account = account.cloned();
        self.current = match account {
            None => SkinPreferences::default(),
            Some(account) => match self.repository.load(account) {
                Ok(saved) => saved.unwrap_or_default(),
                Err(err) => {
                    warn!(%account, ?err, "discarding unreadable skin preferences");
                    SkinPreferences::default()
                }
            },
        };
    }

    pub fn select(&mut self, collectible: Collectible) -> Result<()> {
        let choice = collectible.move_type;
        self.update(|preferences| *preferences.slot_mut(choice) = Some(collectible))
    }

    pub fn remove(&mut self, choice: MoveChoice) -> Result<()> {
        self.update(|preferences| *preferences.slot_mut(choice) = None)
    }

    pub fn lookup(&self, choice: MoveChoice) -> Option<&Collectible> {
        self.current.get(choice)
    }

    pub fn preferences(&self) -> &SkinPreferences {
        &self.current
    }

    fn update(&mut self, change: impl FnOnce(&mut SkinPreferences)) -> Result<()> {
        let account = self.account.clone().ok_or(Error::NoAccount)?;
        change(&mut self.current);
        if let Err(err) = self.repository.save(&account, &self.current) {
            warn!(%account, ?err, "skin preferences not persisted");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::test_helpers::{
        address,
        collectible,
    };

    #[test]
    fn switch_account__never_leaks_previous_selection() {
        // given
        let mut store = SkinPreferenceStore::new(InMemorySkinRepository::new());
        store.switch_account(Some(&address(0xa)));
        store.select(collectible(1, MoveChoice::Rock)).unwrap();

        // when
        store.switch_account(Some(&address(0xb)));

        // then
        assert!(store.preferences().is_empty());

        // when
        store.switch_account(None);
        store.switch_account(Some(&address(0xa)));

        // then
        assert_eq!(store.lookup(MoveChoice::Rock), Some(&collectible(1, MoveChoice::Rock)));
    }

    #[test]
    fn select__overwrites_only_the_collectible_slot() {
        // given
        let mut store = SkinPreferenceStore::new(InMemorySkinRepository::new());
        store.switch_account(Some(&address(0xa)));
        store.select(collectible(1, MoveChoice::Paper)).unwrap();
        store.select(collectible(2, MoveChoice::Scissors)).unwrap();

        // when
        store.select(collectible(3, MoveChoice::Paper)).unwrap();
        store.remove(MoveChoice::Scissors).unwrap();

        // then
        assert_eq!(store.lookup(MoveChoice::Paper).map(|c| &c.id), Some(&address(3)));
        assert_eq!(store.lookup(MoveChoice::Scissors), None);
        assert_eq!(store.lookup(MoveChoice::Rock), None);
    }

    #[test]
    fn select__requires_an_account() {
        let mut store = SkinPreferenceStore::new(InMemorySkinRepository::new());
        assert_eq!(
            store.select(collectible(1, MoveChoice::Rock)),
            Err(Error::NoAccount)
        );
    }

    #[test]
    fn switch_account__treats_corrupt_data_as_empty() {
        // given
        let repository = InMemorySkinRepository::new();
        repository.insert_raw(&address(0xa), b"{not json".to_vec());
        let mut store = SkinPreferenceStore::new(repository);

        // when
        store.switch_account(Some(&address(0xa)));

        // then
        assert!(store.preferences().is_empty());
    }

    #[test]
    fn decode_preferences__rejects_collectible_in_foreign_slot() {
        // given
        let misfiled = SkinPreferences {
            rock: Some(collectible(1, MoveChoice::Paper)),
            ..Default::default()
        };
        let bytes = serde_json::to_vec(&misfiled).unwrap();

        // then
        assert!(matches!(decode_preferences(&bytes), Err(Error::StoreParse(_))));
    }

    #[test]
    fn decode_preferences__accepts_explicit_nulls() {
        let bytes = br#"{"rock":null,"paper":null,"scissors":null}"#;
        assert_eq!(decode_preferences(bytes), Ok(SkinPreferences::default()));
    }
}
