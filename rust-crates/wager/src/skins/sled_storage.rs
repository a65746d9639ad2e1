// Sled-backed persistence of skin preferences, one key per account.
use crate::{
    error::{
        Error,
        Result,
    },
    ledger::Address,
    skins::{
        SkinPreferences,
        SkinRepository,
        decode_preferences,
        encode_preferences,
    },
};
use sled::{
    Config,
    Db,
    Tree,
};
use std::path::Path;

const TREE_NAME: &str = "selected_skins";

#[derive(Clone)]
pub struct SledSkinRepository {
    tree: Tree,
}

impl SledSkinRepository {
    pub fn new(db: &Db) -> Result<Self> {
        let tree = db.open_tree(TREE_NAME).map_err(storage("open selected_skins tree"))?;
        Ok(Self { tree })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = Config::default()
            .path(path)
            .open()
            .map_err(storage("open sled database"))?;
        Self::new(&db)
    }

    fn key(account: &Address) -> &[u8] {
        account.as_str().as_bytes()
    }
}

fn storage(action: &'static str) -> impl Fn(sled::Error) -> Error {
    move |err| Error::Storage(format!("{action}: {err}"))
}

impl SkinRepository for SledSkinRepository {
    fn load(&self, account: &Address) -> Result<Option<SkinPreferences>> {
        let value = match self
            .tree
            .get(Self::key(account))
            .map_err(storage("read skin preferences"))?
        {
            Some(value) => value,
            None => return Ok(None),
        };
        decode_preferences(value.as_ref()).map(Some)
    }

    fn save(&mut self, account: &Address, preferences: &SkinPreferences) -> Result<()> {
        let bytes = encode_preferences(preferences)?;
        self.tree
            .insert(Self::key(account), bytes)
            .map_err(storage("persist skin preferences"))?;
        self.tree
            .flush()
            .map_err(storage("flush skin preferences"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        moves::MoveChoice,
        skins::SkinPreferenceStore,
        test_helpers::{
            address,
            collectible,
        },
    };
    use tempdir::TempDir;

    fn sled_db(temp_dir: &TempDir) -> Db {
        Config::default()
            .path(temp_dir.path())
            .open()
            .expect("open sled db")
    }

    #[test]
    fn sut__when_saving_preferences_then_they_survive_a_reopen() {
        // given
        let temp_dir = TempDir::new("sled_skin_repository").unwrap();
        let preferences = SkinPreferences {
            rock: Some(collectible(9, MoveChoice::Rock)),
            ..Default::default()
        };
        {
            let db = sled_db(&temp_dir);
            let mut repository = SledSkinRepository::new(&db).unwrap();
            repository.save(&address(1), &preferences).unwrap();
        }

        // when
        let db = sled_db(&temp_dir);
        let repository = SledSkinRepository::new(&db).unwrap();

        // then
        assert_eq!(repository.load(&address(1)), Ok(Some(preferences)));
        assert_eq!(repository.load(&address(2)), Ok(None));
    }

    #[test]
    fn sut__when_stored_bytes_are_corrupt_then_store_starts_empty() {
        // given
        let temp_dir = TempDir::new("sled_skin_repository_corrupt").unwrap();
        let db = sled_db(&temp_dir);
        db.open_tree(TREE_NAME)
            .unwrap()
            .insert(address(1).as_str().as_bytes(), &b"\x00garbage"[..])
            .unwrap();
        let repository = SledSkinRepository::new(&db).unwrap();

        // when
        let loaded = repository.load(&address(1));
        let mut store = SkinPreferenceStore::new(repository);
        store.switch_account(Some(&address(1)));

        // then
        assert!(matches!(loaded, Err(Error::StoreParse(_))));
        assert!(store.preferences().is_empty());
    }
}
