use rst_common::standard::serde::{self, Deserialize};

use crate::common::types::{CommonError, ToValidate};

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "self::serde")]
pub struct RocksDBCommon {
    pub(super) path: String,
    pub(super) cf_name: String,
}

impl RocksDBCommon {
    pub fn new(path: String, cf_name: String) -> Self {
        Self { path, cf_name }
    }

    pub fn get(&self) -> (String, String) {
        (self.path.to_owned(), self.cf_name.to_owned())
    }
}

impl Default for RocksDBCommon {
    fn default() -> Self {
        Self {
            path: "./db".to_string(),
            cf_name: "".to_string(),
        }
    }
}

impl ToValidate for RocksDBCommon {
    fn validate(&self) -> Result<(), CommonError> {
        if self.path.is_empty() {
            return Err(CommonError::ValidationError(
                "config: rocksdbcommon:path is missing".to_string(),
            ));
        }

        if self.cf_name.is_empty() {
            return Err(CommonError::ValidationError(
                "config: rocksdbcommon:cf_name is missing".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct RocksDBOptions {
    pub(super) create_if_missing: bool,
    pub(super) create_missing_columns: bool,
    pub(super) set_error_if_exists: bool,
    pub(super) set_wal_dir: String,
}

impl RocksDBOptions {
    pub fn get_create_if_missing(&self) -> bool {
        self.create_if_missing
    }

    pub fn get_create_missing_columns(&self) -> bool {
        self.create_missing_columns
    }

    pub fn get_set_error_if_exists(&self) -> bool {
        self.set_error_if_exists
    }

    pub fn get_set_wal_dir(&self) -> String {
        self.set_wal_dir.to_owned()
    }

    pub fn with_wal_dir(mut self, wal_dir: String) -> Self {
        self.set_wal_dir = wal_dir;
        self
    }

    /// `for_wallet` gives the options of a named wallet, each wallet keeps its
    /// own write-ahead log next to the configured one
    pub fn for_wallet(&self, name: &str) -> Self {
        let mut opts = self.clone();
        opts.set_wal_dir = format!("{}/{}", self.set_wal_dir, name);
        opts
    }
}

impl Default for RocksDBOptions {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            create_missing_columns: true,
            set_error_if_exists: false,
            set_wal_dir: "".to_string(),
        }
    }
}

impl ToValidate for RocksDBOptions {
    fn validate(&self) -> Result<(), CommonError> {
        if self.set_wal_dir.is_empty() {
            return Err(CommonError::ValidationError(
                "config: rocksdboptions:wal_dir is missing".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(crate = "self::serde")]
pub struct Database {
    pub wallet: Wallet,
}

impl ToValidate for Database {
    fn validate(&self) -> Result<(), CommonError> {
        self.wallet.validate()
    }
}

/// `Wallet` is the storage of agent records, the configured path is the base
/// directory under which every named wallet lives
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(crate = "self::serde")]
pub struct Wallet {
    pub(super) common: RocksDBCommon,
    pub(super) db: RocksDBOptions,
}

impl Wallet {
    pub fn get_common(&self) -> RocksDBCommon {
        self.common.to_owned()
    }

    pub fn get_db_options(&self) -> RocksDBOptions {
        self.db.to_owned()
    }
}

impl ToValidate for Wallet {
    fn validate(&self) -> Result<(), CommonError> {
        self.common.validate()?;
        self.db.validate()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstdev_config::format::use_toml;
    use rstdev_config::parser::from_file;
    use rstdev_config::{types::ConfigError, Builder};
    use table_test::table_test;

    use crate::common::helpers;
    use crate::common::helpers::testdb::fixture_file;

    #[test]
    fn test_parse_database_config() -> Result<(), ConfigError> {
        let config_toml = {
            let config_builder: Result<Database, ConfigError> =
                Builder::new(from_file(fixture_file("config_db.toml")))
                    .fetch()?
                    .parse(use_toml);

            config_builder
        };

        assert!(!config_toml.is_err());

        let config_db = config_toml.unwrap();
        assert_eq!(config_db.wallet.common.cf_name, "wallet-cf");
        assert_eq!(config_db.wallet.common.path, "./wallet-storage");
        assert_eq!(config_db.wallet.db.set_wal_dir, "./wallet-db-wal");

        assert!(config_db.wallet.db.create_if_missing);
        assert!(config_db.wallet.db.create_missing_columns);
        assert!(!config_db.wallet.db.set_error_if_exists);
        Ok(())
    }

    #[test]
    fn test_rocksdb_common_validation() {
        let table = vec![
            (
                ("".to_string(), "cf".to_string()),
                Some("rocksdbcommon:path"),
            ),
            (
                ("path".to_string(), "".to_string()),
                Some("rocksdbcommon:cf_name"),
            ),
            (("path".to_string(), "cf".to_string()), None),
        ];

        for (validator, (path, cf_name), expected) in table_test!(table) {
            let validation = helpers::validate(RocksDBCommon::new(path.clone(), cf_name.clone()));
            let actual = validation.err().map(|err| {
                expected
                    .map(|field| err.to_string().contains(field))
                    .unwrap_or(false)
            });

            validator
                .given(&format!("path: {}, cf_name: {}", path, cf_name))
                .when("validate")
                .then(&format!("it should fail on {:?}", expected))
                .assert_eq(expected.map(|_| true), actual);
        }
    }

    #[test]
    fn test_rocksdb_db_options_validation_failed() {
        let db_opts = RocksDBOptions::default();
        let validation = helpers::validate(db_opts);
        assert!(validation.is_err());
        assert!(validation
            .unwrap_err()
            .to_string()
            .contains("rocksdboptions:wal_dir"));
    }

    #[test]
    fn test_wallet_options() {
        let mut db_opts = RocksDBOptions::default();
        db_opts.set_wal_dir = "./wal".to_string();

        let wallet_opts = db_opts.for_wallet("alice");
        assert_eq!(wallet_opts.get_set_wal_dir(), "./wal/alice".to_string());
        assert_eq!(
            wallet_opts.get_create_if_missing(),
            db_opts.get_create_if_missing()
        );
    }

    #[test]
    fn test_database_wallet_validation_failed() {
        let wallet_opts = Wallet::default();
        let validation = helpers::validate(wallet_opts);
        assert!(validation.is_err());
        assert!(validation
            .unwrap_err()
            .to_string()
            .contains("rocksdbcommon:cf_name"));
    }
}
