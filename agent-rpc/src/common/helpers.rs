use super::types::{CommonError, ToValidate};

pub fn validate(validator: impl ToValidate) -> Result<(), CommonError> {
    validator.validate()
}

#[cfg(test)]
pub mod testdb {

    use once_cell::sync::OnceCell;
    use std::env;
    use std::path::PathBuf;

    use rstdev_storage::engine::rocksdb::executor::Executor;

    use crate::config::Parser as ConfigManager;
    use crate::store::open_executor;

    pub fn fixture_file(name: &str) -> String {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("src/config/fixtures");

        format!("{}/{}", path.display(), name)
    }

    pub fn global_db_parser() -> &'static ConfigManager {
        static INSTANCE: OnceCell<ConfigManager> = OnceCell::new();
        INSTANCE.get_or_init(|| ConfigManager::new(fixture_file("config.toml")))
    }

    pub fn global_db_builder() -> &'static Executor {
        static INSTANCE: OnceCell<Executor> = OnceCell::new();
        INSTANCE.get_or_init(|| {
            let config = global_db_parser().parse().unwrap();
            let wallet = config.db().wallet.clone();

            open_executor(wallet.get_common(), wallet.get_db_options()).unwrap()
        })
    }
}
