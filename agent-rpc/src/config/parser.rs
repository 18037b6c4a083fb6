use rstdev_config::format::use_toml;
use rstdev_config::parser::from_file;
use rstdev_config::{types::ConfigError, Builder};

use super::Config;

pub struct Parser {
    conf_file: String,
}

impl Parser {
    pub fn new(conf_file: String) -> Self {
        Self { conf_file }
    }

    pub fn parse(&self) -> Result<Config, ConfigError> {
        let config_toml = {
            let config_builder: Result<Config, ConfigError> =
                Builder::new(from_file(self.conf_file.to_owned()))
                    .fetch()?
                    .parse(use_toml);

            config_builder
        };

        config_toml
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::common::helpers;
    use crate::common::helpers::testdb::fixture_file;

    #[test]
    fn test_parse_config() {
        let parser = Parser::new(fixture_file("config.toml"));
        let config_builder = parser.parse();

        assert!(!config_builder.is_err());

        let config = config_builder.unwrap();
        let (host, port) = config.app().get_app_config();
        assert_eq!("localhost".to_string(), host);
        assert_eq!("8181".to_string(), port);

        let (dbpath, cfname) = config.db().wallet.get_common().get();
        assert_eq!("./wallet-storage".to_string(), dbpath);
        assert_eq!("wallet-cf".to_string(), cfname);

        let config_db_opts = config.db().wallet.get_db_options();
        assert_eq!(config_db_opts.get_set_wal_dir(), "./wallet-db-wal");
        assert!(config_db_opts.get_create_if_missing());
        assert!(config_db_opts.get_create_missing_columns());
        assert!(!config_db_opts.get_set_error_if_exists());

        assert_eq!(config.transport().get_timeout(), Duration::from_secs(5));

        let provisioning = config.agent().provisioning();
        assert_eq!(provisioning.get_owner().get_name(), "faber".to_string());
        assert_eq!(provisioning.get_master_secret_id(), "faber-master-secret".to_string());

        assert!(!helpers::validate(config).is_err());
    }

    #[test]
    fn test_parse_missing_file() {
        let parser = Parser::new(fixture_file("unknown.toml"));
        assert!(parser.parse().is_err());
    }
}
