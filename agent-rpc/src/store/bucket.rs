use rst_common::standard::serde::de::DeserializeOwned;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::common::types::CommonError;

/// `Bucket` is a persisted set of values kept under a single key, used by the
/// tag index to list the record ids sharing a tag value
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(crate = "self::serde")]
pub struct Bucket<T>
where
    T: Serialize + PartialEq,
{
    collections: Vec<T>,
}

impl<T> Bucket<T>
where
    T: Serialize + DeserializeOwned + PartialEq + Clone,
{
    pub fn new() -> Self {
        Self {
            collections: Vec::new(),
        }
    }

    /// `add` ignores a value already in the bucket
    pub fn add(&mut self, val: T) {
        if !self.collections.contains(&val) {
            self.collections.push(val)
        }
    }

    pub fn remove(&mut self, val: &T) {
        self.collections.retain(|item| item != val)
    }

    pub fn contains(&self, val: &T) -> bool {
        self.collections.contains(val)
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn items(&self) -> Vec<T> {
        self.collections.to_owned()
    }
}

impl<T> TryInto<Vec<u8>> for Bucket<T>
where
    T: Serialize + PartialEq,
{
    type Error = CommonError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(&self).map_err(|err| CommonError::JSONError(err.to_string()))
    }
}

impl<T> TryFrom<Vec<u8>> for Bucket<T>
where
    T: Serialize + DeserializeOwned + PartialEq,
{
    type Error = CommonError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        serde_json::from_slice(&value).map_err(|err| CommonError::JSONError(err.to_string()))
    }
}

impl<T> ToJSON for Bucket<T>
where
    T: Serialize + PartialEq,
{
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(&self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}
