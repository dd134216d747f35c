use std::collections::BTreeMap;

use crate::error::Error;
use crate::read::{
    attribute::{Attribute, AttributeValue},
    data_object::DataObject,
    dataset::Dataset,
    file::FileReader,
    link::Link,
    object::Object,
};

#[derive(Clone, Debug)]
pub struct Group {
    pub data_object: DataObject,
}

impl Group {
    /// Member names in sorted order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data_object.links.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn contains(&self, name: &str) -> bool {
        self.data_object.links.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<&Link, Error> {
        match self.data_object.links.get(name) {
            Some(l) => Ok(l),
            None => Err(Error::Hdf5Error(format!("Unknown key name '{name}'"))),
        }
    }

    pub fn object(&self, file: &mut FileReader, name: &str) -> Result<Object, Error> {
        self.get(name)?.follow(file)
    }

    pub fn group(&self, file: &mut FileReader, name: &str) -> Result<Group, Error> {
        self.object(file, name)?
            .into_group()
            .map_err(|_| Error::Hdf5Error(format!("'{name}' is not a group")))
    }

    pub fn dataset(&self, file: &mut FileReader, name: &str) -> Result<Dataset, Error> {
        self.object(file, name)?
            .into_dataset()
            .map_err(|_| Error::Hdf5Error(format!("'{name}' is not a dataset")))
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.data_object.attributes
    }

    /// Decodes every attribute. Attributes of types the reader cannot decode
    /// are logged and left out.
    pub fn attribute_values(&self) -> BTreeMap<String, AttributeValue> {
        self.data_object.attribute_values()
    }
}
