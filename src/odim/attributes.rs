use std::collections::BTreeMap;

use crate::error::Error;
use crate::read::attribute::AttributeValue;

/// The attributes of one ODIM metadata group (`what`, `where` or `how`),
/// remembering the group path for error messages.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attributes {
    group: String,
    values: BTreeMap<String, AttributeValue>,
}

impl Attributes {
    pub fn new(group: impl Into<String>) -> Self {
        Attributes {
            group: group.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn from_values(group: impl Into<String>, values: BTreeMap<String, AttributeValue>) -> Self {
        Attributes {
            group: group.into(),
            values,
        }
    }

    /// Builder form of [`Attributes::insert`].
    pub fn with(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<AttributeValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.values.iter()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    fn require(&self, name: &str) -> Result<&AttributeValue, Error> {
        self.values.get(name).ok_or_else(|| Error::MissingAttribute {
            group: self.group.clone(),
            name: name.to_string(),
        })
    }

    fn wrong_type(&self, name: &str, expected: &str, value: &AttributeValue) -> Error {
        Error::OdimError(format!(
            "{}/{} should be {}, found {}",
            self.group, name, expected, value
        ))
    }

    pub fn get_f64(&self, name: &str) -> Result<f64, Error> {
        let value = self.require(name)?;
        value
            .as_f64()
            .ok_or_else(|| self.wrong_type(name, "a number", value))
    }

    pub fn get_i64(&self, name: &str) -> Result<i64, Error> {
        let value = self.require(name)?;
        value
            .as_i64()
            .ok_or_else(|| self.wrong_type(name, "an integer", value))
    }

    pub fn get_str(&self, name: &str) -> Result<&str, Error> {
        let value = self.require(name)?;
        value
            .as_str()
            .ok_or_else(|| self.wrong_type(name, "a string", value))
    }

    pub fn get_f64_array(&self, name: &str) -> Result<Vec<f64>, Error> {
        let value = self.require(name)?;
        value
            .to_f64_vec()
            .ok_or_else(|| self.wrong_type(name, "a numeric array", value))
    }

    /// Like [`Attributes::get_f64`], but absence is not an error.
    pub fn find_f64(&self, name: &str) -> Result<Option<f64>, Error> {
        if self.contains(name) {
            self.get_f64(name).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn find_str(&self, name: &str) -> Result<Option<&str>, Error> {
        if self.contains(name) {
            self.get_str(name).map(Some)
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_missing_attributes_with_their_group() {
        let attributes = Attributes::new("dataset1/where");
        match attributes.get_f64("elangle") {
            Err(Error::MissingAttribute { group, name }) => {
                assert_eq!(group, "dataset1/where");
                assert_eq!(name, "elangle");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn reports_wrong_types() {
        let attributes = Attributes::new("what").with("object", "PVOL");
        assert!(matches!(
            attributes.get_f64("object"),
            Err(Error::OdimError(_))
        ));
        assert_eq!(attributes.get_str("object").unwrap(), "PVOL");
    }

    #[test]
    fn integers_read_as_floats() {
        let attributes = Attributes::new("where").with("nbins", 800i64);
        assert_eq!(attributes.get_f64("nbins").unwrap(), 800.0);
        assert_eq!(attributes.find_f64("rstart").unwrap(), None);
    }
}
