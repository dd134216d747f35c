use crate::{
    error::Error,
    read::{data_object::DataObject, dataset::Dataset, group::Group},
};

#[derive(Clone, Debug)]
pub enum Object {
    Group(Group),
    Dataset(Dataset),
}

impl From<DataObject> for Object {
    fn from(data_object: DataObject) -> Self {
        if data_object.is_dataset() {
            Object::Dataset(Dataset { data_object })
        } else {
            Object::Group(Group { data_object })
        }
    }
}

impl Object {
    pub fn is_group(&self) -> bool {
        matches!(self, Object::Group(_))
    }

    pub fn into_group(self) -> Result<Group, Error> {
        match self {
            Object::Group(group) => Ok(group),
            _ => Err(Error::Hdf5Error("Not a group".to_string())),
        }
    }

    pub fn into_dataset(self) -> Result<Dataset, Error> {
        match self {
            Object::Dataset(dataset) => Ok(dataset),
            _ => Err(Error::Hdf5Error("Not a dataset".to_string())),
        }
    }
}
