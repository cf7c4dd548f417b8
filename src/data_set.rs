//! Typed tag store consumed by the decoder.
//!
//! A [`DataSet`] maps a [`Tag`] to a [`TagValue`]. Sequences hold nested
//! data sets, so functional groups and segment definitions are walked the
//! same way as top level attributes. Data sets are usually converted from a
//! parsed dicom-rs object, but can be built by hand as well.

use std::collections::BTreeMap;

use dicom::core::header::Header;
use dicom::core::value::{PrimitiveValue, Value};
use dicom::core::{Tag, VR};
use dicom::object::{FileDicomObject, InMemDicomObject};
use dicom_dictionary_std::tags;

#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Strs(Vec<String>),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Tags(Vec<Tag>),
    Items(Vec<DataSet>),
    Bytes(Vec<u8>),
}

impl TagValue {
    pub fn str(value: &str) -> Self {
        TagValue::Strs(vec![value.to_string()])
    }

    pub fn strs(values: &[&str]) -> Self {
        TagValue::Strs(values.iter().map(|v| v.to_string()).collect())
    }

    pub fn int(value: i64) -> Self {
        TagValue::Ints(vec![value])
    }

    /// Number of values held.
    pub fn len(&self) -> usize {
        match self {
            TagValue::Strs(v) => v.len(),
            TagValue::Ints(v) => v.len(),
            TagValue::Floats(v) => v.len(),
            TagValue::Tags(v) => v.len(),
            TagValue::Items(v) => v.len(),
            TagValue::Bytes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values rendered as text, used for value set comparisons and messages.
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            TagValue::Strs(v) => v.clone(),
            TagValue::Ints(v) => v.iter().map(ToString::to_string).collect(),
            TagValue::Floats(v) => v.iter().map(ToString::to_string).collect(),
            TagValue::Tags(v) => v.iter().map(ToString::to_string).collect(),
            TagValue::Items(v) => vec![format!("<{} items>", v.len())],
            TagValue::Bytes(v) => vec![format!("<{} bytes>", v.len())],
        }
    }

    pub fn to_floats(&self) -> Option<Vec<f64>> {
        match self {
            TagValue::Floats(v) => Some(v.clone()),
            TagValue::Ints(v) => Some(v.iter().map(|&i| i as f64).collect()),
            TagValue::Strs(v) => v.iter().map(|s| s.trim().parse().ok()).collect(),
            _ => None,
        }
    }

    pub fn to_ints(&self) -> Option<Vec<i64>> {
        match self {
            TagValue::Ints(v) => Some(v.clone()),
            TagValue::Strs(v) => v.iter().map(|s| s.trim().parse().ok()).collect(),
            TagValue::Bytes(v) => Some(v.iter().map(|&b| b as i64).collect()),
            _ => None,
        }
    }

    fn from_primitive(vr: VR, value: &PrimitiveValue) -> Option<Self> {
        match value {
            PrimitiveValue::Empty => None,
            PrimitiveValue::Tags(values) => Some(TagValue::Tags(values.to_vec())),
            PrimitiveValue::U8(values) => Some(TagValue::Bytes(values.to_vec())),
            PrimitiveValue::F32(_) | PrimitiveValue::F64(_) => {
                value.to_multi_float64().ok().map(TagValue::Floats)
            }
            PrimitiveValue::I16(_)
            | PrimitiveValue::U16(_)
            | PrimitiveValue::I32(_)
            | PrimitiveValue::U32(_)
            | PrimitiveValue::I64(_)
            | PrimitiveValue::U64(_) => value.to_multi_int::<i64>().ok().map(TagValue::Ints),
            _ => match vr {
                VR::DS | VR::FL | VR::FD => value.to_multi_float64().ok().map(TagValue::Floats),
                VR::IS => value.to_multi_int::<i64>().ok().map(TagValue::Ints),
                _ => Some(TagValue::Strs(
                    value
                        .to_multi_str()
                        .iter()
                        .map(|s| s.trim_end_matches([' ', '\0']).to_string())
                        .collect(),
                )),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSet {
    elements: BTreeMap<Tag, TagValue>,
}

impl DataSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: Tag, value: TagValue) -> Option<TagValue> {
        self.elements.insert(tag, value)
    }

    /// Builder form of [`DataSet::insert`].
    pub fn with(mut self, tag: Tag, value: TagValue) -> Self {
        self.insert(tag, value);
        self
    }

    pub fn remove(&mut self, tag: Tag) -> Option<TagValue> {
        self.elements.remove(&tag)
    }

    pub fn get(&self, tag: Tag) -> Option<&TagValue> {
        self.elements.get(&tag)
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.elements.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Tag, &TagValue)> {
        self.elements.iter()
    }

    /// Copy `tag` from `other` when present there.
    pub fn copy_from(&mut self, other: &DataSet, tag: Tag) {
        if let Some(value) = other.get(tag) {
            self.insert(tag, value.clone());
        }
    }

    pub fn string(&self, tag: Tag) -> Option<&str> {
        match self.get(tag)? {
            TagValue::Strs(values) => values.first().map(String::as_str),
            _ => None,
        }
    }

    pub fn floats(&self, tag: Tag) -> Option<Vec<f64>> {
        self.get(tag)?.to_floats()
    }

    pub fn int(&self, tag: Tag) -> Option<i64> {
        self.get(tag)?.to_ints()?.first().copied()
    }

    pub fn ints(&self, tag: Tag) -> Option<Vec<i64>> {
        self.get(tag)?.to_ints()
    }

    pub fn tags(&self, tag: Tag) -> Option<&[Tag]> {
        match self.get(tag)? {
            TagValue::Tags(values) => Some(values),
            _ => None,
        }
    }

    pub fn items(&self, tag: Tag) -> Option<&[DataSet]> {
        match self.get(tag)? {
            TagValue::Items(items) => Some(items),
            _ => None,
        }
    }

    /// First item of a sequence, the usual shape of functional group macros.
    pub fn first_item(&self, tag: Tag) -> Option<&DataSet> {
        self.items(tag)?.first()
    }

    /// Convert a parsed file, lifting the transfer syntax out of the meta group.
    pub fn from_file_object(object: &FileDicomObject<InMemDicomObject>) -> Self {
        let mut data_set = DataSet::from(&**object);
        data_set.insert(
            tags::TRANSFER_SYNTAX_UID,
            TagValue::str(object.meta().transfer_syntax().trim_end_matches('\0')),
        );
        data_set
    }
}

impl From<&InMemDicomObject> for DataSet {
    fn from(object: &InMemDicomObject) -> Self {
        let mut data_set = DataSet::new();
        for element in object {
            let tag = element.tag();
            // pixel data is read separately by the loader
            if tag == tags::PIXEL_DATA {
                continue;
            }
            let value = match element.value() {
                Value::Sequence(sequence) => {
                    Some(TagValue::Items(sequence.items().iter().map(DataSet::from).collect()))
                }
                Value::Primitive(primitive) => TagValue::from_primitive(element.vr(), primitive),
                Value::PixelSequence(_) => None,
            };
            if let Some(value) = value {
                data_set.insert(tag, value);
            }
        }
        data_set
    }
}
