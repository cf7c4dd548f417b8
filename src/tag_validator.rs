//! Gatekeeping of the attributes a binary 3D segmentation must carry.

use dicom::core::Tag;
use dicom_dictionary_std::tags;

use crate::data_set::{DataSet, TagValue};
use crate::enums::RequirementLevel;
use crate::error::SegError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AcceptedValue {
    Str(&'static str),
    Int(i64),
    /// An enumerated set of values compared without regard to order.
    Set(&'static [&'static str]),
}

impl AcceptedValue {
    fn to_tag_value(self) -> TagValue {
        match self {
            AcceptedValue::Str(value) => TagValue::str(value),
            AcceptedValue::Int(value) => TagValue::int(value),
            AcceptedValue::Set(values) => TagValue::strs(values),
        }
    }

    fn matches_scalar(self, value: &str) -> bool {
        match self {
            AcceptedValue::Str(accepted) => accepted == value,
            AcceptedValue::Int(accepted) => value.trim().parse::<i64>() == Ok(accepted),
            AcceptedValue::Set(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TagDefinition {
    pub name: &'static str,
    pub tag: Tag,
    pub requirement: RequirementLevel,
    /// Accepted values; empty accepts anything.
    pub accepted: &'static [AcceptedValue],
}

pub const SEGMENTATION_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.66.4";

/// Attributes every decodable segmentation must carry.
pub static REQUIRED_TAGS: [TagDefinition; 12] = [
    TagDefinition {
        name: "TransferSyntaxUID",
        tag: tags::TRANSFER_SYNTAX_UID,
        requirement: RequirementLevel::Required,
        accepted: &[
            AcceptedValue::Str("1.2.840.10008.1.2.1"),
            AcceptedValue::Str("1.2.840.10008.1.2"),
            AcceptedValue::Str("1.2.840.10008.1.2.1.99"),
        ],
    },
    TagDefinition {
        name: "SOPClassUID",
        tag: tags::SOP_CLASS_UID,
        requirement: RequirementLevel::Required,
        accepted: &[AcceptedValue::Str(SEGMENTATION_STORAGE)],
    },
    TagDefinition {
        name: "Modality",
        tag: tags::MODALITY,
        requirement: RequirementLevel::Required,
        accepted: &[AcceptedValue::Str("SEG")],
    },
    TagDefinition {
        name: "SegmentationType",
        tag: tags::SEGMENTATION_TYPE,
        requirement: RequirementLevel::Required,
        accepted: &[AcceptedValue::Str("BINARY")],
    },
    TagDefinition {
        name: "DimensionOrganizationType",
        tag: tags::DIMENSION_ORGANIZATION_TYPE,
        requirement: RequirementLevel::Required,
        accepted: &[AcceptedValue::Str("3D")],
    },
    TagDefinition {
        name: "ImageType",
        tag: tags::IMAGE_TYPE,
        requirement: RequirementLevel::Required,
        accepted: &[AcceptedValue::Set(&["DERIVED", "PRIMARY"])],
    },
    TagDefinition {
        name: "SamplesPerPixel",
        tag: tags::SAMPLES_PER_PIXEL,
        requirement: RequirementLevel::Required,
        accepted: &[AcceptedValue::Int(1)],
    },
    TagDefinition {
        name: "PhotometricInterpretation",
        tag: tags::PHOTOMETRIC_INTERPRETATION,
        requirement: RequirementLevel::Required,
        accepted: &[AcceptedValue::Str("MONOCHROME2")],
    },
    TagDefinition {
        name: "PixelRepresentation",
        tag: tags::PIXEL_REPRESENTATION,
        requirement: RequirementLevel::Required,
        accepted: &[AcceptedValue::Int(0)],
    },
    TagDefinition {
        name: "BitsAllocated",
        tag: tags::BITS_ALLOCATED,
        requirement: RequirementLevel::Required,
        accepted: &[AcceptedValue::Int(1)],
    },
    TagDefinition {
        name: "BitsStored",
        tag: tags::BITS_STORED,
        requirement: RequirementLevel::Required,
        accepted: &[AcceptedValue::Int(1)],
    },
    TagDefinition {
        name: "HighBit",
        tag: tags::HIGH_BIT,
        requirement: RequirementLevel::Required,
        accepted: &[AcceptedValue::Int(0)],
    },
];

/// Check `definitions` in order against `data_set`, failing on the first violation.
pub fn check_tags(data_set: &DataSet, definitions: &[TagDefinition]) -> Result<(), SegError> {
    for definition in definitions {
        check_tag(data_set, definition)?;
    }
    Ok(())
}

pub fn check_tag(data_set: &DataSet, definition: &TagDefinition) -> Result<(), SegError> {
    let Some(value) = data_set.get(definition.tag) else {
        let required = match definition.requirement {
            RequirementLevel::Required => true,
            RequirementLevel::RequiredIfApplicable(condition) => {
                condition.is_none_or(|applies| applies(data_set))
            }
            RequirementLevel::Optional => false,
        };
        return if required {
            Err(SegError::MissingTag(definition.name))
        } else {
            Ok(())
        };
    };

    if definition.accepted.is_empty() {
        return Ok(());
    }

    let values = value.to_strings();
    let unsupported = || SegError::UnsupportedTagValue {
        tag: definition.name,
        value: values.join("\\"),
    };

    if let [AcceptedValue::Set(accepted)] = definition.accepted {
        return if same_set(accepted, &values) {
            Ok(())
        } else {
            Err(unsupported())
        };
    }

    if values.is_empty() {
        return Err(unsupported());
    }
    let all_accepted = values.iter().all(|value| {
        definition
            .accepted
            .iter()
            .any(|accepted| accepted.matches_scalar(value))
    });
    if all_accepted { Ok(()) } else { Err(unsupported()) }
}

fn same_set(accepted: &[&str], values: &[String]) -> bool {
    accepted.len() == values.len()
        && accepted.iter().all(|a| values.iter().any(|v| v == a))
        && values.iter().all(|v| accepted.contains(&v.as_str()))
}

/// Data set holding the first accepted value of each required tag.
pub fn default_tags() -> DataSet {
    let mut data_set = DataSet::new();
    for definition in &REQUIRED_TAGS {
        if let Some(accepted) = definition.accepted.first() {
            data_set.insert(definition.tag, accepted.to_tag_value());
        }
    }
    data_set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_their_own_checks() {
        let defaults = default_tags();
        assert_eq!(defaults.len(), REQUIRED_TAGS.len());
        assert!(check_tags(&defaults, &REQUIRED_TAGS).is_ok());
        assert_eq!(defaults.string(tags::MODALITY), Some("SEG"));
    }

    #[test]
    fn missing_required_tag_is_named() {
        let mut data_set = default_tags();
        data_set.remove(tags::SEGMENTATION_TYPE);
        match check_tags(&data_set, &REQUIRED_TAGS) {
            Err(SegError::MissingTag(name)) => assert_eq!(name, "SegmentationType"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unsupported_value_reports_offending_value() {
        let data_set = default_tags().with(tags::SEGMENTATION_TYPE, TagValue::str("FRACTIONAL"));
        match check_tags(&data_set, &REQUIRED_TAGS) {
            Err(SegError::UnsupportedTagValue { tag, value }) => {
                assert_eq!(tag, "SegmentationType");
                assert_eq!(value, "FRACTIONAL");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn value_pair_ignores_order() {
        let data_set =
            default_tags().with(tags::IMAGE_TYPE, TagValue::strs(&["PRIMARY", "DERIVED"]));
        assert!(check_tags(&data_set, &REQUIRED_TAGS).is_ok());

        let data_set = default_tags().with(tags::IMAGE_TYPE, TagValue::strs(&["DERIVED"]));
        assert!(matches!(
            check_tags(&data_set, &REQUIRED_TAGS),
            Err(SegError::UnsupportedTagValue { tag: "ImageType", .. })
        ));
    }

    #[test]
    fn integer_tags_accept_numeric_strings() {
        let data_set = default_tags().with(tags::BITS_ALLOCATED, TagValue::str("1"));
        assert!(check_tags(&data_set, &REQUIRED_TAGS).is_ok());
        let data_set = default_tags().with(tags::BITS_ALLOCATED, TagValue::int(8));
        assert!(check_tags(&data_set, &REQUIRED_TAGS).is_err());
    }

    #[test]
    fn conditional_requirement_follows_condition() {
        fn never(_: &DataSet) -> bool {
            false
        }
        let excused = TagDefinition {
            name: "ContentLabel",
            tag: tags::CONTENT_LABEL,
            requirement: RequirementLevel::RequiredIfApplicable(Some(never)),
            accepted: &[],
        };
        assert!(check_tag(&DataSet::new(), &excused).is_ok());

        let unconditional = TagDefinition {
            requirement: RequirementLevel::RequiredIfApplicable(None),
            ..excused
        };
        assert!(matches!(
            check_tag(&DataSet::new(), &unconditional),
            Err(SegError::MissingTag("ContentLabel"))
        ));

        let optional = TagDefinition {
            requirement: RequirementLevel::Optional,
            ..excused
        };
        assert!(check_tag(&DataSet::new(), &optional).is_ok());
    }
}
