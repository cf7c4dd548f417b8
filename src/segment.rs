use dicom::core::Tag;
use dicom_dictionary_std::tags;

use crate::colour::dicom_cielab_to_srgb;
use crate::data_set::DataSet;
use crate::error::SegError;

const RECOMMENDED_DISPLAY_CIELAB_VALUE: Tag = Tag(0x0062, 0x000D);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentDisplay {
    Value(u16),
    Rgb([u8; 3]),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub number: u16,
    pub label: Option<String>,
    pub algorithm_type: Option<String>,
    pub display: SegmentDisplay,
}

impl Segment {
    pub fn is_rgb(&self) -> bool {
        matches!(self.display, SegmentDisplay::Rgb(_))
    }

    /// Value written in scalar output mode, `None` for colour segments.
    ///
    /// A single colour segment switches the whole volume to RGB, so scalar
    /// volumes only ever hold grayscale segments.
    pub fn display_value(&self) -> Option<u16> {
        match self.display {
            SegmentDisplay::Value(value) => Some(value),
            SegmentDisplay::Rgb(_) => None,
        }
    }

    /// Colour written in RGB output mode; grayscale segments are
    /// replicated over the three channels.
    pub fn display_rgb(&self) -> [u8; 3] {
        match self.display {
            SegmentDisplay::Rgb(rgb) => rgb,
            SegmentDisplay::Value(value) => {
                let gray = value.min(u16::from(u8::MAX)) as u8;
                [gray, gray, gray]
            }
        }
    }

    fn from_item(item: &DataSet) -> Result<Self, SegError> {
        let number = item
            .int(tags::SEGMENT_NUMBER)
            .ok_or(SegError::MissingTag("SegmentNumber"))?;
        let number = u16::try_from(number).map_err(|_| SegError::UnsupportedTagValue {
            tag: "SegmentNumber",
            value: number.to_string(),
        })?;

        let display = if let Some(lab) = item.ints(RECOMMENDED_DISPLAY_CIELAB_VALUE) {
            let lab: [u16; 3] = lab
                .iter()
                .map(|&v| u16::try_from(v).ok())
                .collect::<Option<Vec<_>>>()
                .and_then(|v| v.try_into().ok())
                .ok_or_else(|| SegError::UnsupportedTagValue {
                    tag: "RecommendedDisplayCIELabValue",
                    value: format!("{lab:?}"),
                })?;
            SegmentDisplay::Rgb(dicom_cielab_to_srgb(lab))
        } else if let Some(gray) = item.int(tags::RECOMMENDED_DISPLAY_GRAYSCALE_VALUE) {
            let gray = u16::try_from(gray).map_err(|_| SegError::UnsupportedTagValue {
                tag: "RecommendedDisplayGrayscaleValue",
                value: gray.to_string(),
            })?;
            SegmentDisplay::Value(gray)
        } else {
            SegmentDisplay::Value(number)
        };

        Ok(Segment {
            number,
            label: item.string(tags::SEGMENT_LABEL).map(str::to_string),
            algorithm_type: item.string(tags::SEGMENT_ALGORITHM_TYPE).map(str::to_string),
            display,
        })
    }
}

/// Segments of an object and whether they are stored as RGB.
#[derive(Debug, Clone, PartialEq)]
pub struct Segments {
    pub segments: Vec<Segment>,
    pub store_as_rgb: bool,
}

impl Segments {
    pub fn find(&self, number: u16) -> Option<&Segment> {
        self.segments.iter().find(|segment| segment.number == number)
    }
}

pub fn parse_segments(data_set: &DataSet) -> Result<Segments, SegError> {
    let items = data_set
        .items(tags::SEGMENT_SEQUENCE)
        .filter(|items| !items.is_empty())
        .ok_or(SegError::MissingSegmentSequence)?;

    let mut segments: Vec<Segment> = Vec::with_capacity(items.len());
    for item in items {
        let segment = Segment::from_item(item)?;
        if segments.iter().any(|s| s.number == segment.number) {
            return Err(SegError::UnsupportedTagValue {
                tag: "SegmentNumber",
                value: format!("duplicate {}", segment.number),
            });
        }
        segments.push(segment);
    }
    let store_as_rgb = segments.iter().any(Segment::is_rgb);

    Ok(Segments {
        segments,
        store_as_rgb,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct DimensionIndex {
    pub pointer: Tag,
    pub functional_group_pointer: Option<Tag>,
    pub description_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DimensionOrganization {
    pub organization_uid: Option<String>,
    pub indices: Vec<DimensionIndex>,
}

/// Read the dimension organization, accepting a single organization whose
/// index (when given) is a segment index followed by the position index.
pub fn parse_dimension_organization(
    data_set: &DataSet,
) -> Result<DimensionOrganization, SegError> {
    let organizations = data_set
        .items(tags::DIMENSION_ORGANIZATION_SEQUENCE)
        .ok_or(SegError::MissingTag("DimensionOrganizationSequence"))?;
    let [organization] = organizations else {
        return Err(SegError::UnsupportedDimensionOrganization(format!(
            "expected one organization, found {}",
            organizations.len()
        )));
    };

    let indices = match data_set.items(tags::DIMENSION_INDEX_SEQUENCE) {
        None => Vec::new(),
        Some(items) => {
            if items.len() != 2 {
                return Err(SegError::UnsupportedDimensionOrganization(format!(
                    "expected two dimension indices, found {}",
                    items.len()
                )));
            }
            let indices = items
                .iter()
                .map(|item| {
                    let pointer = item
                        .tags(tags::DIMENSION_INDEX_POINTER)
                        .and_then(|t| t.first().copied())
                        .ok_or(SegError::MissingTag("DimensionIndexPointer"))?;
                    Ok(DimensionIndex {
                        pointer,
                        functional_group_pointer: item
                            .tags(tags::FUNCTIONAL_GROUP_POINTER)
                            .and_then(|t| t.first().copied()),
                        description_label: item
                            .string(tags::DIMENSION_DESCRIPTION_LABEL)
                            .map(str::to_string),
                    })
                })
                .collect::<Result<Vec<_>, SegError>>()?;
            if indices[1].pointer != tags::IMAGE_POSITION_PATIENT {
                return Err(SegError::UnsupportedDimensionOrganization(format!(
                    "second dimension index points to {}",
                    indices[1].pointer
                )));
            }
            indices
        }
    };

    Ok(DimensionOrganization {
        organization_uid: organization
            .string(tags::DIMENSION_ORGANIZATION_UID)
            .map(str::to_string),
        indices,
    })
}
