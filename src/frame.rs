//! Per-frame functional group extraction.

use dicom_dictionary_std::tags;
use nalgebra::Point3;

use crate::data_set::DataSet;
use crate::error::SegError;

#[derive(Debug, Clone, PartialEq)]
pub struct FrameInfo {
    pub ref_segment_number: u16,
    pub image_position: Point3<f64>,
    /// Row then column direction cosines, when not shared by all frames.
    pub image_orientation: Option<[f64; 6]>,
    /// Column, row and slice spacing, when not shared by all frames.
    pub spacing: Option<[f64; 3]>,
    pub dimension_index_values: Vec<i64>,
    /// SOP instances this frame was derived from.
    pub source_instance_uids: Vec<String>,
}

/// Functional group values fixed for the whole object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedGroup {
    pub image_orientation: Option<[f64; 6]>,
    pub spacing: Option<[f64; 3]>,
    pub ref_segment_number: Option<u16>,
}

impl SharedGroup {
    pub fn from_data_set(data_set: &DataSet) -> Result<Self, SegError> {
        let Some(group) = data_set.first_item(tags::SHARED_FUNCTIONAL_GROUPS_SEQUENCE) else {
            return Ok(SharedGroup::default());
        };
        Ok(SharedGroup {
            image_orientation: orientation_of(group)?,
            spacing: spacing_of(group)?,
            ref_segment_number: ref_segment_number_of(group)?,
        })
    }
}

/// One [`FrameInfo`] per item of the per-frame functional groups.
pub fn frame_infos(data_set: &DataSet, shared: &SharedGroup) -> Result<Vec<FrameInfo>, SegError> {
    let groups = data_set
        .items(tags::PER_FRAME_FUNCTIONAL_GROUPS_SEQUENCE)
        .ok_or(SegError::MissingTag("PerFrameFunctionalGroupsSequence"))?;
    groups
        .iter()
        .map(|group| FrameInfo::from_group(group, shared))
        .collect()
}

impl FrameInfo {
    fn from_group(group: &DataSet, shared: &SharedGroup) -> Result<Self, SegError> {
        let ref_segment_number = match ref_segment_number_of(group)? {
            Some(number) => number,
            None => shared
                .ref_segment_number
                .ok_or(SegError::MissingTag("ReferencedSegmentNumber"))?,
        };

        let position = group
            .first_item(tags::PLANE_POSITION_SEQUENCE)
            .and_then(|item| item.floats(tags::IMAGE_POSITION_PATIENT))
            .ok_or(SegError::MissingTag("ImagePositionPatient"))?;
        let [x, y, z] = <[f64; 3]>::try_from(position.as_slice()).map_err(|_| {
            SegError::UnsupportedTagValue {
                tag: "ImagePositionPatient",
                value: format!("{position:?}"),
            }
        })?;

        let image_orientation = match shared.image_orientation {
            Some(_) => None,
            None => orientation_of(group)?,
        };
        let spacing = match shared.spacing {
            Some(_) => None,
            None => spacing_of(group)?,
        };

        let dimension_index_values = group
            .first_item(tags::FRAME_CONTENT_SEQUENCE)
            .and_then(|item| item.ints(tags::DIMENSION_INDEX_VALUES))
            .unwrap_or_default();

        let source_instance_uids = group
            .items(tags::DERIVATION_IMAGE_SEQUENCE)
            .unwrap_or_default()
            .iter()
            .flat_map(|derivation| {
                derivation
                    .items(tags::SOURCE_IMAGE_SEQUENCE)
                    .unwrap_or_default()
            })
            .filter_map(|source| source.string(tags::REFERENCED_SOP_INSTANCE_UID))
            .map(str::to_string)
            .collect();

        Ok(FrameInfo {
            ref_segment_number,
            image_position: Point3::new(x, y, z),
            image_orientation,
            spacing,
            dimension_index_values,
            source_instance_uids,
        })
    }
}

fn ref_segment_number_of(group: &DataSet) -> Result<Option<u16>, SegError> {
    let Some(number) = group
        .first_item(tags::SEGMENT_IDENTIFICATION_SEQUENCE)
        .and_then(|item| item.int(tags::REFERENCED_SEGMENT_NUMBER))
    else {
        return Ok(None);
    };
    u16::try_from(number)
        .map(Some)
        .map_err(|_| SegError::UnsupportedTagValue {
            tag: "ReferencedSegmentNumber",
            value: number.to_string(),
        })
}

fn orientation_of(group: &DataSet) -> Result<Option<[f64; 6]>, SegError> {
    let Some(values) = group
        .first_item(tags::PLANE_ORIENTATION_SEQUENCE)
        .and_then(|item| item.floats(tags::IMAGE_ORIENTATION_PATIENT))
    else {
        return Ok(None);
    };
    <[f64; 6]>::try_from(values.as_slice())
        .map(Some)
        .map_err(|_| SegError::UnsupportedTagValue {
            tag: "ImageOrientationPatient",
            value: format!("{values:?}"),
        })
}

fn spacing_of(group: &DataSet) -> Result<Option<[f64; 3]>, SegError> {
    let Some(measures) = group.first_item(tags::PIXEL_MEASURES_SEQUENCE) else {
        return Ok(None);
    };
    let Some(pixel_spacing) = measures.floats(tags::PIXEL_SPACING) else {
        return Ok(None);
    };
    // pixel spacing is (between rows, between columns)
    let [row_spacing, column_spacing] = <[f64; 2]>::try_from(pixel_spacing.as_slice())
        .map_err(|_| SegError::UnsupportedTagValue {
            tag: "PixelSpacing",
            value: format!("{pixel_spacing:?}"),
        })?;
    let slice_spacing = [tags::SPACING_BETWEEN_SLICES, tags::SLICE_THICKNESS]
        .into_iter()
        .find_map(|tag| measures.floats(tag).and_then(|v| v.first().copied()))
        .unwrap_or(1.0);
    Ok(Some([column_spacing, row_spacing, slice_spacing]))
}
