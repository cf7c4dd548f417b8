#![allow(dead_code)]

use dicom::core::Tag;
use dicom_dictionary_std::tags;
use dicom_seg::DataSet;
use dicom_seg::TagValue;
use dicom_seg::tag_validator::default_tags;

pub const AXIAL: [f64; 6] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
pub const CIELAB: Tag = Tag(0x0062, 0x000D);

pub struct Frame {
    pub position: [f64; 3],
    pub segment: i64,
    pub orientation: Option<[f64; 6]>,
    pub mask: Vec<u8>,
}

impl Frame {
    pub fn new(position: [f64; 3], segment: i64, mask: Vec<u8>) -> Self {
        Self {
            position,
            segment,
            orientation: None,
            mask,
        }
    }
}

/// Synthetic binary segmentation.
pub struct SegBuilder {
    pub rows: usize,
    pub columns: usize,
    pub spacing: [f64; 3],
    pub shared_orientation: Option<[f64; 6]>,
    pub segments: Vec<DataSet>,
    pub frames: Vec<Frame>,
}

impl SegBuilder {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            spacing: [1.0, 1.0, 1.0],
            shared_orientation: Some(AXIAL),
            segments: Vec::new(),
            frames: Vec::new(),
        }
    }

    pub fn spacing(mut self, spacing: [f64; 3]) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn gray_segment(mut self, number: i64, value: i64) -> Self {
        self.segments.push(
            DataSet::new()
                .with(tags::SEGMENT_NUMBER, TagValue::int(number))
                .with(tags::RECOMMENDED_DISPLAY_GRAYSCALE_VALUE, TagValue::int(value)),
        );
        self
    }

    pub fn lab_segment(mut self, number: i64, lab: [i64; 3]) -> Self {
        self.segments.push(
            DataSet::new()
                .with(tags::SEGMENT_NUMBER, TagValue::int(number))
                .with(CIELAB, TagValue::Ints(lab.to_vec())),
        );
        self
    }

    pub fn frame(mut self, frame: Frame) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn full_mask(&self) -> Vec<u8> {
        vec![1; self.rows * self.columns]
    }

    pub fn empty_mask(&self) -> Vec<u8> {
        vec![0; self.rows * self.columns]
    }

    pub fn build(&self) -> (DataSet, Vec<u8>) {
        let item =
            |tag: Tag, value: TagValue| TagValue::Items(vec![DataSet::new().with(tag, value)]);
        let [column_spacing, row_spacing, slice_spacing] = self.spacing;
        let measures = DataSet::new()
            .with(tags::PIXEL_SPACING, TagValue::Floats(vec![row_spacing, column_spacing]))
            .with(tags::SPACING_BETWEEN_SLICES, TagValue::Floats(vec![slice_spacing]));

        let mut shared = DataSet::new()
            .with(tags::PIXEL_MEASURES_SEQUENCE, TagValue::Items(vec![measures]));
        if let Some(orientation) = self.shared_orientation {
            shared.insert(
                tags::PLANE_ORIENTATION_SEQUENCE,
                item(tags::IMAGE_ORIENTATION_PATIENT, TagValue::Floats(orientation.to_vec())),
            );
        }

        let per_frame = self
            .frames
            .iter()
            .map(|frame| {
                let mut group = DataSet::new()
                    .with(
                        tags::PLANE_POSITION_SEQUENCE,
                        item(
                            tags::IMAGE_POSITION_PATIENT,
                            TagValue::Floats(frame.position.to_vec()),
                        ),
                    )
                    .with(
                        tags::SEGMENT_IDENTIFICATION_SEQUENCE,
                        item(tags::REFERENCED_SEGMENT_NUMBER, TagValue::int(frame.segment)),
                    );
                if let Some(orientation) = frame.orientation {
                    group.insert(
                        tags::PLANE_ORIENTATION_SEQUENCE,
                        item(
                            tags::IMAGE_ORIENTATION_PATIENT,
                            TagValue::Floats(orientation.to_vec()),
                        ),
                    );
                }
                group
            })
            .collect();

        let index = |pointer: Tag| {
            DataSet::new().with(tags::DIMENSION_INDEX_POINTER, TagValue::Tags(vec![pointer]))
        };
        let data_set = default_tags()
            .with(tags::ROWS, TagValue::int(self.rows as i64))
            .with(tags::COLUMNS, TagValue::int(self.columns as i64))
            .with(tags::NUMBER_OF_FRAMES, TagValue::int(self.frames.len() as i64))
            .with(tags::PATIENT_ID, TagValue::str("PATIENT-1"))
            .with(tags::SERIES_INSTANCE_UID, TagValue::str("1.2.826.0.1.3680043.1"))
            .with(
                tags::DIMENSION_ORGANIZATION_SEQUENCE,
                item(tags::DIMENSION_ORGANIZATION_UID, TagValue::str("1.2.826.0.1.3680043.2")),
            )
            .with(
                tags::DIMENSION_INDEX_SEQUENCE,
                TagValue::Items(vec![
                    index(tags::REFERENCED_SEGMENT_NUMBER),
                    index(tags::IMAGE_POSITION_PATIENT),
                ]),
            )
            .with(tags::SEGMENT_SEQUENCE, TagValue::Items(self.segments.clone()))
            .with(tags::SHARED_FUNCTIONAL_GROUPS_SEQUENCE, TagValue::Items(vec![shared]))
            .with(tags::PER_FRAME_FUNCTIONAL_GROUPS_SEQUENCE, TagValue::Items(per_frame));

        let samples = self.frames.iter().flat_map(|f| f.mask.iter().copied()).collect();
        (data_set, samples)
    }
}
