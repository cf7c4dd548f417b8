use crate::data_set::DataSet;
use crate::enums::Processor;
use crate::error::SegError;
use crate::frame::{FrameInfo, SharedGroup, frame_infos};
use crate::reconciler::{DecodeWarning, ReconciledGeometry, reconcile, scan_frames};
use crate::segment::{Segment, Segments, parse_dimension_organization, parse_segments};
use crate::tag_validator::{REQUIRED_TAGS, check_tags, default_tags};
use crate::volume::{Geometry, Volume, VolumeData, VolumeMetadata};

use dicom::core::Tag;
use dicom_dictionary_std::tags;
use ndarray::{Array3, Array4, ArrayViewMut2, ArrayViewMut3, Axis};
use rayon::prelude::*;
use tracing::debug;

/// Identifying attributes carried over from the decoded object.
const COPIED_TAGS: [Tag; 22] = [
    tags::PATIENT_NAME,
    tags::PATIENT_ID,
    tags::PATIENT_BIRTH_DATE,
    tags::PATIENT_SEX,
    tags::STUDY_INSTANCE_UID,
    tags::STUDY_ID,
    tags::STUDY_DATE,
    tags::STUDY_TIME,
    tags::STUDY_DESCRIPTION,
    tags::SERIES_INSTANCE_UID,
    tags::SERIES_NUMBER,
    tags::SERIES_DESCRIPTION,
    tags::SOP_INSTANCE_UID,
    tags::FRAME_OF_REFERENCE_UID,
    tags::MANUFACTURER,
    tags::MANUFACTURER_MODEL_NAME,
    tags::DEVICE_SERIAL_NUMBER,
    tags::SOFTWARE_VERSIONS,
    tags::CONTENT_LABEL,
    tags::ROWS,
    tags::COLUMNS,
    tags::NUMBER_OF_FRAMES,
];

#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    pub processor: Processor,
}

#[derive(Debug, Clone)]
pub struct DecodedSeg {
    pub volume: Volume,
    /// Recoverable irregularities met while decoding.
    pub warnings: Vec<DecodeWarning>,
}

#[derive(Debug, Clone, Default)]
pub struct SegDecoder {
    options: DecodeOptions,
}

impl SegDecoder {
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }

    /// Decode a segmentation into a label volume
    ///
    /// # Arguments
    ///
    /// * `data_set` - Attributes of the segmentation object
    /// * `frames` - One sample per pixel for every frame, non zero where the
    ///   frame's segment is present
    ///
    /// # Errors
    ///
    /// Returns error if the object is not a supported binary 3D segmentation,
    /// its geometry is inconsistent, or the frames do not match the metadata
    pub fn decode(&self, data_set: &DataSet, frames: &[u8]) -> Result<DecodedSeg, SegError> {
        check_tags(data_set, &REQUIRED_TAGS)?;
        let rows = Self::dimension(data_set, tags::ROWS, "Rows")?;
        let columns = Self::dimension(data_set, tags::COLUMNS, "Columns")?;
        let frame_size = rows
            .checked_mul(columns)
            .ok_or_else(|| SegError::UnsupportedTagValue {
                tag: "Rows",
                value: format!("{rows} x {columns} pixels per frame"),
            })?;

        let dimension_organization = parse_dimension_organization(data_set)?;
        let segments = parse_segments(data_set)?;
        let shared = SharedGroup::from_data_set(data_set)?;
        let frame_infos = frame_infos(data_set, &shared)?;
        Self::validate_frame_count(data_set, &frame_infos, frames.len(), frame_size)?;
        debug!(
            frames = frame_infos.len(),
            segments = segments.segments.len(),
            rgb = segments.store_as_rgb,
            "Decoding segmentation"
        );

        let geometry = reconcile(scan_frames(&frame_infos, &shared)?)?;
        let data = self.assemble(frames, &frame_infos, &segments, &geometry, rows, columns)?;
        debug!(slices = geometry.positions.len(), "Assembled segmentation volume");

        let mut metadata_tags = default_tags();
        for tag in COPIED_TAGS {
            metadata_tags.copy_from(data_set, tag);
        }
        let ReconciledGeometry {
            orientation,
            spacing,
            positions,
            warnings,
            ..
        } = geometry;
        let slice_count = positions.len();
        let volume = Volume::new(
            data,
            Geometry {
                origin: positions[0],
                size: [columns, rows, slice_count],
                spacing,
                orientation,
                origins: positions,
            },
            VolumeMetadata {
                tags: metadata_tags,
                dimension_organization,
                segments: segments.segments,
                frame_infos,
                slice_count,
            },
        );

        Ok(DecodedSeg { volume, warnings })
    }

    fn dimension(data_set: &DataSet, tag: Tag, name: &'static str) -> Result<usize, SegError> {
        let value = data_set.int(tag).ok_or(SegError::MissingTag(name))?;
        usize::try_from(value)
            .ok()
            .filter(|&v| v > 0)
            .ok_or_else(|| SegError::UnsupportedTagValue {
                tag: name,
                value: value.to_string(),
            })
    }

    fn validate_frame_count(
        data_set: &DataSet,
        frame_infos: &[FrameInfo],
        samples: usize,
        frame_size: usize,
    ) -> Result<(), SegError> {
        let number_of_frames = data_set
            .int(tags::NUMBER_OF_FRAMES)
            .ok_or(SegError::MissingTag("NumberOfFrames"))?;
        if usize::try_from(number_of_frames).ok() != Some(frame_infos.len()) {
            return Err(SegError::FrameCountMismatch(format!(
                "{number_of_frames} frames declared, {} per-frame groups",
                frame_infos.len()
            )));
        }
        if frame_infos.is_empty() {
            return Err(SegError::FrameCountMismatch("no frames".to_string()));
        }
        let expected = frame_infos.len().checked_mul(frame_size).ok_or_else(|| {
            SegError::FrameCountMismatch(format!(
                "{} frames of {frame_size} samples overflow",
                frame_infos.len()
            ))
        })?;
        if samples != expected {
            return Err(SegError::FrameCountMismatch(format!(
                "expected {expected} samples for {} frames, got {samples}",
                frame_infos.len()
            )));
        }
        Ok(())
    }

    fn assemble(
        &self,
        frames: &[u8],
        frame_infos: &[FrameInfo],
        segments: &Segments,
        geometry: &ReconciledGeometry,
        rows: usize,
        columns: usize,
    ) -> Result<VolumeData, SegError> {
        // overflow already ruled out by `decode`
        let frame_size = rows * columns;
        // every frame is resolved before anything is written
        let mut writes: Vec<Vec<(&[u8], &Segment)>> = vec![Vec::new(); geometry.positions.len()];
        let masks = frames.chunks_exact(frame_size);
        for (frame, (info, mask)) in frame_infos.iter().zip(masks).enumerate() {
            let slice = geometry
                .slice_index(&info.image_position)
                .ok_or(SegError::SliceIndexNotFound { frame })?;
            let segment = segments.find(info.ref_segment_number).ok_or(
                SegError::UnknownSegmentReference {
                    frame,
                    segment: info.ref_segment_number,
                },
            )?;
            writes[slice].push((mask, segment));
        }

        let slices = geometry.positions.len();
        let channels = if segments.store_as_rgb { 3 } else { 1 };
        slices
            .checked_mul(frame_size)
            .and_then(|voxels| voxels.checked_mul(channels))
            .ok_or_else(|| {
                SegError::FrameCountMismatch(format!(
                    "{slices} slices of {rows} x {columns} do not fit in memory"
                ))
            })?;
        let data = if segments.store_as_rgb {
            let mut data = Array4::<u8>::zeros((slices, rows, columns, 3));
            match self.options.processor {
                Processor::Serial => data
                    .axis_iter_mut(Axis(0))
                    .zip(writes.iter())
                    .for_each(|(slice, writes)| Self::write_rgb(slice, writes, columns)),
                Processor::Parallel => data
                    .axis_iter_mut(Axis(0))
                    .into_par_iter()
                    .zip(writes.par_iter())
                    .for_each(|(slice, writes)| Self::write_rgb(slice, writes, columns)),
            }
            VolumeData::Rgb(data)
        } else {
            let mut data = Array3::<u16>::zeros((slices, rows, columns));
            match self.options.processor {
                Processor::Serial => data
                    .axis_iter_mut(Axis(0))
                    .zip(writes.iter())
                    .for_each(|(slice, writes)| Self::write_scalar(slice, writes, columns)),
                Processor::Parallel => data
                    .axis_iter_mut(Axis(0))
                    .into_par_iter()
                    .zip(writes.par_iter())
                    .for_each(|(slice, writes)| Self::write_scalar(slice, writes, columns)),
            }
            VolumeData::Scalar(data)
        };
        Ok(data)
    }

    // frames of one slice are applied in input order, the last one wins
    fn write_scalar(
        mut slice: ArrayViewMut2<'_, u16>,
        writes: &[(&[u8], &Segment)],
        columns: usize,
    ) {
        for (mask, segment) in writes {
            let Some(value) = segment.display_value() else {
                continue;
            };
            for (index, _) in mask.iter().enumerate().filter(|(_, sample)| **sample != 0) {
                slice[[index / columns, index % columns]] = value;
            }
        }
    }

    fn write_rgb(mut slice: ArrayViewMut3<'_, u8>, writes: &[(&[u8], &Segment)], columns: usize) {
        for (mask, segment) in writes {
            let rgb = segment.display_rgb();
            for (index, _) in mask.iter().enumerate().filter(|(_, sample)| **sample != 0) {
                let (row, column) = (index / columns, index % columns);
                for (channel, value) in rgb.into_iter().enumerate() {
                    slice[[row, column, channel]] = value;
                }
            }
        }
    }
}
