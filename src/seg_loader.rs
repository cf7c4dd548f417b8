use crate::data_set::DataSet;
use crate::error::SegError;
use crate::seg_decoder::{DecodeOptions, DecodedSeg, SegDecoder};
use crate::tag_validator::{REQUIRED_TAGS, check_tags};

use dicom::object::{FileDicomObject, InMemDicomObject, open_file};
use dicom_dictionary_std::tags;
use std::path::Path;

pub struct SegLoader;

impl SegLoader {
    /// Load a segmentation from a DICOM object
    ///
    /// # Arguments
    ///
    /// * `dicom_object` - Parsed segmentation file
    /// * `options` - Decoding options
    ///
    /// # Errors
    ///
    /// Returns error if the pixel data is missing or too short, or if the
    /// decoder rejects the object
    pub fn load_from_dicom_object(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        options: DecodeOptions,
    ) -> Result<DecodedSeg, SegError> {
        let data_set = DataSet::from_file_object(dicom_object);
        check_tags(&data_set, &REQUIRED_TAGS)?;
        let frames = Self::frame_samples(dicom_object, &data_set)?;
        SegDecoder::new(options).decode(&data_set, &frames)
    }

    /// Load a segmentation from a file path
    pub fn load_from_file(
        path: impl AsRef<Path>,
        options: DecodeOptions,
    ) -> Result<DecodedSeg, SegError> {
        let dicom_object = open_file(path.as_ref())?;
        Self::load_from_dicom_object(&dicom_object, options)
    }

    fn frame_samples(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        data_set: &DataSet,
    ) -> Result<Vec<u8>, SegError> {
        let count = [
            (tags::NUMBER_OF_FRAMES, "NumberOfFrames"),
            (tags::ROWS, "Rows"),
            (tags::COLUMNS, "Columns"),
        ]
        .into_iter()
        .try_fold(1_usize, |count, (tag, name)| {
            let value = data_set.int(tag).ok_or(SegError::MissingTag(name))?;
            usize::try_from(value)
                .ok()
                .and_then(|value| count.checked_mul(value))
                .ok_or_else(|| SegError::UnsupportedTagValue {
                    tag: name,
                    value: value.to_string(),
                })
        })?;

        let pixel_data = dicom_object
            .element(tags::PIXEL_DATA)
            .map_err(|_| SegError::MissingTag("PixelData"))?
            .to_bytes()
            .map_err(|e| SegError::UnsupportedTagValue {
                tag: "PixelData",
                value: e.to_string(),
            })?;
        unpack_bits(&pixel_data, count)
    }
}

/// Unpack `count` samples of bit packed pixel data, least significant bit
/// first. Frames are not padded, so a frame may start inside a byte.
pub fn unpack_bits(bytes: &[u8], count: usize) -> Result<Vec<u8>, SegError> {
    if bytes.len().saturating_mul(8) < count {
        return Err(SegError::FrameCountMismatch(format!(
            "pixel data holds {} bits, {count} samples declared",
            bytes.len().saturating_mul(8)
        )));
    }
    Ok((0..count)
        .map(|bit| (bytes[bit / 8] >> (bit % 8)) & 1)
        .collect())
}
